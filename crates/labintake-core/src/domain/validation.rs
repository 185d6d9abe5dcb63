//! Sample validation rule
//!
//! A sample is valid iff its content is a well-formed JSON object and every
//! field in [`RequiredFieldSet`] is present with a truthy value. Falsy values
//! (`null`, `false`, `0`, `""`, `[]`, `{}`) count as missing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reason reported for content that is not a JSON object
pub const MALFORMED_REASON: &str = "malformed input";

/// Reason reported when the staged copy could not be read at all
pub const UNREADABLE_REASON: &str = "unreadable sample file";

/// Prefix of the reason listing missing or empty fields
const MISSING_PREFIX: &str = "Missing or empty fields: ";

/// The fixed, ordered set of mandatory field names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequiredFieldSet;

impl RequiredFieldSet {
    /// Field names in declared order
    pub const FIELDS: [&'static str; 3] = ["patient_id", "sample_id", "result"];

    /// Iterates the field names in declared order
    pub fn iter() -> impl Iterator<Item = &'static str> {
        Self::FIELDS.into_iter()
    }
}

/// Outcome of validating one sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    valid: bool,
    reason: String,
}

impl ValidationResult {
    /// A passing result with an empty reason
    pub fn valid() -> Self {
        Self {
            valid: true,
            reason: String::new(),
        }
    }

    /// A failing result with the given reason
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            reason: reason.into(),
        }
    }

    /// Failing result for content that could not be parsed
    pub fn malformed() -> Self {
        Self::invalid(MALFORMED_REASON)
    }

    /// Failing result for a staged copy that could not be read
    pub fn unreadable() -> Self {
        Self::invalid(UNREADABLE_REASON)
    }

    /// Whether the sample passed validation
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Why the sample failed; empty when valid
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Validates raw sample content.
///
/// Never fails: unparseable content is reported as an invalid result.
pub fn validate_sample(content: &[u8]) -> ValidationResult {
    let data = match serde_json::from_slice::<Value>(content) {
        Ok(Value::Object(map)) => map,
        // Arrays, scalars, and syntax errors are all outside the key/value shape
        Ok(_) | Err(_) => return ValidationResult::malformed(),
    };

    let missing: Vec<&str> = RequiredFieldSet::iter()
        .filter(|field| !data.get(*field).is_some_and(is_truthy))
        .collect();

    if missing.is_empty() {
        ValidationResult::valid()
    } else {
        ValidationResult::invalid(format!("{}{}", MISSING_PREFIX, missing.join(", ")))
    }
}

/// Truthiness of a JSON value, as the producers' tooling understands it
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_fields_present_is_valid() {
        let result =
            validate_sample(br#"{"patient_id":"p1","sample_id":"s1","result":"positive"}"#);
        assert!(result.is_valid());
        assert_eq!(result.reason(), "");
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let result = validate_sample(
            br#"{"patient_id":"p1","sample_id":"s1","result":"negative","lab":"north"}"#,
        );
        assert!(result.is_valid());
    }

    #[test]
    fn test_non_string_truthy_values_are_accepted() {
        let result = validate_sample(br#"{"patient_id":17,"sample_id":[1],"result":true}"#);
        assert!(result.is_valid());
    }

    #[test]
    fn test_empty_string_field_is_missing() {
        let result =
            validate_sample(br#"{"patient_id":"p2","sample_id":"","result":"negative"}"#);
        assert!(!result.is_valid());
        assert_eq!(result.reason(), "Missing or empty fields: sample_id");
    }

    #[test]
    fn test_absent_field_is_missing() {
        let result = validate_sample(br#"{"patient_id":"p3","sample_id":"s3"}"#);
        assert_eq!(result.reason(), "Missing or empty fields: result");
    }

    #[test]
    fn test_falsy_values_count_as_missing() {
        let cases: [&[u8]; 6] = [
            br#"{"patient_id":null,"sample_id":"s","result":"r"}"#,
            br#"{"patient_id":0,"sample_id":"s","result":"r"}"#,
            br#"{"patient_id":0.0,"sample_id":"s","result":"r"}"#,
            br#"{"patient_id":false,"sample_id":"s","result":"r"}"#,
            br#"{"patient_id":[],"sample_id":"s","result":"r"}"#,
            br#"{"patient_id":{},"sample_id":"s","result":"r"}"#,
        ];
        for content in cases {
            let result = validate_sample(content);
            assert!(!result.is_valid(), "{}", String::from_utf8_lossy(content));
            assert_eq!(result.reason(), "Missing or empty fields: patient_id");
        }
    }

    #[test]
    fn test_missing_fields_listed_in_declared_order() {
        let result = validate_sample(br#"{"result":"","sample_id":null}"#);
        assert_eq!(
            result.reason(),
            "Missing or empty fields: patient_id, sample_id, result"
        );

        let result = validate_sample(br#"{"sample_id":"s","result":0}"#);
        assert_eq!(
            result.reason(),
            "Missing or empty fields: patient_id, result"
        );
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let result = validate_sample(b"{\"patient_id\": \"p1\", ");
        assert!(!result.is_valid());
        assert_eq!(result.reason(), MALFORMED_REASON);
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        for content in [&b"[1,2,3]"[..], b"\"patient_id\"", b"42", b"null"] {
            let result = validate_sample(content);
            assert!(!result.is_valid());
            assert_eq!(result.reason(), MALFORMED_REASON);
        }
    }

    #[test]
    fn test_empty_and_binary_content_is_malformed() {
        assert_eq!(validate_sample(b"").reason(), MALFORMED_REASON);
        assert_eq!(
            validate_sample(&[0xff, 0xfe, 0x00]).reason(),
            MALFORMED_REASON
        );
    }

    #[test]
    fn test_validation_is_deterministic() {
        let content = br#"{"patient_id":"p","sample_id":"","result":"r"}"#;
        assert_eq!(validate_sample(content), validate_sample(content));
    }

    #[test]
    fn test_required_field_order() {
        let fields: Vec<&str> = RequiredFieldSet::iter().collect();
        assert_eq!(fields, vec!["patient_id", "sample_id", "result"]);
    }
}
