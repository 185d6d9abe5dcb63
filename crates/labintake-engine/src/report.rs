//! Summary of one intake pass

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use labintake_core::domain::{Destination, FileOutcome, RunId};
use serde::Serialize;

/// Everything that happened during one pass
#[derive(Debug, Clone)]
pub struct IntakeReport {
    /// Identifier shared by all audit entries of the pass
    pub run_id: RunId,
    /// When the pass started
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
    /// Terminal state of every candidate, in processing order
    pub outcomes: Vec<FileOutcome>,
    /// Rejection alerts handed to the gateway
    pub alerts_sent: usize,
    /// Rejection alerts that could not be delivered
    pub alerts_failed: usize,
    /// Staged files already waiting for manual recovery when the pass began
    pub retained_before: usize,
}

impl IntakeReport {
    pub(crate) fn new(run_id: RunId, started_at: DateTime<Utc>) -> Self {
        Self {
            run_id,
            started_at,
            duration_ms: 0,
            outcomes: Vec::new(),
            alerts_sent: 0,
            alerts_failed: 0,
            retained_before: 0,
        }
    }

    /// Files uploaded and removed from staging
    pub fn cleaned(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Cleaned { .. }))
    }

    /// Files left in the watched directory for the next run
    pub fn skipped(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                FileOutcome::SkippedUnstable { .. } | FileOutcome::StageFailed { .. }
            )
        })
    }

    /// Files that reached staging but did not finish cleanly
    pub fn failed(&self) -> usize {
        self.count(FileOutcome::needs_recovery)
    }

    /// Files routed to `destination`, whether or not cleanup succeeded
    pub fn routed_to(&self, destination: Destination) -> usize {
        self.count(|o| o.was_uploaded() && o.destination() == Some(destination))
    }

    /// True when something needs a human: a retained staged copy or a lost alert
    pub fn needs_attention(&self) -> bool {
        self.failed() > 0 || self.alerts_failed > 0
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(*o)).count()
    }

    /// Serializable view for JSON output
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            run_id: self.run_id.to_string(),
            started_at: self.started_at,
            duration_ms: self.duration_ms,
            discovered: self.outcomes.len(),
            cleaned: self.cleaned(),
            skipped: self.skipped(),
            failed: self.failed(),
            accepted: self.routed_to(Destination::Accepted),
            rejected: self.routed_to(Destination::Rejected),
            alerts_sent: self.alerts_sent,
            alerts_failed: self.alerts_failed,
            retained_before: self.retained_before,
            files: self.outcomes.iter().map(FileSummary::from).collect(),
        }
    }
}

/// Flat, serializable form of an [`IntakeReport`]
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub discovered: usize,
    pub cleaned: usize,
    pub skipped: usize,
    pub failed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub alerts_sent: usize,
    pub alerts_failed: usize,
    pub retained_before: usize,
    pub files: Vec<FileSummary>,
}

/// One line of a [`ReportSummary`]
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&FileOutcome> for FileSummary {
    fn from(outcome: &FileOutcome) -> Self {
        Self {
            path: outcome.path().to_path_buf(),
            outcome: outcome.label(),
            destination: outcome.destination(),
            error: outcome.error().map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use labintake_core::domain::IntakeError;
    use labintake_core::ports::UploadError;

    use super::*;

    fn report() -> IntakeReport {
        let mut report = IntakeReport::new(RunId::new(), Utc::now());
        report.outcomes = vec![
            FileOutcome::Cleaned {
                path: PathBuf::from("/in/a.json"),
                destination: Destination::Accepted,
            },
            FileOutcome::Cleaned {
                path: PathBuf::from("/in/b.json"),
                destination: Destination::Rejected,
            },
            FileOutcome::SkippedUnstable {
                path: PathBuf::from("/in/c.json"),
                error: None,
            },
            FileOutcome::RoutingFailed {
                path: PathBuf::from("/staging/d.json"),
                destination: Destination::Accepted,
                error: IntakeError::Upload {
                    bucket: "good".into(),
                    key: "d.json".into(),
                    source: UploadError::AlreadyExists,
                },
            },
        ];
        report
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert_eq!(report.cleaned(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.routed_to(Destination::Accepted), 1);
        assert_eq!(report.routed_to(Destination::Rejected), 1);
        assert!(report.needs_attention());
    }

    #[test]
    fn test_empty_report_needs_no_attention() {
        let report = IntakeReport::new(RunId::new(), Utc::now());
        assert_eq!(report.cleaned(), 0);
        assert!(!report.needs_attention());
    }

    #[test]
    fn test_summary_serializes_outcomes() {
        let summary = report().summary();
        assert_eq!(summary.discovered, 4);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["files"][0]["outcome"], "cleaned");
        assert_eq!(json["files"][0]["destination"], "accepted");
        assert!(json["files"][2].get("destination").is_none());
        assert!(json["files"][3]["error"]
            .as_str()
            .unwrap()
            .contains("already exists"));
    }
}
