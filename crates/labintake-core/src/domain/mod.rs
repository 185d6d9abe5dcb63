//! Domain entities and business logic
//!
//! This module contains the core domain types for LabIntake:
//! - Sample files and their routing destinations
//! - The validation rule and its result type
//! - Per-file outcomes of an intake pass
//! - Audit entries for tracking operations
//! - Domain-specific error types

pub mod audit;
pub mod errors;
pub mod outcome;
pub mod sample;
pub mod validation;

// Re-export commonly used types
pub use audit::{AuditAction, AuditEntry, AuditResult, RunId};
pub use errors::{DomainError, IntakeError};
pub use outcome::{FileOutcome, IntakeStage};
pub use sample::{Buckets, Destination, SampleFile};
pub use validation::{validate_sample, RequiredFieldSet, ValidationResult};
