//! LabIntake Audit - Structured audit trail
//!
//! Provides:
//! - `AuditLogger`: High-level service for recording intake audit entries
//! - `ReasonCode`: Structured reason codes for skipped and failed files
//! - `JsonlAuditSink`: Append-only JSON-lines implementation of `IAuditSink`

pub mod logger;
pub mod reason;
pub mod sink;

pub use logger::AuditLogger;
pub use reason::ReasonCode;
pub use sink::{AuditSinkError, JsonlAuditSink};
