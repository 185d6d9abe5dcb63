//! Audit sink port
//!
//! Append-only persistence of [`AuditEntry`] records.

use crate::domain::audit::AuditEntry;

/// Port trait for audit persistence
#[async_trait::async_trait]
pub trait IAuditSink: Send + Sync {
    /// Appends one entry
    async fn append(&self, entry: &AuditEntry) -> anyhow::Result<()>;

    /// Returns the most recent entries, newest last
    async fn recent(&self, limit: usize) -> anyhow::Result<Vec<AuditEntry>>;
}
