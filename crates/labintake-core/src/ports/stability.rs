//! Stability strategy port
//!
//! Decides whether a producer has finished writing a file. The default
//! strategy compares sizes across a quiescence window; the checksum variant
//! compares content digests instead.

use std::path::Path;

/// Port trait for write-completion detection
#[async_trait::async_trait]
pub trait IStabilityStrategy: Send + Sync {
    /// Returns true if `path` did not change across the quiescence window
    ///
    /// # Errors
    /// Returns an error if the file vanished or could not be sampled. Callers
    /// treat this as "not confirmed stable".
    async fn is_stable(&self, path: &Path) -> anyhow::Result<bool>;

    /// Short name of the strategy for logs
    fn name(&self) -> &'static str;
}
