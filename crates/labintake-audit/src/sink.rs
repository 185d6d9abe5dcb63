//! JsonlAuditSink - append-only JSON-lines audit persistence
//!
//! Each [`AuditEntry`] is serialized as one JSON object per line. The file is
//! only ever opened in append mode, so earlier entries are never rewritten.

use std::path::{Path, PathBuf};

use labintake_core::{domain::audit::AuditEntry, ports::audit_sink::IAuditSink};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Errors raised by the JSON-lines sink
#[derive(Debug, Error)]
pub enum AuditSinkError {
    /// The audit file or its directory could not be opened/written
    #[error("I/O error on audit file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An entry could not be encoded or a stored line could not be decoded
    #[error("Invalid audit line: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Append-only audit sink writing JSON lines to a file
pub struct JsonlAuditSink {
    path: PathBuf,
    // Serializes appends so concurrent callers never interleave partial lines
    write_lock: Mutex<()>,
}

impl JsonlAuditSink {
    /// Creates a sink writing to `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the audit file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> AuditSinkError {
        AuditSinkError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn append_line(&self, entry: &AuditEntry) -> Result<(), AuditSinkError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_err(e))?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_err(e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_err(e))?;
        file.flush().await.map_err(|e| self.io_err(e))?;
        Ok(())
    }

    async fn read_recent(&self, limit: usize) -> Result<Vec<AuditEntry>, AuditSinkError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_err(e)),
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(limit);
        lines[start..]
            .iter()
            .map(|line| serde_json::from_str(line).map_err(AuditSinkError::from))
            .collect()
    }
}

#[async_trait::async_trait]
impl IAuditSink for JsonlAuditSink {
    async fn append(&self, entry: &AuditEntry) -> anyhow::Result<()> {
        Ok(self.append_line(entry).await?)
    }

    async fn recent(&self, limit: usize) -> anyhow::Result<Vec<AuditEntry>> {
        Ok(self.read_recent(limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use labintake_core::domain::audit::{AuditAction, AuditResult};
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn test_append_creates_file_and_parent_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("audit.jsonl");
        let sink = JsonlAuditSink::new(&path);

        sink.append(&AuditEntry::new(AuditAction::RunStart, AuditResult::success()))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.ends_with('\n'));
    }

    #[tokio::test]
    async fn test_append_never_rewrites_existing_lines() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("audit.jsonl");
        std::fs::write(&path, "{\"existing\":true}\n").unwrap();
        let sink = JsonlAuditSink::new(&path);

        sink.append(&AuditEntry::new(AuditAction::RunComplete, AuditResult::success()))
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("{\"existing\":true}\n"));
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_recent_returns_tail_in_order() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(tmp.path().join("audit.jsonl"));

        for action in [
            AuditAction::RunStart,
            AuditAction::FileStaged,
            AuditAction::FileUploaded,
            AuditAction::RunComplete,
        ] {
            sink.append(&AuditEntry::new(action, AuditResult::success()))
                .await
                .unwrap();
        }

        let recent = sink.recent(2).await.unwrap();
        let actions: Vec<AuditAction> = recent.iter().map(|e| e.action()).collect();
        assert_eq!(actions, vec![AuditAction::FileUploaded, AuditAction::RunComplete]);
    }

    #[tokio::test]
    async fn test_recent_on_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let sink = JsonlAuditSink::new(tmp.path().join("none.jsonl"));
        assert!(sink.recent(10).await.unwrap().is_empty());
    }
}
