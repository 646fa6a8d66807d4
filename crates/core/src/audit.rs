//! Append-only operational audit log.
//!
//! A timestamped text record of operational events, not consumed
//! programmatically. Appends are fire-and-forget: an audit failure is
//! logged via `tracing` and must never mask the error that triggered the
//! append.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

/// Handle to the audit log file.
pub struct AuditSink {
    path: PathBuf,
}

impl AuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        AuditSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line, best-effort.
    pub fn record(&self, message: &str) {
        if let Err(e) = self.try_record(message) {
            tracing::warn!(path = %self.path.display(), error = %e, "Audit append failed");
        }
    }

    fn try_record(&self, message: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{} - {}", Utc::now().to_rfc3339(), message)
    }
}
