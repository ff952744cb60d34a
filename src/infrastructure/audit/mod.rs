//! Append-only audit log

use std::path::{Path, PathBuf};

use chrono::Local;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::application::errors::AuditError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Local time formatted for audit records
pub fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// `Client[<username>]: <event> at <timestamp>`
pub fn format_record(username: &str, event: &str, at: &str) -> String {
    format!("Client[{}]: {} at {}", username, event, at)
}

/// Audit trail of connects, disconnects and received lines.
///
/// All appends go through one mutex, so records never interleave. Write
/// failures are logged and dropped.
pub struct AuditLog {
    path: Option<PathBuf>,
    file: Option<Mutex<File>>,
}

impl AuditLog {
    /// Truncate `path` and start a fresh log with an `Initialized` record
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(&path).await?;
        file.write_all(format!("Initialized chatroom at {}\n", timestamp()).as_bytes())
            .await?;
        file.flush().await?;

        // Reopen in append mode so later writes always land at the end
        let file = OpenOptions::new().append(true).open(&path).await?;
        tracing::info!("Audit log at {}", path.display());

        Ok(Self {
            path: Some(path),
            file: Some(Mutex::new(file)),
        })
    }

    /// A log that records nothing
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Append a record for `username`. Never fails.
    pub async fn record(&self, username: &str, event: &str) {
        if !self.is_enabled() {
            return;
        }
        let line = format_record(username, event, &timestamp());
        if let Err(e) = self.append(&line).await {
            tracing::warn!("Failed to write audit record: {}", e);
        }
    }

    async fn append(&self, line: &str) -> Result<(), AuditError> {
        let Some(file) = &self.file else {
            return Ok(());
        };
        let mut file = file.lock().await;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> PathBuf {
        std::env::temp_dir()
            .join(format!("chatroom-audit-{}", uuid::Uuid::new_v4()))
            .join("audit.log")
    }

    #[test]
    fn test_record_format() {
        assert_eq!(
            format_record("alice", "connected", "2024-01-01 10:00:00.000000"),
            "Client[alice]: connected at 2024-01-01 10:00:00.000000"
        );
    }

    #[tokio::test]
    async fn test_open_truncates_and_initializes() {
        let path = temp_log();
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, "stale\n").await.unwrap();

        let log = AuditLog::open(&path).await.unwrap();
        log.record("alice", "connected").await;
        log.record("alice", "echo hi").await;

        let content = fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Initialized chatroom at "));
        assert!(lines[1].starts_with("Client[alice]: connected at "));
        assert!(lines[2].starts_with("Client[alice]: echo hi at "));
        assert!(!content.contains("stale"));
    }

    #[tokio::test]
    async fn test_concurrent_records_do_not_interleave() {
        let path = temp_log();
        let log = std::sync::Arc::new(AuditLog::open(&path).await.unwrap());

        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..20 {
            let log = log.clone();
            tasks.spawn(async move {
                log.record(&format!("user{}", i), "connected").await;
            });
        }
        while let Some(result) = tasks.join_next().await {
            result.unwrap();
        }

        let content = fs::read_to_string(&path).await.unwrap();
        let records: Vec<&str> = content.lines().skip(1).collect();
        assert_eq!(records.len(), 20);
        assert!(records.iter().all(|l| l.starts_with("Client[user") && l.contains(": connected at ")));
    }

    #[tokio::test]
    async fn test_disabled_log_is_silent() {
        let log = AuditLog::disabled();
        assert!(!log.is_enabled());
        assert!(log.path().is_none());
        log.record("alice", "connected").await;
    }
}
