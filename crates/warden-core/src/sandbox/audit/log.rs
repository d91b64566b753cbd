//! Append-only audit storage

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::entry::AuditEntry;
use crate::error::{WardenError, WardenResult};

/// Audit entries held in memory and appended to daily JSONL files
///
/// Constructed once at startup and shared by reference; tests build an
/// isolated instance per case. Each record is serialized up front and written
/// with a single `write_all` under the log's mutex, so concurrent writers
/// never interleave partial lines.
#[derive(Debug)]
pub struct AuditLog {
    directory: Option<PathBuf>,
    inner: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Log persisting under `directory`, created on first write
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Log that keeps entries in memory only
    pub fn in_memory() -> Self {
        Self {
            directory: None,
            inner: Mutex::new(Vec::new()),
        }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// File holding entries written on `date`
    pub fn file_for(directory: &Path, date: NaiveDate) -> PathBuf {
        directory.join(format!("audit_{}.jsonl", date.format("%Y%m%d")))
    }

    /// Persist `entry`, then keep it in memory
    ///
    /// On a persistence failure the entry is not kept; callers decide what
    /// to record instead via [`AuditLog::push_unpersisted`].
    pub fn record(&self, entry: AuditEntry) -> WardenResult<()> {
        let mut entries = self.inner.lock();
        if let Some(dir) = &self.directory {
            Self::append(dir, &entry)?;
        }
        entries.push(entry);
        Ok(())
    }

    /// Keep an entry in memory without writing it to disk
    pub fn push_unpersisted(&self, entry: AuditEntry) {
        self.inner.lock().push(entry);
    }

    fn append(dir: &Path, entry: &AuditEntry) -> WardenResult<()> {
        fs::create_dir_all(dir)
            .map_err(io_error("Failed to create audit directory", dir))?;

        let path = Self::file_for(dir, Utc::now().date_naive());
        let mut line = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error("Failed to open audit log", &path))?;
        file.write_all(&line)
            .and_then(|_| file.flush())
            .map_err(io_error("Failed to write audit log", &path))?;

        debug!("Audit entry {} written to {}", entry.execution_id, path.display());
        Ok(())
    }

    /// Snapshot of the in-memory entries
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Read back the persisted entries for one day
    pub fn load_day(&self, date: NaiveDate) -> WardenResult<Vec<AuditEntry>> {
        let Some(dir) = &self.directory else {
            return Ok(Vec::new());
        };
        let path = Self::file_for(dir, date);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&path)
            .map_err(io_error("Failed to read audit log", &path))?;
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(WardenError::from))
            .collect()
    }
}

fn io_error<'a>(context: &'a str, path: &'a Path) -> impl FnOnce(std::io::Error) -> WardenError + 'a {
    move |e| WardenError::io_with_path(format!("{}: {}", context, e), path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::types::ExecutionStatus;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn entry(id: &str, status: ExecutionStatus) -> AuditEntry {
        AuditEntry {
            execution_id: id.to_string(),
            timestamp: Utc::now(),
            tenant_id: None,
            session_id: None,
            code_hash: "00".repeat(32),
            policy_version: "1.0".to_string(),
            status,
            sandbox_used: "none".to_string(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_in_memory_log() {
        let log = AuditLog::in_memory();
        assert!(log.is_empty());
        log.record(entry("a", ExecutionStatus::Success)).unwrap();
        assert_eq!(log.len(), 1);
        assert!(log.directory().is_none());
        assert!(log.load_day(Utc::now().date_naive()).unwrap().is_empty());
    }

    #[test]
    fn test_persists_daily_jsonl() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("audit");
        let log = AuditLog::new(&dir);

        log.record(entry("a", ExecutionStatus::Success)).unwrap();
        log.record(entry("b", ExecutionStatus::PolicyViolation)).unwrap();

        let today = Utc::now().date_naive();
        let path = AuditLog::file_for(&dir, today);
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("audit_"));

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        let loaded = log.load_day(today).unwrap();
        assert_eq!(loaded[1].execution_id, "b");
        assert_eq!(loaded[1].status, ExecutionStatus::PolicyViolation);
    }

    #[test]
    fn test_concurrent_writers_do_not_interleave() {
        let temp = TempDir::new().unwrap();
        let log = Arc::new(AuditLog::new(temp.path()));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        log.record(entry(&format!("{}-{}", t, i), ExecutionStatus::Success))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let loaded = log.load_day(Utc::now().date_naive()).unwrap();
        assert_eq!(loaded.len(), 200);
        assert_eq!(log.len(), 200);
    }

    #[test]
    fn test_unwritable_directory() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "x").unwrap();

        let log = AuditLog::new(blocker.join("audit"));
        assert!(log.record(entry("a", ExecutionStatus::Success)).is_err());
        assert!(log.is_empty());

        log.push_unpersisted(entry("a", ExecutionStatus::Error));
        assert_eq!(log.entries()[0].status, ExecutionStatus::Error);
    }
}
