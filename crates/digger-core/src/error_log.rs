//! Append-only sink for classified failures.

use crate::error::Result;
use crate::taxonomy::{ErrorRecord, Severity};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Number of records kept in memory when no capacity is given.
const DEFAULT_TAIL: usize = 256;

/// Records every [`ErrorRecord`] created at a failure boundary.
///
/// Each record is emitted through `tracing` at a level matching its
/// severity and, when a path is configured, appended to a JSON-lines file.
/// A bounded in-memory tail keeps the most recent records for inspection.
/// Writing to the sink never fails the caller.
#[derive(Debug)]
pub struct ErrorLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
    tail: Mutex<VecDeque<ErrorRecord>>,
    capacity: usize,
}

impl ErrorLog {
    /// A log that only traces and keeps the in-memory tail.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
            tail: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_TAIL,
        }
    }

    /// A log that also appends JSON lines to `path`.
    ///
    /// Parent directories are created as needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path: Some(path),
            file: Mutex::new(Some(file)),
            tail: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_TAIL,
        })
    }

    /// Change how many records are kept in memory.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Path of the backing file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record a classified failure.
    pub fn record(&self, record: &ErrorRecord) {
        match record.severity() {
            Severity::Critical => error!(
                kind = %record.kind,
                platform = %record.platform,
                details = ?record.details,
                "{}",
                record.message
            ),
            Severity::Error => warn!(
                kind = %record.kind,
                platform = %record.platform,
                details = ?record.details,
                "{}",
                record.message
            ),
            Severity::Warning => info!(
                kind = %record.kind,
                platform = %record.platform,
                "{}",
                record.message
            ),
        }

        if let Err(e) = self.append(record) {
            warn!("failed to append to error log: {}", e);
        }

        let mut tail = self.tail.lock().expect("acquire error log tail lock");
        if tail.len() == self.capacity {
            tail.pop_front();
        }
        tail.push_back(record.clone());
    }

    fn append(&self, record: &ErrorRecord) -> Result<()> {
        let mut guard = self.file.lock().expect("acquire error log file lock");
        if let Some(file) = guard.as_mut() {
            let line = serde_json::to_string(record)?;
            writeln!(file, "{line}")?;
        }
        Ok(())
    }

    /// The most recent `count` records, oldest first.
    #[must_use]
    pub fn recent(&self, count: usize) -> Vec<ErrorRecord> {
        let tail = self.tail.lock().expect("acquire error log tail lock");
        let start = tail.len().saturating_sub(count);
        tail.iter().skip(start).cloned().collect()
    }

    /// Number of records currently held in memory.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tail.lock().expect("acquire error log tail lock").len()
    }

    /// True when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_in_memory_tail() {
        let log = ErrorLog::in_memory().with_capacity(2);
        log.record(&ErrorRecord::new(ErrorKind::DnsError, "Juno", "a"));
        log.record(&ErrorRecord::new(ErrorKind::ReadTimeout, "Juno", "b"));
        log.record(&ErrorRecord::new(ErrorKind::NotFound, "Juno", "c"));

        let recent = log.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "b");
        assert_eq!(recent[1].message, "c");
    }

    #[test]
    fn test_appends_json_lines() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("logs").join("errors.jsonl");
        let log = ErrorLog::open(&path).expect("open error log");

        log.record(&ErrorRecord::new(ErrorKind::RateLimited, "Discogs", "slow down"));
        log.record(
            &ErrorRecord::new(ErrorKind::StructureChanged, "Discogs Marketplace", "no rows")
                .with_detail("release_id", "249504"),
        );

        let contents = std::fs::read_to_string(&path).expect("read error log");
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let second: ErrorRecord = serde_json::from_str(lines[1]).expect("parse record");
        assert_eq!(second.kind, ErrorKind::StructureChanged);
        assert_eq!(
            second.details.get("release_id").map(String::as_str),
            Some("249504")
        );
    }

    #[test]
    fn test_reopen_appends() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("errors.jsonl");

        ErrorLog::open(&path)
            .expect("open error log")
            .record(&ErrorRecord::new(ErrorKind::Unknown, "Deezer", "first"));
        ErrorLog::open(&path)
            .expect("reopen error log")
            .record(&ErrorRecord::new(ErrorKind::Unknown, "Deezer", "second"));

        let contents = std::fs::read_to_string(&path).expect("read error log");
        assert_eq!(contents.lines().count(), 2);
    }
}
