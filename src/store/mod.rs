//! Storage access contracts the planner depends on.
//!
//! Both traits are read-only from the planner's point of view. Platforms
//! implement them over their own database and remote protocol (WebDAV,
//! HTTP object storage, ...); [`memory`] provides in-memory doubles.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::types::Record;

pub use memory::{MemoryLocalStore, MemoryRemoteStore};

/// Read-only queries over the local record store for one table.
pub trait LocalStore {
    /// The record with the greatest `last_operation_time`, or `None` if the
    /// table is empty.
    fn fetch_latest_record(&self) -> SyncResult<Option<Record>>;

    /// Distinct `YYYY-MM-DD` days (from `created_at`) that hold records.
    fn fetch_distinct_days(&self) -> SyncResult<Vec<String>>;

    /// Records created on `day`, newest `last_operation_time` first.
    fn fetch_records_for_day(&self, day: &str) -> SyncResult<Vec<Record>>;

    /// Records with `last_operation_time` in `[start, end]` (milliseconds,
    /// inclusive), newest first.
    fn fetch_records_in_time_range(&self, start: i64, end: i64) -> SyncResult<Vec<Record>>;

    /// The record with this id, if any.
    fn fetch_record_by_id(&self, id: &str) -> SyncResult<Option<Record>>;
}

/// Metadata for a remote file or directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Full path
    pub path: String,
    /// Last path segment
    pub name: String,
    pub is_dir: bool,
    /// Size in bytes (0 for directories)
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Stat/read/list primitives over a remote hierarchical object store.
pub trait RemoteStore {
    fn stat(&self, path: &str) -> SyncResult<RemoteEntry>;

    /// Full byte content of a file.
    fn read(&self, path: &str) -> SyncResult<Vec<u8>>;

    /// Immediate children of a directory.
    fn list_dir(&self, path: &str) -> SyncResult<Vec<RemoteEntry>>;

    /// Distinguishes "does not exist" from other failures.
    fn is_not_found_error(&self, err: &SyncError) -> bool {
        err.is_not_found()
    }

    /// Read a file as UTF-8 text. Bad bytes are an `InvalidInput` error.
    fn read_to_string(&self, path: &str) -> SyncResult<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| not_utf8(path, &e))
    }

    /// Read a file as text, replacing invalid UTF-8 sequences with U+FFFD.
    ///
    /// Line breaks survive the replacement, so line indices stay valid. The
    /// second value describes the bad bytes, if there were any.
    fn read_text_lossy(&self, path: &str) -> SyncResult<(String, Option<SyncError>)> {
        let bytes = self.read(path)?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok((text, None)),
            Err(e) => {
                let problem = not_utf8(path, &e);
                Ok((String::from_utf8_lossy(e.as_bytes()).into_owned(), Some(problem)))
            }
        }
    }
}

fn not_utf8(path: &str, err: &std::string::FromUtf8Error) -> SyncError {
    SyncError::InvalidInput(format!("{} is not valid UTF-8: {}", path, err.utf8_error()))
}
