//! In-memory store doubles.
//!
//! Deterministic implementations of [`LocalStore`] and [`RemoteStore`] used by
//! the tests and by the snapshot entry points. Both support failure injection
//! and applying a plan, so a push/pull can be replayed end to end.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{SyncError, SyncResult};
use crate::plan::{FileOperation, RecordMutation};
use crate::store::{LocalStore, RemoteEntry, RemoteStore};
use crate::types::{
    day_bounds_millis, parse_millis, record_created_millis, record_day, record_timestamp, Record,
    TableSettings,
};

/// Sort key for `last_operation_time`; records without one sort last.
fn timestamp_key(record: &Record) -> Option<i64> {
    record_timestamp(record).as_deref().and_then(parse_millis)
}

fn newest_first(mut records: Vec<Record>) -> Vec<Record> {
    records.sort_by(|a, b| timestamp_key(b).cmp(&timestamp_key(a)));
    records
}

/// A single table held in memory.
#[derive(Debug, Clone)]
pub struct MemoryLocalStore {
    settings: TableSettings,
    records: Vec<Record>,
    failure: Option<String>,
}

impl MemoryLocalStore {
    pub fn new(settings: TableSettings) -> Self {
        Self {
            settings,
            records: Vec::new(),
            failure: None,
        }
    }

    pub fn with_records(mut self, records: impl IntoIterator<Item = Record>) -> Self {
        for record in records {
            self.upsert(record);
        }
        self
    }

    /// Insert a record, replacing any record with the same id.
    pub fn upsert(&mut self, record: Record) {
        let id = self.settings.record_id(&record);
        let existing = id.as_ref().and_then(|id| {
            self.records
                .iter()
                .position(|r| self.settings.record_id(r).as_ref() == Some(id))
        });
        match existing {
            Some(index) => self.records[index] = record,
            None => self.records.push(record),
        }
    }

    /// Make every query fail with a database error.
    pub fn fail_with(&mut self, message: impl Into<String>) {
        self.failure = Some(message.into());
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Execute record mutations produced by a pull.
    pub fn apply_mutations(&mut self, mutations: &[RecordMutation]) {
        for mutation in mutations {
            match mutation {
                RecordMutation::Create { record } => self.upsert(record.clone()),
                RecordMutation::Update { id, record } => {
                    let existing = self
                        .records
                        .iter()
                        .position(|r| self.settings.record_id(r).as_deref() == Some(id.as_str()));
                    match existing {
                        Some(index) => self.records[index] = record.clone(),
                        None => self.records.push(record.clone()),
                    }
                }
            }
        }
    }

    fn check(&self) -> SyncResult<()> {
        match &self.failure {
            Some(message) => Err(SyncError::Database(message.clone())),
            None => Ok(()),
        }
    }
}

impl LocalStore for MemoryLocalStore {
    fn fetch_latest_record(&self) -> SyncResult<Option<Record>> {
        self.check()?;
        Ok(newest_first(self.records.clone()).into_iter().next())
    }

    fn fetch_distinct_days(&self) -> SyncResult<Vec<String>> {
        self.check()?;
        let days: BTreeSet<String> = self.records.iter().filter_map(record_day).collect();
        Ok(days.into_iter().collect())
    }

    fn fetch_records_for_day(&self, day: &str) -> SyncResult<Vec<Record>> {
        self.check()?;
        let Some((start, end)) = day_bounds_millis(day) else {
            return Ok(Vec::new());
        };
        let records = self
            .records
            .iter()
            .filter(|r| matches!(record_created_millis(r), Some(ms) if ms >= start && ms <= end))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    fn fetch_records_in_time_range(&self, start: i64, end: i64) -> SyncResult<Vec<Record>> {
        self.check()?;
        let records = self
            .records
            .iter()
            .filter(|r| matches!(timestamp_key(r), Some(ts) if ts >= start && ts <= end))
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    fn fetch_record_by_id(&self, id: &str) -> SyncResult<Option<Record>> {
        self.check()?;
        Ok(self
            .records
            .iter()
            .find(|r| self.settings.record_id(r).as_deref() == Some(id))
            .cloned())
    }
}

fn normalize(path: &str) -> &str {
    path.trim_end_matches('/')
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn name_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

/// An injectable remote hierarchy: files with content and the directories
/// implied by their paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    failures: HashMap<String, String>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.write_file(path, content);
        self
    }

    pub fn with_dir(mut self, path: &str) -> Self {
        self.add_dir(normalize(path));
        self
    }

    /// Create or overwrite a file, creating its parent directories.
    pub fn write_file(&mut self, path: &str, content: impl Into<Vec<u8>>) {
        let path = normalize(path);
        self.add_dir(parent_of(path));
        self.files.insert(path.to_string(), content.into());
    }

    fn add_dir(&mut self, path: &str) {
        let mut current = path;
        while !current.is_empty() && self.dirs.insert(current.to_string()) {
            current = parent_of(current);
        }
    }

    /// Make stat/read/list on `path` fail with a non-"not found" error.
    pub fn fail_path(&mut self, path: &str, message: impl Into<String>) {
        self.failures
            .insert(normalize(path).to_string(), message.into());
    }

    /// File content as text, if the file exists.
    pub fn file_content(&self, path: &str) -> Option<String> {
        self.files
            .get(normalize(path))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// All file paths, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    /// Execute coalesced file operations produced by a push.
    pub fn apply_operations(&mut self, operations: &[FileOperation]) {
        for operation in operations {
            self.write_file(operation.path(), operation.content().as_bytes().to_vec());
        }
    }

    fn check(&self, path: &str) -> SyncResult<()> {
        match self.failures.get(path) {
            Some(message) => Err(SyncError::Remote(format!("{}: {}", path, message))),
            None => Ok(()),
        }
    }

    fn entry(&self, path: &str) -> Option<RemoteEntry> {
        if let Some(bytes) = self.files.get(path) {
            return Some(RemoteEntry {
                path: path.to_string(),
                name: name_of(path).to_string(),
                is_dir: false,
                size: bytes.len() as u64,
                modified: None,
            });
        }
        self.dirs.contains(path).then(|| RemoteEntry {
            path: path.to_string(),
            name: name_of(path).to_string(),
            is_dir: true,
            size: 0,
            modified: None,
        })
    }
}

impl RemoteStore for MemoryRemoteStore {
    fn stat(&self, path: &str) -> SyncResult<RemoteEntry> {
        let path = normalize(path);
        self.check(path)?;
        self.entry(path).ok_or_else(|| SyncError::not_found(path))
    }

    fn read(&self, path: &str) -> SyncResult<Vec<u8>> {
        let path = normalize(path);
        self.check(path)?;
        if let Some(bytes) = self.files.get(path) {
            return Ok(bytes.clone());
        }
        if self.dirs.contains(path) {
            return Err(SyncError::Remote(format!("{} is a directory", path)));
        }
        Err(SyncError::not_found(path))
    }

    fn list_dir(&self, path: &str) -> SyncResult<Vec<RemoteEntry>> {
        let path = normalize(path);
        self.check(path)?;
        if self.files.contains_key(path) {
            return Err(SyncError::Remote(format!("{} is not a directory", path)));
        }
        if !self.dirs.contains(path) {
            return Err(SyncError::not_found(path));
        }

        let children = self
            .dirs
            .iter()
            .chain(self.files.keys())
            .filter(|p| parent_of(p) == path)
            .filter_map(|p| self.entry(p))
            .collect();
        Ok(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, ts: &str, created_at: &str) -> Record {
        json!({ "id": id, "last_operation_time": ts, "created_at": created_at })
            .as_object()
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_local_queries_order_newest_first() {
        let store = MemoryLocalStore::new(TableSettings::new("pastes")).with_records([
            record("a", "100", "2025-10-12T08:00:00Z"),
            record("b", "300", "2025-10-12T09:00:00Z"),
            record("c", "200", "2025-10-13T09:00:00Z"),
        ]);

        let latest = store.fetch_latest_record().unwrap().unwrap();
        assert_eq!(latest["id"], "b");

        assert_eq!(store.fetch_distinct_days().unwrap(), vec!["2025-10-12", "2025-10-13"]);

        let day = store.fetch_records_for_day("2025-10-12").unwrap();
        let ids: Vec<_> = day.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "a"]);

        let range = store.fetch_records_in_time_range(150, 300).unwrap();
        let ids: Vec<_> = range.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["b", "c"]);

        assert!(store.fetch_record_by_id("c").unwrap().is_some());
        assert!(store.fetch_record_by_id("z").unwrap().is_none());
    }

    #[test]
    fn test_day_query_covers_the_whole_utc_day() {
        let store = MemoryLocalStore::new(TableSettings::new("pastes")).with_records([
            record("midnight", "100", "1760227200000"),
            record("bare", "200", "2025-10-12"),
            record("late", "300", "2025-10-12 23:59:59.999"),
            record("next", "400", "2025-10-13T00:00:00Z"),
        ]);

        let day = store.fetch_records_for_day("2025-10-12").unwrap();
        let ids: Vec<_> = day.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["late", "bare", "midnight"]);

        assert!(store.fetch_records_for_day("2025-10-1").unwrap().is_empty());
    }

    #[test]
    fn test_local_empty_and_failure() {
        let mut store = MemoryLocalStore::new(TableSettings::new("pastes"));
        assert!(store.fetch_latest_record().unwrap().is_none());

        store.fail_with("database is locked");
        assert_eq!(
            store.fetch_distinct_days().unwrap_err(),
            SyncError::Database("database is locked".into())
        );
    }

    #[test]
    fn test_apply_mutations() {
        let mut store = MemoryLocalStore::new(TableSettings::new("pastes"))
            .with_records([record("a", "100", "2025-10-12T08:00:00Z")]);

        store.apply_mutations(&[
            RecordMutation::Update {
                id: "a".into(),
                record: record("a", "150", "2025-10-12T08:00:00Z"),
            },
            RecordMutation::Create {
                record: record("b", "120", "2025-10-12T08:30:00Z"),
            },
        ]);

        assert_eq!(store.records().len(), 2);
        let a = store.fetch_record_by_id("a").unwrap().unwrap();
        assert_eq!(a["last_operation_time"], "150");
    }

    #[test]
    fn test_remote_stat_read_list() {
        let remote = MemoryRemoteStore::new()
            .with_file("root/pastes/meta", "100")
            .with_file("root/pastes/2025-10-12", "{}")
            .with_dir("root/images");

        let meta = remote.stat("root/pastes/meta").unwrap();
        assert!(!meta.is_dir);
        assert_eq!(meta.size, 3);
        assert!(remote.stat("root/pastes/").unwrap().is_dir);
        assert_eq!(remote.read("root/pastes/meta").unwrap(), b"100".to_vec());

        let err = remote.stat("root/pastes/2025-10-13").unwrap_err();
        assert!(remote.is_not_found_error(&err));

        let names: Vec<_> = remote
            .list_dir("root")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["images", "pastes"]);

        let names: Vec<_> = remote
            .list_dir("root/pastes")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["2025-10-12", "meta"]);
    }

    #[test]
    fn test_text_reads_classify_bad_utf8() {
        let remote = MemoryRemoteStore::new().with_file("root/t/2025-10-12", b"a\n\xffb\nc".to_vec());

        let err = remote.read_to_string("root/t/2025-10-12").unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));

        let (text, problem) = remote.read_text_lossy("root/t/2025-10-12").unwrap();
        assert_eq!(text, "a\n\u{FFFD}b\nc");
        assert!(matches!(problem, Some(SyncError::InvalidInput(_))));

        let err = remote.read_text_lossy("root/t/meta").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_remote_injected_failure_is_not_not_found() {
        let mut remote = MemoryRemoteStore::new().with_file("root/pastes/meta", "100");
        remote.fail_path("root/pastes/meta", "503 Service Unavailable");

        let err = remote.stat("root/pastes/meta").unwrap_err();
        assert!(!remote.is_not_found_error(&err));
        assert!(remote.read_to_string("root/pastes/meta").is_err());
    }

    #[test]
    fn test_apply_operations() {
        let mut remote = MemoryRemoteStore::new().with_file("root/t/meta", "1");
        remote.apply_operations(&[
            FileOperation::Replace {
                path: "root/t/meta".into(),
                content: "2\n2025-10-12 2".into(),
            },
            FileOperation::Create {
                path: "root/t/2025-10-12".into(),
                content: "{}".into(),
            },
        ]);

        assert_eq!(remote.file_content("root/t/meta").as_deref(), Some("2\n2025-10-12 2"));
        assert_eq!(remote.file_paths(), vec!["root/t/2025-10-12", "root/t/meta"]);
    }
}
