//! Remote per-table layout.
//!
//! ```text
//! <root>/
//! └── <table>/
//!     ├── meta          # line 0: table last_operation_time
//!     │                 # lines 1..n: "<YYYY-MM-DD> <day last_operation_time>"
//!     └── <YYYY-MM-DD>  # one JSON record per line, created that day
//! ```

use std::collections::{HashMap, HashSet};

use crate::types::parse_day;

/// File name of the per-table index.
pub const META_FILE: &str = "meta";

/// Directory holding a table's files.
pub fn table_dir(root: &str, table: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), table)
}

/// Path of a table's meta file.
pub fn meta_path(root: &str, table: &str) -> String {
    format!("{}/{}", table_dir(root, table), META_FILE)
}

/// Path of a table's day file.
pub fn day_path(root: &str, table: &str, day: &str) -> String {
    format!("{}/{}", table_dir(root, table), day)
}

/// Split file content into lines. Shared by the planners and the coalescer
/// so line indices always agree.
pub fn split_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Format a meta day entry line.
pub fn format_day_entry(day: &str, last_operation_time: &str) -> String {
    format!("{} {}", day, last_operation_time)
}

/// Parse a `<YYYY-MM-DD> <digits>` meta line.
pub fn parse_day_entry(line: &str) -> Option<(&str, &str)> {
    let (day, timestamp) = line.split_once(' ')?;
    parse_day(day)?;
    if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((day, timestamp))
}

/// A day entry found in the meta file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    /// Calendar day
    pub day: String,
    /// Line index inside the meta file
    pub line: usize,
    /// Last operation time recorded for the day
    pub last_operation_time: String,
}

/// Parsed view of a remote meta file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaFile {
    /// Line 0, the table-level last operation time (may be malformed)
    pub table_timestamp: Option<String>,
    /// Day entries in file order, first occurrence of each day only
    pub days: Vec<DayEntry>,
    /// Day entries that repeat an earlier day (ignored)
    pub duplicates: Vec<DayEntry>,
    /// Indices of lines >= 1 that are not valid day entries
    pub malformed_lines: Vec<usize>,
}

impl MetaFile {
    pub fn parse(content: &str) -> Self {
        let lines = split_lines(content);
        let mut meta = MetaFile {
            table_timestamp: lines.first().map(|l| l.trim().to_string()),
            ..Default::default()
        };

        let mut seen: HashSet<&str> = HashSet::new();
        for (index, line) in lines.iter().enumerate().skip(1) {
            if line.trim().is_empty() {
                continue;
            }
            let Some((day, timestamp)) = parse_day_entry(line.trim()) else {
                meta.malformed_lines.push(index);
                continue;
            };
            let entry = DayEntry {
                day: day.to_string(),
                line: index,
                last_operation_time: timestamp.to_string(),
            };
            if !seen.insert(day) {
                meta.duplicates.push(entry);
            } else {
                meta.days.push(entry);
            }
        }

        meta
    }

    /// Day entries keyed by day.
    pub fn day_index(&self) -> HashMap<&str, &DayEntry> {
        self.days.iter().map(|e| (e.day.as_str(), e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(meta_path("sync/", "pastes"), "sync/pastes/meta");
        assert_eq!(day_path("sync", "pastes", "2025-10-12"), "sync/pastes/2025-10-12");
        assert_eq!(table_dir("sync", "pastes"), "sync/pastes");
    }

    #[test]
    fn test_parse_day_entry() {
        assert_eq!(parse_day_entry("2025-10-12 1760227200000"), Some(("2025-10-12", "1760227200000")));
        assert_eq!(parse_day_entry("2025-10-12"), None);
        assert_eq!(parse_day_entry("2025-10-12 17a"), None);
        assert_eq!(parse_day_entry("12-10-2025 1"), None);
        assert_eq!(parse_day_entry("2025-10-12  1"), None);
    }

    #[test]
    fn test_meta_parse() {
        let meta = MetaFile::parse("300\n2025-10-11 100\ngarbage\n2025-10-12 300\n2025-10-11 90\n");

        assert_eq!(meta.table_timestamp.as_deref(), Some("300"));
        assert_eq!(meta.days.len(), 2);
        assert_eq!(meta.days[1].day, "2025-10-12");
        assert_eq!(meta.days[1].line, 3);
        assert_eq!(meta.malformed_lines, vec![2]);
        assert_eq!(meta.duplicates.len(), 1);
        assert_eq!(meta.duplicates[0].last_operation_time, "90");

        let index = meta.day_index();
        assert_eq!(index["2025-10-11"].last_operation_time, "100");
    }

    #[test]
    fn test_meta_parse_empty() {
        let meta = MetaFile::parse("");
        assert_eq!(meta.table_timestamp, None);
        assert!(meta.days.is_empty());
    }

    #[test]
    fn test_split_lines_ignores_trailing_newline() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\r\nb"), vec!["a", "b"]);
        assert!(split_lines("").is_empty());
    }
}
