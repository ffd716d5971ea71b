//! Push planning: move local changes out to the remote day-file layout.
//!
//! The planner compares the table's newest local `last_operation_time` with
//! line 0 of the remote meta file, then walks every local day whose newest
//! timestamp differs from the day entry in meta. Nothing is written; the
//! edits are coalesced into whole-file writes for the caller to send.
//!
//! Guards:
//! - equal table timestamps: already converged, no edits
//! - remote table timestamp newer: the caller must pull first, no edits


use std::collections::HashMap;

use crate::coalesce::coalesce_into;
use crate::layout::{self, format_day_entry, split_lines, DayEntry, MetaFile};
use crate::plan::{MessageScope, PendingEdit, Severity, SynchronizeResult};
use crate::store::{LocalStore, RemoteStore};
use crate::types::{parse_millis, record_timestamp, Record, TableSettings};

/// A record line already present in a remote day file.
#[derive(Debug)]
struct RemoteLine {
    index: usize,
    last_operation_time: Option<String>,
}

enum MetaPlan {
    /// Keep going with these day entries (empty for a new meta file)
    Continue(HashMap<String, DayEntry>),
    /// Nothing more to do, or a store failure was recorded
    Stop,
}

/// Build the edits that bring the remote table in line with the local one.
pub fn build_local_to_remote_tasks<L, R>(
    table: &TableSettings,
    root: &str,
    local: &L,
    remote: &R,
) -> SynchronizeResult
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let mut planner = PushPlanner {
        table,
        root,
        local,
        remote,
        meta_path: layout::meta_path(root, &table.name),
        result: SynchronizeResult::new(),
    };
    planner.run();
    planner.result
}

struct PushPlanner<'a, L: ?Sized, R: ?Sized> {
    table: &'a TableSettings,
    root: &'a str,
    local: &'a L,
    remote: &'a R,
    meta_path: String,
    result: SynchronizeResult,
}

impl<L: LocalStore + ?Sized, R: RemoteStore + ?Sized> PushPlanner<'_, L, R> {
    fn run(&mut self) {
        self.result.trace(format!("push {}: start", self.table.name));

        let Some(local_timestamp) = self.latest_local_timestamp() else {
            return;
        };

        let day_index = match self.plan_meta(&local_timestamp) {
            MetaPlan::Continue(index) => index,
            MetaPlan::Stop => return,
        };

        let Some(days) = self
            .result
            .check("fetch distinct days", self.local.fetch_distinct_days())
        else {
            return;
        };

        for day in &days {
            if self.plan_day(day, &day_index).is_none() {
                return;
            }
        }

        coalesce_into(&mut self.result);
        self.result.trace(format!(
            "push {}: {} days checked, {} file operations",
            self.table.name,
            days.len(),
            self.result.file_operations.len()
        ));
    }

    fn latest_local_timestamp(&mut self) -> Option<String> {
        let latest = self
            .result
            .check("fetch latest record", self.local.fetch_latest_record())?;

        let Some(latest) = latest else {
            self.result.error(
                MessageScope::Database,
                format!("table {} has no records to push", self.table.name),
            );
            return None;
        };

        let timestamp = record_timestamp(&latest);
        if timestamp.is_none() {
            self.result.error(
                MessageScope::Database,
                format!(
                    "latest record of {} has no readable last_operation_time",
                    self.table.name
                ),
            );
        }
        timestamp
    }

    fn plan_meta(&mut self, local_timestamp: &str) -> MetaPlan {
        let meta_path = self.meta_path.clone();

        match self.remote.stat(&meta_path) {
            Ok(_) => {}
            Err(err) if self.remote.is_not_found_error(&err) => {
                self.result.trace(format!("{} does not exist, creating it", meta_path));
                self.result.push_edit(PendingEdit::CreateEmpty {
                    path: meta_path.clone(),
                });
                self.result.push_edit(PendingEdit::AppendLine {
                    path: meta_path,
                    content: local_timestamp.to_string(),
                });
                return MetaPlan::Continue(HashMap::new());
            }
            Err(err) => {
                self.result.store_error("stat meta file", &err);
                return MetaPlan::Stop;
            }
        }

        let Some(content) = self
            .result
            .check("read meta file", self.remote.read_to_string(&meta_path))
        else {
            return MetaPlan::Stop;
        };
        let meta = MetaFile::parse(&content);
        let remote_timestamp = meta.table_timestamp.as_deref().unwrap_or("");

        if remote_timestamp == local_timestamp {
            self.result.trace(format!(
                "push {}: remote already at {}, nothing to do",
                self.table.name, local_timestamp
            ));
            return MetaPlan::Stop;
        }

        match (parse_millis(local_timestamp), parse_millis(remote_timestamp)) {
            (Some(local), Some(remote)) if local < remote => {
                self.result.message(
                    Severity::Info,
                    MessageScope::Remote,
                    format!(
                        "remote {} is newer ({} > {}), pull before pushing",
                        self.table.name, remote_timestamp, local_timestamp
                    ),
                );
                return MetaPlan::Stop;
            }
            (_, None) => self.result.trace(format!(
                "{}: unreadable table timestamp {:?}, overwriting",
                meta_path, remote_timestamp
            )),
            _ => {}
        }

        let has_first_line = !split_lines(&content).is_empty();
        self.result.push_edit(PendingEdit::Baseline {
            path: meta_path.clone(),
            content: content.clone(),
        });
        if has_first_line {
            self.result.push_edit(PendingEdit::ReplaceLine {
                path: meta_path.clone(),
                index: 0,
                content: local_timestamp.to_string(),
            });
        } else {
            self.result.push_edit(PendingEdit::AppendLine {
                path: meta_path.clone(),
                content: local_timestamp.to_string(),
            });
        }

        for index in &meta.malformed_lines {
            self.result
                .trace(format!("{}: line {} is not a day entry, kept as is", meta_path, index));
        }
        for entry in &meta.duplicates {
            self.result.trace(format!(
                "{}: duplicate entry for {} at line {}, ignored",
                meta_path, entry.day, entry.line
            ));
        }

        MetaPlan::Continue(meta.days.into_iter().map(|e| (e.day.clone(), e)).collect())
    }

    /// Plan one local day. `None` means a store failure stopped the push.
    fn plan_day(&mut self, day: &str, day_index: &HashMap<String, DayEntry>) -> Option<()> {
        let records = self
            .result
            .check("fetch records for day", self.local.fetch_records_for_day(day))?;

        let Some(newest) = records.first() else {
            self.result.trace(format!("{}: no local records", day));
            return Some(());
        };
        let Some(day_timestamp) = record_timestamp(newest) else {
            self.result
                .trace(format!("{}: newest record has no last_operation_time, skipped", day));
            return Some(());
        };

        let entry = format_day_entry(day, &day_timestamp);
        match day_index.get(day) {
            None => self.result.push_edit(PendingEdit::AppendLine {
                path: self.meta_path.clone(),
                content: entry,
            }),
            Some(existing) if existing.last_operation_time == day_timestamp => {
                self.result.trace(format!("{}: unchanged at {}", day, day_timestamp));
                return Some(());
            }
            Some(existing) => self.result.push_edit(PendingEdit::ReplaceLine {
                path: self.meta_path.clone(),
                index: existing.line,
                content: entry,
            }),
        }

        let day_path = layout::day_path(self.root, &self.table.name, day);
        let remote_lines = match self.remote.stat(&day_path) {
            Ok(_) => {
                let content = self.read_day_file(&day_path)?;
                let lines = self.index_remote_lines(&day_path, &content);
                self.result.push_edit(PendingEdit::Baseline {
                    path: day_path.clone(),
                    content,
                });
                lines
            }
            Err(err) if self.remote.is_not_found_error(&err) => {
                self.result.push_edit(PendingEdit::CreateEmpty {
                    path: day_path.clone(),
                });
                HashMap::new()
            }
            Err(err) => {
                self.result.store_error("stat day file", &err);
                return None;
            }
        };

        for record in &records {
            self.plan_record(&day_path, record, &remote_lines);
        }
        Some(())
    }

    fn plan_record(&mut self, day_path: &str, record: &Record, remote_lines: &HashMap<String, RemoteLine>) {
        let Some(id) = self.table.record_id(record) else {
            self.result.trace(format!(
                "{}: local record without {} skipped",
                day_path, self.table.id_field
            ));
            return;
        };

        let line = match serde_json::to_string(record) {
            Ok(line) => line,
            Err(err) => {
                self.result
                    .trace(format!("{}: cannot encode {}: {}", day_path, id, err));
                return;
            }
        };

        match remote_lines.get(&id) {
            Some(existing) if existing.last_operation_time == record_timestamp(record) => {}
            Some(existing) => self.result.push_edit(PendingEdit::ReplaceLine {
                path: day_path.to_string(),
                index: existing.index,
                content: line,
            }),
            None => self.result.push_edit(PendingEdit::AppendLine {
                path: day_path.to_string(),
                content: line,
            }),
        }
    }

    /// Read a remote day file. Undecodable bytes are replaced and reported as
    /// a warning; the affected lines then fail to parse and are skipped.
    fn read_day_file(&mut self, day_path: &str) -> Option<String> {
        let (content, problem) = self
            .result
            .check("read day file", self.remote.read_text_lossy(day_path))?;
        if let Some(problem) = problem {
            self.result.message(
                Severity::Warning,
                problem.scope(),
                format!("{}; undecodable lines are skipped", problem),
            );
        }
        Some(content)
    }

    /// Map record ids to their line in a remote day file. Malformed lines
    /// are logged and left untouched.
    fn index_remote_lines(&mut self, day_path: &str, content: &str) -> HashMap<String, RemoteLine> {
        let mut lines = HashMap::new();

        for (index, line) in split_lines(content).into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: Record = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(err) => {
                    self.result
                        .trace(format!("{}:{} malformed record skipped: {}", day_path, index, err));
                    continue;
                }
            };
            let Some(id) = self.table.record_id(&record) else {
                self.result.trace(format!(
                    "{}:{} record without {} skipped",
                    day_path, index, self.table.id_field
                ));
                continue;
            };
            if lines.contains_key(&id) {
                self.result
                    .trace(format!("{}:{} duplicate record {} ignored", day_path, index, id));
                continue;
            }
            lines.insert(
                id,
                RemoteLine {
                    index,
                    last_operation_time: record_timestamp(&record),
                },
            );
        }

        lines
    }
}
