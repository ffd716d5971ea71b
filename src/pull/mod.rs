//! Pull planning: turn remote day files into local record mutations.
//!
//! Every day listed in the remote meta file is compared against the local
//! records created that day. Days whose newest local `last_operation_time`
//! equals the meta entry are skipped; otherwise each remote line becomes a
//! create (unknown id) or an update (same id, different timestamp).
//!
//! Day files present in the table directory without a meta entry (left by an
//! interrupted push or an older client) are reconciled as well.

use std::collections::{HashMap, HashSet};

use crate::layout::{self, split_lines, MetaFile};
use crate::plan::{MessageScope, RecordMutation, Severity, SynchronizeResult};
use crate::store::{LocalStore, RemoteStore};
use crate::types::{parse_day, record_timestamp, Record, TableSettings};

/// A remote day to reconcile.
#[derive(Debug)]
struct RemoteDay {
    day: String,
    /// Meta entry timestamp; `None` for a day file missing from meta
    last_operation_time: Option<String>,
}

/// Build the record mutations that bring the local table in line with the
/// remote one.
pub fn build_remote_to_local_tasks<L, R>(
    table: &TableSettings,
    root: &str,
    local: &L,
    remote: &R,
) -> SynchronizeResult
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let mut result = SynchronizeResult::new();
    result.trace(format!("pull {}: start", table.name));

    let meta_path = layout::meta_path(root, &table.name);
    match remote.stat(&meta_path) {
        Ok(_) => {}
        Err(err) if remote.is_not_found_error(&err) => {
            result.error(
                MessageScope::Remote,
                format!("no syncable source: {} does not exist", meta_path),
            );
            return result;
        }
        Err(err) => {
            result.store_error("stat meta file", &err);
            return result;
        }
    }

    let Some(content) = result.check("read meta file", remote.read_to_string(&meta_path)) else {
        return result;
    };
    let meta = MetaFile::parse(&content);
    for index in &meta.malformed_lines {
        result.trace(format!("{}: line {} is not a day entry, skipped", meta_path, index));
    }

    let mut days: Vec<RemoteDay> = meta
        .days
        .iter()
        .map(|entry| RemoteDay {
            day: entry.day.clone(),
            last_operation_time: Some(entry.last_operation_time.clone()),
        })
        .collect();
    days.extend(orphan_days(table, root, remote, &meta, &mut result));

    for remote_day in &days {
        if pull_day(table, root, local, remote, remote_day, &mut result).is_none() {
            return result;
        }
    }

    result.trace(format!(
        "pull {}: {} days checked, {} record mutations",
        table.name,
        days.len(),
        result.record_mutations.len()
    ));
    result
}

/// Day files in the table directory that meta does not mention, sorted.
fn orphan_days<R: RemoteStore + ?Sized>(
    table: &TableSettings,
    root: &str,
    remote: &R,
    meta: &MetaFile,
    result: &mut SynchronizeResult,
) -> Vec<RemoteDay> {
    let dir = layout::table_dir(root, &table.name);
    let entries = match remote.list_dir(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            result.message(
                Severity::Warning,
                MessageScope::Remote,
                format!("cannot list {}: {}; using meta entries only", dir, err),
            );
            return Vec::new();
        }
    };

    let known: HashSet<&str> = meta.days.iter().map(|e| e.day.as_str()).collect();
    let mut orphans: Vec<String> = entries
        .into_iter()
        .filter(|entry| !entry.is_dir && parse_day(&entry.name).is_some())
        .filter(|entry| !known.contains(entry.name.as_str()))
        .map(|entry| entry.name)
        .collect();
    orphans.sort();
    orphans.dedup();

    orphans
        .into_iter()
        .map(|day| {
            result.trace(format!("{}: day file has no meta entry", day));
            RemoteDay {
                day,
                last_operation_time: None,
            }
        })
        .collect()
}

/// Reconcile one day. `None` means a local store failure stopped the pull.
fn pull_day<L, R>(
    table: &TableSettings,
    root: &str,
    local: &L,
    remote: &R,
    remote_day: &RemoteDay,
    result: &mut SynchronizeResult,
) -> Option<()>
where
    L: LocalStore + ?Sized,
    R: RemoteStore + ?Sized,
{
    let day = remote_day.day.as_str();
    let day_path = layout::day_path(root, &table.name, day);

    let content = match remote.read_text_lossy(&day_path) {
        Ok((content, problem)) => {
            if let Some(problem) = problem {
                result.message(
                    Severity::Warning,
                    problem.scope(),
                    format!("{}; undecodable lines are skipped", problem),
                );
            }
            content
        }
        Err(err) => {
            result.error(err.scope(), format!("cannot read day file {}: {}", day_path, err));
            return Some(());
        }
    };

    let local_records = result.check("fetch records for day", local.fetch_records_for_day(day))?;

    let mut seen = HashSet::new();

    if local_records.is_empty() {
        for (index, line) in split_lines(&content).into_iter().enumerate() {
            if let Some((_, record)) = decode_line(table, &day_path, index, line, &mut seen, result) {
                result.record_mutations.push(RecordMutation::Create { record });
            }
        }
        return Some(());
    }

    let newest_local = record_timestamp(&local_records[0]);
    if newest_local.is_some() && newest_local == remote_day.last_operation_time {
        result.trace(format!("{}: converged at {:?}", day, newest_local));
        return Some(());
    }

    let local_index: HashMap<String, Option<String>> = local_records
        .iter()
        .filter_map(|r| Some((table.record_id(r)?, record_timestamp(r))))
        .collect();

    for (index, line) in split_lines(&content).into_iter().enumerate() {
        let Some((id, record)) = decode_line(table, &day_path, index, line, &mut seen, result)
        else {
            continue;
        };

        match local_index.get(&id) {
            None => result.record_mutations.push(RecordMutation::Create { record }),
            Some(local_timestamp) if *local_timestamp == record_timestamp(&record) => {}
            Some(_) => result
                .record_mutations
                .push(RecordMutation::Update { id, record }),
        }
    }

    Some(())
}

/// Decode a day-file line into its id and record. Blank lines are ignored;
/// malformed ones, records without an id and repeats of an id already in
/// `seen` are logged and skipped.
fn decode_line(
    table: &TableSettings,
    day_path: &str,
    index: usize,
    line: &str,
    seen: &mut HashSet<String>,
    result: &mut SynchronizeResult,
) -> Option<(String, Record)> {
    if line.trim().is_empty() {
        return None;
    }
    let record: Record = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(err) => {
            result.trace(format!("{}:{} malformed record skipped: {}", day_path, index, err));
            return None;
        }
    };
    let Some(id) = table.record_id(&record) else {
        result.trace(format!(
            "{}:{} record without {} skipped",
            day_path, index, table.id_field
        ));
        return None;
    };
    if !seen.insert(id.clone()) {
        result.trace(format!("{}:{} duplicate record {} ignored", day_path, index, id));
        return None;
    }
    Some((id, record))
}
