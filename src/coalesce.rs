//! Collapse line-level pending edits into whole-file writes.
//!
//! Edits are grouped by path (a `BTreeMap`, so operations come out sorted by
//! path) and keep their production order inside a group. The first edit of a
//! group decides its shape:
//!
//! - `CreateEmpty`: the appended lines become a new file. A file with nothing
//!   appended is never created.
//! - `Baseline`: replacements are applied first, then deletions, then appends,
//!   so an append can never shift the index of a replacement. A group that
//!   leaves the content unchanged produces nothing.

use std::collections::{BTreeMap, BTreeSet};

use crate::layout::split_lines;
use crate::plan::{FileOperation, PendingEdit, SynchronizeResult};

/// Coalesce `edits` into file operations.
///
/// The returned result carries the edits, the operations and a trace of
/// every group that was dropped.
pub fn build_file_operations_from_pending_edits(edits: Vec<PendingEdit>) -> SynchronizeResult {
    let mut result = SynchronizeResult::new();
    result.pending_edits = edits;
    coalesce_into(&mut result);
    result
}

/// Replace `result.file_operations` with the coalesced form of
/// `result.pending_edits`.
pub(crate) fn coalesce_into(result: &mut SynchronizeResult) {
    let mut notes = Vec::new();
    let operations = coalesce_edits(&result.pending_edits, &mut notes);
    for note in notes {
        result.trace(note);
    }
    result.trace(format!(
        "coalesced {} pending edits into {} file operations",
        result.pending_edits.len(),
        operations.len()
    ));
    result.file_operations = operations;
}

fn coalesce_edits(edits: &[PendingEdit], notes: &mut Vec<String>) -> Vec<FileOperation> {
    let mut groups: BTreeMap<&str, Vec<&PendingEdit>> = BTreeMap::new();
    for edit in edits {
        groups.entry(edit.path()).or_default().push(edit);
    }

    groups
        .into_iter()
        .filter_map(|(path, group)| coalesce_file(path, &group, notes))
        .collect()
}

fn coalesce_file(path: &str, group: &[&PendingEdit], notes: &mut Vec<String>) -> Option<FileOperation> {
    match group.first()? {
        PendingEdit::CreateEmpty { .. } => build_created_file(path, &group[1..], notes),
        PendingEdit::Baseline { content, .. } => {
            build_replaced_file(path, content, &group[1..], notes)
        }
        _ => {
            notes.push(format!(
                "{}: {} edits without a baseline, dropped",
                path,
                group.len()
            ));
            None
        }
    }
}

fn build_created_file(path: &str, rest: &[&PendingEdit], notes: &mut Vec<String>) -> Option<FileOperation> {
    let mut lines: Vec<&str> = Vec::new();
    for edit in rest {
        match edit {
            PendingEdit::AppendLine { content, .. } => lines.push(content),
            other => notes.push(format!("{}: ignoring {:?} on a new file", path, other)),
        }
    }

    if lines.is_empty() {
        notes.push(format!("{}: nothing appended, file not created", path));
        return None;
    }

    Some(FileOperation::Create {
        path: path.to_string(),
        content: lines.join("\n"),
    })
}

fn build_replaced_file(
    path: &str,
    baseline: &str,
    rest: &[&PendingEdit],
    notes: &mut Vec<String>,
) -> Option<FileOperation> {
    if rest.is_empty() {
        notes.push(format!("{}: baseline only, unchanged", path));
        return None;
    }

    let original = split_lines(baseline);
    let mut lines: Vec<&str> = original.clone();
    let mut deletions = BTreeSet::new();
    let mut appends: Vec<&str> = Vec::new();

    for edit in rest {
        match edit {
            PendingEdit::ReplaceLine { index, content, .. } => match lines.get_mut(*index) {
                Some(line) => *line = content.as_str(),
                None => notes.push(format!(
                    "{}: replace at line {} is out of range ({} lines), skipped",
                    path,
                    index,
                    original.len()
                )),
            },
            PendingEdit::DeleteLine { index, .. } => {
                deletions.insert(*index);
            }
            PendingEdit::AppendLine { content, .. } => appends.push(content),
            other => notes.push(format!("{}: ignoring repeated {:?}", path, other)),
        }
    }

    for index in deletions.into_iter().rev() {
        if index < lines.len() {
            lines.remove(index);
        } else {
            notes.push(format!("{}: delete at line {} is out of range, skipped", path, index));
        }
    }
    lines.extend(appends);

    let content = lines.join("\n");
    if content == original.join("\n") {
        notes.push(format!("{}: edits produce no change", path));
        return None;
    }

    Some(FileOperation::Replace {
        path: path.to_string(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn baseline(path: &str, content: &str) -> PendingEdit {
        PendingEdit::Baseline {
            path: path.into(),
            content: content.into(),
        }
    }

    fn append(path: &str, content: &str) -> PendingEdit {
        PendingEdit::AppendLine {
            path: path.into(),
            content: content.into(),
        }
    }

    fn replace(path: &str, index: usize, content: &str) -> PendingEdit {
        PendingEdit::ReplaceLine {
            path: path.into(),
            index,
            content: content.into(),
        }
    }

    fn create(path: &str) -> PendingEdit {
        PendingEdit::CreateEmpty { path: path.into() }
    }

    #[test]
    fn test_updates_apply_before_appends_in_any_order() {
        let expected = vec![FileOperation::Replace {
            path: "f".into(),
            content: "a\nB\nc\nd".into(),
        }];

        let appended_first = build_file_operations_from_pending_edits(vec![
            baseline("f", "a\nb\nc"),
            append("f", "d"),
            replace("f", 1, "B"),
        ]);
        assert_eq!(appended_first.file_operations, expected);

        let replaced_first = build_file_operations_from_pending_edits(vec![
            baseline("f", "a\nb\nc"),
            replace("f", 1, "B"),
            append("f", "d"),
        ]);
        assert_eq!(replaced_first.file_operations, expected);
    }

    #[test]
    fn test_bare_create_is_suppressed() {
        let result = build_file_operations_from_pending_edits(vec![create("root/t/2025-10-13")]);
        assert!(result.file_operations.is_empty());
        assert_eq!(result.pending_edits.len(), 1);
    }

    #[test]
    fn test_delete_on_new_file_is_ignored() {
        let result = build_file_operations_from_pending_edits(vec![
            create("m"),
            append("m", "300"),
            PendingEdit::DeleteLine {
                path: "m".into(),
                index: 0,
            },
            append("m", "2025-10-12 300"),
        ]);
        assert_eq!(
            result.file_operations,
            vec![FileOperation::Create {
                path: "m".into(),
                content: "300\n2025-10-12 300".into(),
            }]
        );
        assert!(result.log.iter().any(|l| l.contains("ignoring DeleteLine")));
    }

    #[test]
    fn test_create_joins_appends() {
        let result = build_file_operations_from_pending_edits(vec![
            create("m"),
            append("m", "300"),
            append("m", "2025-10-12 300"),
        ]);
        assert_eq!(
            result.file_operations,
            vec![FileOperation::Create {
                path: "m".into(),
                content: "300\n2025-10-12 300".into(),
            }]
        );
    }

    #[test]
    fn test_baseline_only_is_dropped() {
        let result = build_file_operations_from_pending_edits(vec![baseline("m", "1\n2025-10-12 1")]);
        assert!(result.file_operations.is_empty());
    }

    #[test]
    fn test_identical_replacement_is_dropped() {
        let result = build_file_operations_from_pending_edits(vec![
            baseline("m", "1\n2025-10-12 1\n"),
            replace("m", 1, "2025-10-12 1"),
        ]);
        assert!(result.file_operations.is_empty());
        assert!(result.log.iter().any(|l| l.contains("no change")));
    }

    #[test]
    fn test_delete_refers_to_baseline_indices() {
        let result = build_file_operations_from_pending_edits(vec![
            baseline("f", "a\nb\nc\nd"),
            PendingEdit::DeleteLine { path: "f".into(), index: 1 },
            replace("f", 2, "C"),
            PendingEdit::DeleteLine { path: "f".into(), index: 3 },
            append("f", "e"),
        ]);
        assert_eq!(result.file_operations[0].content(), "a\nC\ne");
    }

    #[test]
    fn test_out_of_range_replace_is_skipped() {
        let result = build_file_operations_from_pending_edits(vec![
            baseline("f", "a"),
            replace("f", 5, "x"),
            append("f", "b"),
        ]);
        assert_eq!(result.file_operations[0].content(), "a\nb");
        assert!(result.log.iter().any(|l| l.contains("out of range")));
    }

    #[test]
    fn test_edits_without_baseline_are_dropped() {
        let result = build_file_operations_from_pending_edits(vec![append("f", "x")]);
        assert!(result.file_operations.is_empty());
    }

    #[test]
    fn test_operations_sorted_by_path() {
        let result = build_file_operations_from_pending_edits(vec![
            create("root/t/meta"),
            append("root/t/meta", "5"),
            create("root/t/2025-10-13"),
            append("root/t/2025-10-13", "{}"),
            baseline("root/t/2025-10-12", "x"),
            append("root/t/2025-10-12", "y"),
        ]);
        let paths: Vec<_> = result.file_operations.iter().map(|op| op.path()).collect();
        assert_eq!(paths, vec!["root/t/2025-10-12", "root/t/2025-10-13", "root/t/meta"]);
    }
}
