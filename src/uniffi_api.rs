//! UniFFI API module for Swift and Kotlin bindings.
//!
//! This module exposes the plan builders via UniFFI for mobile platforms.
//! All functions use JSON strings for input/output to simplify cross-language marshalling.

use crate::error::SyncError;

/// Get the version of the tablesync-core library.
#[uniffi::export]
pub fn get_core_version() -> String {
    crate::get_core_version().to_string()
}

/// Build a push plan (local changes to the remote layout).
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "table": {"name": "pastes", "id_field": "id"},
///     "root": "sync",
///     "local_records": [{"id": "...", "created_at": "...", "last_operation_time": "..."}],
///     "remote_files": {"sync/pastes/meta": "..."}
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "log": ["..."],
///     "messages": [{"severity": "info", "scope": "remote", "text": "..."}],
///     "pending_edits": [{"kind": "append_line", "path": "...", "content": "..."}],
///     "file_operations": [{"kind": "create", "path": "...", "content": "..."}],
///     "record_mutations": []
///   }
///   ```
#[uniffi::export]
pub fn plan_push_json(input_json: String) -> Result<String, SyncError> {
    crate::snapshot::plan_push_json(&input_json)
}

/// Build a pull plan (remote day files to local record mutations).
///
/// Takes the same input as `plan_push_json`; the result carries
/// `record_mutations` (`{"kind": "create" | "update", ...}`).
#[uniffi::export]
pub fn plan_pull_json(input_json: String) -> Result<String, SyncError> {
    crate::snapshot::plan_pull_json(&input_json)
}

/// Coalesce a JSON array of pending edits into whole-file operations.
#[uniffi::export]
pub fn build_file_operations_json(edits_json: String) -> Result<String, SyncError> {
    crate::snapshot::build_file_operations_json(&edits_json)
}
