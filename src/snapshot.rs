//! Snapshot entry points.
//!
//! Platforms that cannot hand the planner a live store (FFI, WASM, mobile)
//! send a snapshot instead: the table's local records plus the remote files
//! under the table directory. The planner runs against in-memory stores
//! built from it and returns the plan as data or JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::coalesce::build_file_operations_from_pending_edits;
use crate::error::SyncResult;
use crate::plan::{PendingEdit, SynchronizeResult};
use crate::pull::build_remote_to_local_tasks;
use crate::push::build_local_to_remote_tasks;
use crate::store::{MemoryLocalStore, MemoryRemoteStore};
use crate::types::{Record, TableSettings};

/// Input for a push or pull plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    /// Table being synchronized
    pub table: TableSettings,
    /// Remote root directory
    pub root: String,
    /// Every local record of the table
    #[serde(default)]
    pub local_records: Vec<Record>,
    /// Remote files by full path (meta and day files)
    #[serde(default)]
    pub remote_files: BTreeMap<String, String>,
}

impl PlanInput {
    fn stores(&self) -> (MemoryLocalStore, MemoryRemoteStore) {
        let local =
            MemoryLocalStore::new(self.table.clone()).with_records(self.local_records.iter().cloned());
        let mut remote = MemoryRemoteStore::new();
        for (path, content) in &self.remote_files {
            remote.write_file(path, content.as_bytes().to_vec());
        }
        (local, remote)
    }
}

/// Build a push plan from a snapshot.
pub fn plan_push(input: &PlanInput) -> SynchronizeResult {
    let (local, remote) = input.stores();
    build_local_to_remote_tasks(&input.table, &input.root, &local, &remote)
}

/// Build a pull plan from a snapshot.
pub fn plan_pull(input: &PlanInput) -> SynchronizeResult {
    let (local, remote) = input.stores();
    build_remote_to_local_tasks(&input.table, &input.root, &local, &remote)
}

/// Push plan using JSON strings.
/// Convenience function for FFI.
pub fn plan_push_json(input_json: &str) -> SyncResult<String> {
    let input: PlanInput = serde_json::from_str(input_json)?;
    let output = plan_push(&input);
    Ok(serde_json::to_string(&output)?)
}

/// Pull plan using JSON strings.
/// Convenience function for FFI.
pub fn plan_pull_json(input_json: &str) -> SyncResult<String> {
    let input: PlanInput = serde_json::from_str(input_json)?;
    let output = plan_pull(&input);
    Ok(serde_json::to_string(&output)?)
}

/// Coalesce a JSON array of pending edits.
pub fn build_file_operations_json(edits_json: &str) -> SyncResult<String> {
    let edits: Vec<PendingEdit> = serde_json::from_str(edits_json)?;
    let output = build_file_operations_from_pending_edits(edits);
    Ok(serde_json::to_string(&output)?)
}
