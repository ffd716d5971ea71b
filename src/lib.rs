//! TableSync Core Library
//!
//! Cross-platform planning for multi-device sync of small record tables
//! through a remote hierarchical store (WebDAV-like: stat/read/list), with
//! no central server:
//! - **push**: plans the remote file edits that publish local changes
//! - **pull**: plans the local record creates/updates that import remote changes
//! - **coalesce**: collapses line-level edits into whole-file writes
//!
//! The planner is read-only. It queries the stores through the
//! [`LocalStore`] and [`RemoteStore`] traits and returns a
//! [`SynchronizeResult`]; each platform applies the file operations and
//! record mutations itself.
//!
//! Conflicts are resolved by last-write-wins on `last_operation_time`
//! equality: when a record changed on both sides between two syncs, the side
//! that syncs last wins. There is no causal ordering and no multi-file
//! atomicity; concurrent plans for the same table must be serialized by the
//! caller.
//!
//! # Example (conceptual)
//! ```ignore
//! let table = TableSettings::new("pastes");
//! let plan = build_local_to_remote_tasks(&table, "sync", &local_db, &webdav);
//! for op in &plan.file_operations {
//!     webdav.put(op.path(), op.content())?;
//! }
//!
//! let plan = build_remote_to_local_tasks(&table, "sync", &local_db, &webdav);
//! local_db.apply(&plan.record_mutations)?;
//! ```

pub mod coalesce;
pub mod error;
pub mod layout;
pub mod plan;
pub mod pull;
pub mod push;
pub mod snapshot;
pub mod store;
pub mod types;

pub use coalesce::build_file_operations_from_pending_edits;
pub use error::{SyncError, SyncResult};
pub use plan::{
    FileOperation, Message, MessageScope, PendingEdit, RecordMutation, Severity, SynchronizeResult,
};
pub use pull::build_remote_to_local_tasks;
pub use push::build_local_to_remote_tasks;
pub use snapshot::{plan_pull, plan_pull_json, plan_push, plan_push_json, PlanInput};
pub use store::{LocalStore, MemoryLocalStore, MemoryRemoteStore, RemoteEntry, RemoteStore};
pub use types::{Record, TableSettings};

/// Version of this library.
pub fn get_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for .NET P/Invoke
#[cfg(feature = "ffi")]
pub mod ffi;

// UniFFI bindings for Swift/Kotlin
#[cfg(feature = "uniffi")]
pub mod uniffi_api;

#[cfg(feature = "uniffi")]
pub use uniffi_api::*;

// UniFFI scaffolding - generates the FFI glue code
#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();
