//! Plan types returned to the caller.
//!
//! The planner never writes anything. It returns a [`SynchronizeResult`]
//! holding the pending edits, the coalesced file operations and the record
//! mutations; each platform applies them against its own stores.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};
use crate::types::Record;

/// A not-yet-materialized instruction against a single remote file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingEdit {
    /// Create the file; only materialized if lines are appended to it
    CreateEmpty { path: String },
    /// Current remote content, the base that later edits mutate
    Baseline { path: String, content: String },
    /// Append a line at the end of the file
    AppendLine { path: String, content: String },
    /// Replace the baseline line at `index`
    ReplaceLine { path: String, index: usize, content: String },
    /// Remove the baseline line at `index`
    DeleteLine { path: String, index: usize },
}

impl PendingEdit {
    /// Remote path this edit targets.
    pub fn path(&self) -> &str {
        match self {
            PendingEdit::CreateEmpty { path }
            | PendingEdit::Baseline { path, .. }
            | PendingEdit::AppendLine { path, .. }
            | PendingEdit::ReplaceLine { path, .. }
            | PendingEdit::DeleteLine { path, .. } => path,
        }
    }
}

/// A whole-file write, ready to send to the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileOperation {
    Create { path: String, content: String },
    Replace { path: String, content: String },
}

impl FileOperation {
    pub fn path(&self) -> &str {
        match self {
            FileOperation::Create { path, .. } | FileOperation::Replace { path, .. } => path,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            FileOperation::Create { content, .. } | FileOperation::Replace { content, .. } => {
                content
            }
        }
    }
}

/// A pending local-store instruction derived from remote state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordMutation {
    /// Insert a record that only exists remotely
    Create { record: Record },
    /// Overwrite the local record with this id by the full remote payload
    Update { id: String, record: Record },
}

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Which side a message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageScope {
    Database,
    Remote,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub severity: Severity,
    pub scope: MessageScope,
    pub text: String,
}

/// Output of a plan-building call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynchronizeResult {
    /// Diagnostic trace, in order
    pub log: Vec<String>,
    /// Messages for the user
    pub messages: Vec<Message>,
    /// Line-level edits, in the order they were produced
    pub pending_edits: Vec<PendingEdit>,
    /// Whole-file writes coalesced from `pending_edits`, sorted by path
    pub file_operations: Vec<FileOperation>,
    /// Local record creates/updates
    pub record_mutations: Vec<RecordMutation>,
}

impl SynchronizeResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a diagnostic line.
    pub fn trace(&mut self, line: impl Into<String>) {
        let line = line.into();
        tracing::debug!("{}", line);
        self.log.push(line);
    }

    /// Record a user-facing message. It is traced as well.
    pub fn message(&mut self, severity: Severity, scope: MessageScope, text: impl Into<String>) {
        let text = text.into();
        match severity {
            Severity::Error | Severity::Warning => tracing::warn!(?scope, "{}", text),
            Severity::Info | Severity::Success => tracing::info!(?scope, "{}", text),
        }
        self.log.push(format!("[{:?}] {}", severity, text));
        self.messages.push(Message {
            severity,
            scope,
            text,
        });
    }

    /// Record an error-severity message.
    pub fn error(&mut self, scope: MessageScope, text: impl Into<String>) {
        self.message(Severity::Error, scope, text);
    }

    /// Record a store failure, scoped by the error's origin.
    pub fn store_error(&mut self, context: &str, err: &SyncError) {
        self.error(err.scope(), format!("{}: {}", context, err));
    }

    /// Unwrap a store call. A failure is recorded as an error message and
    /// `None` tells the planner to stop.
    pub(crate) fn check<T>(&mut self, context: &str, outcome: SyncResult<T>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(err) => {
                self.store_error(context, &err);
                None
            }
        }
    }

    /// Queue a pending edit.
    pub fn push_edit(&mut self, edit: PendingEdit) {
        self.pending_edits.push(edit);
    }

    /// True if any error-severity message was recorded.
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }
}
