//! Record command.
//!
//! Prints the current session record, the same payload the record sink
//! receives at each checkpoint.

use serde::{Deserialize, Serialize};

use crate::record::SessionRecord;
use crate::storage::SessionStore;

/// Output format for the record command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Session ID.
    pub session_id: String,
    /// The record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<SessionRecord>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutput {
    /// Create a successful output.
    pub fn success(session_id: impl Into<String>, record: SessionRecord) -> Self {
        Self {
            success: true,
            session_id: session_id.into(),
            record: Some(record),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(session_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: session_id.into(),
            record: None,
            error: Some(error.into()),
        }
    }
}

/// The record command implementation.
pub struct RecordCommand<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> RecordCommand<S> {
    /// Create a new record command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Build the record for a stored session.
    pub fn run(&self, session_id: &str) -> RecordOutput {
        match self.store.require(session_id) {
            Ok(session) => {
                // Elapsed time is measured up to the last update, so repeated
                // invocations print the same record.
                let elapsed = session.elapsed_seconds(session.updated_at);
                let record = SessionRecord::build(&session.profile, &session.flow, elapsed);
                RecordOutput::success(session_id, record)
            }
            Err(e) => RecordOutput::failure(session_id, e.to_string()),
        }
    }

    /// Format output. Success prints the bare record on one line.
    pub fn format_output(&self, output: &RecordOutput, quiet: bool) -> String {
        if quiet {
            return String::new();
        }

        match &output.record {
            Some(record) if output.success => record
                .to_json()
                .unwrap_or_else(|_| "{}".to_string()),
            _ => serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}
