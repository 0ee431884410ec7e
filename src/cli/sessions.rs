//! Sessions command.
//!
//! Lists recent form sessions with their step, category and submission
//! state, useful for finding session IDs to pass to `leadflow debug`,
//! `leadflow trace` and `leadflow record`.

use serde::{Deserialize, Serialize};

use crate::core::LeadSession;
use crate::storage::SessionStore;

/// Options for the sessions command.
#[derive(Debug, Clone, Default)]
pub struct SessionsOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of sessions to show.
    pub limit: usize,
}

/// Summary of a single session for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session ID.
    pub id: String,
    /// Flow status label ("step 2", "evaluating -> 3", "submitted").
    pub status: String,
    /// Lead category wire value, if categorized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Assigned counsellor, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counsellor: Option<String>,
    /// Last updated timestamp (ISO 8601).
    pub updated_at: String,
}

impl From<&LeadSession> for SessionSummary {
    fn from(session: &LeadSession) -> Self {
        Self {
            id: session.id.clone(),
            status: session.flow.status_label(),
            category: session.flow.lead_category.map(|c| c.to_string()),
            counsellor: session.flow.counsellor.clone(),
            updated_at: session.updated_at.to_rfc3339(),
        }
    }
}

/// Output format for the sessions command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionsOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// List of session summaries.
    pub sessions: Vec<SessionSummary>,
    /// Total count of sessions returned.
    pub count: usize,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionsOutput {
    /// Create a successful output.
    pub fn success(sessions: Vec<SessionSummary>) -> Self {
        let count = sessions.len();
        Self {
            success: true,
            sessions,
            count,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            sessions: vec![],
            count: 0,
            error: Some(error.into()),
        }
    }

    /// Format as human-readable text.
    pub fn format_text(&self) -> String {
        if !self.success {
            return format!(
                "Sessions failed: {}",
                self.error.as_deref().unwrap_or("unknown error")
            );
        }

        if self.sessions.is_empty() {
            return "No sessions found.".to_string();
        }

        let mut lines = vec![format!("Sessions ({} found):", self.count)];
        lines.push(String::new());

        lines.push(format!(
            "{:<36}  {:<16}  {:<10}  {:<20}  {}",
            "ID", "STATUS", "CATEGORY", "UPDATED", "COUNSELLOR"
        ));
        lines.push("-".repeat(100));

        for session in &self.sessions {
            let category = session.category.as_deref().unwrap_or("-");
            let counsellor = session.counsellor.as_deref().unwrap_or("-");
            // YYYY-MM-DDTHH:MM:SS
            let updated: String = session.updated_at.chars().take(19).collect();
            lines.push(format!(
                "{:<36}  {:<16}  {:<10}  {:<20}  {}",
                session.id, session.status, category, updated, counsellor
            ));
        }

        lines.join("\n")
    }
}

/// The sessions command implementation.
pub struct SessionsCommand<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> SessionsCommand<S> {
    /// Create a new sessions command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the sessions command.
    pub fn run(&self, options: &SessionsOptions) -> SessionsOutput {
        match self.store.list(options.limit) {
            Ok(sessions) => {
                let summaries: Vec<SessionSummary> =
                    sessions.iter().map(SessionSummary::from).collect();
                SessionsOutput::success(summaries)
            }
            Err(e) => SessionsOutput::failure(format!("Failed to list sessions: {}", e)),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SessionsOutput, options: &SessionsOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            output.format_text()
        }
    }
}
