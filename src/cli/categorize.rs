//! Categorize command.
//!
//! Runs the categorization rules over a standalone profile, without a
//! session. Useful for checking how a set of answers would be routed.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{categorize_with, LeadCategory, LeadProfile};
use crate::error::{LeadflowError, Result};
use crate::util::read_to_string_limited;

/// Options for the categorize command.
#[derive(Debug, Clone, Default)]
pub struct CategorizeOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the categorize command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizeOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// Computed category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<LeadCategory>,
    /// Whether the category counts as a qualified lead.
    pub is_qualified_lead: bool,
    /// Counsellor the category would be routed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counsellor: Option<String>,
    /// Normalization notes.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategorizeOutput {
    /// Create a successful output.
    pub fn success(
        category: LeadCategory,
        counsellor: Option<String>,
        notes: Vec<String>,
    ) -> Self {
        Self {
            success: true,
            category: Some(category),
            is_qualified_lead: category.is_qualified(),
            counsellor,
            notes,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            category: None,
            is_qualified_lead: false,
            counsellor: None,
            notes: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The categorize command implementation.
pub struct CategorizeCommand {
    config: Config,
}

impl CategorizeCommand {
    /// Create a new categorize command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Categorize a profile given as JSON.
    pub fn run(&self, profile_json: &str) -> CategorizeOutput {
        match parse_profile(profile_json) {
            Ok(profile) => self.categorize(profile),
            Err(e) => CategorizeOutput::failure(e.to_string()),
        }
    }

    /// Categorize a profile read from a file.
    pub fn run_file(&self, path: &Path) -> CategorizeOutput {
        match read_to_string_limited(path) {
            Ok(content) => self.run(&content),
            Err(e) => CategorizeOutput::failure(format!("Failed to read profile: {}", e)),
        }
    }

    fn categorize(&self, mut profile: LeadProfile) -> CategorizeOutput {
        let notes = profile.normalize();
        let category = categorize_with(&profile, &self.config.rules);
        let counsellor = self
            .config
            .routing
            .counsellor_for(category)
            .map(str::to_string);

        tracing::debug!(category = %category, "profile categorized");
        CategorizeOutput::success(category, counsellor, notes)
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &CategorizeOutput, options: &CategorizeOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format_human_readable(output)
        }
    }
}

fn parse_profile(json: &str) -> Result<LeadProfile> {
    serde_json::from_str(json)
        .map_err(|e| LeadflowError::serde(format!("failed to parse profile: {}", e)))
}

fn format_human_readable(output: &CategorizeOutput) -> String {
    if !output.success {
        return format!(
            "Categorize failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let category = output
        .category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut lines = vec![format!(
        "Category: {}{}",
        category,
        if output.is_qualified_lead {
            " (qualified)"
        } else {
            ""
        }
    )];
    if let Some(counsellor) = &output.counsellor {
        lines.push(format!("Counsellor: {}", counsellor));
    }
    for note in &output.notes {
        lines.push(format!("Note: {}", note));
    }

    lines.join("\n") + "\n"
}
