//! Debug command.
//!
//! Dumps a stored session with the record the sinks would receive for it
//! and a consistency check of the stored decision against the current
//! rules and routing.

use serde::Serialize;

use crate::config::Config;
use crate::core::{categorize_with, AcademicTrack, FlowStep, LeadCategory, LeadSession};
use crate::record::SessionRecord;
use crate::storage::SessionStore;

/// Options for the debug command.
#[derive(Debug, Clone, Default)]
pub struct DebugOptions {
    /// Suppress output.
    pub quiet: bool,
}

/// Stored decision checked against the configured rules.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Diagnostics {
    /// What the rule list gives the stored answers; null before step 1
    /// completes. Differs from the stored category after step 2.5
    /// re-categorization and for the grade-7 drop.
    pub rules_category: Option<LeadCategory>,
    pub matches_rules: bool,
    /// Counsellor routing would assign at the current step.
    pub expected_counsellor: Option<String>,
    pub counsellor_matches: bool,
    /// Answers the completed steps depend on that are unset.
    pub missing_answers: Vec<&'static str>,
}

impl Diagnostics {
    /// Check `session` against `config`.
    pub fn check(session: &LeadSession, config: &Config) -> Self {
        let flow = &session.flow;
        let rules_category = flow
            .step_completed
            .map(|_| categorize_with(&session.profile, &config.rules));

        let expected_counsellor = if flow.current_step == FlowStep::Counselling {
            flow.lead_category
                .and_then(|c| config.routing.counsellor_for(c))
                .map(str::to_string)
        } else {
            None
        };

        Self {
            matches_rules: rules_category == flow.lead_category,
            rules_category,
            counsellor_matches: expected_counsellor == flow.counsellor,
            expected_counsellor,
            missing_answers: missing_answers(session),
        }
    }
}

fn missing_answers(session: &LeadSession) -> Vec<&'static str> {
    let profile = &session.profile;
    let flow = &session.flow;
    let mut missing = Vec::new();

    let Some(completed) = flow.step_completed else {
        return missing;
    };

    if profile.form_filler_type.is_none() {
        missing.push("form_filler_type");
    }
    if profile.current_grade.is_none() {
        missing.push("current_grade");
    }
    if completed == FlowStep::Basics {
        return missing;
    }

    match flow.academic_track {
        Some(AcademicTrack::Masters) => {
            if profile.application_preparation.is_none() {
                missing.push("application_preparation");
            }
            if profile.target_universities.is_none() {
                missing.push("target_universities");
            }
        }
        _ => {
            if profile.scholarship_requirement.is_none() {
                missing.push("scholarship_requirement");
            }
            if profile.gpa_value.is_none() && profile.percentage_value.is_none() {
                missing.push("gpa_value");
            }
            if profile.target_geographies.is_empty() {
                missing.push("target_geographies");
            }
        }
    }

    if completed == FlowStep::ExtendedNurture && profile.partial_funding_approach.is_none() {
        missing.push("partial_funding_approach");
    }
    if completed == FlowStep::Counselling && profile.counselling_slot.is_none() {
        missing.push("counselling_slot");
    }
    missing
}

/// Output format for the debug command.
#[derive(Debug, Clone, Serialize)]
pub struct DebugOutput {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<LeadSession>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<SessionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DebugOutput {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            session: None,
            record: None,
            diagnostics: None,
            error: Some(error.into()),
        }
    }
}

/// The debug command implementation.
pub struct DebugCommand<S: SessionStore> {
    store: S,
    config: Config,
}

impl<S: SessionStore> DebugCommand<S> {
    /// Create a new debug command.
    pub fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// Run the debug command.
    pub fn run(&self, session_id: &str) -> DebugOutput {
        let session = match self.store.require(session_id) {
            Ok(session) => session,
            Err(e) => return DebugOutput::failure(e.to_string()),
        };

        // Elapsed up to the last update so repeated dumps agree.
        let record = SessionRecord::build(
            &session.profile,
            &session.flow,
            session.elapsed_seconds(session.updated_at),
        );
        let diagnostics = Diagnostics::check(&session, &self.config);
        if !diagnostics.counsellor_matches {
            tracing::debug!(
                session_id = %session.id,
                expected = ?diagnostics.expected_counsellor,
                stored = ?session.flow.counsellor,
                "stored counsellor differs from routing"
            );
        }

        DebugOutput {
            success: true,
            session: Some(session),
            record: Some(record),
            diagnostics: Some(diagnostics),
            error: None,
        }
    }

    /// Format output based on options. Debug always renders JSON.
    pub fn format_output(&self, output: &DebugOutput, options: &DebugOptions) -> String {
        if options.quiet {
            return String::new();
        }

        serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
    }
}
