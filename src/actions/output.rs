//! Action output types.
//!
//! Every action prints exactly one JSON document on stdout.

use serde::Serialize;

use crate::core::{FlowStep, LeadCategory, Transition};
use crate::error::Result;

/// Output for `leadflow start`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StartOutput {
    pub session_id: String,
    pub current_step: FlowStep,
}

/// Output for `leadflow step <action>`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StepOutput {
    pub session_id: String,
    /// The action that was applied.
    pub action: String,
    /// Outcome, category, trigger and counsellor.
    #[serde(flatten)]
    pub transition: Transition,
    /// Step displayed after the action.
    pub current_step: FlowStep,
    pub is_submitted: bool,
    /// Boundary normalization notes, if answers were coerced.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl StepOutput {
    /// Category after the action.
    pub fn category(&self) -> Option<LeadCategory> {
        self.transition.category
    }
}

/// Serialize output to a single JSON line.
pub fn to_json<T: Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string(output)?)
}

/// Serialize output to pretty JSON.
pub fn to_json_pretty<T: Serialize>(output: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(output)?)
}
