//! Action input types.
//!
//! Each form action arrives as one JSON document on stdin carrying the
//! session id and the answers collected on the current step.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::LeadProfile;
use crate::error::{LeadflowError, Result};

/// Input for every `step` action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionInput {
    /// Session the action applies to.
    pub session_id: String,
    /// Answers from the current step. Omitted fields keep their stored value.
    #[serde(default)]
    pub answers: LeadProfile,
}

impl ActionInput {
    /// Create an input without answers.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            answers: LeadProfile::default(),
        }
    }

    /// Attach answers.
    pub fn with_answers(mut self, answers: LeadProfile) -> Self {
        self.answers = answers;
        self
    }

    /// Whether any answer was supplied.
    pub fn has_answers(&self) -> bool {
        self.answers != LeadProfile::default()
    }
}

/// Parse action input from JSON.
pub fn parse_input<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|e| LeadflowError::serde(format!("failed to parse action input: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FormFillerType, Geography, Grade, ScholarshipRequirement};

    #[test]
    fn test_parse_full_input() {
        let json = r#"{
            "session_id": "abc-123",
            "answers": {
                "form_filler_type": "parent",
                "current_grade": "11",
                "scholarship_requirement": "optional",
                "target_geographies": ["UK", "US"],
                "gpa_value": 8.7
            }
        }"#;

        let input: ActionInput = parse_input(json).unwrap();
        assert_eq!(input.session_id, "abc-123");
        assert_eq!(input.answers.form_filler_type, Some(FormFillerType::Parent));
        assert_eq!(input.answers.current_grade, Some(Grade::Eleven));
        assert_eq!(
            input.answers.scholarship_requirement,
            Some(ScholarshipRequirement::Optional)
        );
        assert!(input.answers.target_geographies.contains(&Geography::Us));
        assert_eq!(input.answers.gpa_value, Some(8.7));
        assert!(input.has_answers());
    }

    #[test]
    fn test_parse_without_answers() {
        let input: ActionInput = parse_input(r#"{"session_id": "abc"}"#).unwrap();
        assert!(!input.has_answers());
    }

    #[test]
    fn test_unknown_enum_values_are_unrecognized() {
        let json = r#"{
            "session_id": "abc",
            "answers": {"current_grade": "13", "form_filler_type": "teacher"}
        }"#;

        let input: ActionInput = parse_input(json).unwrap();
        assert_eq!(input.answers.current_grade, Some(Grade::Unrecognized));
        assert_eq!(
            input.answers.form_filler_type,
            Some(FormFillerType::Unrecognized)
        );
    }

    #[test]
    fn test_parse_missing_session_id_fails() {
        let result: Result<ActionInput> = parse_input(r#"{"answers": {}}"#);
        assert!(matches!(result, Err(LeadflowError::Serde { .. })));
    }

    #[test]
    fn test_parse_invalid_json_fails() {
        let result: Result<ActionInput> = parse_input("not json");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("failed to parse action input"));
    }
}
