//! Session and flow state types.
//!
//! These types represent the persisted state of one form session: the
//! answers collected so far, the flow state machine position, and trace
//! events for debugging.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::category::{deserialize_sanitized, LeadCategory};
use crate::core::profile::LeadProfile;

/// Main session container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeadSession {
    /// Unique session identifier (UUID v4).
    pub id: String,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session was last updated.
    pub updated_at: DateTime<Utc>,
    /// Answers collected so far.
    #[serde(default)]
    pub profile: LeadProfile,
    /// Flow state machine position.
    #[serde(default)]
    pub flow: FlowState,
    /// Trace events for debugging.
    #[serde(default)]
    pub trace: Vec<TraceEvent>,
}

impl LeadSession {
    /// Create a new session with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            created_at: now,
            updated_at: now,
            profile: LeadProfile::default(),
            flow: FlowState::default(),
            trace: Vec::new(),
        }
    }

    /// Create a new session with a random UUID v4.
    pub fn start() -> Self {
        let mut session = Self::new(Uuid::new_v4().to_string());
        session.add_trace(EventType::SessionStart, None);
        session
    }

    /// Add a trace event to the session.
    pub fn add_trace(&mut self, event_type: EventType, details: Option<String>) {
        let event = TraceEvent::new(event_type, details).at(&self.flow);
        self.trace.push(event);
        self.updated_at = Utc::now();
    }

    /// Update the session's updated_at timestamp.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Whole seconds since the session was created.
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.created_at)
            .num_seconds()
            .max(0) as u64
    }
}

/// Form steps.
///
/// Serialized as the step labels the form displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FlowStep {
    /// Step 1: role, grade, curriculum, scholarship.
    #[default]
    #[serde(rename = "1")]
    Basics,
    /// Step 2: scores and destinations (or masters questions).
    #[serde(rename = "2")]
    Academic,
    /// Step 2.5: funding questions for nurture parents of grades 11-12.
    #[serde(rename = "2.5")]
    ExtendedNurture,
    /// Step 3: counselling slot booking.
    #[serde(rename = "3")]
    Counselling,
}

impl FlowStep {
    /// Display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowStep::Basics => "1",
            FlowStep::Academic => "2",
            FlowStep::ExtendedNurture => "2.5",
            FlowStep::Counselling => "3",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            FlowStep::Basics => "basics",
            FlowStep::Academic => "academic",
            FlowStep::ExtendedNurture => "extended_nurture",
            FlowStep::Counselling => "counselling",
        }
    }
}

impl fmt::Display for FlowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which question set step 2 shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicTrack {
    Regular,
    Masters,
}

/// Flow state machine position for one session.
///
/// Mutated only through [`Flow`](crate::core::Flow). Once `is_submitted` is
/// true nothing changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct FlowState {
    /// The step currently displayed.
    pub current_step: FlowStep,
    /// Step 2 question set, set when step 2 is entered.
    pub academic_track: Option<AcademicTrack>,
    /// Current category; null until step 1 completes.
    #[serde(deserialize_with = "deserialize_sanitized")]
    pub lead_category: Option<LeadCategory>,
    /// Last completed step.
    pub step_completed: Option<FlowStep>,
    /// Decided next step, held while the evaluation screen runs.
    pub pending_step: Option<FlowStep>,
    /// Counsellor assigned when the counselling step is entered.
    pub counsellor: Option<String>,
    /// Terminal flag.
    pub is_submitted: bool,
}

impl FlowState {
    /// Whether an evaluation is in progress.
    pub fn is_evaluating(&self) -> bool {
        self.pending_step.is_some()
    }

    /// Short status label for listings.
    pub fn status_label(&self) -> String {
        if self.is_submitted {
            "submitted".to_string()
        } else if let Some(pending) = self.pending_step {
            format!("evaluating -> {}", pending)
        } else {
            format!("step {}", self.current_step)
        }
    }
}

/// Analytics facts emitted when a step completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsTrigger {
    Step1Complete,
    Step2Complete,
    ExtendedNurtureComplete,
    Step3Complete,
}

impl AnalyticsTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsTrigger::Step1Complete => "step1_complete",
            AnalyticsTrigger::Step2Complete => "step2_complete",
            AnalyticsTrigger::ExtendedNurtureComplete => "extended_nurture_complete",
            AnalyticsTrigger::Step3Complete => "step3_complete",
        }
    }
}

impl fmt::Display for AnalyticsTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Individual trace event for debugging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    /// Type of event.
    pub event_type: EventType,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Optional details.
    pub details: Option<String>,
    /// Step displayed when the event was recorded.
    #[serde(default)]
    pub step: FlowStep,
    /// Category when the event was recorded.
    #[serde(default, deserialize_with = "deserialize_sanitized")]
    pub category: Option<LeadCategory>,
}

impl TraceEvent {
    /// Create a new trace event at step 1 with no category.
    pub fn new(event_type: EventType, details: Option<String>) -> Self {
        Self {
            event_type,
            timestamp: Utc::now(),
            details,
            step: FlowStep::default(),
            category: None,
        }
    }

    /// Stamp the event with the flow position it was recorded at.
    pub fn at(mut self, flow: &FlowState) -> Self {
        self.step = flow.current_step;
        self.category = flow.lead_category;
        self
    }
}

/// Event type enum for trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Session started.
    SessionStart,
    /// Answers merged into the profile.
    AnswersMerged,
    /// Boundary normalization adjusted an answer.
    AnswersNormalized,
    /// Category computed or changed.
    Categorized,
    /// Evaluation screen started.
    EvaluationStarted,
    /// Evaluation screen finished, pending step committed.
    EvaluationCompleted,
    /// Evaluation screen cancelled.
    EvaluationCancelled,
    /// Step advanced.
    StepAdvanced,
    /// Back navigation.
    NavigatedBack,
    /// Session submitted.
    Submitted,
    /// Transition rejected as a no-op.
    TransitionIgnored,
    /// A sink call failed.
    SinkFailed,
}

/// Every event type, in declaration order.
pub const ALL_EVENT_TYPES: [EventType; 12] = [
    EventType::SessionStart,
    EventType::AnswersMerged,
    EventType::AnswersNormalized,
    EventType::Categorized,
    EventType::EvaluationStarted,
    EventType::EvaluationCompleted,
    EventType::EvaluationCancelled,
    EventType::StepAdvanced,
    EventType::NavigatedBack,
    EventType::Submitted,
    EventType::TransitionIgnored,
    EventType::SinkFailed,
];

impl EventType {
    /// Wire name, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::SessionStart => "session_start",
            EventType::AnswersMerged => "answers_merged",
            EventType::AnswersNormalized => "answers_normalized",
            EventType::Categorized => "categorized",
            EventType::EvaluationStarted => "evaluation_started",
            EventType::EvaluationCompleted => "evaluation_completed",
            EventType::EvaluationCancelled => "evaluation_cancelled",
            EventType::StepAdvanced => "step_advanced",
            EventType::NavigatedBack => "navigated_back",
            EventType::Submitted => "submitted",
            EventType::TransitionIgnored => "transition_ignored",
            EventType::SinkFailed => "sink_failed",
        }
    }

    /// Events that move the session between steps.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            EventType::EvaluationStarted
                | EventType::EvaluationCompleted
                | EventType::EvaluationCancelled
                | EventType::StepAdvanced
                | EventType::NavigatedBack
                | EventType::Submitted
        )
    }

    /// Events that point at something going wrong.
    pub fn is_problem(&self) -> bool {
        matches!(self, EventType::TransitionIgnored | EventType::SinkFailed)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
