//! Action runner.
//!
//! Applies one form action to a stored session:
//!
//! 1. parse the input and load the session
//! 2. merge and normalize the submitted answers into a candidate profile
//! 3. drive the flow state machine against the candidate
//! 4. keep the candidate only if the transition applied
//! 5. hand analytics facts and the session record to the sinks
//! 6. persist the session and render the output
//!
//! Sinks run after the decision is made. Their failures are logged and
//! traced but never change the outcome.

use std::io;

use chrono::Utc;

use crate::actions::input::{parse_input, ActionInput};
use crate::actions::output::{to_json, StartOutput, StepOutput};
use crate::config::Config;
use crate::core::{EventType, Flow, LeadProfile, LeadSession, Outcome, Transition};
use crate::error::{FailOpen, LeadflowError, Result};
use crate::record::SessionRecord;
use crate::sinks::{
    AnalyticsEvent, AnalyticsSink, JsonlAnalyticsSink, JsonlRecordSink, RecordSink,
};
use crate::storage::{validate_session_id, SessionStore};
use crate::util::{read_stream_with_limit, MAX_INPUT_SIZE};

/// Form actions accepted by `leadflow step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    /// Step 1 submitted.
    Basics,
    /// Step 2 submitted.
    Academic,
    /// Evaluation screen finished.
    EvaluationComplete,
    /// Evaluation screen closed early.
    EvaluationCancel,
    /// Step 2.5 submitted.
    ExtendedNurture,
    /// Step 3 slot submitted.
    Counselling,
    /// Back button.
    Back,
}

impl ActionType {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basics => "basics",
            Self::Academic => "academic",
            Self::EvaluationComplete => "evaluation-complete",
            Self::EvaluationCancel => "evaluation-cancel",
            Self::ExtendedNurture => "extended-nurture",
            Self::Counselling => "counselling",
            Self::Back => "back",
        }
    }

    /// Whether the action submits a form page and so carries answers.
    ///
    /// Evaluation and back actions only move between steps; answers sent
    /// with them are dropped.
    pub fn carries_answers(&self) -> bool {
        matches!(
            self,
            Self::Basics | Self::Academic | Self::ExtendedNurture | Self::Counselling
        )
    }
}

/// Action runner context.
pub struct ActionRunner<S: SessionStore> {
    /// Session storage.
    store: S,
    /// Configuration.
    config: Config,
    /// Analytics sink, if enabled.
    analytics: Option<Box<dyn AnalyticsSink>>,
    /// Record sink, if enabled.
    records: Option<Box<dyn RecordSink>>,
}

impl<S: SessionStore> ActionRunner<S> {
    /// Create a runner without sinks.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store,
            config,
            analytics: None,
            records: None,
        }
    }

    /// Create a runner with the JSONL sinks enabled in `config`.
    pub fn with_configured_sinks(store: S, config: Config) -> Self {
        let analytics = if config.sinks.analytics_enabled {
            config
                .analytics_log_path()
                .map(|path| Box::new(JsonlAnalyticsSink::new(path)) as Box<dyn AnalyticsSink>)
        } else {
            None
        };
        let records = if config.sinks.records_enabled {
            config
                .records_log_path()
                .map(|path| Box::new(JsonlRecordSink::new(path)) as Box<dyn RecordSink>)
        } else {
            None
        };

        Self {
            store,
            config,
            analytics,
            records,
        }
    }

    /// Attach an analytics sink.
    pub fn with_analytics(mut self, sink: impl AnalyticsSink + 'static) -> Self {
        self.analytics = Some(Box::new(sink));
        self
    }

    /// Attach a record sink.
    pub fn with_records(mut self, sink: impl RecordSink + 'static) -> Self {
        self.records = Some(Box::new(sink));
        self
    }

    /// The session store.
    pub fn store(&self) -> &S {
        &self.store
    }

    // =========================================================================
    // Entry points
    // =========================================================================

    /// Create and persist a new session.
    pub fn start(&self) -> Result<StartOutput> {
        let session = LeadSession::start();
        self.store.put(&session)?;
        tracing::info!(session_id = %session.id, "session started");

        Ok(StartOutput {
            session_id: session.id,
            current_step: session.flow.current_step,
        })
    }

    /// Run an action with input from stdin.
    pub fn run(&self, action: ActionType) -> Result<String> {
        let input = read_stdin()?;
        self.run_with_input(action, &input)
    }

    /// Run an action with provided JSON input.
    pub fn run_with_input(&self, action: ActionType, input: &str) -> Result<String> {
        let input: ActionInput = parse_input(input)?;
        let output = self.apply(action, input)?;
        to_json(&output)
    }

    /// Apply an action to its session.
    pub fn apply(&self, action: ActionType, input: ActionInput) -> Result<StepOutput> {
        validate_session_id(&input.session_id)?;
        let mut session = self.store.require(&input.session_id)?;

        let candidate = if input.has_answers() {
            self.candidate_profile(&session, action, input.answers)
        } else {
            None
        };
        let profile = candidate
            .as_ref()
            .map(|(profile, _)| profile)
            .unwrap_or(&session.profile);

        let previous_category = session.flow.lead_category;
        let transition = {
            let mut flow = Flow::new(&mut session.flow, &self.config, session.id.clone());
            match action {
                ActionType::Basics => flow.complete_basics(profile),
                ActionType::Academic => flow.complete_academic(profile),
                ActionType::EvaluationComplete => flow.complete_evaluation(),
                ActionType::EvaluationCancel => flow.cancel_evaluation(),
                ActionType::ExtendedNurture => flow.complete_extended_nurture(profile),
                ActionType::Counselling => flow.submit_counselling(),
                ActionType::Back => flow.go_back(),
            }
        };

        // Answers only stick when the step they belong to completes.
        let notes = match candidate {
            Some((profile, notes)) if transition.is_applied() => {
                self.commit_answers(&mut session, profile, &notes);
                notes
            }
            Some(_) => {
                tracing::debug!(
                    session_id = %session.id,
                    action = action.as_str(),
                    "transition ignored, answers discarded"
                );
                Vec::new()
            }
            None => Vec::new(),
        };

        self.trace_transition(&mut session, action, &transition);
        if transition.category != previous_category {
            if let Some(category) = transition.category {
                session.add_trace(EventType::Categorized, Some(category.to_string()));
            }
        }

        tracing::info!(
            session_id = %session.id,
            action = action.as_str(),
            step = %session.flow.current_step,
            category = ?transition.category,
            applied = transition.is_applied(),
            "action applied"
        );

        if transition.is_applied() {
            self.deliver(&mut session, &transition);
        }

        session.touch();
        self.store
            .put(&session)
            .fail_open_default("failed to save session");

        Ok(StepOutput {
            session_id: session.id.clone(),
            action: action.as_str().to_string(),
            current_step: session.flow.current_step,
            is_submitted: session.flow.is_submitted,
            transition,
            notes,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// The stored profile with `answers` merged and normalized.
    ///
    /// `None` when the session is submitted or the action takes no answers.
    /// The session itself is not touched.
    fn candidate_profile(
        &self,
        session: &LeadSession,
        action: ActionType,
        answers: LeadProfile,
    ) -> Option<(LeadProfile, Vec<String>)> {
        if session.flow.is_submitted {
            tracing::debug!(session_id = %session.id, "session submitted, answers ignored");
            return None;
        }
        if !action.carries_answers() {
            tracing::debug!(
                session_id = %session.id,
                action = action.as_str(),
                "action takes no answers, answers ignored"
            );
            return None;
        }

        let mut profile = session.profile.clone();
        profile.merge(answers);
        let notes = profile.normalize();
        Some((profile, notes))
    }

    fn commit_answers(&self, session: &mut LeadSession, profile: LeadProfile, notes: &[String]) {
        session.profile = profile;
        session.add_trace(EventType::AnswersMerged, None);
        for note in notes {
            tracing::debug!(session_id = %session.id, note = %note, "answers normalized");
            session.add_trace(EventType::AnswersNormalized, Some(note.clone()));
        }
    }

    fn trace_transition(
        &self,
        session: &mut LeadSession,
        action: ActionType,
        transition: &Transition,
    ) {
        let (event, details) = match &transition.outcome {
            Outcome::Ignored { reason } => (EventType::TransitionIgnored, reason.clone()),
            Outcome::Evaluating { to, delay_seconds } => (
                EventType::EvaluationStarted,
                format!("next: {}, delay: {}s", to, delay_seconds),
            ),
            Outcome::Submitted => (EventType::Submitted, action.as_str().to_string()),
            Outcome::Advanced { to } => {
                let event = match action {
                    ActionType::EvaluationComplete => EventType::EvaluationCompleted,
                    ActionType::EvaluationCancel => EventType::EvaluationCancelled,
                    ActionType::Back => EventType::NavigatedBack,
                    _ => EventType::StepAdvanced,
                };
                (event, format!("step: {}", to))
            }
        };
        session.add_trace(event, Some(details));
    }

    /// Hand an applied transition to the sinks.
    ///
    /// Every applied transition is a checkpoint and refreshes the session
    /// record. Analytics only hears about transitions that carry a trigger.
    fn deliver(&self, session: &mut LeadSession, transition: &Transition) {
        let now = Utc::now();

        if let (Some(sink), Some(trigger)) = (&self.analytics, transition.trigger) {
            let event = AnalyticsEvent::with_timestamp(
                &session.id,
                trigger,
                transition.category,
                session.profile.form_filler_type,
                now,
            );
            if let Err(err) = sink.emit(&event) {
                sink_failed(session, "analytics", &err);
            }
        }

        if let Some(sink) = &self.records {
            let record = SessionRecord::build(
                &session.profile,
                &session.flow,
                session.elapsed_seconds(now),
            );
            if let Err(err) = sink.submit(&session.id, &record) {
                sink_failed(session, "records", &err);
            }
        }
    }
}

fn sink_failed(session: &mut LeadSession, sink: &str, err: &LeadflowError) {
    tracing::warn!(session_id = %session.id, sink, error = %err, "sink failed (fail-open)");
    session.add_trace(EventType::SinkFailed, Some(format!("{}: {}", sink, err)));
}

/// Read input from stdin.
fn read_stdin() -> Result<String> {
    read_stream_with_limit(io::stdin(), "stdin", MAX_INPUT_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AnalyticsTrigger, FlowStep, FormFillerType, Geography, Grade, LeadCategory,
        PartialFundingApproach, ScholarshipRequirement,
    };
    use crate::record::FunnelStage;
    use crate::sinks::{MemoryAnalyticsSink, MemoryRecordSink};
    use crate::storage::MemorySessionStore;
    use std::sync::Arc;

    struct Harness {
        runner: ActionRunner<MemorySessionStore>,
        analytics: Arc<MemoryAnalyticsSink>,
        records: Arc<MemoryRecordSink>,
    }

    fn harness() -> Harness {
        harness_with(Config::default())
    }

    fn harness_with(config: Config) -> Harness {
        let analytics = Arc::new(MemoryAnalyticsSink::new());
        let records = Arc::new(MemoryRecordSink::new());
        let runner = ActionRunner::new(MemorySessionStore::new(), config)
            .with_analytics(Arc::clone(&analytics))
            .with_records(Arc::clone(&records));
        Harness {
            runner,
            analytics,
            records,
        }
    }

    fn step(h: &Harness, id: &str, action: ActionType, answers: LeadProfile) -> StepOutput {
        h.runner
            .apply(action, ActionInput::new(id).with_answers(answers))
            .unwrap()
    }

    fn bare(h: &Harness, id: &str, action: ActionType) -> StepOutput {
        h.runner.apply(action, ActionInput::new(id)).unwrap()
    }

    struct FailingSink;

    impl AnalyticsSink for FailingSink {
        fn emit(&self, _event: &AnalyticsEvent) -> Result<()> {
            Err(LeadflowError::sink("unreachable"))
        }
    }

    impl RecordSink for FailingSink {
        fn submit(&self, _session_id: &str, _record: &SessionRecord) -> Result<()> {
            Err(LeadflowError::sink("unreachable"))
        }
    }

    // ActionType tests

    #[test]
    fn test_action_type_carries_answers() {
        assert!(ActionType::Basics.carries_answers());
        assert!(ActionType::Academic.carries_answers());
        assert!(ActionType::ExtendedNurture.carries_answers());
        assert!(ActionType::Counselling.carries_answers());
        assert!(!ActionType::EvaluationComplete.carries_answers());
        assert!(!ActionType::EvaluationCancel.carries_answers());
        assert!(!ActionType::Back.carries_answers());
    }

    // Entry point tests

    #[test]
    fn test_start_persists_session() {
        let h = harness();
        let output = h.runner.start().unwrap();

        assert_eq!(output.current_step, FlowStep::Basics);
        let session = h.runner.store().get(&output.session_id).unwrap().unwrap();
        assert!(session
            .trace
            .iter()
            .any(|t| t.event_type == EventType::SessionStart));
    }

    #[test]
    fn test_missing_session_is_error() {
        let h = harness();
        let result = h.runner.apply(ActionType::Basics, ActionInput::new("nope"));
        assert!(matches!(result, Err(LeadflowError::SessionNotFound { .. })));
    }

    #[test]
    fn test_invalid_session_id_is_error() {
        let h = harness();
        let result = h
            .runner
            .run_with_input(ActionType::Basics, r#"{"session_id": "../x"}"#);
        assert!(matches!(result, Err(LeadflowError::InvalidInput { .. })));
    }

    #[test]
    fn test_run_with_input_renders_json() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;
        let input = format!(
            r#"{{"session_id": "{}", "answers": {{"form_filler_type": "parent", "current_grade": "9", "scholarship_requirement": "partial"}}}}"#,
            id
        );

        let json = h.runner.run_with_input(ActionType::Basics, &input).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["outcome"], "advanced");
        assert_eq!(value["to"], "2");
        assert_eq!(value["trigger"], "step1_complete");
        assert_eq!(value["category"], "bch");
    }

    // Full flows

    #[test]
    fn test_bch_flow_books_counselling() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Ten)
                .with_scholarship(ScholarshipRequirement::Optional),
        );
        let out = step(
            &h,
            &id,
            ActionType::Academic,
            LeadProfile::new()
                .with_gpa(8.8)
                .with_geography(Geography::Us),
        );
        assert_eq!(
            out.transition.outcome,
            Outcome::Evaluating {
                to: FlowStep::Counselling,
                delay_seconds: 10
            }
        );
        assert_eq!(out.category(), Some(LeadCategory::Bch));

        let out = bare(&h, &id, ActionType::EvaluationComplete);
        assert_eq!(out.current_step, FlowStep::Counselling);
        assert_eq!(out.transition.counsellor.as_deref(), Some("Viswanathan"));
        assert_eq!(h.records.entries().len(), 3);
        let record = h.records.latest(&id).unwrap();
        assert_eq!(record.current_step, FlowStep::Counselling);
        assert_eq!(record.counsellor.as_deref(), Some("Viswanathan"));

        let mut booking = LeadProfile::new();
        booking.counselling_slot = Some("10:00-10:30".to_string());
        booking.contact.email = Some("parent@example.com".to_string());
        let out = step(&h, &id, ActionType::Counselling, booking);
        assert!(out.is_submitted);

        assert_eq!(
            h.analytics.triggers(),
            vec![
                AnalyticsTrigger::Step1Complete,
                AnalyticsTrigger::Step2Complete,
                AnalyticsTrigger::Step3Complete,
            ]
        );

        let record = h.records.latest(&id).unwrap();
        assert!(record.is_submitted);
        assert!(record.is_qualified_lead);
        assert_eq!(record.funnel_stage, FunnelStage::CounselingBooked);
        assert_eq!(record.counselling_slot.as_deref(), Some("10:00-10:30"));
        assert_eq!(record.email.as_deref(), Some("parent@example.com"));
        assert_eq!(h.records.entries().len(), 4);
    }

    #[test]
    fn test_student_flow_submits_as_nurture() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Student)
                .with_grade(Grade::Eleven)
                .with_scholarship(ScholarshipRequirement::Partial),
        );
        let out = step(&h, &id, ActionType::Academic, LeadProfile::new().with_gpa(9.0));

        assert_eq!(out.transition.outcome, Outcome::Submitted);
        assert_eq!(out.category(), Some(LeadCategory::Nurture));

        let record = h.records.latest(&id).unwrap();
        assert_eq!(record.funnel_stage, FunnelStage::ContactSubmitted);
        assert!(!record.is_qualified_lead);
    }

    #[test]
    fn test_spam_gpa_submits_as_nurture() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Eleven)
                .with_scholarship(ScholarshipRequirement::Optional),
        );
        let out = step(
            &h,
            &id,
            ActionType::Academic,
            LeadProfile::new()
                .with_gpa(10.0)
                .with_geography(Geography::Us),
        );

        assert_eq!(out.category(), Some(LeadCategory::Nurture));
        // Grade 11 parent nurture still gets the funding questions.
        assert_eq!(
            out.transition.outcome,
            Outcome::Evaluating {
                to: FlowStep::ExtendedNurture,
                delay_seconds: 10
            }
        );
    }

    #[test]
    fn test_grade_seven_submits_at_step_one() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        let out = step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::SevenOrBelow),
        );

        assert_eq!(out.transition.outcome, Outcome::Submitted);
        assert_eq!(out.category(), Some(LeadCategory::Drop));
        assert!(h.records.latest(&id).unwrap().is_submitted);
    }

    #[test]
    fn test_extended_nurture_flow_recategorizes() {
        let h = harness_with({
            let mut config = Config::default();
            config.flow.evaluation_delay_seconds = 0;
            config
        });
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Eleven)
                .with_scholarship(ScholarshipRequirement::Full),
        );
        let out = step(&h, &id, ActionType::Academic, LeadProfile::new().with_gpa(7.5));
        assert_eq!(
            out.transition.outcome,
            Outcome::Advanced {
                to: FlowStep::ExtendedNurture
            }
        );

        let mut funding = LeadProfile::new();
        funding.partial_funding_approach = Some(PartialFundingApproach::AcceptLoans);
        let out = step(&h, &id, ActionType::ExtendedNurture, funding);

        assert_eq!(out.category(), Some(LeadCategory::LumL2));
        assert_eq!(out.current_step, FlowStep::Counselling);
        assert_eq!(
            out.transition.counsellor.as_deref(),
            Some("Karthik Lakshman")
        );
        assert_eq!(
            h.analytics.events().last().unwrap().trigger,
            AnalyticsTrigger::ExtendedNurtureComplete
        );
    }

    #[test]
    fn test_back_navigation_keeps_answers() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Twelve)
                .with_scholarship(ScholarshipRequirement::Optional),
        );
        let out = bare(&h, &id, ActionType::Back);
        assert_eq!(out.current_step, FlowStep::Basics);

        let session = h.runner.store().get(&id).unwrap().unwrap();
        assert_eq!(session.profile.current_grade, Some(Grade::Twelve));
        assert!(session
            .trace
            .iter()
            .any(|t| t.event_type == EventType::NavigatedBack));
    }

    // Invariants

    #[test]
    fn test_ignored_action_emits_nothing() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        let out = bare(&h, &id, ActionType::Counselling);

        assert!(!out.transition.is_applied());
        assert!(h.analytics.events().is_empty());
        assert!(h.records.entries().is_empty());
        let session = h.runner.store().get(&id).unwrap().unwrap();
        assert!(session
            .trace
            .iter()
            .any(|t| t.event_type == EventType::TransitionIgnored));
    }

    #[test]
    fn test_ignored_action_discards_answers() {
        let h = harness_with({
            let mut config = Config::default();
            config.flow.evaluation_delay_seconds = 0;
            config
        });
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Twelve)
                .with_scholarship(ScholarshipRequirement::Optional),
        );
        let out = step(
            &h,
            &id,
            ActionType::Academic,
            LeadProfile::new()
                .with_gpa(8.0)
                .with_geography(Geography::Uk),
        );
        assert_eq!(out.current_step, FlowStep::Counselling);
        assert_eq!(out.category(), Some(LeadCategory::LumL1));
        let before = h.runner.store().get(&id).unwrap().unwrap();

        // Step 1 answers sent while on step 3.
        let out = step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Student)
                .with_grade(Grade::SevenOrBelow),
        );
        assert!(!out.transition.is_applied());
        assert!(out.notes.is_empty());

        let after = h.runner.store().get(&id).unwrap().unwrap();
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.flow, before.flow);

        bare(&h, &id, ActionType::Counselling);
        let record = h.records.latest(&id).unwrap();
        assert_eq!(record.current_grade, Some(Grade::Twelve));
        assert_eq!(record.form_filler_type, Some(FormFillerType::Parent));
        assert_eq!(record.lead_category, Some(LeadCategory::LumL1));
    }

    #[test]
    fn test_evaluation_actions_drop_answers() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Ten)
                .with_scholarship(ScholarshipRequirement::Optional),
        );
        step(
            &h,
            &id,
            ActionType::Academic,
            LeadProfile::new()
                .with_gpa(8.8)
                .with_geography(Geography::Us),
        );

        let out = step(
            &h,
            &id,
            ActionType::EvaluationComplete,
            LeadProfile::new()
                .with_scholarship(ScholarshipRequirement::Full)
                .with_gpa(10.0),
        );
        assert_eq!(out.current_step, FlowStep::Counselling);
        assert_eq!(out.category(), Some(LeadCategory::Bch));

        let session = h.runner.store().get(&id).unwrap().unwrap();
        assert_eq!(
            session.profile.scholarship_requirement,
            Some(ScholarshipRequirement::Optional)
        );
        assert_eq!(session.profile.gpa_value, Some(8.8));
        assert_eq!(crate::core::categorize(&session.profile), LeadCategory::Bch);

        let out = step(
            &h,
            &id,
            ActionType::Back,
            LeadProfile::new().with_grade(Grade::Masters),
        );
        assert_eq!(out.current_step, FlowStep::Academic);
        let session = h.runner.store().get(&id).unwrap().unwrap();
        assert_eq!(session.profile.current_grade, Some(Grade::Ten));
    }

    #[test]
    fn test_evaluation_complete_refreshes_record() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Eleven)
                .with_scholarship(ScholarshipRequirement::Optional),
        );
        step(
            &h,
            &id,
            ActionType::Academic,
            LeadProfile::new()
                .with_gpa(8.5)
                .with_geography(Geography::Us),
        );
        let analytics_before = h.analytics.events().len();
        let records_before = h.records.entries().len();

        let out = bare(&h, &id, ActionType::EvaluationComplete);
        assert!(out.transition.trigger.is_none());

        assert_eq!(h.analytics.events().len(), analytics_before);
        assert_eq!(h.records.entries().len(), records_before + 1);
        let record = h.records.latest(&id).unwrap();
        assert_eq!(record.current_step, FlowStep::Counselling);
        assert!(record.counsellor.is_some());
    }

    #[test]
    fn test_submitted_session_ignores_answers_and_resubmits() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::SevenOrBelow),
        );
        let before = h.runner.store().get(&id).unwrap().unwrap();

        let out = step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new().with_grade(Grade::Ten),
        );

        assert!(!out.transition.is_applied());
        let after = h.runner.store().get(&id).unwrap().unwrap();
        assert_eq!(after.profile, before.profile);
        assert_eq!(after.flow, before.flow);
        assert_eq!(h.analytics.events().len(), 1);
    }

    #[test]
    fn test_normalization_notes_are_reported() {
        let h = harness();
        let id = h.runner.start().unwrap().session_id;

        let out = step(
            &h,
            &id,
            ActionType::Basics,
            LeadProfile::new()
                .with_filler(FormFillerType::Parent)
                .with_grade(Grade::Ten)
                .with_scholarship(ScholarshipRequirement::Partial)
                .with_gpa(42.0),
        );

        assert_eq!(out.notes.len(), 1);
        let session = h.runner.store().get(&id).unwrap().unwrap();
        assert!(session.profile.gpa_value.is_none());
    }

    #[test]
    fn test_failing_sinks_do_not_change_decision() {
        let runner = ActionRunner::new(MemorySessionStore::new(), Config::default())
            .with_analytics(FailingSink)
            .with_records(FailingSink);
        let id = runner.start().unwrap().session_id;

        let out = runner
            .apply(
                ActionType::Basics,
                ActionInput::new(&id).with_answers(
                    LeadProfile::new()
                        .with_filler(FormFillerType::Parent)
                        .with_grade(Grade::Masters),
                ),
            )
            .unwrap();

        assert_eq!(
            out.transition.outcome,
            Outcome::Advanced {
                to: FlowStep::Academic
            }
        );
        let session = runner.store().get(&id).unwrap().unwrap();
        assert_eq!(session.flow.current_step, FlowStep::Academic);
        assert_eq!(
            session
                .trace
                .iter()
                .filter(|t| t.event_type == EventType::SinkFailed)
                .count(),
            2
        );
    }
}
