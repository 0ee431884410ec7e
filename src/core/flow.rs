//! Form flow state machine.
//!
//! Decides the next step from the current step, the filler's role, the
//! grade and the lead category. Illegal or out-of-order transitions are
//! reported as [`Outcome::Ignored`] and leave the state untouched.

use serde::Serialize;

use crate::config::Config;
use crate::core::categorizer::{categorize_with, recategorize};
use crate::core::category::LeadCategory;
use crate::core::profile::{Grade, LeadProfile};
use crate::core::state::{AcademicTrack, AnalyticsTrigger, FlowState, FlowStep};

/// What a transition did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Moved to another step.
    Advanced { to: FlowStep },
    /// Decided the next step; the evaluation screen runs before it is entered.
    Evaluating { to: FlowStep, delay_seconds: u32 },
    /// Session is now terminal.
    Submitted,
    /// Nothing changed.
    Ignored { reason: String },
}

/// Result of one flow transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Category after the transition.
    pub category: Option<LeadCategory>,
    /// Analytics fact completed by this transition, if any.
    pub trigger: Option<AnalyticsTrigger>,
    /// Assigned counsellor after the transition.
    pub counsellor: Option<String>,
}

impl Transition {
    /// Whether the state changed.
    pub fn is_applied(&self) -> bool {
        !matches!(self.outcome, Outcome::Ignored { .. })
    }
}

/// Flow state machine.
///
/// All mutations of [`FlowState`] go through this struct.
#[derive(Debug)]
pub struct Flow<'a> {
    /// The flow state being managed.
    state: &'a mut FlowState,
    /// Configuration for rule parameters, delays and routing.
    config: &'a Config,
    /// Current session ID.
    session_id: String,
}

impl<'a> Flow<'a> {
    /// Create a new flow manager.
    pub fn new(
        state: &'a mut FlowState,
        config: &'a Config,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            state,
            config,
            session_id: session_id.into(),
        }
    }

    /// The step currently displayed.
    pub fn current_step(&self) -> FlowStep {
        self.state.current_step
    }

    /// Current category.
    pub fn category(&self) -> Option<LeadCategory> {
        self.state.lead_category
    }

    /// Whether the session is terminal.
    pub fn is_submitted(&self) -> bool {
        self.state.is_submitted
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Step 1 completed.
    ///
    /// Grade 7 or below submits immediately as `drop`. Masters goes to the
    /// masters question set, everyone else to the regular one.
    pub fn complete_basics(&mut self, profile: &LeadProfile) -> Transition {
        if let Some(reason) = self.guard(FlowStep::Basics) {
            return self.ignored(reason);
        }

        self.state.step_completed = Some(FlowStep::Basics);
        self.state.lead_category = Some(self.session_category(profile));

        if profile.current_grade == Some(Grade::SevenOrBelow) {
            self.state.is_submitted = true;
            tracing::debug!(session_id = %self.session_id, "grade 7 or below, submitting as drop");
            return self.applied(Outcome::Submitted, Some(AnalyticsTrigger::Step1Complete));
        }

        let track = if profile.current_grade == Some(Grade::Masters) {
            AcademicTrack::Masters
        } else {
            AcademicTrack::Regular
        };
        self.state.academic_track = Some(track);
        self.state.current_step = FlowStep::Academic;

        self.applied(
            Outcome::Advanced {
                to: FlowStep::Academic,
            },
            Some(AnalyticsTrigger::Step1Complete),
        )
    }

    /// Step 2 completed.
    ///
    /// The category is always recomputed from the full profile here.
    pub fn complete_academic(&mut self, profile: &LeadProfile) -> Transition {
        if let Some(reason) = self.guard(FlowStep::Academic) {
            return self.ignored(reason);
        }

        let category = self.session_category(profile);
        self.state.lead_category = Some(category);
        self.state.step_completed = Some(FlowStep::Academic);
        let trigger = Some(AnalyticsTrigger::Step2Complete);

        tracing::debug!(
            session_id = %self.session_id,
            category = %category,
            "categorized at step 2"
        );

        if profile.is_student() || category == LeadCategory::Drop {
            self.state.is_submitted = true;
            return self.applied(Outcome::Submitted, trigger);
        }

        if category.routes_to_counselling() {
            return self.evaluate(FlowStep::Counselling, trigger);
        }

        let extended_nurture = profile.is_parent()
            && profile
                .current_grade
                .map(|g| g.is_senior_secondary())
                .unwrap_or(false);
        if extended_nurture {
            return self.evaluate(FlowStep::ExtendedNurture, trigger);
        }

        self.state.is_submitted = true;
        self.applied(Outcome::Submitted, trigger)
    }

    /// Evaluation screen finished: enter the pending step.
    pub fn complete_evaluation(&mut self) -> Transition {
        if self.state.is_submitted {
            return self.ignored("session already submitted");
        }
        let Some(next) = self.state.pending_step.take() else {
            return self.ignored("no evaluation in progress");
        };

        self.enter(next);
        self.applied(Outcome::Advanced { to: next }, None)
    }

    /// Evaluation screen cancelled: stay on step 2.
    ///
    /// The computed category is kept; it is recomputed on the next advance.
    pub fn cancel_evaluation(&mut self) -> Transition {
        if self.state.is_submitted {
            return self.ignored("session already submitted");
        }
        if self.state.pending_step.take().is_none() {
            return self.ignored("no evaluation in progress");
        }

        self.applied(
            Outcome::Advanced {
                to: self.state.current_step,
            },
            None,
        )
    }

    /// Extended nurture step completed: re-categorize on funding answers.
    pub fn complete_extended_nurture(&mut self, profile: &LeadProfile) -> Transition {
        if let Some(reason) = self.guard(FlowStep::ExtendedNurture) {
            return self.ignored(reason);
        }

        let current = self.state.lead_category.unwrap_or(LeadCategory::Nurture);
        let category = recategorize(current, profile);
        self.state.lead_category = Some(category);
        self.state.step_completed = Some(FlowStep::ExtendedNurture);
        let trigger = Some(AnalyticsTrigger::ExtendedNurtureComplete);

        if category == LeadCategory::LumL2 {
            self.enter(FlowStep::Counselling);
            return self.applied(
                Outcome::Advanced {
                    to: FlowStep::Counselling,
                },
                trigger,
            );
        }

        self.state.is_submitted = true;
        self.applied(Outcome::Submitted, trigger)
    }

    /// Counselling slot submitted.
    pub fn submit_counselling(&mut self) -> Transition {
        if let Some(reason) = self.guard(FlowStep::Counselling) {
            return self.ignored(reason);
        }

        self.state.step_completed = Some(FlowStep::Counselling);
        self.state.is_submitted = true;
        self.applied(Outcome::Submitted, Some(AnalyticsTrigger::Step3Complete))
    }

    /// Navigate one step back. Answers are kept by the caller; any running
    /// evaluation is dropped.
    pub fn go_back(&mut self) -> Transition {
        if self.state.is_submitted {
            return self.ignored("session already submitted");
        }
        if !self.config.flow.allow_back_navigation {
            return self.ignored("back navigation disabled");
        }

        let previous = match self.state.current_step {
            FlowStep::Basics => return self.ignored("already at the first step"),
            FlowStep::Academic => FlowStep::Basics,
            FlowStep::ExtendedNurture | FlowStep::Counselling => FlowStep::Academic,
        };

        self.state.pending_step = None;
        self.state.counsellor = None;
        self.state.current_step = previous;
        self.applied(Outcome::Advanced { to: previous }, None)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Common preconditions for completing `step`.
    fn guard(&self, step: FlowStep) -> Option<String> {
        if self.state.is_submitted {
            return Some("session already submitted".to_string());
        }
        if self.state.is_evaluating() {
            return Some("evaluation in progress".to_string());
        }
        if self.state.current_step != step {
            return Some(format!(
                "cannot complete {} while on step {}",
                step.name(),
                self.state.current_step
            ));
        }
        None
    }

    /// Category for the session: grade 7 or below is always `drop`.
    fn session_category(&self, profile: &LeadProfile) -> LeadCategory {
        if profile.current_grade == Some(Grade::SevenOrBelow) {
            return LeadCategory::Drop;
        }
        categorize_with(profile, &self.config.rules)
    }

    /// Hold `next` behind the evaluation screen, or enter it directly when
    /// the delay is zero.
    fn evaluate(&mut self, next: FlowStep, trigger: Option<AnalyticsTrigger>) -> Transition {
        let delay_seconds = self.config.flow.evaluation_delay_seconds;
        if delay_seconds == 0 {
            self.enter(next);
            return self.applied(Outcome::Advanced { to: next }, trigger);
        }

        self.state.pending_step = Some(next);
        self.applied(
            Outcome::Evaluating {
                to: next,
                delay_seconds,
            },
            trigger,
        )
    }

    fn enter(&mut self, step: FlowStep) {
        self.state.current_step = step;
        if step == FlowStep::Counselling {
            self.state.counsellor = self
                .state
                .lead_category
                .and_then(|c| self.config.routing.counsellor_for(c))
                .map(str::to_string);
        }
    }

    fn applied(&self, outcome: Outcome, trigger: Option<AnalyticsTrigger>) -> Transition {
        Transition {
            outcome,
            category: self.state.lead_category,
            trigger,
            counsellor: self.state.counsellor.clone(),
        }
    }

    fn ignored(&self, reason: impl Into<String>) -> Transition {
        let reason = reason.into();
        tracing::debug!(session_id = %self.session_id, reason = %reason, "transition ignored");
        Transition {
            outcome: Outcome::Ignored { reason },
            category: self.state.lead_category,
            trigger: None,
            counsellor: self.state.counsellor.clone(),
        }
    }
}
