//! Core types and logic for leadflow.
//!
//! This module contains the lead profile, the categorization rules, the
//! form flow state machine and the session state they operate on.

pub mod categorizer;
pub mod category;
pub mod flow;
pub mod profile;
pub mod state;

pub use categorizer::{categorize, categorize_masters, categorize_with, recategorize};
pub use category::{LeadCategory, UnknownCategory, ALL_CATEGORIES};
pub use flow::{Flow, Outcome, Transition};
pub use profile::{
    ApplicationPreparation, ContactDetails, CurriculumType, FormFillerType, Geography, Grade,
    LeadProfile, PartialFundingApproach, ScholarshipRequirement, StrongProfileIntent,
    SupportLevel, TargetUniversities, MAX_GPA, MAX_PERCENTAGE,
};
pub use state::{
    AcademicTrack, AnalyticsTrigger, EventType, FlowState, FlowStep, LeadSession, TraceEvent,
    ALL_EVENT_TYPES,
};
