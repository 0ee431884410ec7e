//! leadflow - lead categorization and form flow engine
//!
//! Classifies admissions leads from the answers collected by a multi-step
//! form, decides which step the form shows next, and hands analytics facts
//! and session records to their sinks once each decision is made.

pub mod actions;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod record;
pub mod sinks;
pub mod storage;
pub mod util;

pub use actions::{ActionInput, ActionRunner, ActionType, StartOutput, StepOutput};
pub use config::Config;
pub use core::{
    categorize, categorize_with, recategorize, Flow, FlowState, FlowStep, LeadCategory,
    LeadProfile, LeadSession, Outcome, Transition,
};
pub use error::{LeadflowError, Result};
pub use record::{FunnelStage, SessionRecord};
pub use sinks::{AnalyticsEvent, AnalyticsSink, RecordSink};
pub use storage::{FileSessionStore, MemorySessionStore, SessionStore};

// CLI commands
pub use cli::{CategorizeCommand, DebugCommand, RecordCommand, SessionsCommand, TraceCommand};
