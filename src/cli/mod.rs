//! CLI commands for leadflow.
//!
//! `start` and `step` go through [`crate::actions::ActionRunner`]; the
//! commands here are the inspection side:
//! - **categorize**: route a standalone profile
//! - **record**: print a session's current record
//! - **sessions**, **debug**, **trace**: developer views of stored sessions

pub mod categorize;
pub mod debug;
pub mod record;
pub mod sessions;
pub mod trace;

pub use categorize::{CategorizeCommand, CategorizeOptions, CategorizeOutput};
pub use debug::{DebugCommand, DebugOptions, DebugOutput, Diagnostics};
pub use record::{RecordCommand, RecordOutput};
pub use sessions::{SessionsCommand, SessionsOptions, SessionsOutput};
pub use trace::{TraceCommand, TraceFilter, TraceOptions, TraceOutput};
