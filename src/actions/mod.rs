//! Form action handling.
//!
//! Each action reads a JSON document from stdin, applies it to the stored
//! session, and prints one JSON document describing the transition.

pub mod input;
pub mod output;
pub mod runner;

pub use input::{parse_input, ActionInput};
pub use output::{to_json, to_json_pretty, StartOutput, StepOutput};
pub use runner::{ActionRunner, ActionType};
