//! Unified error types for leadflow with fail-open philosophy.
//!
//! Routing decisions never fail: the categorizer is total and the flow
//! controller turns illegal transitions into no-ops. The errors here cover
//! the infrastructure around the core (session files, action input, config,
//! sinks). When they occur we log warnings and return safe defaults rather
//! than letting them change or block a decision.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for leadflow operations.
#[derive(Error, Debug)]
pub enum LeadflowError {
    /// I/O errors from session file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Analytics or record sink failures.
    #[error("sink error: {message}")]
    Sink { message: String },

    /// JSON parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Action input that cannot be applied (unknown action, missing session id).
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Session not found in storage.
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },
}

/// A specialized Result type for leadflow operations.
pub type Result<T> = std::result::Result<T, LeadflowError>;

impl LeadflowError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a sink error.
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink {
            message: message.into(),
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<io::Error> for LeadflowError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for LeadflowError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Trait for fail-open error handling.
///
/// Log the error and continue with a safe default.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "{} (fail-open: using default)", context);
                T::default()
            }
        }
    }
}

/// Exit codes for the leadflow CLI.
pub mod exit_codes {
    /// The command completed.
    pub const OK: i32 = 0;

    /// The command failed (bad input, missing session, storage failure).
    pub const ERROR: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}
