//! Session storage traits for leadflow.

use std::sync::Arc;

use crate::core::LeadSession;
use crate::error::{LeadflowError, Result};

/// Longest accepted session id.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Trait for session storage backends.
pub trait SessionStore: Send + Sync {
    /// Retrieve a session by ID.
    ///
    /// Returns `Ok(None)` if the session doesn't exist.
    fn get(&self, id: &str) -> Result<Option<LeadSession>>;

    /// Create or replace a session.
    fn put(&self, session: &LeadSession) -> Result<()>;

    /// List up to `limit` sessions, most recently updated first.
    fn list(&self, limit: usize) -> Result<Vec<LeadSession>>;

    /// Delete a session. Deleting a missing session succeeds.
    fn delete(&self, id: &str) -> Result<()>;

    /// Check if a session exists.
    fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Retrieve a session, treating a missing one as an error.
    fn require(&self, id: &str) -> Result<LeadSession> {
        self.get(id)?
            .ok_or_else(|| LeadflowError::session_not_found(id))
    }
}

impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    fn get(&self, id: &str) -> Result<Option<LeadSession>> {
        (**self).get(id)
    }

    fn put(&self, session: &LeadSession) -> Result<()> {
        (**self).put(session)
    }

    fn list(&self, limit: usize) -> Result<Vec<LeadSession>> {
        (**self).list(limit)
    }

    fn delete(&self, id: &str) -> Result<()> {
        (**self).delete(id)
    }
}

/// Session ids become file names: ASCII alphanumerics, `-` and `_` only.
pub fn validate_session_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(LeadflowError::invalid_input("session_id is empty"));
    }
    if id.len() > MAX_SESSION_ID_LEN {
        return Err(LeadflowError::invalid_input(format!(
            "session_id longer than {} characters",
            MAX_SESSION_ID_LEN
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(LeadflowError::invalid_input(format!(
            "session_id contains invalid characters: {}",
            id
        )));
    }
    Ok(())
}
