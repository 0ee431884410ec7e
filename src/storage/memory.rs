//! In-memory session storage for testing.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::LeadSession;
use crate::error::Result;
use crate::storage::SessionStore;

/// In-memory session store.
///
/// Sessions are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, LeadSession>>,
}

impl MemorySessionStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of sessions in the store.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, LeadSession>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, LeadSession>> {
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, id: &str) -> Result<Option<LeadSession>> {
        Ok(self.read().get(id).cloned())
    }

    fn put(&self, session: &LeadSession) -> Result<()> {
        self.write().insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn list(&self, limit: usize) -> Result<Vec<LeadSession>> {
        let mut result: Vec<LeadSession> = self.read().values().cloned().collect();
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        result.truncate(limit);
        Ok(result)
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.write().remove(id);
        Ok(())
    }
}
