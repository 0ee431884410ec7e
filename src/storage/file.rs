//! File-based session storage.
//!
//! Sessions are stored as JSON files in `~/.leadflow/sessions/`.
//! Atomic writes are achieved via temp file + rename.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use crate::config::sessions_dir;
use crate::core::LeadSession;
use crate::error::{LeadflowError, Result};
use crate::storage::{validate_session_id, SessionStore};

/// File-based session storage.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    /// Directory where session files are stored.
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    /// Create a store in the default directory
    /// (`$LEADFLOW_HOME/sessions/` or `~/.leadflow/sessions/`).
    pub fn new() -> Result<Self> {
        let dir = sessions_dir().ok_or_else(|| {
            LeadflowError::config("could not determine sessions directory (no home directory)")
        })?;
        Self::with_dir(dir)
    }

    /// Create a store in a custom directory, creating it if needed.
    pub fn with_dir(sessions_dir: impl Into<PathBuf>) -> Result<Self> {
        let sessions_dir = sessions_dir.into();

        if !sessions_dir.exists() {
            fs::create_dir_all(&sessions_dir)
                .map_err(|e| LeadflowError::storage(&sessions_dir, e))?;
        }

        Ok(Self { sessions_dir })
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!("{}.json", id))
    }

    fn temp_path(&self, id: &str) -> PathBuf {
        self.sessions_dir.join(format!(".{}.json.tmp", id))
    }

    fn atomic_write(&self, session: &LeadSession) -> Result<()> {
        let final_path = self.session_path(&session.id);
        let temp_path = self.temp_path(&session.id);

        let json = serde_json::to_string_pretty(session)?;

        {
            let mut file =
                fs::File::create(&temp_path).map_err(|e| LeadflowError::storage(&temp_path, e))?;
            file.write_all(json.as_bytes())
                .map_err(|e| LeadflowError::storage(&temp_path, e))?;
            file.sync_all()
                .map_err(|e| LeadflowError::storage(&temp_path, e))?;
        }

        // Atomic on POSIX
        fs::rename(&temp_path, &final_path).map_err(|e| LeadflowError::storage(&final_path, e))?;

        tracing::debug!(session_id = %session.id, path = %final_path.display(), "session saved");
        Ok(())
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, id: &str) -> Result<Option<LeadSession>> {
        validate_session_id(id)?;
        let path = self.session_path(id);

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| LeadflowError::storage(&path, e))?;
        let session: LeadSession = serde_json::from_str(&content)?;

        Ok(Some(session))
    }

    fn put(&self, session: &LeadSession) -> Result<()> {
        validate_session_id(&session.id)?;
        self.atomic_write(session)
    }

    fn list(&self, limit: usize) -> Result<Vec<LeadSession>> {
        if !self.sessions_dir.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();

        let entries = fs::read_dir(&self.sessions_dir)
            .map_err(|e| LeadflowError::storage(&self.sessions_dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| LeadflowError::storage(&self.sessions_dir, e))?;
            let path = entry.path();

            // Skip non-JSON files and temp files
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            if path
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(true)
            {
                continue;
            }

            let parsed = fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|content| {
                    serde_json::from_str::<LeadSession>(&content).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(session) => sessions.push(session),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "skipping unreadable session file");
                }
            }
        }

        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sessions.truncate(limit);

        Ok(sessions)
    }

    fn delete(&self, id: &str) -> Result<()> {
        validate_session_id(id)?;
        let path = self.session_path(id);

        if path.exists() {
            fs::remove_file(&path).map_err(|e| LeadflowError::storage(&path, e))?;
        }

        let temp_path = self.temp_path(id);
        if temp_path.exists() {
            let _ = fs::remove_file(&temp_path);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FormFillerType, LeadCategory, LeadProfile};
    use crate::storage::traits::tests::test_session_store_crud;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn create_test_store() -> (FileSessionStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::with_dir(dir.path()).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_session_store_crud() {
        let (store, _dir) = create_test_store();
        test_session_store_crud(&store);
    }

    #[test]
    fn test_with_dir_creates_directory() {
        let dir = TempDir::new().unwrap();
        let sessions_path = dir.path().join("sessions");

        assert!(!sessions_path.exists());
        let _store = FileSessionStore::with_dir(&sessions_path).unwrap();
        assert!(sessions_path.is_dir());
    }

    #[test]
    fn test_put_and_get_preserves_profile() {
        let (store, _dir) = create_test_store();

        let mut session = LeadSession::new("test-1");
        session.profile = LeadProfile::new()
            .with_filler(FormFillerType::Parent)
            .with_gpa(8.2);
        session.flow.lead_category = Some(LeadCategory::LumL1);
        store.put(&session).unwrap();

        let retrieved = store.get("test-1").unwrap().unwrap();
        assert_eq!(retrieved, session);
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let (store, _dir) = create_test_store();

        assert!(matches!(
            store.get("../escape"),
            Err(LeadflowError::InvalidInput { .. })
        ));
        assert!(store.put(&LeadSession::new("a/b")).is_err());
        assert!(store.delete("..").is_err());
    }

    #[test]
    fn test_corrupted_category_is_sanitized_on_load() {
        let (store, dir) = create_test_store();

        let mut session = LeadSession::new("legacy");
        session.flow.lead_category = Some(LeadCategory::Bch);
        store.put(&session).unwrap();

        let path = dir.path().join("legacy.json");
        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.replace("\"bch\"", "\"Gold-Tier\"")).unwrap();

        let loaded = store.get("legacy").unwrap().unwrap();
        assert_eq!(loaded.flow.lead_category, Some(LeadCategory::Nurture));
    }

    #[test]
    fn test_list_orders_by_updated_at() {
        let (store, _dir) = create_test_store();

        for (id, age) in [("old", 300), ("newest", 0), ("middle", 60)] {
            let mut session = LeadSession::new(id);
            session.updated_at = Utc::now() - Duration::seconds(age);
            store.put(&session).unwrap();
        }

        let ids: Vec<String> = store.list(10).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["newest", "middle", "old"]);
        assert_eq!(store.list(1).unwrap().len(), 1);
    }

    #[test]
    fn test_temp_file_cleaned_up() {
        let (store, _dir) = create_test_store();

        store.put(&LeadSession::new("test-temp")).unwrap();
        assert!(!store.temp_path("test-temp").exists());
    }

    #[test]
    fn test_list_ignores_temp_and_invalid_files() {
        let (store, dir) = create_test_store();

        store.put(&LeadSession::new("valid")).unwrap();
        fs::write(dir.path().join(".temp.json.tmp"), "{}").unwrap();
        fs::write(dir.path().join("invalid.json"), "not valid json").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let sessions = store.list(10).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "valid");
    }
}
