//! Session record sink.
//!
//! Records are sent at every checkpoint and once more with
//! `is_submitted = true`. Resending an unchanged record is harmless: the
//! entry carries no timestamp of its own, so identical inputs produce
//! identical lines.

use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::JsonlLog;
use crate::error::Result;
use crate::record::SessionRecord;

/// One record line, keyed by session id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub session_id: String,
    #[serde(flatten)]
    pub record: SessionRecord,
}

/// Receiver of session records.
pub trait RecordSink: Send + Sync {
    /// Upsert the record for `session_id`.
    fn submit(&self, session_id: &str, record: &SessionRecord) -> Result<()>;
}

impl<T: RecordSink + ?Sized> RecordSink for Arc<T> {
    fn submit(&self, session_id: &str, record: &SessionRecord) -> Result<()> {
        (**self).submit(session_id, record)
    }
}

/// JSONL record log. The latest line per session id wins.
#[derive(Debug, Clone)]
pub struct JsonlRecordSink {
    log: JsonlLog,
}

impl JsonlRecordSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            log: JsonlLog::new(path),
        }
    }

    /// Read all entries in append order.
    pub fn read_all(&self) -> Result<Vec<RecordEntry>> {
        self.log.read_all()
    }

    /// Most recent record for a session.
    pub fn latest(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        Ok(self
            .read_all()?
            .into_iter()
            .rev()
            .find(|entry| entry.session_id == session_id)
            .map(|entry| entry.record))
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        self.log.path()
    }
}

impl RecordSink for JsonlRecordSink {
    fn submit(&self, session_id: &str, record: &SessionRecord) -> Result<()> {
        self.log.append(&RecordEntry {
            session_id: session_id.to_string(),
            record: record.clone(),
        })
    }
}

/// In-memory record sink for tests.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    entries: RwLock<Vec<RecordEntry>>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry received so far.
    pub fn entries(&self) -> Vec<RecordEntry> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recent record for a session.
    pub fn latest(&self, session_id: &str) -> Option<SessionRecord> {
        self.entries()
            .into_iter()
            .rev()
            .find(|entry| entry.session_id == session_id)
            .map(|entry| entry.record)
    }
}

impl RecordSink for MemoryRecordSink {
    fn submit(&self, session_id: &str, record: &SessionRecord) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordEntry {
                session_id: session_id.to_string(),
                record: record.clone(),
            });
        Ok(())
    }
}
