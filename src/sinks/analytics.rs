//! Analytics facts emitted when a step completes.
//!
//! Events are appended to `analytics.log` under the leadflow home in JSONL
//! format, one event per completed step.

use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::JsonlLog;
use crate::core::{AnalyticsTrigger, FormFillerType, LeadCategory};
use crate::error::Result;

/// Schema version for analytics events.
///
/// Increment when the event schema changes in a breaking way.
pub const ANALYTICS_SCHEMA_VERSION: u8 = 1;

/// One analytics fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsEvent {
    /// Schema version for forward compatibility.
    pub v: u8,
    /// Timestamp of the event.
    pub ts: DateTime<Utc>,
    /// Session that completed the step.
    pub session_id: String,
    /// Which step completed.
    pub trigger: AnalyticsTrigger,
    /// Category at the time of the event.
    pub lead_category: Option<LeadCategory>,
    /// Who filled the form.
    pub form_filler_type: Option<FormFillerType>,
}

impl AnalyticsEvent {
    /// Create an event with the current timestamp.
    pub fn new(
        session_id: impl Into<String>,
        trigger: AnalyticsTrigger,
        lead_category: Option<LeadCategory>,
        form_filler_type: Option<FormFillerType>,
    ) -> Self {
        Self::with_timestamp(
            session_id,
            trigger,
            lead_category,
            form_filler_type,
            Utc::now(),
        )
    }

    /// Create an event with a specific timestamp (for testing).
    pub fn with_timestamp(
        session_id: impl Into<String>,
        trigger: AnalyticsTrigger,
        lead_category: Option<LeadCategory>,
        form_filler_type: Option<FormFillerType>,
        ts: DateTime<Utc>,
    ) -> Self {
        Self {
            v: ANALYTICS_SCHEMA_VERSION,
            ts,
            session_id: session_id.into(),
            trigger,
            lead_category,
            form_filler_type,
        }
    }
}

/// Receiver of analytics facts.
pub trait AnalyticsSink: Send + Sync {
    /// Record one event.
    fn emit(&self, event: &AnalyticsEvent) -> Result<()>;
}

impl<T: AnalyticsSink + ?Sized> AnalyticsSink for Arc<T> {
    fn emit(&self, event: &AnalyticsEvent) -> Result<()> {
        (**self).emit(event)
    }
}

/// JSONL analytics log.
#[derive(Debug, Clone)]
pub struct JsonlAnalyticsSink {
    log: JsonlLog,
}

impl JsonlAnalyticsSink {
    /// Create a sink writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            log: JsonlLog::new(path),
        }
    }

    /// Read all events from the log.
    pub fn read_all(&self) -> Result<Vec<AnalyticsEvent>> {
        self.log.read_all()
    }

    /// Count the number of events in the log.
    pub fn count(&self) -> Result<usize> {
        self.log.count()
    }

    /// Get the path to the log file.
    pub fn path(&self) -> &Path {
        self.log.path()
    }
}

impl AnalyticsSink for JsonlAnalyticsSink {
    fn emit(&self, event: &AnalyticsEvent) -> Result<()> {
        self.log.append(event)
    }
}

/// In-memory analytics sink for tests.
#[derive(Debug, Default)]
pub struct MemoryAnalyticsSink {
    events: RwLock<Vec<AnalyticsEvent>>,
}

impl MemoryAnalyticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every event received so far.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Triggers received so far, in order.
    pub fn triggers(&self) -> Vec<AnalyticsTrigger> {
        self.events().iter().map(|e| e.trigger).collect()
    }
}

impl AnalyticsSink for MemoryAnalyticsSink {
    fn emit(&self, event: &AnalyticsEvent) -> Result<()> {
        self.events
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_event() -> AnalyticsEvent {
        AnalyticsEvent::new(
            "session-123",
            AnalyticsTrigger::Step2Complete,
            Some(LeadCategory::LumL1),
            Some(FormFillerType::Parent),
        )
    }

    #[test]
    fn test_event_serialization() {
        let ts = DateTime::parse_from_rfc3339("2026-01-15T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let event = AnalyticsEvent::with_timestamp(
            "session-123",
            AnalyticsTrigger::Step1Complete,
            None,
            Some(FormFillerType::Student),
            ts,
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["v"], 1);
        assert_eq!(json["session_id"], "session-123");
        assert_eq!(json["trigger"], "step1_complete");
        assert!(json["lead_category"].is_null());
        assert_eq!(json["form_filler_type"], "student");
    }

    #[test]
    fn test_jsonl_sink_appends() {
        let temp = TempDir::new().unwrap();
        let sink = JsonlAnalyticsSink::new(temp.path().join("analytics.log"));

        sink.emit(&sample_event()).unwrap();
        sink.emit(&sample_event()).unwrap();

        assert_eq!(sink.count().unwrap(), 2);
        let events = sink.read_all().unwrap();
        assert_eq!(events[0].lead_category, Some(LeadCategory::LumL1));
        assert_eq!(events[1].trigger, AnalyticsTrigger::Step2Complete);
    }

    #[test]
    fn test_jsonl_sink_path() {
        let sink = JsonlAnalyticsSink::new("/tmp/leadflow/analytics.log");
        assert_eq!(sink.path(), Path::new("/tmp/leadflow/analytics.log"));
    }

    #[test]
    fn test_memory_sink_collects() {
        let sink = MemoryAnalyticsSink::new();
        sink.emit(&sample_event()).unwrap();

        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.triggers(), vec![AnalyticsTrigger::Step2Complete]);
    }

    #[test]
    fn test_arc_sink_forwards() {
        let sink = Arc::new(MemoryAnalyticsSink::new());
        let shared: Arc<MemoryAnalyticsSink> = Arc::clone(&sink);

        shared.emit(&sample_event()).unwrap();
        assert_eq!(sink.events().len(), 1);
    }
}
