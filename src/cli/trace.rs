//! Trace command.
//!
//! Replays a session's timeline: each recorded event with the step and
//! category the session was at when it happened. Filters narrow the view
//! to a single event type or to one of the groups below.

use serde::Serialize;

use crate::core::{EventType, FlowStep, LeadCategory, LeadSession, TraceEvent, ALL_EVENT_TYPES};
use crate::storage::SessionStore;

/// Options for the trace command.
#[derive(Debug, Clone, Default)]
pub struct TraceOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Keep only the most recent N events.
    pub limit: Option<usize>,
    /// Event type or group to keep.
    pub event_type: Option<String>,
}

/// What `--event-type` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFilter {
    /// One event type.
    Exact(EventType),
    /// Step changes, evaluation screens and submission.
    Navigation,
    /// Category computations.
    Categories,
    /// Ignored transitions and failed sink deliveries.
    Problems,
}

impl TraceFilter {
    /// Parse a filter name. Event types use their wire names; dashes are
    /// accepted in place of underscores.
    pub fn parse(raw: &str) -> Option<Self> {
        let name = raw.trim().to_ascii_lowercase().replace('-', "_");
        match name.as_str() {
            "navigation" | "steps" => Some(Self::Navigation),
            "categories" | "category" => Some(Self::Categories),
            "problems" => Some(Self::Problems),
            _ => ALL_EVENT_TYPES
                .iter()
                .copied()
                .find(|event| event.as_str() == name)
                .map(Self::Exact),
        }
    }

    fn matches(&self, event: EventType) -> bool {
        match self {
            Self::Exact(wanted) => event == *wanted,
            Self::Navigation => event.is_navigation(),
            Self::Categories => event == EventType::Categorized,
            Self::Problems => event.is_problem(),
        }
    }
}

/// Where the session stands now.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub status: String,
    pub category: Option<LeadCategory>,
    pub ignored_transitions: usize,
    pub sink_failures: usize,
}

impl From<&LeadSession> for TraceSummary {
    fn from(session: &LeadSession) -> Self {
        let count = |wanted: EventType| {
            session
                .trace
                .iter()
                .filter(|event| event.event_type == wanted)
                .count()
        };
        Self {
            status: session.flow.status_label(),
            category: session.flow.lead_category,
            ignored_transitions: count(EventType::TransitionIgnored),
            sink_failures: count(EventType::SinkFailed),
        }
    }
}

/// One timeline entry.
#[derive(Debug, Clone, Serialize)]
pub struct TraceEventInfo {
    pub timestamp: String,
    pub event_type: EventType,
    pub step: FlowStep,
    pub category: Option<LeadCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&TraceEvent> for TraceEventInfo {
    fn from(event: &TraceEvent) -> Self {
        Self {
            timestamp: event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event_type: event.event_type,
            step: event.step,
            category: event.category,
            details: event.details.clone(),
        }
    }
}

/// Output format for the trace command.
#[derive(Debug, Clone, Serialize)]
pub struct TraceOutput {
    pub success: bool,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TraceSummary>,
    /// Events shown.
    pub count: usize,
    /// Events recorded.
    pub total: usize,
    pub events: Vec<TraceEventInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TraceOutput {
    fn failure(session_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            session_id: session_id.to_string(),
            summary: None,
            count: 0,
            total: 0,
            events: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The trace command implementation.
pub struct TraceCommand<S: SessionStore> {
    store: S,
}

impl<S: SessionStore> TraceCommand<S> {
    /// Create a new trace command.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Run the trace command.
    pub fn run(&self, session_id: &str, options: &TraceOptions) -> TraceOutput {
        let filter = match options.event_type.as_deref().map(TraceFilter::parse) {
            Some(None) => {
                return TraceOutput::failure(
                    session_id,
                    format!(
                        "Unknown event filter: {}",
                        options.event_type.as_deref().unwrap_or_default()
                    ),
                )
            }
            Some(filter) => filter,
            None => None,
        };

        let session = match self.store.require(session_id) {
            Ok(session) => session,
            Err(e) => return TraceOutput::failure(session_id, e.to_string()),
        };

        let mut events: Vec<TraceEventInfo> = session
            .trace
            .iter()
            .filter(|event| filter.map_or(true, |f| f.matches(event.event_type)))
            .map(TraceEventInfo::from)
            .collect();

        if let Some(limit) = options.limit {
            let skip = events.len().saturating_sub(limit);
            events.drain(..skip);
        }

        TraceOutput {
            success: true,
            session_id: session.id.clone(),
            summary: Some(TraceSummary::from(&session)),
            count: events.len(),
            total: session.trace.len(),
            events,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &TraceOutput, options: &TraceOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            format_timeline(output)
        }
    }
}

fn format_timeline(output: &TraceOutput) -> String {
    if !output.success {
        return format!(
            "Trace failed: {}\n",
            output.error.as_deref().unwrap_or("unknown error")
        );
    }

    let mut lines = Vec::new();
    if let Some(summary) = &output.summary {
        lines.push(format!(
            "Session {}: {}, category {}",
            output.session_id,
            summary.status,
            category_label(summary.category)
        ));
        if summary.ignored_transitions > 0 || summary.sink_failures > 0 {
            lines.push(format!(
                "  {} ignored transition(s), {} sink failure(s)",
                summary.ignored_transitions, summary.sink_failures
            ));
        }
    }

    if output.events.is_empty() {
        lines.push("No matching events".to_string());
        return lines.join("\n") + "\n";
    }

    lines.push(format!("Events ({}/{}):", output.count, output.total));
    for event in &output.events {
        let mut line = format!(
            "[{}] step {:<3} {:<10} {}",
            event.timestamp,
            event.step.as_str(),
            category_label(event.category),
            event.event_type
        );
        if let Some(details) = &event.details {
            line.push_str(": ");
            line.push_str(details);
        }
        lines.push(line);
    }

    lines.join("\n") + "\n"
}

fn category_label(category: Option<LeadCategory>) -> &'static str {
    category.map_or("-", |c| c.as_str())
}
