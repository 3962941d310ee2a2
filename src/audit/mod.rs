//! ECS-shaped audit events.
//!
//! Every repository-backed request gets exactly one event: created before
//! any side effect, resolved once the outcome is known, emitted once.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Data-store client recorded as the dataset of database events
pub const DATABASE_DATASET: &str = "postgresql";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Alert,
    Event,
    Metric,
    State,
    PipelineError,
    Signal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Api,
    Authentication,
    Configuration,
    Database,
    Iam,
    Network,
    Session,
    Web,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Access,
    Admin,
    Allowed,
    Change,
    Connection,
    Creation,
    Deletion,
    Denied,
    End,
    Error,
    Info,
    Start,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Failure,
    Success,
    Unknown,
}

impl EventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventOutcome::Failure => "failure",
            EventOutcome::Success => "success",
            EventOutcome::Unknown => "unknown",
        }
    }
}

/// Syslog severity levels, serialized as their numeric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventSeverity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Serialize for EventSeverity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub category: Vec<EventCategory>,
    pub action: String,
    #[serde(rename = "type")]
    pub types: Vec<EventType>,
    pub outcome: EventOutcome,
    pub severity: EventSeverity,
    pub dataset: String,
    #[serde(rename = "@timestamp")]
    pub created_at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn create_event(
        categories: Vec<EventCategory>,
        action: impl Into<String>,
        dataset: impl Into<String>,
        types: Vec<EventType>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EventKind::Event,
            category: categories,
            action: action.into(),
            types,
            outcome: EventOutcome::Unknown,
            severity: EventSeverity::Informational,
            dataset: dataset.into(),
            created_at: Utc::now(),
        }
    }

    /// Event for a repository-backed operation
    pub fn database(action: impl Into<String>, types: Vec<EventType>) -> Self {
        Self::create_event(vec![EventCategory::Database], action, DATABASE_DATASET, types)
    }

    /// Same event with its final outcome; `decision` is appended to `type`
    pub fn with_outcome(mut self, outcome: EventOutcome, decision: EventType) -> Self {
        self.outcome = outcome;
        self.types.push(decision);
        self
    }

    pub fn last_type(&self) -> Option<EventType> {
        self.types.last().copied()
    }
}

/// Destination for finished audit events
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits events on the `audit` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        let types = serde_json::to_string(&event.types).unwrap_or_default();
        let category = serde_json::to_string(&event.category).unwrap_or_default();

        tracing::info!(
            target: "audit",
            {
                event.id = %event.id,
                event.kind = "event",
                event.category = %category,
                event.action = %event.action,
                "event.type" = %types,
                event.outcome = event.outcome.as_str(),
                event.severity = event.severity as u8,
                event.dataset = %event.dataset,
            },
            "{} {}",
            event.action,
            event.outcome.as_str(),
        );
    }
}

/// Keeps every recorded event in memory
#[derive(Debug, Default, Clone)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Holds the in-flight event of one request and hands it to the sink
/// exactly once, when the scope is dropped.
pub struct AuditScope {
    event: Option<AuditEvent>,
    sink: Arc<dyn AuditSink>,
}

impl AuditScope {
    pub fn begin(sink: Arc<dyn AuditSink>, event: AuditEvent) -> Self {
        Self { event: Some(event), sink }
    }

    pub fn resolve(&mut self, outcome: EventOutcome, decision: EventType) {
        self.event = self.event.take().map(|event| event.with_outcome(outcome, decision));
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        if let Some(event) = self.event.take() {
            self.sink.record(&event);
        }
    }
}
