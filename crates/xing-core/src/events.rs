//! Operational event sink and the bounded in-memory event log

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Kind of operational event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    SystemStart,
    SystemReset,
    UserCommand,
    StateChange,
    InvalidTransition,
    TrainApproach,
    CountdownStart,
    BarrierDown,
    TrainPass,
    Reset,
    Emergency,
    EmergencyClear,
    MaintenanceMode,
    MaintenanceComplete,
    WeatherChange,
    FaultInjected,
    FaultCleared,
    ComponentDegraded,
    SystemError,
}

impl EventKind {
    pub fn severity(self) -> Severity {
        match self {
            EventKind::Emergency | EventKind::SystemError => Severity::Danger,
            EventKind::InvalidTransition
            | EventKind::FaultInjected
            | EventKind::ComponentDegraded
            | EventKind::MaintenanceMode => Severity::Warning,
            EventKind::Reset
            | EventKind::EmergencyClear
            | EventKind::FaultCleared
            | EventKind::MaintenanceComplete => Severity::Success,
            _ => Severity::Info,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SystemStart => "SYSTEM_START",
            EventKind::SystemReset => "SYSTEM_RESET",
            EventKind::UserCommand => "USER_COMMAND",
            EventKind::StateChange => "STATE_CHANGE",
            EventKind::InvalidTransition => "INVALID_TRANSITION",
            EventKind::TrainApproach => "TRAIN_APPROACH",
            EventKind::CountdownStart => "COUNTDOWN_START",
            EventKind::BarrierDown => "BARRIER_DOWN",
            EventKind::TrainPass => "TRAIN_PASS",
            EventKind::Reset => "RESET",
            EventKind::Emergency => "EMERGENCY",
            EventKind::EmergencyClear => "EMERGENCY_CLEAR",
            EventKind::MaintenanceMode => "MAINTENANCE_MODE",
            EventKind::MaintenanceComplete => "MAINTENANCE_COMPLETE",
            EventKind::WeatherChange => "WEATHER_CHANGE",
            EventKind::FaultInjected => "FAULT_INJECTED",
            EventKind::FaultCleared => "FAULT_CLEARED",
            EventKind::ComponentDegraded => "COMPONENT_DEGRADED",
            EventKind::SystemError => "SYSTEM_ERROR",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dashboard severity of an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Danger,
    Warning,
    Info,
    Success,
}

/// Consumer of operational events.
///
/// Only the three fields are contractual; message wording is up to the sink.
pub trait EventSink: Send + Sync {
    fn record(&self, kind: EventKind, crossing: Option<usize>, details: &str);
}

/// One retained event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub event: EventKind,
    pub level: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossing: Option<usize>,
    pub details: String,
}

struct LogInner {
    entries: VecDeque<EventEntry>,
    next_id: u64,
}

/// Bounded ring of recent events, mirrored to `tracing`
pub struct EventLog {
    capacity: usize,
    inner: Mutex<LogInner>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(LogInner {
                entries: VecDeque::with_capacity(capacity.max(1)),
                next_id: 0,
            }),
        }
    }

    /// Newest `count` events, oldest first
    pub fn recent(&self, count: usize) -> Vec<EventEntry> {
        let inner = self.inner.lock();
        let skip = inner.entries.len().saturating_sub(count);
        inner.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every retained event, leaving a marker entry
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
        self.record(EventKind::SystemStart, None, "log cleared");
    }
}

impl EventSink for EventLog {
    fn record(&self, kind: EventKind, crossing: Option<usize>, details: &str) {
        let level = kind.severity();
        match level {
            Severity::Danger => {
                tracing::error!(event = %kind, crossing_id = ?crossing, details, "crossing event")
            }
            Severity::Warning => {
                tracing::warn!(event = %kind, crossing_id = ?crossing, details, "crossing event")
            }
            Severity::Info | Severity::Success => {
                tracing::info!(event = %kind, crossing_id = ?crossing, details, "crossing event")
            }
        }

        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        if inner.entries.len() == self.capacity {
            inner.entries.pop_front();
        }
        inner.entries.push_back(EventEntry {
            id,
            timestamp: Utc::now(),
            event: kind,
            level,
            crossing,
            details: details.to_string(),
        });
    }
}
