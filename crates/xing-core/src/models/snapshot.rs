//! Read-only views handed to external consumers

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AlarmMode, BarrierPosition, CrossingState, FaultCode, SensorHealth, TrafficLights,
    WeatherCondition,
};
use crate::maintenance::Component;

/// One recorded state change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub from: CrossingState,
    pub to: CrossingState,
    pub timestamp: DateTime<Utc>,
    pub weather: WeatherCondition,
}

/// A step of the nominal train cycle, annotated with progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineStep {
    pub step: usize,
    pub state: CrossingState,
    pub title: String,
    pub description: String,
    pub is_current: bool,
    pub is_completed: bool,
}

/// Full snapshot of one crossing, taken under its lock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingSnapshot {
    pub id: usize,
    pub state: CrossingState,
    pub state_description: String,
    pub next_action: String,
    pub barrier: BarrierPosition,
    pub train_position: f64,
    pub train_speed: f64,
    pub train_distance: f64,
    /// Seconds until arrival; absent when no train is inbound
    pub arrival_time: Option<f64>,
    pub weather: WeatherCondition,
    pub countdown: u32,
    pub alarm: AlarmMode,
    pub traffic_lights: TrafficLights,
    pub sensor_health: SensorHealth,
    pub faults: Vec<FaultCode>,
    pub state_history: Vec<HistoryEntry>,
    pub state_timeline: Vec<TimelineStep>,
    pub last_update: DateTime<Utc>,
    pub operation_count: u64,
    pub component_health: BTreeMap<Component, u8>,
    pub maintenance_warnings: Vec<String>,
}

/// Process-wide command and health statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatistics {
    pub total_operations: u64,
    pub successful_transitions: u64,
    pub failed_transitions: u64,
    pub emergency_events: usize,
    pub average_health: f64,
    pub success_rate: f64,
    pub maintenance_warnings: usize,
    pub last_updated: DateTime<Utc>,
}

/// System-wide flags and aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalState {
    pub emergency: bool,
    pub maintenance: bool,
    pub weather: WeatherCondition,
    pub uptime: u64,
    pub system_health: f64,
    pub total_trains: u64,
    pub active_crossings: usize,
    pub statistics: SystemStatistics,
}

/// Response of `get_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub crossings: Vec<CrossingSnapshot>,
    pub global_state: GlobalState,
}

/// What each crossing is waiting for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextAction {
    pub crossing_id: usize,
    pub current_state: CrossingState,
    pub state_description: String,
    pub next_action: String,
    /// Remaining countdown, only while counting down
    pub countdown: Option<u32>,
    pub estimated_time: Option<f64>,
    pub state_timeline: Vec<TimelineStep>,
    pub can_advance: bool,
}

/// Per-crossing health section of the diagnostics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossingDiagnostics {
    pub id: usize,
    pub state: CrossingState,
    pub faults: Vec<FaultCode>,
    pub sensor_health: SensorHealth,
    pub component_health: BTreeMap<Component, u8>,
    pub operation_count: u64,
    pub maintenance_warnings: Vec<String>,
}

/// Response of `diagnostics`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub system_health: f64,
    pub active_faults: usize,
    pub sensor_faults: usize,
    pub statistics: SystemStatistics,
    pub crossing_status: Vec<CrossingDiagnostics>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}
