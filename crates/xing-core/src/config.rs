//! Crossing system configuration
//!
//! Every field has a default so a partial TOML table (or none at all) yields a
//! working four-crossing system.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Number of crossings created at start and on every reset
    #[serde(default = "default_crossing_count")]
    pub crossing_count: usize,
    /// Scheduler tick period in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Maximum entries kept in each crossing's state history
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Maximum entries kept in the event log
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
    /// Seed for component wear; each crossing uses `seed + id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub wear: WearConfig,
    #[serde(default)]
    pub maintenance: MaintenanceThresholds,
}

fn default_crossing_count() -> usize {
    4
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_history_capacity() -> usize {
    10
}

fn default_event_log_capacity() -> usize {
    100
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            crossing_count: default_crossing_count(),
            tick_interval_ms: default_tick_interval_ms(),
            history_capacity: default_history_capacity(),
            event_log_capacity: default_event_log_capacity(),
            seed: None,
            timing: TimingConfig::default(),
            wear: WearConfig::default(),
            maintenance: MaintenanceThresholds::default(),
        }
    }
}

impl SystemConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Same configuration with a fixed wear seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// =============================================================================
// Timing
// =============================================================================

/// Dwell times driving scheduler auto-advance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Countdown length before the weather multiplier, in seconds
    #[serde(default = "default_countdown_base")]
    pub countdown_base_secs: u32,
    /// Minimum time in WARNING before counting down
    #[serde(default = "default_warning_dwell")]
    pub warning_dwell_secs: f64,
    /// Minimum time in BARRIER_DOWN before the train may pass
    #[serde(default = "default_barrier_dwell")]
    pub barrier_dwell_secs: f64,
    /// Minimum time in TRAIN_PASSING before returning to IDLE
    #[serde(default = "default_passing_dwell")]
    pub passing_dwell_secs: f64,
    /// WARNING only progresses once the train is this close (seconds away)
    #[serde(default = "default_arrival_guard")]
    pub arrival_guard_secs: f64,
}

fn default_countdown_base() -> u32 {
    10
}

fn default_warning_dwell() -> f64 {
    3.0
}

fn default_barrier_dwell() -> f64 {
    2.0
}

fn default_passing_dwell() -> f64 {
    3.0
}

fn default_arrival_guard() -> f64 {
    5.0
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            countdown_base_secs: default_countdown_base(),
            warning_dwell_secs: default_warning_dwell(),
            barrier_dwell_secs: default_barrier_dwell(),
            passing_dwell_secs: default_passing_dwell(),
            arrival_guard_secs: default_arrival_guard(),
        }
    }
}

// =============================================================================
// Wear and maintenance
// =============================================================================

/// Stochastic component wear applied on each completed transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WearConfig {
    /// Chance (0..=1) that a transition wears one component
    #[serde(default = "default_wear_probability")]
    pub probability: f64,
    #[serde(default = "default_wear_min")]
    pub min_step: u8,
    #[serde(default = "default_wear_max")]
    pub max_step: u8,
    /// Health never drops below this percentage
    #[serde(default = "default_wear_floor")]
    pub floor: u8,
}

fn default_wear_probability() -> f64 {
    0.1
}

fn default_wear_min() -> u8 {
    1
}

fn default_wear_max() -> u8 {
    3
}

fn default_wear_floor() -> u8 {
    50
}

impl Default for WearConfig {
    fn default() -> Self {
        Self {
            probability: default_wear_probability(),
            min_step: default_wear_min(),
            max_step: default_wear_max(),
            floor: default_wear_floor(),
        }
    }
}

/// Thresholds for maintenance warnings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceThresholds {
    /// Operations since last service above which usage is flagged
    #[serde(default = "default_high_usage")]
    pub high_usage_operations: u64,
    /// Component health below this is urgent
    #[serde(default = "default_urgent_health")]
    pub urgent_health: u8,
    /// Component health below this needs a check soon
    #[serde(default = "default_advisory_health")]
    pub advisory_health: u8,
}

fn default_high_usage() -> u64 {
    10
}

fn default_urgent_health() -> u8 {
    80
}

fn default_advisory_health() -> u8 {
    90
}

impl Default for MaintenanceThresholds {
    fn default() -> Self {
        Self {
            high_usage_operations: default_high_usage(),
            urgent_health: default_urgent_health(),
            advisory_health: default_advisory_health(),
        }
    }
}
