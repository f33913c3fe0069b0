//! Fixed set of crossings plus the counters that live and die with them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::config::SystemConfig;
use crate::error::{CrossingError, CrossingResult};
use crate::events::EventSink;
use crate::machine::CrossingStateMachine;
use crate::models::WeatherCondition;

/// Owns every crossing, indexed by id.
///
/// Each crossing sits behind its own mutex; different crossings never contend.
/// A system reset builds a fresh registry and swaps it in whole.
pub struct CrossingRegistry {
    crossings: Vec<Mutex<CrossingStateMachine>>,
    /// Process-wide emergency flag; taken before any crossing lock
    pub(crate) emergency: Mutex<bool>,
    pub(crate) weather: Mutex<WeatherCondition>,
    pub(crate) system_health: Mutex<f64>,
    pub(crate) last_updated: Mutex<DateTime<Utc>>,
    pub(crate) successful_transitions: AtomicU64,
    pub(crate) failed_transitions: AtomicU64,
    pub(crate) total_operations: AtomicU64,
    pub(crate) total_trains: AtomicU64,
    pub(crate) uptime: AtomicU64,
}

impl CrossingRegistry {
    pub fn new(config: &SystemConfig, clock: Arc<dyn Clock>, events: Arc<dyn EventSink>) -> Self {
        let crossings = (0..config.crossing_count)
            .map(|id| {
                Mutex::new(CrossingStateMachine::new(
                    id,
                    config,
                    clock.clone(),
                    events.clone(),
                ))
            })
            .collect();

        Self {
            crossings,
            emergency: Mutex::new(false),
            weather: Mutex::new(WeatherCondition::Clear),
            system_health: Mutex::new(100.0),
            last_updated: Mutex::new(Utc::now()),
            successful_transitions: AtomicU64::new(0),
            failed_transitions: AtomicU64::new(0),
            total_operations: AtomicU64::new(0),
            total_trains: AtomicU64::new(0),
            uptime: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.crossings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crossings.is_empty()
    }

    /// Look up a crossing; out-of-range ids are rejected
    pub fn get(&self, id: usize) -> CrossingResult<&Mutex<CrossingStateMachine>> {
        self.crossings
            .get(id)
            .ok_or(CrossingError::InvalidCrossing(id))
    }

    /// Crossings in id order
    pub fn iter(&self) -> impl Iterator<Item = &Mutex<CrossingStateMachine>> {
        self.crossings.iter()
    }

    pub fn emergency_active(&self) -> bool {
        *self.emergency.lock()
    }

    /// Count one processed command
    pub(crate) fn record_outcome(&self, success: bool) {
        if success {
            self.successful_transitions.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_transitions.fetch_add(1, Ordering::Relaxed);
        }
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        *self.last_updated.lock() = Utc::now();
    }

    /// Faults and unhealthy sensors summed over every crossing
    pub fn fault_totals(&self) -> (usize, usize) {
        self.crossings.iter().fold((0, 0), |(faults, sensors), c| {
            let c = c.lock();
            (
                faults + c.faults().len(),
                sensors + c.sensor_health().faulty_count(),
            )
        })
    }
}

/// `max(0, 100 - 5 * faults - 3 * faulty sensors)`
pub fn health_score(faults: usize, faulty_sensors: usize) -> f64 {
    let penalty = faults.saturating_mul(5).saturating_add(faulty_sensors.saturating_mul(3));
    100.0_f64 - (penalty.min(100) as f64)
}
