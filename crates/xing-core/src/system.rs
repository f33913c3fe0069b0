//! Railway system context: command processing and system-wide views
//!
//! [`RailwaySystem`] is the single owned entry point shared by the HTTP layer
//! and the scheduler. It holds the current [`CrossingRegistry`] behind an
//! `RwLock<Arc<_>>`; readers clone the `Arc` and work against that registry,
//! so a reset swaps the whole crossing set without half-reset states.
//!
//! Lock order: emergency flag, then crossing, then event log.

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::clock::{Clock, SystemClock};
use crate::config::SystemConfig;
use crate::error::{CrossingError, CrossingResult};
use crate::events::{EventKind, EventLog, EventSink};
use crate::machine::{CrossingStateMachine, TRAIN_AT_CROSSING};
use crate::models::{
    Command, CommandOutcome, CrossingSnapshot, CrossingState, DiagnosticsReport, GlobalState,
    NextAction, SystemStatistics, SystemStatus,
};
use crate::registry::{health_score, CrossingRegistry};
use crate::scheduler;

pub struct RailwaySystem {
    config: SystemConfig,
    clock: Arc<dyn Clock>,
    events: Arc<EventLog>,
    registry: RwLock<Arc<CrossingRegistry>>,
}

impl RailwaySystem {
    pub fn new(config: SystemConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a system whose dwell times come from `clock`
    pub fn with_clock(config: SystemConfig, clock: Arc<dyn Clock>) -> Self {
        let events = Arc::new(EventLog::new(config.event_log_capacity));
        let registry = CrossingRegistry::new(&config, clock.clone(), events.clone());

        info!(
            crossings = config.crossing_count,
            seed = ?config.seed,
            "Railway system initialized"
        );
        events.record(
            EventKind::SystemStart,
            None,
            &format!("{} crossings", config.crossing_count),
        );

        Self {
            config,
            clock,
            events,
            registry: RwLock::new(Arc::new(registry)),
        }
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Current registry; stays valid even if a reset swaps in a new one
    pub fn registry(&self) -> Arc<CrossingRegistry> {
        self.registry.read().clone()
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Validate and apply an operator command.
    ///
    /// Unknown crossings, unknown commands and malformed parameters are
    /// returned as errors and leave statistics untouched. A refused
    /// transition is an `Ok` outcome with `success == false`.
    pub fn process_command(
        &self,
        crossing_id: usize,
        command: &str,
        params: &Value,
    ) -> CrossingResult<CommandOutcome> {
        let registry = self.registry();
        let crossing = registry.get(crossing_id)?;
        let command = Command::parse(command, params)?;

        let details = match params {
            Value::Null => format!("{}()", command.name()),
            params => format!("{}({})", command.name(), params),
        };
        self.events
            .record(EventKind::UserCommand, Some(crossing_id), &details);

        let outcome = match command {
            Command::Emergency => self.toggle_emergency(&registry, crossing_id)?,
            command => {
                let mut machine = crossing.lock();
                apply_command(&registry, &mut machine, command)
            }
        };

        registry.record_outcome(outcome.success);
        debug!(
            crossing_id,
            command = command.name(),
            success = outcome.success,
            state = %outcome.new_state,
            "Command processed"
        );
        Ok(outcome)
    }

    /// Flip the process-wide emergency flag and broadcast it to every crossing
    fn toggle_emergency(
        &self,
        registry: &CrossingRegistry,
        crossing_id: usize,
    ) -> CrossingResult<CommandOutcome> {
        let mut emergency = registry.emergency.lock();
        *emergency = !*emergency;
        let activating = *emergency;

        for crossing in registry.iter() {
            let mut machine = crossing.lock();
            let target = if activating {
                CrossingState::Emergency
            } else {
                CrossingState::Idle
            };
            // Maintenance cannot enter EMERGENCY; COUNTDOWN and BARRIER_DOWN cannot leave for IDLE
            if machine.state().can_transition_to(target) {
                machine.transition(target)?;
            }
        }

        if activating {
            error!("Emergency activated on all crossings");
            self.events
                .record(EventKind::Emergency, None, "system-wide emergency");
        } else {
            info!("Emergency cleared");
            self.events.record(EventKind::EmergencyClear, None, "");
        }
        drop(emergency);

        let state = registry.get(crossing_id)?.lock().state();
        Ok(CommandOutcome::new(true, state))
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Snapshot of every crossing plus global flags and statistics
    pub fn get_status(&self) -> SystemStatus {
        let registry = self.registry();
        let mut tally = Tally::default();
        let crossings: Vec<CrossingSnapshot> = registry
            .iter()
            .map(|c| {
                let machine = c.lock();
                let snapshot = machine.snapshot();
                tally.add(&machine, snapshot.maintenance_warnings.len());
                snapshot
            })
            .collect();

        let active_crossings = crossings
            .iter()
            .filter(|c| !matches!(c.state, CrossingState::Idle | CrossingState::Maintenance))
            .count();
        let maintenance = crossings
            .iter()
            .any(|c| c.state == CrossingState::Maintenance);

        let global_state = GlobalState {
            emergency: registry.emergency_active(),
            maintenance,
            weather: *registry.weather.lock(),
            uptime: registry.uptime.load(Ordering::Relaxed),
            system_health: *registry.system_health.lock(),
            total_trains: registry.total_trains.load(Ordering::Relaxed),
            active_crossings,
            statistics: tally.statistics(&registry),
        };

        SystemStatus {
            crossings,
            global_state,
        }
    }

    pub fn crossing_snapshot(&self, crossing_id: usize) -> CrossingResult<CrossingSnapshot> {
        let registry = self.registry();
        let snapshot = registry.get(crossing_id)?.lock().snapshot();
        Ok(snapshot)
    }

    /// What every crossing is waiting for, keyed by id
    pub fn get_next_actions(&self) -> BTreeMap<usize, NextAction> {
        let registry = self.registry();
        registry
            .iter()
            .map(|c| {
                let machine = c.lock();
                (machine.id(), machine.next_action())
            })
            .collect()
    }

    /// Health report with faults, per-crossing status and recommendations
    pub fn diagnostics(&self) -> DiagnosticsReport {
        let registry = self.registry();
        let mut tally = Tally::default();
        let mut active_faults = 0;
        let mut sensor_faults = 0;
        let crossing_status: Vec<_> = registry
            .iter()
            .map(|c| {
                let machine = c.lock();
                let status = machine.diagnostics();
                tally.add(&machine, status.maintenance_warnings.len());
                active_faults += status.faults.len();
                sensor_faults += status.sensor_health.faulty_count();
                status
            })
            .collect();

        let system_health = health_score(active_faults, sensor_faults);
        *registry.system_health.lock() = system_health;

        let statistics = tally.statistics(&registry);
        let recommendations = vec![
            if active_faults == 0 {
                "System operating normally".to_string()
            } else {
                format!("Check {} fault(s) in crossings", active_faults)
            },
            if sensor_faults == 0 {
                "All sensors functional".to_string()
            } else {
                format!("Investigate {} sensor fault(s)", sensor_faults)
            },
            if statistics.maintenance_warnings == 0 {
                "No maintenance required".to_string()
            } else {
                format!("{} maintenance warning(s)", statistics.maintenance_warnings)
            },
        ];

        DiagnosticsReport {
            system_health,
            active_faults,
            sensor_faults,
            statistics,
            crossing_status,
            recommendations,
            timestamp: Utc::now(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Replace every crossing and all statistics with a fresh set
    pub fn reset_system(&self) {
        let registry = CrossingRegistry::new(&self.config, self.clock.clone(), self.events.clone());
        *self.registry.write() = Arc::new(registry);
        info!(crossings = self.config.crossing_count, "System reset");
        self.events.record(EventKind::SystemReset, None, "");
    }

    /// One scheduler pass over every crossing, in id order.
    ///
    /// A failure or panic on one crossing is logged and the pass moves on.
    pub fn tick(&self) {
        self.tick_with(scheduler::advance_crossing);
    }

    fn tick_with<F>(&self, advance: F)
    where
        F: Fn(&mut CrossingStateMachine) -> CrossingResult<Option<CrossingState>>,
    {
        let registry = self.registry();
        registry.uptime.fetch_add(1, Ordering::Relaxed);

        for crossing in registry.iter() {
            let mut machine = crossing.lock();
            let id = machine.id();
            let failure = match panic::catch_unwind(AssertUnwindSafe(|| advance(&mut *machine))) {
                Ok(Ok(Some(state))) => {
                    debug!(crossing_id = id, %state, "Auto-advanced");
                    None
                }
                Ok(Ok(None)) => None,
                Ok(Err(err)) => Some(err.to_string()),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            if let Some(message) = failure {
                error!(crossing_id = id, error = %message, "Tick failed for crossing");
                self.events
                    .record(EventKind::SystemError, Some(id), &message);
            }
        }

        let (faults, sensors) = registry.fault_totals();
        *registry.system_health.lock() = health_score(faults, sensors);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("panic while advancing crossing: {reason}")
}

/// Effect of a single-crossing command on a locked crossing
fn apply_command(
    registry: &CrossingRegistry,
    machine: &mut CrossingStateMachine,
    command: Command,
) -> CommandOutcome {
    let result = match command {
        Command::Approach(params) => {
            let target = CrossingState::Warning;
            if let (Some(params), true) = (params, machine.state().can_transition_to(target)) {
                machine.set_train(&params);
                if let Some(weather) = params.weather {
                    *registry.weather.lock() = weather;
                }
            }
            machine
                .transition(target)
                .map(|()| machine.set_train_position(0.0))
        }
        Command::Countdown => machine.transition(CrossingState::Countdown),
        Command::BarrierDown => machine.transition(CrossingState::BarrierDown),
        Command::TrainPass => machine.transition(CrossingState::TrainPassing).map(|()| {
            machine.set_train_position(TRAIN_AT_CROSSING);
            registry.total_trains.fetch_add(1, Ordering::Relaxed);
        }),
        Command::Reset => machine
            .transition(CrossingState::Idle)
            .map(|()| machine.clear_train()),
        Command::Maintenance => machine.transition(CrossingState::Maintenance),
        Command::InjectFault(fault) => {
            machine.inject_fault(fault);
            Ok(())
        }
        Command::ClearFaults => {
            machine.clear_faults();
            Ok(())
        }
        Command::Emergency => Err(CrossingError::Internal(
            "emergency is a system-wide command".to_string(),
        )),
    };

    match result {
        Ok(()) => CommandOutcome::new(true, machine.state()),
        Err(err) => CommandOutcome::rejected(machine.state(), &err),
    }
}

/// Per-crossing figures folded into [`SystemStatistics`]
#[derive(Default)]
struct Tally {
    emergency_events: usize,
    health_total: u64,
    components: usize,
    warnings: usize,
}

impl Tally {
    fn add(&mut self, machine: &CrossingStateMachine, warnings: usize) {
        self.emergency_events += machine.emergency_entries();
        for health in machine.maintenance().component_health().values() {
            self.health_total += u64::from(*health);
            self.components += 1;
        }
        self.warnings += warnings;
    }

    fn statistics(&self, registry: &CrossingRegistry) -> SystemStatistics {
        let successful = registry.successful_transitions.load(Ordering::Relaxed);
        let failed = registry.failed_transitions.load(Ordering::Relaxed);
        let attempts = successful + failed;
        let success_rate = if attempts == 0 {
            100.0
        } else {
            (successful as f64 / attempts as f64 * 1000.0).round() / 10.0
        };
        let average_health = if self.components == 0 {
            100.0
        } else {
            self.health_total as f64 / self.components as f64
        };

        SystemStatistics {
            total_operations: registry.total_operations.load(Ordering::Relaxed),
            successful_transitions: successful,
            failed_transitions: failed,
            emergency_events: self.emergency_events,
            average_health,
            success_rate,
            maintenance_warnings: self.warnings,
            last_updated: *registry.last_updated.lock(),
        }
    }
}
