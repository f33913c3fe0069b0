//! Per-crossing finite state machine
//!
//! A [`CrossingStateMachine`] owns everything about one crossing: its state,
//! derived outputs, train data, sensor and fault flags, bounded history and
//! maintenance model. It holds no lock of its own; the registry wraps each
//! machine in a mutex so commands and scheduler ticks are serialized.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::{SystemConfig, TimingConfig};
use crate::error::{CrossingError, CrossingResult};
use crate::events::{EventKind, EventSink};
use crate::maintenance::{MaintenancePredictor, MaintenanceWarning};
use crate::models::{
    ApproachParams, CrossingDiagnostics, CrossingOutputs, CrossingSnapshot, CrossingState,
    FaultCode, FaultType, HistoryEntry, NextAction, SensorHealth, TimelineStep, WeatherCondition,
};

/// Train position when no train is present
pub const TRAIN_ABSENT: f64 = -100.0;
/// Train position at the crossing itself
pub const TRAIN_AT_CROSSING: f64 = 100.0;

/// History entries included in a status snapshot
const SNAPSHOT_HISTORY: usize = 5;

pub struct CrossingStateMachine {
    id: usize,
    state: CrossingState,
    previous_state: CrossingState,
    entered_at: Instant,
    last_state_change: DateTime<Utc>,
    outputs: CrossingOutputs,
    train_position: f64,
    train_speed: f64,
    train_distance: f64,
    weather: WeatherCondition,
    countdown: u32,
    sensor_health: SensorHealth,
    faults: Vec<FaultCode>,
    history: VecDeque<HistoryEntry>,
    history_capacity: usize,
    maintenance: MaintenancePredictor,
    timing: TimingConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl CrossingStateMachine {
    /// Create an idle crossing
    pub fn new(
        id: usize,
        config: &SystemConfig,
        clock: Arc<dyn Clock>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        let seed = config.seed.map(|s| s.wrapping_add(id as u64));
        let state = CrossingState::Idle;
        Self {
            id,
            state,
            previous_state: state,
            entered_at: clock.now(),
            last_state_change: Utc::now(),
            outputs: state.outputs(),
            train_position: TRAIN_ABSENT,
            train_speed: 0.0,
            train_distance: 0.0,
            weather: WeatherCondition::Clear,
            countdown: config.timing.countdown_base_secs,
            sensor_health: SensorHealth::default(),
            faults: Vec::new(),
            history: VecDeque::with_capacity(config.history_capacity),
            history_capacity: config.history_capacity.max(1),
            maintenance: MaintenancePredictor::new(
                config.wear.clone(),
                config.maintenance.clone(),
                seed,
            ),
            timing: config.timing.clone(),
            clock,
            events,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn state(&self) -> CrossingState {
        self.state
    }

    pub fn previous_state(&self) -> CrossingState {
        self.previous_state
    }

    pub fn outputs(&self) -> CrossingOutputs {
        self.outputs
    }

    pub fn train_position(&self) -> f64 {
        self.train_position
    }

    pub fn train_speed(&self) -> f64 {
        self.train_speed
    }

    pub fn train_distance(&self) -> f64 {
        self.train_distance
    }

    pub fn weather(&self) -> WeatherCondition {
        self.weather
    }

    pub fn countdown(&self) -> u32 {
        self.countdown
    }

    pub fn sensor_health(&self) -> SensorHealth {
        self.sensor_health
    }

    pub fn faults(&self) -> &[FaultCode] {
        &self.faults
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Retained history entries that entered EMERGENCY
    pub fn emergency_entries(&self) -> usize {
        self.history
            .iter()
            .filter(|h| h.to == CrossingState::Emergency)
            .count()
    }

    pub fn maintenance(&self) -> &MaintenancePredictor {
        &self.maintenance
    }

    pub fn operation_count(&self) -> u64 {
        self.maintenance.operation_count()
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Time spent in the current state
    pub fn dwell(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.entered_at)
    }

    /// Move to `target` if the transition table allows it.
    ///
    /// On refusal nothing about the crossing changes.
    pub fn transition(&mut self, target: CrossingState) -> CrossingResult<()> {
        let from = self.state;
        if !from.can_transition_to(target) {
            let err = CrossingError::InvalidTransition { from, to: target };
            warn!(crossing_id = self.id, %from, to = %target, "Rejected transition");
            self.events.record(
                EventKind::InvalidTransition,
                Some(self.id),
                &format!("{} -> {}", from, target),
            );
            return Err(err);
        }

        self.previous_state = from;
        self.state = target;
        self.entered_at = self.clock.now();
        self.last_state_change = Utc::now();

        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            from,
            to: target,
            timestamp: self.last_state_change,
            weather: self.weather,
        });

        self.apply_outputs();

        info!(crossing_id = self.id, %from, to = %target, "State changed");
        self.events.record(
            EventKind::StateChange,
            Some(self.id),
            &format!("{} -> {}", from, target),
        );
        if let Some(kind) = entry_event(from, target) {
            self.events.record(kind, Some(self.id), "");
        }

        if from == CrossingState::Maintenance && target == CrossingState::Idle {
            self.maintenance.complete_service();
            self.events
                .record(EventKind::MaintenanceComplete, Some(self.id), "");
        }

        if let Some(wear) = self.maintenance.record_operation() {
            debug!(
                crossing_id = self.id,
                component = ?wear.component,
                from = wear.from,
                to = wear.to,
                "Component degraded"
            );
            self.events.record(
                EventKind::ComponentDegraded,
                Some(self.id),
                &format!("{}: {}% -> {}%", wear.component.label(), wear.from, wear.to),
            );
        }

        Ok(())
    }

    /// Derive barrier, lights, alarm and countdown for the current state
    fn apply_outputs(&mut self) {
        self.outputs = self.state.outputs();
        match self.state {
            CrossingState::Idle => self.countdown = self.timing.countdown_base_secs,
            CrossingState::Warning | CrossingState::Countdown => {
                self.countdown = self.adjusted_countdown()
            }
            CrossingState::Emergency => self.train_position = TRAIN_ABSENT,
            CrossingState::BarrierDown
            | CrossingState::TrainPassing
            | CrossingState::Maintenance => {}
        }
    }

    /// Full countdown length under the current weather
    pub fn adjusted_countdown(&self) -> u32 {
        self.weather.adjust_secs(self.timing.countdown_base_secs)
    }

    /// Re-derive the countdown from dwell time; only meaningful in COUNTDOWN
    pub fn refresh_countdown(&mut self) -> u32 {
        if self.state == CrossingState::Countdown {
            let elapsed = u32::try_from(self.dwell().as_secs()).unwrap_or(u32::MAX);
            self.countdown = self.adjusted_countdown().saturating_sub(elapsed);
        }
        self.countdown
    }

    /// Estimated seconds until the train reaches the crossing
    pub fn calculate_arrival_time(&self) -> f64 {
        if self.train_speed <= 0.0 || self.train_distance <= 0.0 {
            return f64::INFINITY;
        }
        let speed_mps = self.train_speed * 1000.0 / 3600.0;
        self.train_distance / speed_mps
    }

    /// Whether the scheduler may progress this crossing
    pub fn can_advance(&self) -> bool {
        match self.state {
            CrossingState::Emergency | CrossingState::Maintenance => false,
            CrossingState::Countdown => self.countdown == 0,
            CrossingState::Warning => {
                self.calculate_arrival_time() <= self.timing.arrival_guard_secs
            }
            _ => true,
        }
    }

    /// Move an active train one tick closer; returns the new position
    pub fn advance_train(&mut self) -> f64 {
        if self.state.train_active() && self.train_position < TRAIN_AT_CROSSING {
            let step = (5.0 * self.train_speed / 100.0).clamp(2.0, 10.0);
            self.train_position = (self.train_position + step).min(TRAIN_AT_CROSSING);
        }
        self.train_position
    }

    pub fn set_train_position(&mut self, position: f64) {
        self.train_position = position;
    }

    /// Apply approach parameters, logging a weather change
    pub fn set_train(&mut self, params: &ApproachParams) {
        self.train_speed = params.train_speed;
        self.train_distance = params.train_distance;
        if let Some(weather) = params.weather {
            self.weather = weather;
            self.events
                .record(EventKind::WeatherChange, Some(self.id), weather.as_str());
        }
    }

    /// Forget the current train
    pub fn clear_train(&mut self) {
        self.train_position = TRAIN_ABSENT;
        self.train_speed = 0.0;
        self.train_distance = 0.0;
    }

    pub fn inject_fault(&mut self, fault: FaultType) {
        fault.apply_to(&mut self.sensor_health);
        let code = fault.code();
        if !self.faults.contains(&code) {
            self.faults.push(code);
        }
        warn!(crossing_id = self.id, fault = fault.as_str(), "Fault injected");
        self.events
            .record(EventKind::FaultInjected, Some(self.id), fault.as_str());
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
        self.sensor_health = SensorHealth::default();
        info!(crossing_id = self.id, "Faults cleared");
        self.events.record(EventKind::FaultCleared, Some(self.id), "");
    }

    pub fn check_maintenance(&self) -> Vec<MaintenanceWarning> {
        self.maintenance
            .check(self.faults.len(), self.sensor_health.faulty_count())
    }

    /// Nominal cycle annotated with where this crossing is
    pub fn timeline(&self) -> Vec<TimelineStep> {
        let progress = |state: CrossingState| {
            CrossingState::CYCLE[..5].iter().position(|s| *s == state)
        };
        let current = match self.state {
            CrossingState::Emergency | CrossingState::Maintenance => None,
            state => progress(state),
        };

        CrossingState::CYCLE
            .iter()
            .enumerate()
            .map(|(i, &state)| TimelineStep {
                step: i + 1,
                state,
                title: state.title().to_string(),
                description: state.description().to_string(),
                is_current: state == self.state,
                is_completed: matches!(
                    (current, progress(state)),
                    (Some(cur), Some(idx)) if idx < cur
                ),
            })
            .collect()
    }

    fn arrival_time_opt(&self) -> Option<f64> {
        let eta = self.calculate_arrival_time();
        eta.is_finite().then_some(eta)
    }

    fn warning_strings(&self) -> Vec<String> {
        self.check_maintenance()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub fn snapshot(&self) -> CrossingSnapshot {
        let skip = self.history.len().saturating_sub(SNAPSHOT_HISTORY);
        CrossingSnapshot {
            id: self.id,
            state: self.state,
            state_description: self.state.description().to_string(),
            next_action: self.state.next_action().to_string(),
            barrier: self.outputs.barrier,
            train_position: self.train_position,
            train_speed: self.train_speed,
            train_distance: self.train_distance,
            arrival_time: self.arrival_time_opt(),
            weather: self.weather,
            countdown: self.countdown,
            alarm: self.outputs.alarm,
            traffic_lights: self.outputs.lights,
            sensor_health: self.sensor_health,
            faults: self.faults.clone(),
            state_history: self.history.iter().skip(skip).cloned().collect(),
            state_timeline: self.timeline(),
            last_update: self.last_state_change,
            operation_count: self.operation_count(),
            component_health: self.maintenance.component_health().clone(),
            maintenance_warnings: self.warning_strings(),
        }
    }

    pub fn next_action(&self) -> NextAction {
        NextAction {
            crossing_id: self.id,
            current_state: self.state,
            state_description: self.state.description().to_string(),
            next_action: self.state.next_action().to_string(),
            countdown: (self.state == CrossingState::Countdown).then_some(self.countdown),
            estimated_time: self.arrival_time_opt(),
            state_timeline: self.timeline(),
            can_advance: self.can_advance(),
        }
    }

    pub fn diagnostics(&self) -> CrossingDiagnostics {
        CrossingDiagnostics {
            id: self.id,
            state: self.state,
            faults: self.faults.clone(),
            sensor_health: self.sensor_health,
            component_health: self.maintenance.component_health().clone(),
            operation_count: self.operation_count(),
            maintenance_warnings: self.warning_strings(),
        }
    }
}

/// State-specific event raised after a successful transition
fn entry_event(from: CrossingState, to: CrossingState) -> Option<EventKind> {
    match to {
        CrossingState::Warning => Some(EventKind::TrainApproach),
        CrossingState::Countdown => Some(EventKind::CountdownStart),
        CrossingState::BarrierDown => Some(EventKind::BarrierDown),
        CrossingState::TrainPassing => Some(EventKind::TrainPass),
        CrossingState::Emergency => Some(EventKind::Emergency),
        CrossingState::Maintenance => Some(EventKind::MaintenanceMode),
        CrossingState::Idle if from != CrossingState::Idle => Some(EventKind::Reset),
        CrossingState::Idle => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::WearConfig;
    use crate::events::EventLog;
    use crate::models::{AlarmMode, BarrierPosition, TrafficLights};

    fn machine_with(config: SystemConfig) -> (CrossingStateMachine, Arc<ManualClock>, Arc<EventLog>) {
        let clock = Arc::new(ManualClock::new());
        let events = Arc::new(EventLog::new(100));
        let machine = CrossingStateMachine::new(0, &config, clock.clone(), events.clone());
        (machine, clock, events)
    }

    fn machine() -> (CrossingStateMachine, Arc<ManualClock>, Arc<EventLog>) {
        machine_with(SystemConfig::default().with_seed(11))
    }

    fn storm_approach() -> ApproachParams {
        ApproachParams {
            train_speed: 100.0,
            train_distance: 500.0,
            weather: Some(WeatherCondition::Storm),
        }
    }

    #[test]
    fn starts_idle_with_barrier_up() {
        let (m, _, _) = machine();
        assert_eq!(m.state(), CrossingState::Idle);
        assert_eq!(m.outputs().barrier, BarrierPosition::Up);
        assert_eq!(m.outputs().lights, TrafficLights::GREEN);
        assert_eq!(m.train_position(), TRAIN_ABSENT);
        assert_eq!(m.countdown(), 10);
    }

    #[test]
    fn full_cycle_drives_outputs() {
        let (mut m, _, _) = machine();
        m.transition(CrossingState::Warning).unwrap();
        assert_eq!(m.outputs().alarm, AlarmMode::SlowBeep);
        m.transition(CrossingState::Countdown).unwrap();
        assert_eq!(m.outputs().lights, TrafficLights::RED);
        m.transition(CrossingState::BarrierDown).unwrap();
        assert_eq!(m.outputs().barrier, BarrierPosition::Down);
        m.transition(CrossingState::TrainPassing).unwrap();
        assert_eq!(m.outputs().alarm, AlarmMode::Silent);
        assert_eq!(m.outputs().barrier, BarrierPosition::Down);
        m.transition(CrossingState::Idle).unwrap();
        assert_eq!(m.outputs().barrier, BarrierPosition::Up);
        assert_eq!(m.previous_state(), CrossingState::TrainPassing);
        assert_eq!(m.operation_count(), 5);
    }

    #[test]
    fn rejected_transition_changes_nothing() {
        let (mut m, _, events) = machine();
        m.transition(CrossingState::Warning).unwrap();
        let before = m.snapshot();
        let history_before: Vec<_> = m.history().cloned().collect();

        let err = m.transition(CrossingState::TrainPassing).unwrap_err();
        assert_eq!(
            err,
            CrossingError::InvalidTransition {
                from: CrossingState::Warning,
                to: CrossingState::TrainPassing
            }
        );
        assert_eq!(m.snapshot(), before);
        assert_eq!(m.history().cloned().collect::<Vec<_>>(), history_before);
        assert!(events
            .recent(100)
            .iter()
            .any(|e| e.event == EventKind::InvalidTransition));
    }

    #[test]
    fn countdown_uses_weather_multiplier() {
        let (mut m, _, _) = machine();
        m.set_train(&storm_approach());
        m.transition(CrossingState::Warning).unwrap();
        m.transition(CrossingState::Countdown).unwrap();
        assert_eq!(m.countdown(), 18);

        let (mut clear, _, _) = machine();
        clear.transition(CrossingState::Warning).unwrap();
        clear.transition(CrossingState::Countdown).unwrap();
        assert_eq!(clear.countdown(), 10);
    }

    #[test]
    fn countdown_rederived_from_dwell() {
        let (mut m, clock, _) = machine();
        m.transition(CrossingState::Warning).unwrap();
        m.transition(CrossingState::Countdown).unwrap();

        clock.advance_secs(3.5);
        assert_eq!(m.refresh_countdown(), 7);
        assert!(!m.can_advance());

        clock.advance_secs(60.0);
        assert_eq!(m.refresh_countdown(), 0);
        assert!(m.can_advance());
    }

    #[test]
    fn arrival_time() {
        let (mut m, _, _) = machine();
        assert_eq!(m.calculate_arrival_time(), f64::INFINITY);

        m.set_train(&ApproachParams {
            train_speed: 0.0,
            train_distance: 500.0,
            weather: None,
        });
        assert!(m.calculate_arrival_time().is_infinite());

        m.set_train(&ApproachParams {
            train_speed: 100.0,
            train_distance: 0.0,
            weather: None,
        });
        assert!(m.calculate_arrival_time().is_infinite());

        m.set_train(&storm_approach());
        assert!((m.calculate_arrival_time() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn warning_guard_waits_for_close_train() {
        let (mut m, _, _) = machine();
        m.set_train(&storm_approach());
        m.transition(CrossingState::Warning).unwrap();
        assert!(!m.can_advance());

        m.set_train(&ApproachParams {
            train_speed: 100.0,
            train_distance: 100.0,
            weather: None,
        });
        assert!(m.can_advance());
    }

    #[test]
    fn emergency_clears_train_and_blocks_advance() {
        let (mut m, _, _) = machine();
        m.transition(CrossingState::Warning).unwrap();
        m.set_train_position(40.0);
        m.transition(CrossingState::Emergency).unwrap();
        assert_eq!(m.train_position(), TRAIN_ABSENT);
        assert_eq!(m.outputs().barrier, BarrierPosition::Up);
        assert_eq!(m.outputs().lights, TrafficLights::RED_YELLOW);
        assert!(!m.can_advance());
    }

    #[test]
    fn train_advances_only_while_active() {
        let (mut m, _, _) = machine();
        m.set_train(&ApproachParams {
            train_speed: 80.0,
            train_distance: 200.0,
            weather: None,
        });
        assert_eq!(m.advance_train(), TRAIN_ABSENT);

        m.transition(CrossingState::Warning).unwrap();
        m.set_train_position(0.0);
        assert_eq!(m.advance_train(), 4.0);

        m.set_train_position(99.0);
        assert_eq!(m.advance_train(), TRAIN_AT_CROSSING);
        assert_eq!(m.advance_train(), TRAIN_AT_CROSSING);
    }

    #[test]
    fn slow_train_moves_at_least_two() {
        let (mut m, _, _) = machine();
        m.transition(CrossingState::Warning).unwrap();
        m.set_train_position(0.0);
        assert_eq!(m.advance_train(), 2.0);
    }

    #[test]
    fn history_is_capped() {
        let (mut m, _, _) = machine();
        for _ in 0..8 {
            m.transition(CrossingState::Warning).unwrap();
            m.transition(CrossingState::Idle).unwrap();
        }
        assert_eq!(m.history().count(), 10);
        assert_eq!(m.snapshot().state_history.len(), 5);
    }

    #[test]
    fn faults_inject_and_clear_idempotently() {
        let (mut m, _, _) = machine();
        m.inject_fault(FaultType::SensorIr);
        m.inject_fault(FaultType::SensorIr);
        m.inject_fault(FaultType::BarrierStuck);
        assert_eq!(
            m.faults(),
            &[FaultCode::IrSensorFault, FaultCode::BarrierStuck]
        );
        assert_eq!(m.sensor_health().faulty_count(), 1);

        for _ in 0..2 {
            m.clear_faults();
            assert!(m.faults().is_empty());
            assert!(m.sensor_health().all_healthy());
        }
    }

    #[test]
    fn leaving_maintenance_restores_components() {
        let config = SystemConfig {
            wear: WearConfig {
                probability: 1.0,
                ..WearConfig::default()
            },
            ..SystemConfig::default()
        }
        .with_seed(4);
        let (mut m, _, _) = machine_with(config);
        for _ in 0..10 {
            m.transition(CrossingState::Warning).unwrap();
            m.transition(CrossingState::Idle).unwrap();
        }
        assert!(m.maintenance().component_health().values().any(|h| *h < 100));

        m.transition(CrossingState::Maintenance).unwrap();
        m.transition(CrossingState::Idle).unwrap();
        // The exit transition itself may wear one component by up to 3 points
        assert!(m.maintenance().component_health().values().all(|h| *h >= 97));
    }

    #[test]
    fn timeline_marks_progress() {
        let (mut m, _, _) = machine();
        m.transition(CrossingState::Warning).unwrap();
        m.transition(CrossingState::Countdown).unwrap();
        let timeline = m.timeline();
        assert_eq!(timeline.len(), 6);
        assert!(timeline[0].is_completed);
        assert!(timeline[1].is_completed);
        assert!(timeline[2].is_current);
        assert!(!timeline[2].is_completed);
        assert!(!timeline[3].is_completed);

        m.transition(CrossingState::Emergency).unwrap();
        assert!(m.timeline().iter().all(|s| !s.is_completed && !s.is_current));
    }
}
