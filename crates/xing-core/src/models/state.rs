//! Crossing states, the transition table, and per-state outputs

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating state of a single level crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrossingState {
    /// No train approaching
    Idle,
    /// Train detected, warning active
    Warning,
    /// Counting down to barrier closure
    Countdown,
    /// Barriers lowered, road closed
    BarrierDown,
    /// Train occupying the crossing
    TrainPassing,
    /// Manual intervention required
    Emergency,
    /// Out of service for maintenance
    Maintenance,
}

impl CrossingState {
    /// Every state, in declaration order
    pub const ALL: [CrossingState; 7] = [
        CrossingState::Idle,
        CrossingState::Warning,
        CrossingState::Countdown,
        CrossingState::BarrierDown,
        CrossingState::TrainPassing,
        CrossingState::Emergency,
        CrossingState::Maintenance,
    ];

    /// The nominal train cycle shown as a timeline
    pub const CYCLE: [CrossingState; 6] = [
        CrossingState::Idle,
        CrossingState::Warning,
        CrossingState::Countdown,
        CrossingState::BarrierDown,
        CrossingState::TrainPassing,
        CrossingState::Idle,
    ];

    /// States that may be entered from this one
    pub fn allowed_targets(self) -> &'static [CrossingState] {
        use CrossingState::*;
        match self {
            Idle => &[Warning, Emergency, Maintenance],
            Warning => &[Countdown, Idle, Emergency],
            Countdown => &[BarrierDown, Emergency],
            BarrierDown => &[TrainPassing, Emergency],
            TrainPassing => &[Idle, Emergency],
            Emergency => &[Idle],
            Maintenance => &[Idle],
        }
    }

    /// Whether `target` is in the transition table for this state
    pub fn can_transition_to(self, target: CrossingState) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Whether a train is expected to be moving through this state
    pub fn train_active(self) -> bool {
        matches!(
            self,
            CrossingState::Warning
                | CrossingState::Countdown
                | CrossingState::BarrierDown
                | CrossingState::TrainPassing
        )
    }

    /// Upper-case wire name
    pub fn as_str(self) -> &'static str {
        match self {
            CrossingState::Idle => "IDLE",
            CrossingState::Warning => "WARNING",
            CrossingState::Countdown => "COUNTDOWN",
            CrossingState::BarrierDown => "BARRIER_DOWN",
            CrossingState::TrainPassing => "TRAIN_PASSING",
            CrossingState::Emergency => "EMERGENCY",
            CrossingState::Maintenance => "MAINTENANCE",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            CrossingState::Idle => "Crossing is clear and ready",
            CrossingState::Warning => "Train detected - warning activated",
            CrossingState::Countdown => "Countdown to barrier closure",
            CrossingState::BarrierDown => "Barriers lowered - road closed",
            CrossingState::TrainPassing => "Train is passing through",
            CrossingState::Emergency => "EMERGENCY - Manual intervention required",
            CrossingState::Maintenance => "Maintenance in progress",
        }
    }

    /// What the operator should expect to happen next
    pub fn next_action(self) -> &'static str {
        match self {
            CrossingState::Idle => "Train detection",
            CrossingState::Warning => "Start countdown",
            CrossingState::Countdown => "Lower barriers",
            CrossingState::BarrierDown => "Train passage",
            CrossingState::TrainPassing => "Raise barriers",
            CrossingState::Emergency => "Manual reset",
            CrossingState::Maintenance => "Complete maintenance",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            CrossingState::Idle => "Idle State",
            CrossingState::Warning => "Warning Activated",
            CrossingState::Countdown => "Countdown",
            CrossingState::BarrierDown => "Barriers Down",
            CrossingState::TrainPassing => "Train Passing",
            CrossingState::Emergency => "Emergency",
            CrossingState::Maintenance => "Maintenance",
        }
    }

    /// Barrier, lights and alarm to drive on entry to this state
    pub fn outputs(self) -> CrossingOutputs {
        let (barrier, lights, alarm) = match self {
            CrossingState::Idle => (BarrierPosition::Up, TrafficLights::GREEN, AlarmMode::Silent),
            CrossingState::Warning => {
                (BarrierPosition::Up, TrafficLights::YELLOW, AlarmMode::SlowBeep)
            }
            CrossingState::Countdown => {
                (BarrierPosition::Up, TrafficLights::RED, AlarmMode::FastBeep)
            }
            CrossingState::BarrierDown => {
                (BarrierPosition::Down, TrafficLights::RED, AlarmMode::Continuous)
            }
            CrossingState::TrainPassing => {
                (BarrierPosition::Down, TrafficLights::RED, AlarmMode::Silent)
            }
            CrossingState::Emergency => (
                BarrierPosition::Up,
                TrafficLights::RED_YELLOW,
                AlarmMode::Continuous,
            ),
            CrossingState::Maintenance => {
                (BarrierPosition::Up, TrafficLights::OFF, AlarmMode::Silent)
            }
        };
        CrossingOutputs {
            barrier,
            lights,
            alarm,
        }
    }
}

impl fmt::Display for CrossingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical barrier arm position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BarrierPosition {
    Up,
    Down,
}

/// Audible alarm pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmMode {
    Silent,
    SlowBeep,
    FastBeep,
    Continuous,
}

/// Road-facing traffic light lamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficLights {
    pub red: bool,
    pub yellow: bool,
    pub green: bool,
}

impl TrafficLights {
    pub const OFF: TrafficLights = TrafficLights {
        red: false,
        yellow: false,
        green: false,
    };
    pub const GREEN: TrafficLights = TrafficLights {
        green: true,
        ..Self::OFF
    };
    pub const YELLOW: TrafficLights = TrafficLights {
        yellow: true,
        ..Self::OFF
    };
    pub const RED: TrafficLights = TrafficLights {
        red: true,
        ..Self::OFF
    };
    pub const RED_YELLOW: TrafficLights = TrafficLights {
        red: true,
        yellow: true,
        green: false,
    };
}

/// Outputs derived from a state, applied together on every entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossingOutputs {
    pub barrier: BarrierPosition,
    pub lights: TrafficLights,
    pub alarm: AlarmMode,
}
