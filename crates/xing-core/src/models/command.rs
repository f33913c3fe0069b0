//! Operator commands and their results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CrossingState, FaultType, WeatherCondition};
use crate::error::{CrossingError, CrossingResult};

/// Train speed assumed when an approach omits it (km/h)
pub const DEFAULT_TRAIN_SPEED: f64 = 60.0;
/// Train distance assumed when an approach omits it (m)
pub const DEFAULT_TRAIN_DISTANCE: f64 = 200.0;

/// Train parameters supplied with an `approach` command
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachParams {
    pub train_speed: f64,
    pub train_distance: f64,
    pub weather: Option<WeatherCondition>,
}

/// A validated operator command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Train approaching; parameters are only applied when supplied
    Approach(Option<ApproachParams>),
    Countdown,
    BarrierDown,
    TrainPass,
    Reset,
    /// Toggle the system-wide emergency
    Emergency,
    Maintenance,
    InjectFault(FaultType),
    ClearFaults,
}

/// Loosely typed parameter bag as sent by clients
#[derive(Debug, Default, Deserialize)]
struct RawParams {
    train_speed: Option<f64>,
    train_distance: Option<f64>,
    weather: Option<String>,
    fault_type: Option<FaultType>,
}

impl Command {
    /// Parse a command name and its JSON parameters
    pub fn parse(name: &str, params: &Value) -> CrossingResult<Self> {
        let supplied = match params {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => {
                return Err(CrossingError::InvalidParameter(
                    "parameters must be an object".to_string(),
                ))
            }
        };
        let raw: RawParams = if supplied {
            serde_json::from_value(params.clone())
                .map_err(|e| CrossingError::InvalidParameter(e.to_string()))?
        } else {
            RawParams::default()
        };

        let command = match name {
            "approach" => Command::Approach(supplied.then(|| ApproachParams {
                train_speed: raw.train_speed.unwrap_or(DEFAULT_TRAIN_SPEED),
                train_distance: raw.train_distance.unwrap_or(DEFAULT_TRAIN_DISTANCE),
                // Unrecognised weather falls back to clear skies
                weather: raw
                    .weather
                    .map(|w| w.parse().unwrap_or(WeatherCondition::Clear)),
            })),
            "countdown" => Command::Countdown,
            "barrier_down" => Command::BarrierDown,
            "train_pass" => Command::TrainPass,
            "reset" => Command::Reset,
            "emergency" => Command::Emergency,
            "maintenance" => Command::Maintenance,
            "inject_fault" => Command::InjectFault(raw.fault_type.unwrap_or_default()),
            "clear_faults" => Command::ClearFaults,
            other => return Err(CrossingError::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }

    /// Command name as accepted by [`Command::parse`]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Approach(_) => "approach",
            Command::Countdown => "countdown",
            Command::BarrierDown => "barrier_down",
            Command::TrainPass => "train_pass",
            Command::Reset => "reset",
            Command::Emergency => "emergency",
            Command::Maintenance => "maintenance",
            Command::InjectFault(_) => "inject_fault",
            Command::ClearFaults => "clear_faults",
        }
    }
}

/// Result of processing a command against a crossing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    pub new_state: CrossingState,
    pub state_description: String,
    pub next_action: String,
    /// Why the command had no effect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandOutcome {
    pub fn new(success: bool, state: CrossingState) -> Self {
        Self {
            success,
            new_state: state,
            state_description: state.description().to_string(),
            next_action: state.next_action().to_string(),
            error: None,
        }
    }

    pub fn rejected(state: CrossingState, err: &CrossingError) -> Self {
        Self {
            error: Some(err.to_string()),
            ..Self::new(false, state)
        }
    }
}
