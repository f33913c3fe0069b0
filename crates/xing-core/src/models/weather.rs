//! Weather conditions and their timing multipliers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Environmental condition at a crossing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Rain,
    Fog,
    Storm,
}

impl WeatherCondition {
    /// Scalar applied to base warning and countdown durations
    pub fn multiplier(self) -> f64 {
        match self {
            WeatherCondition::Clear => 1.0,
            WeatherCondition::Rain => 1.3,
            WeatherCondition::Fog => 1.5,
            WeatherCondition::Storm => 1.8,
        }
    }

    /// Scale a base duration in seconds, rounded to whole seconds
    pub fn adjust_secs(self, base_secs: u32) -> u32 {
        (f64::from(base_secs) * self.multiplier()).round() as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WeatherCondition::Clear => "CLEAR",
            WeatherCondition::Rain => "RAIN",
            WeatherCondition::Fog => "FOG",
            WeatherCondition::Storm => "STORM",
        }
    }
}

impl fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeatherCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CLEAR" => Ok(WeatherCondition::Clear),
            "RAIN" => Ok(WeatherCondition::Rain),
            "FOG" => Ok(WeatherCondition::Fog),
            "STORM" => Ok(WeatherCondition::Storm),
            _ => Err(format!("Unknown weather condition: {}", s)),
        }
    }
}
