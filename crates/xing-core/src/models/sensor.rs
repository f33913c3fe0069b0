//! Sensor health flags and fault codes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Health of each train-detection sensor (true = healthy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorHealth {
    pub ir: bool,
    pub ultrasonic: bool,
    pub vibration: bool,
    pub rfid: bool,
}

impl Default for SensorHealth {
    fn default() -> Self {
        Self {
            ir: true,
            ultrasonic: true,
            vibration: true,
            rfid: true,
        }
    }
}

impl SensorHealth {
    /// Number of sensors currently reporting a fault
    pub fn faulty_count(&self) -> usize {
        [self.ir, self.ultrasonic, self.vibration, self.rfid]
            .iter()
            .filter(|healthy| !**healthy)
            .count()
    }

    pub fn all_healthy(&self) -> bool {
        self.faulty_count() == 0
    }
}

/// Active fault code carried by a crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultCode {
    IrSensorFault,
    VibrationSensorFault,
    BarrierStuck,
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FaultCode::IrSensorFault => "IR_SENSOR_FAULT",
            FaultCode::VibrationSensorFault => "VIBRATION_SENSOR_FAULT",
            FaultCode::BarrierStuck => "BARRIER_STUCK",
        })
    }
}

/// Fault kinds accepted by the `inject_fault` command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    #[default]
    SensorIr,
    SensorVib,
    BarrierStuck,
}

impl FaultType {
    /// Fault code appended when this fault is injected
    pub fn code(self) -> FaultCode {
        match self {
            FaultType::SensorIr => FaultCode::IrSensorFault,
            FaultType::SensorVib => FaultCode::VibrationSensorFault,
            FaultType::BarrierStuck => FaultCode::BarrierStuck,
        }
    }

    /// Mark the affected sensor (if any) unhealthy
    pub fn apply_to(self, sensors: &mut SensorHealth) {
        match self {
            FaultType::SensorIr => sensors.ir = false,
            FaultType::SensorVib => sensors.vibration = false,
            FaultType::BarrierStuck => {}
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FaultType::SensorIr => "sensor_ir",
            FaultType::SensorVib => "sensor_vib",
            FaultType::BarrierStuck => "barrier_stuck",
        }
    }
}
