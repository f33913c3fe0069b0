//! Predictive maintenance: operation counting, component wear and warnings

use std::collections::BTreeMap;
use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{MaintenanceThresholds, WearConfig};

/// Wearing component of a crossing installation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    BarrierMotor,
    TrafficLights,
    AlarmSystem,
    Sensors,
}

impl Component {
    pub const ALL: [Component; 4] = [
        Component::BarrierMotor,
        Component::TrafficLights,
        Component::AlarmSystem,
        Component::Sensors,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Component::BarrierMotor => "Barrier Motor",
            Component::TrafficLights => "Traffic Lights",
            Component::AlarmSystem => "Alarm System",
            Component::Sensors => "Sensors",
        }
    }
}

/// A maintenance finding, in the order produced by [`MaintenancePredictor::check`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceWarning {
    HighUsage { operations: u64 },
    ComponentUrgent { component: Component, health: u8 },
    ComponentAdvisory { component: Component },
    ActiveFaults { count: usize },
    FaultySensors { count: usize },
}

impl fmt::Display for MaintenanceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceWarning::HighUsage { operations } => {
                write!(f, "High usage ({} operations)", operations)
            }
            MaintenanceWarning::ComponentUrgent { component, health } => {
                write!(f, "{} at {}%", component.label(), health)
            }
            MaintenanceWarning::ComponentAdvisory { component } => {
                write!(f, "{} check soon", component.label())
            }
            MaintenanceWarning::ActiveFaults { count } => write!(f, "{} active fault(s)", count),
            MaintenanceWarning::FaultySensors { count } => {
                write!(f, "{} sensor(s) faulty", count)
            }
        }
    }
}

/// Health loss applied to one component by a single wear step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Degradation {
    pub component: Component,
    pub from: u8,
    pub to: u8,
}

/// Tracks usage and wear for one crossing
#[derive(Debug, Clone)]
pub struct MaintenancePredictor {
    component_health: BTreeMap<Component, u8>,
    operation_count: u64,
    operations_at_service: u64,
    wear: WearConfig,
    thresholds: MaintenanceThresholds,
    rng: StdRng,
}

impl MaintenancePredictor {
    /// Create a predictor; `seed` makes wear reproducible
    pub fn new(wear: WearConfig, thresholds: MaintenanceThresholds, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            component_health: Component::ALL.iter().map(|c| (*c, 100)).collect(),
            operation_count: 0,
            operations_at_service: 0,
            wear,
            thresholds,
            rng,
        }
    }

    pub fn component_health(&self) -> &BTreeMap<Component, u8> {
        &self.component_health
    }

    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    pub fn operations_since_service(&self) -> u64 {
        self.operation_count - self.operations_at_service
    }

    /// Count a completed transition and maybe wear one component
    pub fn record_operation(&mut self) -> Option<Degradation> {
        self.operation_count += 1;

        let probability = self.wear.probability.clamp(0.0, 1.0);
        if !self.rng.gen_bool(probability) {
            return None;
        }

        let component = *Component::ALL.choose(&mut self.rng)?;
        let low = self.wear.min_step.min(self.wear.max_step);
        let high = self.wear.min_step.max(self.wear.max_step);
        let step = self.rng.gen_range(low..=high);

        let health = self.component_health.entry(component).or_insert(100);
        let from = *health;
        let to = from.saturating_sub(step).max(self.wear.floor).min(from);
        *health = to;

        Some(Degradation {
            component,
            from,
            to,
        })
    }

    /// Service completed: every component back to full health
    pub fn complete_service(&mut self) {
        for health in self.component_health.values_mut() {
            *health = 100;
        }
        self.operations_at_service = self.operation_count;
    }

    /// Derive warnings from usage, wear, faults and sensors
    pub fn check(&self, active_faults: usize, faulty_sensors: usize) -> Vec<MaintenanceWarning> {
        let mut warnings = Vec::new();

        let operations = self.operations_since_service();
        if operations > self.thresholds.high_usage_operations {
            warnings.push(MaintenanceWarning::HighUsage { operations });
        }

        for (&component, &health) in &self.component_health {
            if health < self.thresholds.urgent_health {
                warnings.push(MaintenanceWarning::ComponentUrgent { component, health });
            } else if health < self.thresholds.advisory_health {
                warnings.push(MaintenanceWarning::ComponentAdvisory { component });
            }
        }

        if active_faults > 0 {
            warnings.push(MaintenanceWarning::ActiveFaults {
                count: active_faults,
            });
        }
        if faulty_sensors > 0 {
            warnings.push(MaintenanceWarning::FaultySensors {
                count: faulty_sensors,
            });
        }

        warnings
    }
}
