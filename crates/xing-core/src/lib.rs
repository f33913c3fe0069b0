//! xing-core - Level-crossing control core
//!
//! Each crossing is a [`CrossingStateMachine`] behind its own lock inside a
//! [`CrossingRegistry`]. [`RailwaySystem`] owns the registry and processes
//! operator commands; [`Scheduler`] ticks it to move trains and fire timed
//! transitions.

pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod machine;
pub mod maintenance;
pub mod models;
pub mod registry;
pub mod scheduler;
pub mod system;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MaintenanceThresholds, SystemConfig, TimingConfig, WearConfig};
pub use error::{CrossingError, CrossingResult};
pub use events::{EventEntry, EventKind, EventLog, EventSink, Severity};
pub use machine::CrossingStateMachine;
pub use maintenance::{Component, MaintenancePredictor, MaintenanceWarning};
pub use models::*;
pub use registry::CrossingRegistry;
pub use scheduler::Scheduler;
pub use system::RailwaySystem;
