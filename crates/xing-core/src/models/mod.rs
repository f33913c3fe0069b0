//! Shared data models for crossing control

mod command;
mod sensor;
mod snapshot;
mod state;
mod weather;

pub use command::*;
pub use sensor::*;
pub use snapshot::*;
pub use state::*;
pub use weather::*;
