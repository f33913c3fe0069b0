//! HTTP request handlers for the crossing API

pub mod command;
pub mod diagnostics;
pub mod logs;
pub mod reset;
pub mod status;
