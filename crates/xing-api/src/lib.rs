//! xing-api - HTTP/JSON API for the level-crossing control system
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use xing_api::{create_router, AppState};
//! use xing_core::{RailwaySystem, SystemConfig};
//!
//! let system = Arc::new(RailwaySystem::new(SystemConfig::default()));
//! let router = create_router(AppState::new(system));
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Upper bound on any single request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Create the crossing API router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // System views
        .route("/api/system/status", get(handlers::status::get_status))
        .route(
            "/api/system/crossings/{crossing_id}",
            get(handlers::status::get_crossing),
        )
        .route(
            "/api/system/next-actions",
            get(handlers::status::get_next_actions),
        )
        .route(
            "/api/system/diagnostics",
            get(handlers::diagnostics::get_diagnostics),
        )
        // Commands
        .route(
            "/api/system/command",
            post(handlers::command::execute_command),
        )
        .route("/api/system/reset", post(handlers::reset::reset_system))
        // Event log
        .route("/api/system/logs", get(handlers::logs::get_logs))
        .route("/api/system/logs/clear", post(handlers::logs::clear_logs))
        // Middleware
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
