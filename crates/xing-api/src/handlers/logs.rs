//! Event log handlers
//!
//! - GET /api/system/logs?count=N - newest events, oldest first
//! - POST /api/system/logs/clear - empty the log

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use xing_core::EventEntry;

use crate::state::AppState;

const DEFAULT_LOG_COUNT: usize = 50;

#[derive(Debug, Deserialize, Default)]
pub struct LogQuery {
    pub count: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub items: Vec<EventEntry>,
    pub total_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearLogsResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/system/logs
pub async fn get_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Json<LogsResponse> {
    let events = state.system().events();
    let items = events.recent(query.count.unwrap_or(DEFAULT_LOG_COUNT));
    Json(LogsResponse {
        total_count: events.len(),
        items,
    })
}

/// POST /api/system/logs/clear
pub async fn clear_logs(State(state): State<AppState>) -> Json<ClearLogsResponse> {
    state.system().events().clear();
    tracing::info!("Event log cleared");
    Json(ClearLogsResponse {
        success: true,
        message: "Logs cleared".to_string(),
    })
}
