//! Read-only system views

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use xing_core::{CrossingSnapshot, NextAction, SystemStatus};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/system/status
pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(state.system().get_status())
}

/// GET /api/system/crossings/{id}
pub async fn get_crossing(
    State(state): State<AppState>,
    Path(crossing_id): Path<usize>,
) -> Result<Json<CrossingSnapshot>, ApiError> {
    let snapshot = state.system().crossing_snapshot(crossing_id)?;
    Ok(Json(snapshot))
}

/// GET /api/system/next-actions
pub async fn get_next_actions(
    State(state): State<AppState>,
) -> Json<BTreeMap<usize, NextAction>> {
    Json(state.system().get_next_actions())
}
