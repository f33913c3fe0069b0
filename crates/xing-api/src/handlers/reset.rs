//! Full system reset

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use xing_core::SystemStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
    pub system_status: SystemStatus,
}

/// POST /api/system/reset
pub async fn reset_system(State(state): State<AppState>) -> Json<ResetResponse> {
    let system = state.system();
    system.reset_system();
    Json(ResetResponse {
        success: true,
        message: "System reset".to_string(),
        system_status: system.get_status(),
    })
}
