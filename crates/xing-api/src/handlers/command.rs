//! Operator command endpoint

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use xing_core::{CommandOutcome, SystemStatus};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/system/command
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub crossing_id: usize,
    pub command: String,
    /// Command parameters, e.g. `train_speed` or `fault_type`
    #[serde(default)]
    pub parameters: Value,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    pub result: CommandOutcome,
    pub system_status: SystemStatus,
}

/// POST /api/system/command
///
/// A transition the table refuses is reported as 409 Conflict.
pub async fn execute_command(
    State(state): State<AppState>,
    Json(request): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    let system = state.system();
    let result =
        system.process_command(request.crossing_id, &request.command, &request.parameters)?;

    if !result.success {
        return Err(ApiError::Conflict {
            kind: "invalid_transition",
            message: result
                .error
                .unwrap_or_else(|| format!("{} refused", request.command)),
        });
    }

    Ok(Json(CommandResponse {
        success: true,
        result,
        system_status: system.get_status(),
    }))
}
