use axum::extract::State;
use axum::Json;
use xing_core::DiagnosticsReport;

use crate::state::AppState;

/// GET /api/system/diagnostics
pub async fn get_diagnostics(State(state): State<AppState>) -> Json<DiagnosticsReport> {
    Json(state.system().diagnostics())
}
