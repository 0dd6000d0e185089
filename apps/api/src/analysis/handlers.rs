//! Axum route handlers for the Analysis API.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::analysis::runner::run_analysis;
use crate::errors::AppError;
use crate::session::SessionView;
use crate::state::AppState;

/// POST /api/v1/sessions/:id/analysis
///
/// Analyzes every résumé that has no analysis yet. All-or-nothing: on failure the
/// session is left as it was and the client is sent back to setup.
pub async fn handle_run_analysis(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let view = run_analysis(&state, session_id).await?;
    Ok(Json(view))
}
