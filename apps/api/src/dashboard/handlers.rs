use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use uuid::Uuid;

use crate::dashboard::{build_report, compare, ranked, Comparison, RankedCandidate, Report};
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ComparisonRequest {
    pub resume_ids: Vec<Uuid>,
}

/// GET /api/v1/sessions/:id/ranking
pub async fn handle_ranking(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<RankedCandidate>>, AppError> {
    let session = state.sessions.get(session_id).await?;
    let ranking = ranked(&session.lock().await.resumes);
    Ok(Json(ranking))
}

/// POST /api/v1/sessions/:id/comparison
pub async fn handle_comparison(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<ComparisonRequest>,
) -> Result<Json<Comparison>, AppError> {
    let session = state.sessions.get(session_id).await?;
    let comparison = compare(&session.lock().await.resumes, &req.resume_ids)?;
    Ok(Json(comparison))
}

/// GET /api/v1/sessions/:id/report
pub async fn handle_report(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    let session = state.sessions.get(session_id).await?;
    let s = session.lock().await;
    let report = build_report(&s.job_description, &s.resumes, Local::now().date_naive())?;
    Ok(Json(report))
}
