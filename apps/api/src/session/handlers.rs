//! Axum route handlers for session setup: job description and résumés.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::{resume_from_text, resume_from_upload, IngestError};
use crate::models::resume::{Resume, ResumeSummary};
use crate::session::SessionView;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobDescriptionRequest {
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct TextResumeRequest {
    pub name: String,
    pub content: String,
}

impl From<IngestError> for AppError {
    fn from(e: IngestError) -> Self {
        AppError::Validation(e.to_string())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sessions
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionView>) {
    let session = state.sessions.create().await;
    let view = session.lock().await.view(Instant::now());
    (StatusCode::CREATED, Json(view))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(session_id).await?;
    let view = session.lock().await.view(Instant::now());
    Ok(Json(view))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.sessions.remove(session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/:id/job-description
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<JobDescriptionRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = state.sessions.get(session_id).await?;
    let mut s = session.lock().await;
    s.job_description = req.job_description;
    Ok(Json(s.view(Instant::now())))
}

// ────────────────────────────────────────────────────────────────────────────
// Résumés
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions/:id/resumes
pub async fn handle_add_text_resume(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<TextResumeRequest>,
) -> Result<(StatusCode, Json<ResumeSummary>), AppError> {
    let session = state.sessions.get(session_id).await?;
    let resume = resume_from_text(&req.name, &req.content)?;
    let summary = ResumeSummary::from(&resume);

    session.lock().await.add_resume(resume);
    info!("Session {session_id}: text résumé '{}' added", summary.name);
    Ok((StatusCode::CREATED, Json(summary)))
}

/// POST /api/v1/sessions/:id/resumes/upload
///
/// Accepts one or more `file` parts. Every file is read before any is added, so a
/// bad file rejects the whole upload.
pub async fn handle_upload_resumes(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<ResumeSummary>>), AppError> {
    let session = state.sessions.get(session_id).await?;

    let mut resumes: Vec<Resume> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::Validation("File part has no file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read '{file_name}': {e}")))?;
        resumes.push(resume_from_upload(&file_name, &bytes)?);
    }

    if resumes.is_empty() {
        return Err(AppError::Validation("No file was uploaded".to_string()));
    }

    let summaries: Vec<ResumeSummary> = resumes.iter().map(ResumeSummary::from).collect();
    let mut s = session.lock().await;
    for resume in resumes {
        s.add_resume(resume);
    }
    info!("Session {session_id}: {} file(s) uploaded", summaries.len());
    Ok((StatusCode::CREATED, Json(summaries)))
}

/// DELETE /api/v1/sessions/:id/resumes/:resume_id
pub async fn handle_remove_resume(
    State(state): State<AppState>,
    Path((session_id, resume_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let session = state.sessions.get(session_id).await?;
    if !session.lock().await.remove_resume(resume_id) {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    Ok(StatusCode::NO_CONTENT)
}
