pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};

use crate::analysis::handlers as analysis;
use crate::chat::handlers as chat;
use crate::dashboard::handlers as dashboard;
use crate::session::handlers as session;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Session setup
        .route("/api/v1/sessions", post(session::handle_create_session))
        .route(
            "/api/v1/sessions/:id",
            get(session::handle_get_session).delete(session::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/job-description",
            put(session::handle_set_job_description),
        )
        .route(
            "/api/v1/sessions/:id/resumes",
            post(session::handle_add_text_resume),
        )
        .route(
            "/api/v1/sessions/:id/resumes/upload",
            post(session::handle_upload_resumes),
        )
        .route(
            "/api/v1/sessions/:id/resumes/:resume_id",
            delete(session::handle_remove_resume),
        )
        // Analysis
        .route(
            "/api/v1/sessions/:id/analysis",
            post(analysis::handle_run_analysis),
        )
        // Dashboard
        .route("/api/v1/sessions/:id/ranking", get(dashboard::handle_ranking))
        .route(
            "/api/v1/sessions/:id/comparison",
            post(dashboard::handle_comparison),
        )
        .route("/api/v1/sessions/:id/report", get(dashboard::handle_report))
        // Chat
        .route(
            "/api/v1/sessions/:id/chat",
            get(chat::handle_get_transcript).post(chat::handle_send_message),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
