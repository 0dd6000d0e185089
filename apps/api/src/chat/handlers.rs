use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use uuid::Uuid;

use crate::chat::conversation::{submit_chat, ChatEvent};
use crate::errors::AppError;
use crate::models::chat::ChatMessage;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// GET /api/v1/sessions/:id/chat
// ────────────────────────────────────────────────────────────────────────────

pub async fn handle_get_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, AppError> {
    let session = state.sessions.get(session_id).await?;
    let history = session.lock().await.chat_history.clone();
    Ok(Json(history))
}

// ────────────────────────────────────────────────────────────────────────────
// POST /api/v1/sessions/:id/chat
// ────────────────────────────────────────────────────────────────────────────

/// Streams the reply as server-sent events: `chunk` per fragment, `error` if the
/// reply failed, and a closing `done`.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let rx = submit_chat(&state, session_id, &body.message).await?;

    let events = stream::unfold(rx, |mut rx| async move {
        let event = match rx.recv().await? {
            ChatEvent::Fragment(text) => Event::default().event("chunk").data(text),
            ChatEvent::Failed(notice) => Event::default().event("error").data(notice),
            ChatEvent::Done => Event::default().event("done").data(""),
        };
        Some((Ok(event), rx))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
