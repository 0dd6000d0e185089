use tokio::sync::mpsc;
use tracing::{error, info};
use uuid::Uuid;

use crate::chat::orchestrator::stream_reply;
use crate::chat::prompts::CONNECTION_APOLOGY;
use crate::errors::AppError;
use crate::models::chat::ChatMessage;
use crate::session::Stage;
use crate::state::AppState;

/// Events buffered between the transcript writer and the HTTP response.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// What the client sees while a reply is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// Text appended to the model's reply.
    Fragment(String),
    /// The reply failed; the transcript now holds this apology instead.
    Failed(String),
    /// Always the last event.
    Done,
}

/// Sends `message` to the consultant and streams the reply.
///
/// The user message and an empty model reply are appended right away. Fragments
/// are written into that reply as they arrive, whether or not anyone is still
/// reading the returned channel.
pub async fn submit_chat(
    state: &AppState,
    session_id: Uuid,
    message: &str,
) -> Result<mpsc::Receiver<ChatEvent>, AppError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(AppError::Validation("A mensagem não pode ser vazia.".to_string()));
    }

    let session = state.sessions.get(session_id).await?;

    let (mut reply, reply_index) = {
        let mut s = session.lock().await;
        if s.chatting {
            return Err(AppError::Conflict(
                "A reply is already streaming for this session".to_string(),
            ));
        }

        s.chat_history.push(ChatMessage::user(message));
        s.chat_history.push(ChatMessage::model(""));
        let reply_index = s.chat_history.len() - 1;
        s.chatting = true;
        s.quota.clear();
        s.stage = Stage::Chat;

        let reply = stream_reply(state.model.clone(), &s.job_description, &s.resumes, message);
        (reply, reply_index)
    };

    info!("Session {session_id}: chat message submitted");

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(async move {
        while let Some(item) = reply.next_fragment().await {
            match item {
                Ok(fragment) => {
                    if let Some(entry) = session.lock().await.chat_history.get_mut(reply_index) {
                        entry.text.push_str(&fragment);
                    }
                    let _ = tx.send(ChatEvent::Fragment(fragment)).await;
                }
                Err(e) => {
                    error!("Session {session_id}: chat stream failed: {e}");
                    if let Some(entry) = session.lock().await.chat_history.get_mut(reply_index) {
                        entry.text = CONNECTION_APOLOGY.to_string();
                    }
                    let _ = tx.send(ChatEvent::Failed(CONNECTION_APOLOGY.to_string())).await;
                }
            }
        }

        session.lock().await.chatting = false;
        let _ = tx.send(ChatEvent::Done).await;
    });

    Ok(rx)
}
