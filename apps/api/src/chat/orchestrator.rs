//! Chat stream orchestrator: opens a streamed conversation with the model and
//! hands fragments to the caller through a finite, single-pass channel.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::chat::prompts::{CHAT_PROMPT_TEMPLATE, CONSULTANT_SYSTEM, NO_CANDIDATES, QUOTA_NOTICE};
use crate::llm_client::{
    fill_template, GenerateContentRequest, LlmError, ModelApi, Part, CHAT_MODEL,
};
use crate::models::resume::Resume;

/// Fragments in flight between the producer task and the consumer.
/// Kept at one so nothing piles up ahead of the reader.
const REPLY_CHANNEL_CAPACITY: usize = 1;

/// The receiving end of a streamed reply.
///
/// Yields fragments in arrival order and then `None` forever. A quota failure
/// shows up as one notice fragment followed by a normal end; any other failure
/// is yielded as `Err` and ends the stream.
pub struct ReplyStream {
    rx: mpsc::Receiver<Result<String, LlmError>>,
}

impl ReplyStream {
    pub async fn next_fragment(&mut self) -> Option<Result<String, LlmError>> {
        self.rx.recv().await
    }
}

/// One digest line per analyzed résumé: name, adherence and gap issues.
pub fn candidate_digest(resumes: &[Resume]) -> String {
    let lines: Vec<String> = resumes
        .iter()
        .filter_map(|r| r.analysis.as_ref().map(|a| (r, a)))
        .map(|(resume, analysis)| {
            let gaps: Vec<&str> = analysis
                .weaknesses
                .iter()
                .map(|w| w.issue.as_str())
                .collect();
            format!(
                "- Candidato: {}. Aderência: {}%. Gaps: {}.",
                resume.display_name(),
                analysis.adherence_percentage,
                gaps.join(", ")
            )
        })
        .collect();

    if lines.is_empty() {
        NO_CANDIDATES.to_string()
    } else {
        lines.join("\n")
    }
}

pub fn build_chat_prompt(job_description: &str, resumes: &[Resume], message: &str) -> String {
    let candidates = candidate_digest(resumes);
    fill_template(
        CHAT_PROMPT_TEMPLATE,
        &[
            ("job_description", job_description),
            ("candidates", candidates.as_str()),
            ("message", message),
        ],
    )
}

/// Starts streaming the consultant's reply to `message`.
///
/// The model call runs in its own task; the returned stream is the only way to
/// observe it. Must be called from within a Tokio runtime.
pub fn stream_reply(
    model: Arc<dyn ModelApi>,
    job_description: &str,
    resumes: &[Resume],
    message: &str,
) -> ReplyStream {
    let prompt = build_chat_prompt(job_description, resumes, message);
    let request = GenerateContentRequest::user_turn(vec![Part::text(prompt)], CONSULTANT_SYSTEM);

    let (tx, rx) = mpsc::channel(REPLY_CHANNEL_CAPACITY);
    tokio::spawn(produce(model, request, tx));
    ReplyStream { rx }
}

async fn produce(
    model: Arc<dyn ModelApi>,
    request: GenerateContentRequest,
    tx: mpsc::Sender<Result<String, LlmError>>,
) {
    let mut fragments = match model.stream_content(CHAT_MODEL, &request).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = tx.send(settle(e)).await;
            return;
        }
    };

    while let Some(item) = fragments.next().await {
        match item {
            Ok(fragment) => {
                if tx.send(Ok(fragment)).await.is_err() {
                    debug!("Reply consumer dropped, stopping stream");
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(settle(e)).await;
                return;
            }
        }
    }
}

/// Quota failures become the closing notice; everything else stays an error.
fn settle(err: LlmError) -> Result<String, LlmError> {
    if err.is_quota_exceeded() {
        warn!("Chat stream hit the model quota: {err}");
        Ok(QUOTA_NOTICE.to_string())
    } else {
        Err(err)
    }
}
