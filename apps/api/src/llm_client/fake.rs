//! Scripted in-memory `ModelApi` for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};

use super::{GenerateContentRequest, LlmError, ModelApi, Part, TextStream};

/// One scripted streaming reply.
pub enum ScriptedStream {
    /// Opening the stream fails.
    Refused(LlmError),
    /// The stream yields these items in order, then ends.
    Items(Vec<Result<String, LlmError>>),
}

/// Replays queued replies and records every request it saw.
///
/// A reply registered with `reply_for` is only handed to a request whose prompt
/// contains the marker, so concurrent callers get deterministic answers.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<Vec<(Option<String>, Result<String, LlmError>)>>,
    streams: Mutex<VecDeque<ScriptedStream>>,
    requests: Mutex<Vec<(String, GenerateContentRequest)>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, reply: Result<String, LlmError>) -> Self {
        self.replies.lock().unwrap().push((None, reply));
        self
    }

    pub fn reply_for(self, marker: &str, reply: Result<String, LlmError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push((Some(marker.to_string()), reply));
        self
    }

    pub fn stream(self, stream: ScriptedStream) -> Self {
        self.streams.lock().unwrap().push_back(stream);
        self
    }

    pub fn requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, model: &str, request: &GenerateContentRequest) {
        self.requests
            .lock()
            .unwrap()
            .push((model.to_string(), request.clone()));
    }
}

#[async_trait]
impl ModelApi for ScriptedModel {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, LlmError> {
        self.record(model, request);
        let prompt = prompt_text(request);
        let mut replies = self.replies.lock().unwrap();
        let index = replies.iter().position(|(marker, _)| match marker {
            Some(m) => prompt.contains(m.as_str()),
            None => true,
        });
        match index {
            Some(i) => replies.remove(i).1,
            None => Err(LlmError::EmptyContent),
        }
    }

    async fn stream_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<TextStream, LlmError> {
        self.record(model, request);
        let next = self.streams.lock().unwrap().pop_front();
        match next {
            Some(ScriptedStream::Refused(err)) => Err(err),
            Some(ScriptedStream::Items(items)) => Ok(stream::iter(items).boxed()),
            None => Ok(stream::empty().boxed()),
        }
    }
}

/// All text parts of the request's user turns.
pub fn prompt_text(request: &GenerateContentRequest) -> String {
    request
        .contents
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| match p {
            Part::Text { text } => Some(text.as_str()),
            Part::InlineData { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A well-formed analysis reply for the given candidate.
pub fn analysis_json(name: &str, adherence: f64, gaps: &[&str]) -> String {
    let weaknesses: Vec<serde_json::Value> = gaps
        .iter()
        .map(|g| serde_json::json!({"issue": g, "investigativeQuestion": format!("Fale sobre {g}")}))
        .collect();
    serde_json::json!({
        "candidateName": name,
        "professionalSummary": "Backend engineer",
        "technicalSkills": ["Go", "Rust"],
        "softSkills": ["Comunicação"],
        "relevantExperience": "5 anos em backend",
        "strengths": ["APIs"],
        "weaknesses": weaknesses,
        "adherencePercentage": adherence,
        "recommendation": "Parcial",
        "justification": "Bom fit técnico",
        "interviewQuestions": ["Como você escala um serviço?"]
    })
    .to_string()
}
