//! LLM Client: the single point of entry for all Gemini API calls.
//!
//! ARCHITECTURAL RULE: No other module may call the Gemini API directly.
//! Everything goes through the `ModelApi` trait so tests can swap in a scripted model.
//!
//! Models are hardcoded per use case to prevent drift between environments.
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod retry;
pub mod sse;

#[cfg(test)]
pub mod fake;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Model used for structured résumé analysis.
pub const ANALYSIS_MODEL: &str = "gemini-3-pro-preview";
/// Model used for the streaming consultant chat.
pub const CHAT_MODEL: &str = "gemini-3-flash-preview";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Markers the upstream puts in rate-limit error messages.
const QUOTA_MARKERS: [&str; 3] = ["429", "quota", "Too Many Requests"];

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("Stream error: {0}")]
    Stream(String),
}

impl LlmError {
    /// True when the upstream rejected the call for exceeding its request quota.
    ///
    /// The HTTP status is authoritative; message markers are the fallback for
    /// errors that reach us without one (e.g. errors embedded in a stream).
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            LlmError::Api { status: 429, .. } => true,
            LlmError::Api { message, .. } if message.contains("RESOURCE_EXHAUSTED") => true,
            other => {
                let text = other.to_string();
                QUOTA_MARKERS.iter().any(|marker| text.contains(marker))
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types (Gemini generateContent)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    /// A single user turn with the given system instruction.
    pub fn user_turn(parts: Vec<Part>, system: &str) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part::text(system)],
            }),
            generation_config: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }
}

/// A binary attachment sent alongside the prompt. `data` is base64 text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    pub fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        Some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    code: u16,
    message: String,
    #[serde(default)]
    status: String,
}

impl From<GeminiErrorBody> for LlmError {
    fn from(body: GeminiErrorBody) -> Self {
        let message = if body.status.is_empty() {
            body.message
        } else {
            format!("{} ({})", body.message, body.status)
        };
        LlmError::Api {
            status: body.code,
            message,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ModelApi trait
// ────────────────────────────────────────────────────────────────────────────

/// Incremental text fragments of a streamed reply. Finite and single-pass.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

/// The model boundary. Implement this to swap backends without touching callers.
///
/// Carried in `AppState` as `Arc<dyn ModelApi>`.
#[async_trait]
pub trait ModelApi: Send + Sync {
    /// One-shot generation. Returns the full reply text.
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, LlmError>;

    /// Streaming generation. Errors opening the stream are returned directly;
    /// errors while reading it arrive as stream items.
    async fn stream_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<TextStream, LlmError>;
}

/// Gemini REST client. Retries are the caller's business (see `retry`).
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn post(
        &self,
        url: String,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 429 {
            warn!("Gemini API returned {status}");
        }
        match serde_json::from_str::<GeminiError>(&body) {
            Ok(parsed) => {
                let mut err = LlmError::from(parsed.error);
                if let LlmError::Api { status: code, .. } = &mut err {
                    if *code == 0 {
                        *code = status.as_u16();
                    }
                }
                Err(err)
            }
            Err(_) => Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            }),
        }
    }
}

#[async_trait]
impl ModelApi for GeminiClient {
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<String, LlmError> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);
        let response: GenerateContentResponse = self.post(url, request).await?.json().await?;

        if let Some(usage) = &response.usage_metadata {
            debug!(
                "Gemini call succeeded: model={model}, prompt_tokens={}, output_tokens={}",
                usage.prompt_token_count, usage.candidates_token_count
            );
        }

        response
            .text()
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn stream_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<TextStream, LlmError> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, model
        );
        let response = self.post(url, request).await?;
        debug!("Gemini stream opened: model={model}");
        Ok(sse::text_fragments(Box::pin(response.bytes_stream())))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

/// Fills `{name}` placeholders in one left-to-right pass.
///
/// Substituted values are copied as-is and never scanned again, so braces inside
/// a résumé or a chat message survive untouched. Unknown placeholders are kept.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let filled = after.find('}').and_then(|close| {
            let key = &after[..close];
            values
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (*value, close))
        });
        match filled {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
