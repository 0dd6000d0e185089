//! Analysis request builder: turns a job description + one résumé into a
//! schema-constrained model request, and decodes the reply.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{json, Value};
use thiserror::Error;

use crate::analysis::prompts::{ANALYSIS_PROMPT_TEMPLATE, ANALYSIS_SYSTEM, FILE_CONTENT_PLACEHOLDER};
use crate::llm_client::retry::QuotaClassify;
use crate::llm_client::{
    fill_template, strip_json_fences, GenerateContentRequest, GenerationConfig, InlineData,
    LlmError, Part,
};
use crate::models::resume::{Analysis, Recommendation, Resume, ResumeKind};

const PDF_MIME: &str = "application/pdf";
const IMAGE_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("résumé '{0}' has no content")]
    EmptyContent(String),

    #[error("résumé '{name}' has an invalid attachment: {reason}")]
    InvalidAttachment { name: String, reason: String },

    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl QuotaClassify for AnalysisError {
    fn is_quota_exceeded(&self) -> bool {
        match self {
            AnalysisError::Llm(e) => e.is_quota_exceeded(),
            _ => false,
        }
    }
}

/// Builds the single analysis request for `resume`.
///
/// Text résumés are inlined in the prompt. PDF and image résumés get a placeholder
/// in the prompt and travel as a base64 attachment.
pub fn build_analysis_request(
    job_description: &str,
    resume: &Resume,
) -> Result<GenerateContentRequest, AnalysisError> {
    if resume.content.trim().is_empty() {
        return Err(AnalysisError::EmptyContent(resume.name.clone()));
    }

    let resume_content = match resume.kind {
        ResumeKind::Text => resume.content.as_str(),
        ResumeKind::Pdf | ResumeKind::Image => FILE_CONTENT_PLACEHOLDER,
    };
    let prompt = fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("job_description", job_description),
            ("resume_content", resume_content),
        ],
    );

    let mut parts = vec![Part::text(prompt)];
    if let Some(attachment) = attachment_for(resume)? {
        parts.push(Part::InlineData {
            inline_data: attachment,
        });
    }

    let mut request = GenerateContentRequest::user_turn(parts, ANALYSIS_SYSTEM);
    request.generation_config = Some(GenerationConfig {
        response_mime_type: Some("application/json".to_string()),
        response_schema: Some(analysis_schema()),
    });
    Ok(request)
}

fn attachment_for(resume: &Resume) -> Result<Option<InlineData>, AnalysisError> {
    let mime_type = match resume.kind {
        ResumeKind::Text => return Ok(None),
        ResumeKind::Pdf => PDF_MIME,
        ResumeKind::Image => IMAGE_MIME,
    };

    let data = data_url_payload(&resume.content);
    if data.is_empty() {
        return Err(AnalysisError::EmptyContent(resume.name.clone()));
    }
    STANDARD
        .decode(data)
        .map_err(|e| AnalysisError::InvalidAttachment {
            name: resume.name.clone(),
            reason: e.to_string(),
        })?;

    Ok(Some(InlineData {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    }))
}

/// Base64 payload of a data URL (`data:<mime>;base64,<payload>`).
/// Content without a prefix is taken as the payload itself.
fn data_url_payload(content: &str) -> &str {
    let content = content.trim();
    match content.split_once(',') {
        Some((prefix, payload)) if prefix.starts_with("data:") => payload.trim(),
        _ => content,
    }
}

/// Response schema: every `Analysis` field, all required.
pub fn analysis_schema() -> Value {
    let string_list = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    let recommendations: Vec<&str> = Recommendation::ALL.iter().map(|r| r.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "candidateName": { "type": "STRING" },
            "professionalSummary": { "type": "STRING" },
            "technicalSkills": string_list,
            "softSkills": string_list,
            "relevantExperience": { "type": "STRING" },
            "strengths": string_list,
            "weaknesses": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "issue": { "type": "STRING" },
                        "investigativeQuestion": { "type": "STRING" }
                    },
                    "required": ["issue", "investigativeQuestion"]
                }
            },
            "adherencePercentage": { "type": "NUMBER" },
            "recommendation": { "type": "STRING", "enum": recommendations },
            "justification": { "type": "STRING" },
            "interviewQuestions": string_list
        },
        "required": [
            "candidateName",
            "professionalSummary",
            "technicalSkills",
            "softSkills",
            "relevantExperience",
            "strengths",
            "weaknesses",
            "adherencePercentage",
            "recommendation",
            "justification",
            "interviewQuestions"
        ]
    })
}

/// Decodes a model reply into an `Analysis`, tolerating Markdown code fences.
pub fn decode_analysis(text: &str) -> Result<Analysis, LlmError> {
    serde_json::from_str(strip_json_fences(text)).map_err(LlmError::Parse)
}
