use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the résumé content is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeKind {
    /// Plain text (pasted, or extracted from DOCX).
    Text,
    /// `data:application/pdf;base64,...` data URL. Parsing is left to the model.
    Pdf,
    /// `data:image/...;base64,...` data URL.
    Image,
}

/// A candidate résumé held in a session. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: ResumeKind,
    pub analysis: Option<Analysis>,
}

impl Resume {
    pub fn new(name: impl Into<String>, content: impl Into<String>, kind: ResumeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            content: content.into(),
            kind,
            analysis: None,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.is_some()
    }

    /// Name to show for the candidate: the one the model found, else the upload name.
    pub fn display_name(&self) -> &str {
        self.analysis
            .as_ref()
            .map(|a| a.candidate_name.as_str())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// Model verdict on how well the candidate fits the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Aderente")]
    Adherent,
    #[serde(rename = "Parcial")]
    Partial,
    #[serde(rename = "Pouco Aderente")]
    LowAdherence,
}

impl Recommendation {
    pub const ALL: [Recommendation; 3] = [
        Recommendation::Adherent,
        Recommendation::Partial,
        Recommendation::LowAdherence,
    ];

    /// Wire value, as the model is asked to produce it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Adherent => "Aderente",
            Recommendation::Partial => "Parcial",
            Recommendation::LowAdherence => "Pouco Aderente",
        }
    }
}

/// A gap paired with the interview question that probes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weakness {
    pub issue: String,
    pub investigative_question: String,
}

/// Structured analysis of one résumé against the job description.
/// Every field is required; a reply missing any of them is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub candidate_name: String,
    pub professional_summary: String,
    pub technical_skills: Vec<String>,
    pub soft_skills: Vec<String>,
    pub relevant_experience: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<Weakness>,
    /// 0–100 expected. Not validated.
    pub adherence_percentage: f64,
    pub recommendation: Recommendation,
    pub justification: String,
    pub interview_questions: Vec<String>,
}

/// Résumé without its payload, for listing back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ResumeKind,
    pub analysis: Option<Analysis>,
}

impl From<&Resume> for ResumeSummary {
    fn from(resume: &Resume) -> Self {
        Self {
            id: resume.id,
            name: resume.name.clone(),
            kind: resume.kind,
            analysis: resume.analysis.clone(),
        }
    }
}
