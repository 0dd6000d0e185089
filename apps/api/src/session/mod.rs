//! Per-browser-session state: job description, résumés, transcript and the
//! transient flags the UI reacts to (busy flags, quota cooldown, stage).
//!
//! Nothing here is persisted. A session lives until it is deleted or sits idle
//! past the configured TTL.

pub mod handlers;
pub mod store;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::models::chat::ChatMessage;
use crate::models::resume::{Analysis, Resume, ResumeSummary};

/// Which view the client should be showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Setup,
    Analysis,
    Chat,
}

/// Rate-limit cooldown. Tripped by a quota failure; clears itself once the
/// window elapses, or explicitly when a new interaction starts.
#[derive(Debug, Clone)]
pub struct QuotaCooldown {
    window: Duration,
    tripped_at: Option<Instant>,
}

impl QuotaCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            tripped_at: None,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn trip(&mut self, now: Instant) {
        self.tripped_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.tripped_at = None;
    }

    /// Time left before the cooldown lifts, `None` if it is not active.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let tripped_at = self.tripped_at?;
        let elapsed = now.saturating_duration_since(tripped_at);
        self.window.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.remaining(now).is_some()
    }
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub job_description: String,
    pub resumes: Vec<Resume>,
    pub chat_history: Vec<ChatMessage>,
    /// A batch analysis is running.
    pub analyzing: bool,
    /// A chat reply is streaming.
    pub chatting: bool,
    pub stage: Stage,
    pub quota: QuotaCooldown,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: Uuid, quota_window: Duration) -> Self {
        Self {
            id,
            job_description: String::new(),
            resumes: Vec::new(),
            chat_history: Vec::new(),
            analyzing: false,
            chatting: false,
            stage: Stage::Setup,
            quota: QuotaCooldown::new(quota_window),
            created_at: Utc::now(),
        }
    }

    /// Appends a résumé. Existing entries are left untouched.
    pub fn add_resume(&mut self, resume: Resume) -> Uuid {
        let id = resume.id;
        self.resumes.push(resume);
        id
    }

    /// Removes exactly the résumé with `id`, keeping the order of the rest.
    pub fn remove_resume(&mut self, id: Uuid) -> bool {
        let before = self.resumes.len();
        self.resumes.retain(|r| r.id != id);
        self.resumes.len() != before
    }

    pub fn has_analysis_context(&self) -> bool {
        self.resumes.iter().any(Resume::is_analyzed)
    }

    /// Attaches a finished batch in one step. Results for résumés removed in the
    /// meantime are dropped, and an existing analysis is never overwritten.
    /// Returns how many résumés received an analysis.
    pub fn attach_analyses(&mut self, results: Vec<(Uuid, Analysis)>) -> usize {
        let mut attached = 0;
        for (id, analysis) in results {
            if let Some(resume) = self.resumes.iter_mut().find(|r| r.id == id) {
                if resume.analysis.is_none() {
                    resume.analysis = Some(analysis);
                    attached += 1;
                }
            }
        }
        attached
    }

    pub fn view(&self, now: Instant) -> SessionView {
        SessionView {
            id: self.id,
            job_description: self.job_description.clone(),
            resumes: self.resumes.iter().map(ResumeSummary::from).collect(),
            chat_history: self.chat_history.clone(),
            analyzing: self.analyzing,
            chatting: self.chatting,
            stage: self.stage,
            has_analysis_context: self.has_analysis_context(),
            quota_cooldown_secs: self.quota.remaining(now).map(|d| d.as_secs().max(1)),
            created_at: self.created_at,
        }
    }
}

/// What the client renders. Résumé payloads are left out.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub job_description: String,
    pub resumes: Vec<ResumeSummary>,
    pub chat_history: Vec<ChatMessage>,
    pub analyzing: bool,
    pub chatting: bool,
    pub stage: Stage,
    pub has_analysis_context: bool,
    /// Seconds until the quota cooldown lifts, absent when inactive.
    pub quota_cooldown_secs: Option<u64>,
    pub created_at: DateTime<Utc>,
}
