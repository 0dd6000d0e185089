use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::{retry::DEFAULT_MAX_ATTEMPTS, DEFAULT_API_BASE};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub port: u16,
    pub rust_log: String,
    /// Max résumé analyses in flight per batch.
    pub analysis_concurrency: usize,
    pub llm_max_attempts: u32,
    pub quota_cooldown: Duration,
    /// Sessions untouched for this long are dropped.
    pub session_idle_ttl: Duration,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_API_BASE.to_string()),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            analysis_concurrency: parse_env::<usize>("ANALYSIS_CONCURRENCY", 4)?.max(1),
            llm_max_attempts: parse_env::<u32>("LLM_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?.max(1),
            quota_cooldown: Duration::from_secs(parse_env("QUOTA_COOLDOWN_SECS", 60)?),
            session_idle_ttl: Duration::from_secs(parse_env(
                "SESSION_IDLE_TTL_SECS",
                2 * 60 * 60,
            )?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}
