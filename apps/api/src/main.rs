mod analysis;
mod chat;
mod config;
mod dashboard;
mod errors;
mod ingest;
mod llm_client;
mod models;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::GeminiClient;
use crate::routes::build_router;
use crate::state::AppState;

/// How often idle sessions are swept.
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the model client
    let gemini = GeminiClient::new(config.gemini_api_key.clone(), config.gemini_api_base.clone())?;
    info!(
        "Gemini client initialized (analysis: {}, chat: {})",
        llm_client::ANALYSIS_MODEL,
        llm_client::CHAT_MODEL
    );
    info!(
        "Analysis concurrency {}, {} attempt(s) per call, quota cooldown {}s",
        config.analysis_concurrency,
        config.llm_max_attempts,
        config.quota_cooldown.as_secs()
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let state = AppState::new(Arc::new(gemini), config);
    state.sessions.clone().spawn_sweeper(SESSION_SWEEP_INTERVAL);

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client has a fixed host

    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
