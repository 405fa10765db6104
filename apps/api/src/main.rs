mod chat;
mod config;
mod document;
mod errors;
mod gemini;
mod routes;
mod session;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::gemini::files::ActivationPolicy;
use crate::gemini::GeminiClient;
use crate::routes::build_router;
use crate::session::store::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Fitchat API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Gemini client
    let gemini = GeminiClient::new(config.gemini_api_key.clone());
    info!("Gemini client initialized");

    // Activation polling cadence; the poll ceiling stays at the default
    let activation = ActivationPolicy {
        poll_interval: Duration::from_secs(config.file_poll_interval_secs),
        ..ActivationPolicy::default()
    };

    // In-memory session registry
    let sessions = SessionStore::new();

    // Build app state
    let state = AppState {
        gemini,
        sessions,
        activation,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
