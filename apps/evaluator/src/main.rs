mod config;
mod errors;
mod evaluation;
mod models;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::evaluation::lexicon::{load_lexicon, BuiltinLexicon, FileLexicon, LexiconSource};
use crate::evaluation::settings::EngineSettings;
use crate::evaluation::EvaluationEngine;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting evaluator v{}", env!("CARGO_PKG_VERSION"));

    // Any failure here drops what was loaded so far and exits before serving.
    let engine = build_engine(&config).await?;

    let state = AppState {
        engine: Arc::new(engine),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads and validates settings, then the sentiment lexicon.
async fn build_engine(config: &Config) -> Result<EvaluationEngine> {
    let settings = EngineSettings::load(config.settings_path.as_deref())
        .await
        .context("Failed to load evaluator settings")?;
    info!(
        "Settings validated: {} questions, retry_count {}, extractor timeout {:?}",
        settings.questions.len(),
        settings.retry_count,
        settings.extractor_timeout
    );

    let source: Box<dyn LexiconSource> = match &config.lexicon_path {
        Some(path) => Box::new(FileLexicon { path: path.clone() }),
        None => Box::new(BuiltinLexicon),
    };
    let lexicon = load_lexicon(source.as_ref(), settings.retry_count)
        .await
        .context("Failed to load sentiment lexicon")?;

    Ok(EvaluationEngine::new(settings, Arc::new(lexicon)))
}
