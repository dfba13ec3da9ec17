use std::sync::Arc;

use crate::evaluation::EvaluationEngine;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read-only engine: settings, lexicon and question bank, loaded once at startup.
    pub engine: Arc<EvaluationEngine>,
}
