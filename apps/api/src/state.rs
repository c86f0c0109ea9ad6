use std::sync::Arc;

use crate::analysis::engine::MatchEngine;
use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Read-only after startup; shared by every request.
    pub engine: Arc<MatchEngine>,
    pub config: Config,
}
