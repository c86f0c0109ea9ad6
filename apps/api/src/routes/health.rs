use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service version plus the active scoring strategies.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "resumatch-api",
        "keyword_strategy": state.config.keyword_strategy,
        "formatting_strategy": state.config.formatting_strategy,
        "text_generator": state.engine.has_generator(),
    }))
}
