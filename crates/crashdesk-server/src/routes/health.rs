//! Liveness and dependency health.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}

/// GET /api/health — store reachable and model ping.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let store_ok = state.store.get_stats().is_ok();

    let model = match state.reply_source() {
        Some(source) => match source.ping().await {
            Ok(()) => json!({ "configured": true, "provider": source.name(), "reachable": true }),
            Err(e) => json!({
                "configured": true,
                "provider": source.name(),
                "reachable": false,
                "error": e.to_string(),
            }),
        },
        None => json!({ "configured": false, "reachable": false }),
    };

    let healthy = store_ok && model["reachable"].as_bool().unwrap_or(false);
    Json(json!({
        "status": if healthy { "ok" } else { "degraded" },
        "store": store_ok,
        "model": model,
    }))
}
