//! Model provider configuration.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{error_response, ApiResponse};
use crate::state::AppState;
use crashdesk_llm::LLMConfigUpdate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/llm/config", get(get_config).put(update_config))
}

async fn get_config(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.llm_config.read();
    Json(serde_json::to_value(config.to_response()).unwrap_or_default())
}

async fn update_config(
    State(state): State<Arc<AppState>>,
    Json(update): Json<LLMConfigUpdate>,
) -> ApiResponse {
    let response = {
        let mut config = state.llm_config.write();
        if let Err(e) = config.apply_update(&update) {
            return error_response(&e);
        }
        if let Err(e) = config.save() {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": format!("Failed to save config: {}", e) })),
            );
        }
        config.to_response()
    };
    state.refresh_reply_source();

    (
        StatusCode::OK,
        Json(serde_json::to_value(response).unwrap_or_default()),
    )
}
