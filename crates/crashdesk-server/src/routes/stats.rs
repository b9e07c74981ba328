//! Store statistics.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::error::{error_response, ApiResponse};
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/stats", get(get_stats))
}

/// GET /api/stats — report, vehicle and case counts.
async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResponse {
    match state.store.get_stats() {
        Ok(stats) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "reports": stats.total_reports,
                "vehicles": stats.total_vehicles,
                "cases": stats.total_cases,
                "openCases": stats.open_cases,
                "dbSizeMb": stats.db_size_mb,
            })),
        ),
        Err(e) => error_response(&e),
    }
}
