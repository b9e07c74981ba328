//! HTTP route handlers, all nested under `/api`.

pub mod analyze;
pub mod cases;
pub mod health;
pub mod llm;
pub mod reports;
pub mod stats;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::routes())
        .merge(analyze::routes())
        .merge(reports::routes())
        .merge(cases::routes())
        .merge(stats::routes())
        .merge(llm::routes())
}
