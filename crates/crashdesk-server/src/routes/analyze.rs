//! Report analysis: model call, reply parsing and persistence.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::error::{bad_request, error_response, status_for, ApiResponse};
use crate::state::AppState;
use crashdesk_llm::with_retry;
use crashdesk_store::{source_hash, SaveOutcome};
use crashdesk_triage::ParsedReport;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .route("/parse", post(parse))
}

/// A crash report as extracted text.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub filename: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub reports: Vec<AnalyzeRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ParseRequest {
    pub reply: String,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    filename: String,
    report: ParsedReport,
    saved: SaveOutcome,
}

/// POST /api/analyze — analyze one report and persist the result.
async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResponse {
    match analyze_one(&state, &req).await {
        Ok(response) => (
            if response.saved.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            },
            Json(serde_json::to_value(&response).unwrap_or_default()),
        ),
        Err(failure) => failure,
    }
}

/// POST /api/analyze/batch — analyze several reports, one result per item.
///
/// Items run in order; a failed item does not stop the rest.
async fn analyze_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> ApiResponse {
    let mut results = Vec::with_capacity(req.reports.len());
    let mut failed = 0usize;

    for item in &req.reports {
        match analyze_one(&state, item).await {
            Ok(response) => results.push(json!({
                "filename": item.filename,
                "success": true,
                "report": response.report,
                "saved": response.saved,
            })),
            Err((status, Json(body))) => {
                failed += 1;
                results.push(json!({
                    "filename": item.filename,
                    "success": false,
                    "status": status.as_u16(),
                    "error": body["error"],
                }));
            }
        }
    }

    info!(
        "Batch analyzed {} report(s), {} failed",
        req.reports.len(),
        failed
    );
    (
        StatusCode::OK,
        Json(json!({
            "total": req.reports.len(),
            "failed": failed,
            "results": results,
        })),
    )
}

/// POST /api/parse — parse a raw model reply; no model call, nothing stored.
async fn parse(State(state): State<Arc<AppState>>, Json(req): Json<ParseRequest>) -> ApiResponse {
    let report = state.parser.parse(&req.reply);
    (
        StatusCode::OK,
        Json(serde_json::to_value(&report).unwrap_or_default()),
    )
}

async fn analyze_one(
    state: &AppState,
    req: &AnalyzeRequest,
) -> std::result::Result<AnalyzeResponse, ApiResponse> {
    if !req.filename.to_ascii_lowercase().ends_with(".pdf") {
        return Err(bad_request(format!("{} is not a PDF file", req.filename)));
    }
    if req.text.trim().is_empty() {
        return Err(bad_request("report text is empty"));
    }

    let source = state.reply_source().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "No model provider configured" })),
        )
    })?;
    let policy = state.llm_config.read().retry.clone();

    let text = req.text.as_str();
    let client = source.as_ref();
    let reply = with_retry(&policy, "analyze", move || client.analyze(text))
        .await
        .map_err(|e| {
            warn!("Model call for {} failed: {}", req.filename, e);
            error_response(&e)
        })?;

    let report = state.parser.parse(&reply);
    let saved = state
        .store
        .save_report(&req.filename, &report, Some(&source_hash(&req.text)))
        .map_err(|e| {
            warn!("Not saving {}: {}", req.filename, e);
            (
                status_for(&e),
                Json(json!({ "error": e.to_string(), "report": report })),
            )
        })?;

    Ok(AnalyzeResponse {
        filename: req.filename.clone(),
        report,
        saved,
    })
}
