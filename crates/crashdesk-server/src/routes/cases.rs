//! Vehicle case workflow.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::{bad_request, error_response, ApiResponse};
use crate::state::AppState;
use crashdesk_store::CaseDetail;
use crashdesk_triage::{CasePriority, CaseStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/vehicles/{id}/case", post(create_case))
        .route("/cases", get(list_cases))
        .route("/cases/{id}", get(get_case).patch(update_case))
        .route("/cases/{id}/priority", post(set_priority))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateCaseRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CaseListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CaseUpdate {
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Either re-run the classifier or set a priority by hand.
#[derive(Debug, Default, Deserialize)]
pub struct PriorityRequest {
    #[serde(default)]
    pub recompute: bool,
    pub priority: Option<String>,
}

fn detail_response(status: StatusCode, detail: &CaseDetail) -> ApiResponse {
    (status, Json(serde_json::to_value(detail).unwrap_or_default()))
}

/// POST /api/vehicles/{id}/case — open (or fetch) the vehicle's case.
async fn create_case(
    State(state): State<Arc<AppState>>,
    Path(vehicle_id): Path<i64>,
    Json(req): Json<CreateCaseRequest>,
) -> ApiResponse {
    let notes = req.notes.as_deref().filter(|n| !n.trim().is_empty());
    match state
        .store
        .create_case_for_vehicle(vehicle_id, notes, state.current_year())
    {
        Ok(detail) => detail_response(StatusCode::OK, &detail),
        Err(e) => error_response(&e),
    }
}

/// GET /api/cases — all cases, optionally `?status=IN_PROGRESS`.
async fn list_cases(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CaseListQuery>,
) -> ApiResponse {
    let status = match query.status.as_deref().map(str::parse::<CaseStatus>).transpose() {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };
    match state.store.list_cases(status) {
        Ok(cases) => (
            StatusCode::OK,
            Json(json!({ "total": cases.len(), "cases": cases })),
        ),
        Err(e) => error_response(&e),
    }
}

async fn get_case(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResponse {
    match state.store.get_case(id) {
        Ok(Some(detail)) => detail_response(StatusCode::OK, &detail),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Case {} not found", id) })),
        ),
        Err(e) => error_response(&e),
    }
}

/// PATCH /api/cases/{id} — change status and/or notes.
///
/// An empty `notes` string clears the notes.
async fn update_case(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<CaseUpdate>,
) -> ApiResponse {
    if update.status.is_none() && update.notes.is_none() {
        return bad_request("nothing to update; send status and/or notes");
    }
    let status = match update.status.as_deref().map(str::parse::<CaseStatus>).transpose() {
        Ok(s) => s,
        Err(e) => return bad_request(e),
    };

    let mut detail = None;
    if let Some(status) = status {
        match state.store.update_case_status(id, status) {
            Ok(d) => detail = Some(d),
            Err(e) => return error_response(&e),
        }
    }
    if let Some(notes) = &update.notes {
        let notes = Some(notes.as_str()).filter(|n| !n.trim().is_empty());
        match state.store.update_case_notes(id, notes) {
            Ok(d) => detail = Some(d),
            Err(e) => return error_response(&e),
        }
    }

    match detail {
        Some(d) => detail_response(StatusCode::OK, &d),
        None => bad_request("nothing to update"),
    }
}

/// POST /api/cases/{id}/priority — `{"recompute": true}` or `{"priority": "URGENT"}`.
async fn set_priority(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<PriorityRequest>,
) -> ApiResponse {
    let result = match (req.recompute, req.priority.as_deref()) {
        (true, None) => state.store.recompute_case_priority(id, state.current_year()),
        (false, Some(p)) => match p.parse::<CasePriority>() {
            Ok(priority) => state.store.override_case_priority(id, priority),
            Err(e) => return bad_request(e),
        },
        (true, Some(_)) => return bad_request("send either recompute or priority, not both"),
        (false, None) => return bad_request("send recompute: true or a priority"),
    };
    match result {
        Ok(detail) => detail_response(StatusCode::OK, &detail),
        Err(e) => error_response(&e),
    }
}
