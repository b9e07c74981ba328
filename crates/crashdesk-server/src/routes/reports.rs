//! Stored report browsing.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::error::{bad_request, error_response, ApiResponse};
use crate::state::AppState;
use crashdesk_store::{parse_crash_date, ReportFilter};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/{id}", get(get_report).delete(delete_report))
        .route("/vehicles/{id}", get(get_vehicle))
}

/// Query filters. Dates are `MM/DD/YYYY`; every bound is inclusive and optional.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ReportQuery {
    fn to_filter(&self) -> crashdesk_core::Result<ReportFilter> {
        let year_range = match (self.min_year, self.max_year) {
            (None, None) => None,
            (min, max) => Some((min.unwrap_or(i32::MIN), max.unwrap_or(i32::MAX))),
        };
        let start = self.start_date.as_deref().map(parse_crash_date).transpose()?;
        let end = self.end_date.as_deref().map(parse_crash_date).transpose()?;
        let date_range = match (start, end) {
            (None, None) => None,
            (start, end) => Some((
                start.unwrap_or_else(earliest_date),
                end.unwrap_or_else(latest_date),
            )),
        };
        Ok(ReportFilter {
            year_range,
            date_range,
        })
    }
}

// Stored dates compare as ISO text, so open bounds stay within four-digit years.
fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

fn latest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// GET /api/reports — reports with vehicles, newest crash first.
async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportQuery>,
) -> ApiResponse {
    let filter = match query.to_filter() {
        Ok(f) => f,
        Err(e) => return bad_request(e.to_string()),
    };
    if let Some((min, max)) = filter.year_range {
        if min > max {
            return bad_request("min_year is greater than max_year");
        }
    }
    if let Some((start, end)) = filter.date_range {
        if start > end {
            return bad_request("start_date is after end_date");
        }
    }

    match state.store.filter_reports(&filter) {
        Ok(reports) => (
            StatusCode::OK,
            Json(json!({ "total": reports.len(), "reports": reports })),
        ),
        Err(e) => error_response(&e),
    }
}

async fn get_report(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResponse {
    match state.store.get_report(id) {
        Ok(Some(report)) => (
            StatusCode::OK,
            Json(serde_json::to_value(&report).unwrap_or_default()),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Report {} not found", id) })),
        ),
        Err(e) => error_response(&e),
    }
}

async fn delete_report(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResponse {
    match state.store.delete_report(id) {
        Ok(true) => (StatusCode::OK, Json(json!({ "deleted": id }))),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Report {} not found", id) })),
        ),
        Err(e) => error_response(&e),
    }
}

async fn get_vehicle(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> ApiResponse {
    match state.store.get_vehicle(id) {
        Ok(Some(vehicle)) => (
            StatusCode::OK,
            Json(serde_json::to_value(&vehicle).unwrap_or_default()),
        ),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Vehicle {} not found", id) })),
        ),
        Err(e) => error_response(&e),
    }
}
