//! Error to HTTP response mapping.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crashdesk_core::Error;

pub type ApiResponse = (StatusCode, Json<Value>);

pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidTransition { .. } => StatusCode::CONFLICT,
        Error::EmptyReport | Error::InvalidDate(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::Config(_) => StatusCode::BAD_REQUEST,
        Error::Http(_) | Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(error: &Error) -> ApiResponse {
    (status_for(error), Json(json!({ "error": error.to_string() })))
}

pub fn bad_request(message: impl Into<String>) -> ApiResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": message.into() })),
    )
}
