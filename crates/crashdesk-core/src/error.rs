//! Error types for CrashDesk.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid crash date: {0:?} (expected MM/DD/YYYY)")]
    InvalidDate(String),

    #[error("Report has no usable fields")]
    EmptyReport,

    #[error("Invalid case status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Upstream API error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a failed model call is worth retrying.
    ///
    /// Transport failures, rate limits and server-side errors are transient;
    /// everything else (bad request, bad key, configuration) is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) => true,
            Error::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
