//! CrashDesk HTTP service: analyze crash reports, browse stored reports,
//! and work vehicle cases.

pub mod error;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
