//! CrashDesk Store — SQLite persistence for crash reports, vehicles and cases.

pub mod schema;
pub mod sqlite;
pub mod types;

pub use sqlite::{parse_crash_date, source_hash, CrashStore};
pub use types::*;
