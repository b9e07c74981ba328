//! CrashDesk Core — error type, configuration and data directory layout.

pub mod config;
pub mod error;

pub use config::{CrashDeskConfig, DataPaths};
pub use error::{Error, Result};
