//! Row types for reports, vehicles and cases.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crashdesk_triage::{CasePriority, CaseStatus, InjuryStatus};

/// A crash report row with its vehicles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashReport {
    pub id: i64,
    pub filename: String,
    pub incident_summary: String,
    pub crash_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<String>,
    pub created_at: i64,
    pub processed_at: i64,
    pub vehicles: Vec<Vehicle>,
}

/// A vehicle row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: i64,
    pub crash_report_id: i64,
    pub vehicle_number: i64,
    pub owner_name: String,
    pub owner_address: String,
    pub make: String,
    pub model: String,
    /// NULL when the parsed year was not an integer.
    pub year: Option<i32>,
    pub damage: String,
    pub injuries: InjuryStatus,
    pub insurance_company: Option<String>,
    pub insurance_policy_number: Option<String>,
    pub towing_company: Option<String>,
    pub created_at: i64,
}

/// A triage case row. Priority is fixed at creation unless explicitly changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Case {
    pub id: i64,
    pub vehicle_id: i64,
    pub status: CaseStatus,
    pub priority: CasePriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A case joined with the vehicle it tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseDetail {
    #[serde(flatten)]
    pub case: Case,
    pub vehicle: Vehicle,
}

/// Result of saving a parsed report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub report_id: i64,
    /// False when a report with the same filename and crash date already existed.
    pub created: bool,
}

/// Report listing filters. Both ranges are inclusive.
#[derive(Debug, Clone, Default)]
pub struct ReportFilter {
    /// Matches reports with at least one vehicle whose model year is in range.
    pub year_range: Option<(i32, i32)>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Store-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_reports: i64,
    pub total_vehicles: i64,
    pub total_cases: i64,
    pub open_cases: i64,
    pub db_path: String,
    pub db_size_mb: f64,
}
