//! Database schema SQL.

/// Reports, vehicles and cases.
///
/// `crash_date` is stored as ISO `YYYY-MM-DD` so it sorts and compares as text.
/// The CHECK lists mirror `InjuryStatus`, `CaseStatus` and `CasePriority`.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS crash_reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    incident_summary TEXT NOT NULL,
    crash_date TEXT NOT NULL,
    source_hash TEXT,
    created_at INTEGER NOT NULL,
    processed_at INTEGER NOT NULL,
    UNIQUE (filename, crash_date)
);

CREATE INDEX IF NOT EXISTS idx_crash_reports_date ON crash_reports(crash_date);

CREATE TABLE IF NOT EXISTS vehicles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    crash_report_id INTEGER NOT NULL REFERENCES crash_reports(id) ON DELETE CASCADE,
    vehicle_number INTEGER NOT NULL,
    owner_name TEXT NOT NULL,
    owner_address TEXT NOT NULL,
    make TEXT NOT NULL,
    model TEXT NOT NULL,
    year INTEGER,
    damage TEXT NOT NULL,
    injuries TEXT NOT NULL CHECK (injuries IN (
        'No apparent injury',
        'Suspected minor injury',
        'Suspected serious injury',
        'Fatal injury',
        'Not specified'
    )),
    insurance_company TEXT,
    insurance_policy_number TEXT,
    towing_company TEXT,
    created_at INTEGER NOT NULL,
    UNIQUE (crash_report_id, vehicle_number)
);

CREATE INDEX IF NOT EXISTS idx_vehicles_report ON vehicles(crash_report_id);
CREATE INDEX IF NOT EXISTS idx_vehicles_year ON vehicles(year);

CREATE TABLE IF NOT EXISTS cases (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    vehicle_id INTEGER NOT NULL UNIQUE REFERENCES vehicles(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'NEW' CHECK (status IN ('NEW', 'IN_PROGRESS', 'CLOSED', 'LOST')),
    priority TEXT NOT NULL CHECK (priority IN ('LOW', 'MEDIUM', 'HIGH', 'URGENT')),
    notes TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cases_status ON cases(status);
"#;
