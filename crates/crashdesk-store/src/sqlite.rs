//! SQLite store for crash reports, their vehicles and triage cases.
//!
//! A report is keyed by `(filename, crash_date)`; saving the same pair again
//! is a no-op that returns the existing id. Each vehicle can carry at most
//! one case, whose priority is computed when the case is opened.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::schema::SCHEMA_SQL;
use crate::types::*;
use crashdesk_core::{Error, Result};
use crashdesk_triage::{
    CasePriority, CaseStatus, InjuryStatus, ParsedReport, PriorityClassifier, VehicleField,
    VehicleFields,
};

const DB_FILE: &str = "crashdesk.db";
const DATE_FORMAT: &str = "%Y-%m-%d";
const REPORT_DATE_FORMAT: &str = "%m/%d/%Y";

const VEHICLE_COLUMNS: &str = "id, crash_report_id, vehicle_number, owner_name, owner_address, \
     make, model, year, damage, injuries, insurance_company, insurance_policy_number, \
     towing_company, created_at";

const CASE_COLUMNS: &str = "id, vehicle_id, status, priority, notes, created_at, updated_at";

/// Parse a `MM/DD/YYYY` crash date.
pub fn parse_crash_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), REPORT_DATE_FORMAT)
        .map_err(|_| Error::InvalidDate(value.to_string()))
}

/// SHA-256 of the source text, hex encoded.
pub fn source_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// SQLite store for reports, vehicles and cases.
pub struct CrashStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    classifier: PriorityClassifier,
}

impl CrashStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/db/`). The file will be `db_dir/crashdesk.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_classifier(db_dir, PriorityClassifier::default())
    }

    pub fn open_with_classifier(
        db_dir: impl AsRef<Path>,
        classifier: PriorityClassifier,
    ) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join(DB_FILE);

        let conn = Self::create_connection(&db_path)?;
        Self::init_schema(&conn)?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            classifier,
        };

        let stats = store.get_stats()?;
        info!(
            "CrashStore initialized: {} reports, {} vehicles, {} cases, path={}",
            stats.total_reports,
            stats.total_vehicles,
            stats.total_cases,
            store.db_path.display()
        );

        Ok(store)
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn classifier(&self) -> &PriorityClassifier {
        &self.classifier
    }

    // ---------------------------------------------------------------
    // Reports
    // ---------------------------------------------------------------

    /// Persist a parsed report and its vehicles in one transaction.
    ///
    /// Rejects replies with nothing extracted and crash dates that are not
    /// `MM/DD/YYYY`. A report already stored under the same filename and
    /// crash date is left untouched.
    pub fn save_report(
        &self,
        filename: &str,
        report: &ParsedReport,
        source_hash: Option<&str>,
    ) -> Result<SaveOutcome> {
        if report.is_all_default() {
            return Err(Error::EmptyReport);
        }
        let crash_date = parse_crash_date(&report.crash_date)?;
        let crash_date = crash_date.format(DATE_FORMAT).to_string();
        let now = now_millis();

        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM crash_reports WHERE filename = ?1 AND crash_date = ?2",
                params![filename, crash_date],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        if let Some(report_id) = existing {
            debug!("Report {} ({}) already stored as {}", filename, crash_date, report_id);
            return Ok(SaveOutcome {
                report_id,
                created: false,
            });
        }

        let report_id = tx
            .prepare_cached(
                "INSERT INTO crash_reports (filename, incident_summary, crash_date, source_hash, created_at, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![filename, report.incident_summary, crash_date, source_hash, now])
            .map_err(|e| Error::Database(e.to_string()))?;

        for vehicle in &report.vehicles {
            Self::insert_vehicle(&tx, report_id, vehicle, now)?;
        }

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        info!(
            "Saved report {} as {} with {} vehicle(s)",
            filename,
            report_id,
            report.vehicles.len()
        );
        Ok(SaveOutcome {
            report_id,
            created: true,
        })
    }

    fn insert_vehicle(
        conn: &Connection,
        report_id: i64,
        vehicle: &VehicleFields,
        now: i64,
    ) -> Result<i64> {
        let optional = |field: VehicleField| vehicle.get(field).map(|v| v.to_string());
        conn.prepare_cached(
            "INSERT INTO vehicles (crash_report_id, vehicle_number, owner_name, owner_address, make, model,
                                   year, damage, injuries, insurance_company, insurance_policy_number,
                                   towing_company, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .insert(params![
            report_id,
            vehicle.vehicle_number,
            vehicle.text(VehicleField::OwnerName),
            vehicle.text(VehicleField::OwnerAddress),
            vehicle.text(VehicleField::Make),
            vehicle.text(VehicleField::Model),
            vehicle.year(),
            vehicle.damage(),
            vehicle.injuries().as_str(),
            optional(VehicleField::InsuranceCompany),
            optional(VehicleField::InsurancePolicyNumber),
            optional(VehicleField::TowingCompany),
            now,
        ])
        .map_err(|e| Error::Database(e.to_string()))
    }

    /// Get a report with its vehicles.
    pub fn get_report(&self, report_id: i64) -> Result<Option<CrashReport>> {
        let conn = self.conn.lock();
        let report = conn
            .prepare_cached("SELECT * FROM crash_reports WHERE id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![report_id], Self::row_to_report)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        match report {
            Some(mut report) => {
                report.vehicles = Self::vehicles_for_report(&conn, report.id)?;
                Ok(Some(report))
            }
            None => Ok(None),
        }
    }

    /// List reports, newest crash first.
    pub fn filter_reports(&self, filter: &ReportFilter) -> Result<Vec<CrashReport>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<rusqlite::types::Value> = Vec::new();

        if let Some((min_year, max_year)) = filter.year_range {
            clauses.push(
                "EXISTS (SELECT 1 FROM vehicles v WHERE v.crash_report_id = r.id AND v.year BETWEEN ? AND ?)",
            );
            args.push(i64::from(min_year).into());
            args.push(i64::from(max_year).into());
        }
        if let Some((start, end)) = filter.date_range {
            clauses.push("r.crash_date BETWEEN ? AND ?");
            args.push(start.format(DATE_FORMAT).to_string().into());
            args.push(end.format(DATE_FORMAT).to_string().into());
        }

        let mut sql = String::from("SELECT r.* FROM crash_reports r");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY r.crash_date DESC, r.id DESC");

        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let mut reports = stmt
            .query_map(params_from_iter(args), Self::row_to_report)
            .map_err(|e| Error::Database(e.to_string()))?
            .filter_map(|r| r.ok())
            .collect::<Vec<_>>();
        drop(stmt);

        for report in &mut reports {
            report.vehicles = Self::vehicles_for_report(&conn, report.id)?;
        }
        Ok(reports)
    }

    /// Delete a report. Its vehicles and their cases go with it.
    pub fn delete_report(&self, report_id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        let affected = conn
            .execute("DELETE FROM crash_reports WHERE id = ?1", params![report_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(affected > 0)
    }

    fn vehicles_for_report(conn: &Connection, report_id: i64) -> Result<Vec<Vehicle>> {
        let sql = format!(
            "SELECT {} FROM vehicles WHERE crash_report_id = ?1 ORDER BY vehicle_number",
            VEHICLE_COLUMNS
        );
        let mut stmt = conn
            .prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![report_id], |row| Ok(Self::row_to_vehicle(row)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ---------------------------------------------------------------
    // Vehicles
    // ---------------------------------------------------------------

    pub fn get_vehicle(&self, vehicle_id: i64) -> Result<Option<Vehicle>> {
        let conn = self.conn.lock();
        Self::find_vehicle(&conn, vehicle_id)
    }

    fn find_vehicle(conn: &Connection, vehicle_id: i64) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {} FROM vehicles WHERE id = ?1", VEHICLE_COLUMNS);
        conn.prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![vehicle_id], |row| Ok(Self::row_to_vehicle(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    // ---------------------------------------------------------------
    // Cases
    // ---------------------------------------------------------------

    /// Open a case for a vehicle, classifying its priority.
    ///
    /// If the vehicle already has a case, that case is returned unchanged.
    pub fn create_case_for_vehicle(
        &self,
        vehicle_id: i64,
        notes: Option<&str>,
        current_year: i32,
    ) -> Result<CaseDetail> {
        let conn = self.conn.lock();
        let vehicle = Self::find_vehicle(&conn, vehicle_id)?
            .ok_or_else(|| Error::NotFound(format!("vehicle {}", vehicle_id)))?;

        if let Some(case) = Self::find_case_by_vehicle(&conn, vehicle_id)? {
            debug!("Vehicle {} already has case {}", vehicle_id, case.id);
            return Ok(CaseDetail { case, vehicle });
        }

        let priority = self
            .classifier
            .classify(&vehicle.damage, vehicle.year, current_year);
        let now = now_millis();
        let case_id = conn
            .prepare_cached(
                "INSERT INTO cases (vehicle_id, status, priority, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .insert(params![
                vehicle_id,
                CaseStatus::New.as_str(),
                priority.as_str(),
                notes,
                now
            ])
            .map_err(|e| Error::Database(e.to_string()))?;

        info!(
            "Opened case {} for vehicle {} with priority {}",
            case_id, vehicle_id, priority
        );
        let case = Self::find_case(&conn, case_id)?
            .ok_or_else(|| Error::Internal(format!("case {} vanished after insert", case_id)))?;
        Ok(CaseDetail { case, vehicle })
    }

    /// List cases with their vehicles, optionally filtered by status.
    pub fn list_cases(&self, status: Option<CaseStatus>) -> Result<Vec<CaseDetail>> {
        let conn = self.conn.lock();
        let cases: Vec<Case> = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM cases WHERE status = ?1 ORDER BY updated_at DESC, id DESC",
                    CASE_COLUMNS
                );
                let mut stmt = conn
                    .prepare_cached(&sql)
                    .map_err(|e| Error::Database(e.to_string()))?;
                let rows = stmt
                    .query_map(params![status.as_str()], |row| Ok(Self::row_to_case(row)))
                    .map_err(|e| Error::Database(e.to_string()))?;
                let cases: Vec<Case> = rows.filter_map(|r| r.ok()).collect();
                cases
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM cases ORDER BY updated_at DESC, id DESC",
                    CASE_COLUMNS
                );
                let mut stmt = conn
                    .prepare_cached(&sql)
                    .map_err(|e| Error::Database(e.to_string()))?;
                let rows = stmt
                    .query_map([], |row| Ok(Self::row_to_case(row)))
                    .map_err(|e| Error::Database(e.to_string()))?;
                let cases: Vec<Case> = rows.filter_map(|r| r.ok()).collect();
                cases
            }
        };

        let mut details = Vec::with_capacity(cases.len());
        for case in cases {
            if let Some(vehicle) = Self::find_vehicle(&conn, case.vehicle_id)? {
                details.push(CaseDetail { case, vehicle });
            }
        }
        Ok(details)
    }

    pub fn get_case(&self, case_id: i64) -> Result<Option<CaseDetail>> {
        let conn = self.conn.lock();
        Self::find_case_detail(&conn, case_id)
    }

    /// Move a case along its lifecycle.
    pub fn update_case_status(&self, case_id: i64, status: CaseStatus) -> Result<CaseDetail> {
        let conn = self.conn.lock();
        let case = Self::find_case(&conn, case_id)?
            .ok_or_else(|| Error::NotFound(format!("case {}", case_id)))?;
        let next = case.status.transition(status)?;
        if next != case.status {
            conn.execute(
                "UPDATE cases SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![next.as_str(), now_millis(), case_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
            info!("Case {}: {} -> {}", case_id, case.status, next);
        }
        Self::require_case_detail(&conn, case_id)
    }

    pub fn update_case_notes(&self, case_id: i64, notes: Option<&str>) -> Result<CaseDetail> {
        let conn = self.conn.lock();
        let affected = conn
            .execute(
                "UPDATE cases SET notes = ?1, updated_at = ?2 WHERE id = ?3",
                params![notes, now_millis(), case_id],
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        if affected == 0 {
            return Err(Error::NotFound(format!("case {}", case_id)));
        }
        Self::require_case_detail(&conn, case_id)
    }

    /// Re-run the classifier against the vehicle's stored damage and year.
    pub fn recompute_case_priority(&self, case_id: i64, current_year: i32) -> Result<CaseDetail> {
        let conn = self.conn.lock();
        let detail = Self::require_case_detail(&conn, case_id)?;
        let priority = self.classifier.classify(
            &detail.vehicle.damage,
            detail.vehicle.year,
            current_year,
        );
        if priority == detail.case.priority {
            return Ok(detail);
        }
        Self::set_priority(&conn, case_id, priority)?;
        Self::require_case_detail(&conn, case_id)
    }

    /// Set a priority by hand. This is the only way a case becomes `URGENT`.
    pub fn override_case_priority(
        &self,
        case_id: i64,
        priority: CasePriority,
    ) -> Result<CaseDetail> {
        let conn = self.conn.lock();
        if Self::find_case(&conn, case_id)?.is_none() {
            return Err(Error::NotFound(format!("case {}", case_id)));
        }
        Self::set_priority(&conn, case_id, priority)?;
        Self::require_case_detail(&conn, case_id)
    }

    fn set_priority(conn: &Connection, case_id: i64, priority: CasePriority) -> Result<()> {
        conn.execute(
            "UPDATE cases SET priority = ?1, updated_at = ?2 WHERE id = ?3",
            params![priority.as_str(), now_millis(), case_id],
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        info!("Case {} priority set to {}", case_id, priority);
        Ok(())
    }

    fn find_case(conn: &Connection, case_id: i64) -> Result<Option<Case>> {
        let sql = format!("SELECT {} FROM cases WHERE id = ?1", CASE_COLUMNS);
        conn.prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![case_id], |row| Ok(Self::row_to_case(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn find_case_by_vehicle(conn: &Connection, vehicle_id: i64) -> Result<Option<Case>> {
        let sql = format!("SELECT {} FROM cases WHERE vehicle_id = ?1", CASE_COLUMNS);
        conn.prepare_cached(&sql)
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![vehicle_id], |row| Ok(Self::row_to_case(row)))
            .optional()
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn find_case_detail(conn: &Connection, case_id: i64) -> Result<Option<CaseDetail>> {
        let case = match Self::find_case(conn, case_id)? {
            Some(case) => case,
            None => return Ok(None),
        };
        Ok(Self::find_vehicle(conn, case.vehicle_id)?.map(|vehicle| CaseDetail { case, vehicle }))
    }

    fn require_case_detail(conn: &Connection, case_id: i64) -> Result<CaseDetail> {
        Self::find_case_detail(conn, case_id)?
            .ok_or_else(|| Error::NotFound(format!("case {}", case_id)))
    }

    // ---------------------------------------------------------------
    // Stats
    // ---------------------------------------------------------------

    pub fn get_stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();
        let count = |sql: &str| -> Result<i64> {
            conn.query_row(sql, [], |row| row.get(0))
                .map_err(|e| Error::Database(e.to_string()))
        };
        let total_reports = count("SELECT COUNT(*) FROM crash_reports")?;
        let total_vehicles = count("SELECT COUNT(*) FROM vehicles")?;
        let total_cases = count("SELECT COUNT(*) FROM cases")?;
        let open_cases = count("SELECT COUNT(*) FROM cases WHERE status IN ('NEW', 'IN_PROGRESS')")?;
        drop(conn);

        let db_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(StoreStats {
            total_reports,
            total_vehicles,
            total_cases,
            open_cases,
            db_path: self.db_path.to_string_lossy().to_string(),
            db_size_mb: (db_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0,
        })
    }

    // ---------------------------------------------------------------
    // Row mapping
    // ---------------------------------------------------------------

    fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<CrashReport> {
        let crash_date: String = row.get("crash_date")?;
        Ok(CrashReport {
            id: row.get("id")?,
            filename: row.get("filename").unwrap_or_default(),
            incident_summary: row.get("incident_summary").unwrap_or_default(),
            crash_date: NaiveDate::parse_from_str(&crash_date, DATE_FORMAT).unwrap_or_default(),
            source_hash: row.get("source_hash").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
            processed_at: row.get("processed_at").unwrap_or(0),
            vehicles: Vec::new(),
        })
    }

    fn row_to_vehicle(row: &rusqlite::Row<'_>) -> Vehicle {
        Vehicle {
            id: row.get("id").unwrap_or(0),
            crash_report_id: row.get("crash_report_id").unwrap_or(0),
            vehicle_number: row.get("vehicle_number").unwrap_or(0),
            owner_name: row.get("owner_name").unwrap_or_default(),
            owner_address: row.get("owner_address").unwrap_or_default(),
            make: row.get("make").unwrap_or_default(),
            model: row.get("model").unwrap_or_default(),
            year: row.get("year").ok().flatten(),
            damage: row.get("damage").unwrap_or_default(),
            injuries: row
                .get::<_, String>("injuries")
                .map(|s| InjuryStatus::normalize(&s))
                .unwrap_or(InjuryStatus::NotSpecified),
            insurance_company: row.get("insurance_company").ok().flatten(),
            insurance_policy_number: row.get("insurance_policy_number").ok().flatten(),
            towing_company: row.get("towing_company").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
        }
    }

    fn row_to_case(row: &rusqlite::Row<'_>) -> Case {
        Case {
            id: row.get("id").unwrap_or(0),
            vehicle_id: row.get("vehicle_id").unwrap_or(0),
            status: row
                .get::<_, String>("status")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(CaseStatus::New),
            priority: row
                .get::<_, String>("priority")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(CasePriority::Low),
            notes: row.get("notes").ok().flatten(),
            created_at: row.get("created_at").unwrap_or(0),
            updated_at: row.get("updated_at").unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashdesk_triage::parse_reply;
    use tempfile::TempDir;

    const NOW: i32 = 2026;

    const REPLY: &str = "INCIDENT SUMMARY:\nTwo vehicles collided at an intersection.\n\n\
CRASH DATE: 03/15/2023\n\n\
VEHICLE 1:\nOwner Name: John Doe\nMake: Honda\nModel: Civic\nYear: 2021\n\
Damage: Severe front-end damage\nInjuries: Suspected minor injury\nInsurance Company: Acme Mutual\n\n\
VEHICLE 2:\nOwner Name: Jane Roe\nMake: Ford\nModel: F-150\nYear: 2005\n\
Damage: Minor scratches\nInjuries: bruised knee\n";

    fn test_store() -> (CrashStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = CrashStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn saved_report(store: &CrashStore) -> CrashReport {
        let outcome = store
            .save_report("report.pdf", &parse_reply(REPLY), Some(&source_hash(REPLY)))
            .unwrap();
        store.get_report(outcome.report_id).unwrap().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_save_and_get_report() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);

        assert_eq!(report.filename, "report.pdf");
        assert_eq!(report.crash_date, date(2023, 3, 15));
        assert_eq!(report.vehicles.len(), 2);
        assert_eq!(report.source_hash.as_deref(), Some(source_hash(REPLY).as_str()));

        let first = &report.vehicles[0];
        assert_eq!(first.vehicle_number, 1);
        assert_eq!(first.make, "Honda");
        assert_eq!(first.year, Some(2021));
        assert_eq!(first.injuries, InjuryStatus::SuspectedMinorInjury);
        assert_eq!(first.owner_address, "Not specified");
        assert_eq!(first.insurance_company.as_deref(), Some("Acme Mutual"));
        assert_eq!(first.towing_company, None);

        assert_eq!(report.vehicles[1].injuries, InjuryStatus::NotSpecified);
    }

    #[test]
    fn test_save_is_idempotent() {
        let (store, _dir) = test_store();
        let parsed = parse_reply(REPLY);
        let first = store.save_report("report.pdf", &parsed, None).unwrap();
        let second = store.save_report("report.pdf", &parsed, None).unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.report_id, second.report_id);
        assert_eq!(store.get_stats().unwrap().total_vehicles, 2);

        let other = store.save_report("other.pdf", &parsed, None).unwrap();
        assert!(other.created);
        assert_ne!(other.report_id, first.report_id);
    }

    #[test]
    fn test_rejects_empty_report() {
        let (store, _dir) = test_store();
        let err = store
            .save_report("empty.pdf", &ParsedReport::default(), None)
            .unwrap_err();
        assert!(matches!(err, Error::EmptyReport));
        assert_eq!(store.get_stats().unwrap().total_reports, 0);
    }

    #[test]
    fn test_rejects_bad_date() {
        let (store, _dir) = test_store();
        let parsed = parse_reply("INCIDENT SUMMARY: x\nCRASH DATE: March 3rd\n");
        let err = store.save_report("x.pdf", &parsed, None).unwrap_err();
        assert!(matches!(err, Error::InvalidDate(_)));
    }

    #[test]
    fn test_non_integer_year_is_null() {
        let (store, _dir) = test_store();
        let parsed = parse_reply("CRASH DATE: 01/02/2020\nVEHICLE 1:\nYear: unknown\nMake: Kia");
        let outcome = store.save_report("y.pdf", &parsed, None).unwrap();
        let report = store.get_report(outcome.report_id).unwrap().unwrap();
        assert_eq!(report.vehicles[0].year, None);
        assert_eq!(report.incident_summary, "Not specified");
    }

    #[test]
    fn test_filter_reports() {
        let (store, _dir) = test_store();
        saved_report(&store);
        let older = parse_reply("CRASH DATE: 06/01/2019\nVEHICLE 1:\nMake: Kia\nYear: 1998");
        store.save_report("older.pdf", &older, None).unwrap();

        let all = store.filter_reports(&ReportFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].filename, "report.pdf");

        let by_year = store
            .filter_reports(&ReportFilter {
                year_range: Some((1995, 2000)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].filename, "older.pdf");

        let by_date = store
            .filter_reports(&ReportFilter {
                date_range: Some((date(2023, 1, 1), date(2023, 3, 15))),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_date.len(), 1);
        assert_eq!(by_date[0].filename, "report.pdf");

        let none = store
            .filter_reports(&ReportFilter {
                year_range: Some((2021, 2022)),
                date_range: Some((date(2019, 1, 1), date(2019, 12, 31))),
            })
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_create_case_classifies_priority() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);

        let high = store
            .create_case_for_vehicle(report.vehicles[0].id, Some("call owner"), NOW)
            .unwrap();
        assert_eq!(high.case.priority, CasePriority::High);
        assert_eq!(high.case.status, CaseStatus::New);
        assert_eq!(high.case.notes.as_deref(), Some("call owner"));
        assert_eq!(high.vehicle.make, "Honda");

        let low = store
            .create_case_for_vehicle(report.vehicles[1].id, None, NOW)
            .unwrap();
        assert_eq!(low.case.priority, CasePriority::Low);
    }

    #[test]
    fn test_case_for_out_of_range_year() {
        let (store, _dir) = test_store();
        let reply = "CRASH DATE: 06/01/2024\n\nVEHICLE 1:\nMake: Kia\nYear: -2147483648\nDamage: minor";
        let saved = store
            .save_report("odd.pdf", &parse_reply(reply), None)
            .unwrap();
        let report = store.get_report(saved.report_id).unwrap().unwrap();
        assert_eq!(report.vehicles[0].year, Some(i32::MIN));

        let detail = store
            .create_case_for_vehicle(report.vehicles[0].id, None, NOW)
            .unwrap();
        assert_eq!(detail.case.priority, CasePriority::Low);
    }

    #[test]
    fn test_timestamps_are_wall_clock_millis() {
        let before = now_millis();
        assert!(before > 1_600_000_000_000);
        let (store, _dir) = test_store();
        let report = saved_report(&store);
        assert!(report.created_at >= before);
        assert_eq!(report.created_at, report.processed_at);
    }

    #[test]
    fn test_create_case_returns_existing() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);
        let vehicle_id = report.vehicles[0].id;
        let first = store.create_case_for_vehicle(vehicle_id, None, NOW).unwrap();
        let again = store
            .create_case_for_vehicle(vehicle_id, Some("ignored"), NOW)
            .unwrap();
        assert_eq!(first.case.id, again.case.id);
        assert_eq!(again.case.notes, None);
        assert_eq!(store.get_stats().unwrap().total_cases, 1);
    }

    #[test]
    fn test_create_case_missing_vehicle() {
        let (store, _dir) = test_store();
        let err = store.create_case_for_vehicle(999, None, NOW).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_case_status_lifecycle() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);
        let case_id = store
            .create_case_for_vehicle(report.vehicles[0].id, None, NOW)
            .unwrap()
            .case
            .id;

        let err = store
            .update_case_status(case_id, CaseStatus::Closed)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let detail = store
            .update_case_status(case_id, CaseStatus::InProgress)
            .unwrap();
        assert_eq!(detail.case.status, CaseStatus::InProgress);
        let detail = store.update_case_status(case_id, CaseStatus::Lost).unwrap();
        assert_eq!(detail.case.status, CaseStatus::Lost);

        assert_eq!(store.list_cases(Some(CaseStatus::Lost)).unwrap().len(), 1);
        assert!(store.list_cases(Some(CaseStatus::New)).unwrap().is_empty());
        assert_eq!(store.get_stats().unwrap().open_cases, 0);

        let missing = store.update_case_status(999, CaseStatus::InProgress);
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_priority_override_and_recompute() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);
        let case_id = store
            .create_case_for_vehicle(report.vehicles[1].id, None, NOW)
            .unwrap()
            .case
            .id;

        let urgent = store
            .override_case_priority(case_id, CasePriority::Urgent)
            .unwrap();
        assert_eq!(urgent.case.priority, CasePriority::Urgent);

        let recomputed = store.recompute_case_priority(case_id, NOW).unwrap();
        assert_eq!(recomputed.case.priority, CasePriority::Low);

        // The 2005 Ford counts as recent relative to 2010.
        let recomputed = store.recompute_case_priority(case_id, 2010).unwrap();
        assert_eq!(recomputed.case.priority, CasePriority::Medium);
    }

    #[test]
    fn test_update_notes() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);
        let case_id = store
            .create_case_for_vehicle(report.vehicles[0].id, None, NOW)
            .unwrap()
            .case
            .id;
        let detail = store.update_case_notes(case_id, Some("left voicemail")).unwrap();
        assert_eq!(detail.case.notes.as_deref(), Some("left voicemail"));
        assert!(matches!(
            store.update_case_notes(999, None),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_report_cascades() {
        let (store, _dir) = test_store();
        let report = saved_report(&store);
        store
            .create_case_for_vehicle(report.vehicles[0].id, None, NOW)
            .unwrap();
        assert!(store.delete_report(report.id).unwrap());
        assert!(!store.delete_report(report.id).unwrap());

        let stats = store.get_stats().unwrap();
        assert_eq!(stats.total_reports, 0);
        assert_eq!(stats.total_vehicles, 0);
        assert_eq!(stats.total_cases, 0);
    }

    #[test]
    fn test_reopen_persists() {
        let dir = TempDir::new().unwrap();
        {
            let store = CrashStore::open(dir.path()).unwrap();
            saved_report(&store);
        }
        let store = CrashStore::open(dir.path()).unwrap();
        assert_eq!(store.get_stats().unwrap().total_reports, 1);
        assert!(store.db_path().ends_with("crashdesk.db"));
    }

    #[test]
    fn test_parse_crash_date() {
        assert_eq!(parse_crash_date(" 12/31/2022 ").unwrap(), date(2022, 12, 31));
        assert!(parse_crash_date("2022-12-31").is_err());
        assert!(parse_crash_date("Not specified").is_err());
        assert_eq!(source_hash("abc").len(), 64);
    }
}
