//! Analysis reply parsing — templated free text into a [`ParsedReport`].
//!
//! Replies come from a language model that was asked to follow a fixed
//! template, so malformed input is the normal case. Parsing never fails:
//! anything that cannot be extracted falls back to the `"Not specified"`
//! sentinel, and a reply with no recognizable headers yields an all-default
//! report (see [`ParsedReport::is_all_default`]).

use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crashdesk_core::Result;

use crate::sanitize::FieldSanitizer;
use crate::sections::{HeaderTable, SectionKind, SectionLocator};
use crate::vehicle::{VehicleField, VehicleFields};
use crate::NOT_SPECIFIED;

static DEFAULT_PARSER: Lazy<ResponseParser> = Lazy::new(ResponseParser::default);

/// Structured result of one analysis reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedReport {
    pub incident_summary: String,
    /// `MM/DD/YYYY` when the model followed the template; not validated here.
    pub crash_date: String,
    /// Ordered by vehicle number.
    pub vehicles: Vec<VehicleFields>,
}

impl Default for ParsedReport {
    fn default() -> Self {
        Self {
            incident_summary: NOT_SPECIFIED.to_string(),
            crash_date: NOT_SPECIFIED.to_string(),
            vehicles: Vec::new(),
        }
    }
}

impl ParsedReport {
    /// True when nothing usable was extracted.
    pub fn is_all_default(&self) -> bool {
        self.incident_summary == NOT_SPECIFIED
            && self.crash_date == NOT_SPECIFIED
            && self.vehicles.is_empty()
    }

    pub fn vehicle(&self, number: u32) -> Option<&VehicleFields> {
        self.vehicles.iter().find(|v| v.vehicle_number == number)
    }
}

/// Reply parser: a sanitizer plus a compiled header table.
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    sanitizer: FieldSanitizer,
    locator: SectionLocator,
}

impl ResponseParser {
    pub fn new(sanitizer: FieldSanitizer, headers: &HeaderTable) -> Result<Self> {
        Ok(Self {
            sanitizer,
            locator: SectionLocator::new(headers)?,
        })
    }

    /// Build a parser from on-disk overrides, falling back to the built-in tables.
    pub fn load(artifact_rules: &Path, section_headers: &Path) -> Self {
        let sanitizer = FieldSanitizer::load_or_default(artifact_rules);
        let headers = HeaderTable::load_or_default(section_headers);
        // load_or_default only returns validated tables
        Self::new(sanitizer, &headers).unwrap_or_default()
    }

    pub fn sanitizer(&self) -> &FieldSanitizer {
        &self.sanitizer
    }

    pub fn headers(&self) -> &HeaderTable {
        self.locator.headers()
    }

    /// Parse a raw model reply. Total: returns a report for every input.
    pub fn parse(&self, reply: &str) -> ParsedReport {
        let text = self.sanitizer.unwrap_reply(reply);
        let sections = self.locator.segment(&text);

        if sections.is_empty() {
            debug!("No section headers found in {}-byte reply", reply.len());
            return ParsedReport::default();
        }

        let mut report = ParsedReport::default();
        let mut summary_seen = false;
        let mut date_seen = false;

        for section in &sections {
            match section.kind {
                SectionKind::IncidentSummary if !summary_seen => {
                    summary_seen = true;
                    report.incident_summary = self.sentinel_or(section.body);
                }
                SectionKind::CrashDate if !date_seen => {
                    date_seen = true;
                    report.crash_date = self.sentinel_or(section.body);
                }
                SectionKind::Vehicle(number) => {
                    if report.vehicle(number).is_some() {
                        debug!("Ignoring repeated VEHICLE {} block", number);
                        continue;
                    }
                    report.vehicles.push(self.parse_vehicle(number, section.body));
                }
                _ => {}
            }
        }

        if !summary_seen {
            debug!("Reply has no incident summary section");
        }
        if !date_seen {
            debug!("Reply has no crash date section");
        }

        // Label order, not text order.
        report.vehicles.sort_by_key(|v| v.vehicle_number);
        report
    }

    fn sentinel_or(&self, body: &str) -> String {
        let cleaned = self.sanitizer.sanitize(body);
        if cleaned.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            cleaned
        }
    }

    fn parse_vehicle(&self, number: u32, body: &str) -> VehicleFields {
        let mut vehicle = VehicleFields::new(number);

        for line in body.lines() {
            // First colon only: addresses and notes may contain more.
            let Some((label, value)) = line.split_once(':') else {
                continue;
            };
            match VehicleField::from_label(label) {
                Some(field) => {
                    let value = self.sanitizer.sanitize(value);
                    if !vehicle.set(field, &value) {
                        debug!("VEHICLE {}: duplicate {:?} ignored", number, field.key());
                    }
                }
                None => debug!("VEHICLE {}: ignoring label {:?}", number, label.trim()),
            }
        }

        vehicle
    }
}

/// Parse with the built-in artifact and header tables.
pub fn parse_reply(reply: &str) -> ParsedReport {
    DEFAULT_PARSER.parse(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injury::InjuryStatus;
    use crate::vehicle::FieldValue;

    const FULL_REPLY: &str = "INCIDENT SUMMARY:
Vehicle 1 rear-ended Vehicle 2 at a red light on Elm St. Both drivers remained on scene.

CRASH DATE: 03/09/2024

VEHICLE 1:
Owner Name: Jane Doe
Owner Address: 12 Elm St, Springfield, IL 62701
Make: Toyota
Model: Camry
Year: 2021
Damage: Severe front-end damage, airbags deployed
Injuries: Suspected minor injury
Insurance Company: State Farm
Insurance Policy #: SF-123-456
Towing Company: Joe's Towing

VEHICLE 2:
Owner Name: John Roe
Owner Address: Not specified
Make: Ford
Model: F-150
Year: Not specified
Damage: Rear bumper scratches
Injuries: No apparent injury
Insurance Company: Not specified
Insurance Policy #: Not specified
Towing Company: Not specified";

    #[test]
    fn test_end_to_end_scenario() {
        let reply = "INCIDENT SUMMARY:\nCar hit pole.\n\nCRASH DATE: 01/15/2024\n\nVEHICLE 1:\nMake: Honda\nModel: Civic\nYear: 2019\nDamage: minor\nInjuries: No apparent injury";
        let report = parse_reply(reply);

        assert_eq!(report.incident_summary, "Car hit pole.");
        assert_eq!(report.crash_date, "01/15/2024");
        assert_eq!(report.vehicles.len(), 1);

        let v = &report.vehicles[0];
        assert_eq!(v.vehicle_number, 1);
        assert_eq!(v.text(VehicleField::Make), "Honda");
        assert_eq!(v.text(VehicleField::Model), "Civic");
        assert_eq!(v.get(VehicleField::Year), Some(&FieldValue::Integer(2019)));
        assert_eq!(v.text(VehicleField::Injuries), "No apparent injury");
        assert_eq!(v.text(VehicleField::OwnerName), NOT_SPECIFIED);
    }

    #[test]
    fn test_full_template() {
        let report = parse_reply(FULL_REPLY);
        assert!(report.incident_summary.starts_with("Vehicle 1 rear-ended Vehicle 2"));
        assert_eq!(report.crash_date, "03/09/2024");
        assert_eq!(report.vehicles.len(), 2);

        let v1 = &report.vehicles[0];
        assert_eq!(v1.text(VehicleField::OwnerAddress), "12 Elm St, Springfield, IL 62701");
        assert_eq!(v1.text(VehicleField::InsurancePolicyNumber), "SF-123-456");
        assert_eq!(v1.text(VehicleField::TowingCompany), "Joe's Towing");
        assert_eq!(v1.injuries(), InjuryStatus::SuspectedMinorInjury);
        assert_eq!(v1.year(), Some(2021));

        let v2 = &report.vehicles[1];
        assert_eq!(v2.vehicle_number, 2);
        assert_eq!(v2.get(VehicleField::Year), Some(&FieldValue::Text("Not specified".into())));
        assert_eq!(v2.year(), None);
    }

    #[test]
    fn test_summary_mentioning_vehicles_is_not_split() {
        // "Vehicle 1" in prose is not the upper-case header.
        let report = parse_reply(FULL_REPLY);
        assert!(report.incident_summary.contains("Both drivers remained on scene."));
    }

    #[test]
    fn test_parse_is_total() {
        for input in [
            "",
            "   \n\n  ",
            "\u{1f697}\u{1f4a5}\u{4e2d}\u{6587}",
            "The model refused to answer.",
            "VEHICLE",
            "VEHICLE :",
            "CRASH DATE:",
            ":::\n:",
        ] {
            let report = parse_reply(input);
            assert!(report.vehicles.is_empty(), "{:?}", input);
        }
        assert!(parse_reply("").is_all_default());
        assert!(parse_reply("\u{1f697}\u{1f4a5}").is_all_default());
    }

    #[test]
    fn test_reversed_header_order() {
        let reply = "VEHICLE 2:\nMake: Ford\n\nVEHICLE 1:\nMake: Honda\n\nCRASH DATE: 05/05/2020\n\nINCIDENT SUMMARY:\nBackwards.";
        let report = parse_reply(reply);
        assert_eq!(report.incident_summary, "Backwards.");
        assert_eq!(report.crash_date, "05/05/2020");
        let numbers: Vec<u32> = report.vehicles.iter().map(|v| v.vehicle_number).collect();
        assert_eq!(numbers, vec![1, 2]);
        assert_eq!(report.vehicles[0].text(VehicleField::Make), "Honda");
        assert_eq!(report.vehicles[1].text(VehicleField::Make), "Ford");
    }

    #[test]
    fn test_colon_in_value() {
        let reply = "VEHICLE 1:\nOwner Address: 123 Main St, Apt 4: North Wing";
        let report = parse_reply(reply);
        assert_eq!(
            report.vehicles[0].text(VehicleField::OwnerAddress),
            "123 Main St, Apt 4: North Wing"
        );
    }

    #[test]
    fn test_injury_whitelist() {
        for raw in ["minor", "Fatal", "Suspected Minor Injury", "N/A"] {
            let reply = format!("VEHICLE 1:\nInjuries: {}", raw);
            let report = parse_reply(&reply);
            assert_eq!(report.vehicles[0].text(VehicleField::Injuries), "Not specified");
        }
    }

    #[test]
    fn test_single_vehicle_only() {
        let report = parse_reply("VEHICLE 1:\nMake: Subaru\nModel: Outback");
        assert_eq!(report.vehicles.len(), 1);
        assert_eq!(report.incident_summary, NOT_SPECIFIED);
        assert_eq!(report.crash_date, NOT_SPECIFIED);
        assert!(!report.is_all_default());
    }

    #[test]
    fn test_more_than_two_vehicles() {
        let reply = "VEHICLE 3:\nMake: C\nVEHICLE 1:\nMake: A\nVEHICLE 2:\nMake: B";
        let report = parse_reply(reply);
        let makes: Vec<String> = report
            .vehicles
            .iter()
            .map(|v| v.text(VehicleField::Make))
            .collect();
        assert_eq!(makes, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_unknown_labels_and_prose_ignored() {
        let reply = "VEHICLE 1:\nVIN: 1HGCM82633A004352\nMake: Honda\nThe driver fled.\nColor: red";
        let v = &parse_reply(reply).vehicles[0];
        assert_eq!(v.fields.len(), 1);
        assert_eq!(v.text(VehicleField::Make), "Honda");
    }

    #[test]
    fn test_empty_header_bodies_use_sentinel() {
        let report = parse_reply("INCIDENT SUMMARY:\n\nCRASH DATE:\n\nVEHICLE 1:\nMake:");
        assert_eq!(report.incident_summary, NOT_SPECIFIED);
        assert_eq!(report.crash_date, NOT_SPECIFIED);
        assert_eq!(report.vehicles[0].text(VehicleField::Make), NOT_SPECIFIED);
    }

    #[test]
    fn test_wrapped_client_reply() {
        let reply = "[TextBlock(text='INCIDENT SUMMARY:\\nCar hit pole.\\n\\nCRASH DATE: 01/15/2024\\n\\nVEHICLE 1:\\nOwner Name: Pat O\\'Neil\\nMake: Honda', type='text')]";
        let report = parse_reply(reply);
        assert_eq!(report.incident_summary, "Car hit pole.");
        assert_eq!(report.crash_date, "01/15/2024");
        assert_eq!(report.vehicles[0].text(VehicleField::OwnerName), "Pat O'Neil");
        assert_eq!(report.vehicles[0].text(VehicleField::Make), "Honda");
    }

    #[test]
    fn test_high_code_points_in_values() {
        let reply = "VEHICLE 1:\nOwner Name: Jos\u{e9} Mu\u{f1}oz\nDamage: dent \u{2014} left door";
        let v = &parse_reply(reply).vehicles[0];
        assert_eq!(v.text(VehicleField::OwnerName), "Jos  Mu oz");
        assert_eq!(v.damage(), "dent   left door");
    }

    #[test]
    fn test_markdown_bullets() {
        let reply = "VEHICLE 1:\n- **Make:** Mazda\n- Model: 3";
        let v = &parse_reply(reply).vehicles[0];
        assert_eq!(v.text(VehicleField::Model), "3");
    }

    #[test]
    fn test_parser_from_missing_override_files() {
        let dir = tempfile::tempdir().unwrap();
        let parser = ResponseParser::load(
            &dir.path().join("artifact-rules.json"),
            &dir.path().join("section-headers.json"),
        );
        assert_eq!(parser.sanitizer().version(), 1);
        assert_eq!(parser.headers().crash_date, "CRASH DATE:");
    }
}
