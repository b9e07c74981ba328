//! CrashDesk Triage — turns templated model replies into typed crash records.
//!
//! Pure, synchronous building blocks with no I/O beyond optional rule-table
//! loading: field sanitizing, section segmentation, reply parsing, injury
//! normalization, case priority and case status rules.

pub mod case;
pub mod injury;
pub mod parser;
pub mod priority;
pub mod sanitize;
pub mod sections;
pub mod vehicle;

/// Sentinel for a field that could not be extracted.
pub const NOT_SPECIFIED: &str = "Not specified";

pub use case::CaseStatus;
pub use injury::InjuryStatus;
pub use parser::{parse_reply, ParsedReport, ResponseParser};
pub use priority::{classify, CasePriority, PriorityClassifier};
pub use sanitize::{sanitize, strip_non_ascii, ArtifactRule, ArtifactTable, FieldSanitizer};
pub use sections::{HeaderTable, Section, SectionKind, SectionLocator};
pub use vehicle::{FieldValue, VehicleField, VehicleFields};
