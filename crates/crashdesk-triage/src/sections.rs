//! Section segmentation for templated analysis replies.
//!
//! Headers are located by search rather than by position, so a missing
//! section never shifts the others. The header strings come from a
//! [`HeaderTable`] that can be loaded from JSON.

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crashdesk_core::{Error, Result};

/// Built-in header table shipped with the crate.
pub const DEFAULT_HEADER_TABLE_JSON: &str = include_str!("../rules/section-headers.json");

/// Header strings of the reply template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderTable {
    /// e.g. `INCIDENT SUMMARY:`
    pub incident_summary: String,
    /// e.g. `CRASH DATE:`
    pub crash_date: String,
    /// Prefix of numbered vehicle headers; `VEHICLE` matches `VEHICLE 1:`.
    pub vehicle_prefix: String,
}

impl Default for HeaderTable {
    fn default() -> Self {
        serde_json::from_str(DEFAULT_HEADER_TABLE_JSON).unwrap()
    }
}

impl HeaderTable {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let table: HeaderTable = serde_json::from_str(&raw)?;
        table.validate()?;
        Ok(table)
    }

    /// Load the override table at `path` if there is one, else the built-in table.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        Self::from_file(path).unwrap_or_else(|e| {
            warn!(
                "Ignoring header table {}: {}; using built-in headers",
                path.display(),
                e
            );
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("incident_summary", &self.incident_summary),
            ("crash_date", &self.crash_date),
            ("vehicle_prefix", &self.vehicle_prefix),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("section header {} is empty", name)));
            }
        }
        Ok(())
    }
}

/// What a located header introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    IncidentSummary,
    CrashDate,
    Vehicle(u32),
}

/// A header and the text up to the next recognized header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    pub kind: SectionKind,
    /// Byte offset of the header in the segmented text.
    pub offset: usize,
    pub body: &'a str,
}

/// Compiled header table.
#[derive(Debug, Clone)]
pub struct SectionLocator {
    headers: HeaderTable,
    vehicle_re: Regex,
}

impl SectionLocator {
    pub fn new(headers: &HeaderTable) -> Result<Self> {
        headers.validate()?;
        let pattern = format!(r"{}[ \t]*(\d+)[ \t]*:", regex::escape(&headers.vehicle_prefix));
        let vehicle_re = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid vehicle header: {}", e)))?;
        Ok(Self {
            headers: headers.clone(),
            vehicle_re,
        })
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    /// Split `text` into sections ordered by position.
    ///
    /// Summary and date use their first occurrence. Every vehicle header is
    /// a boundary, so duplicated numbers stay in the result for the caller
    /// to resolve. Text before the first header is dropped.
    pub fn segment<'a>(&self, text: &'a str) -> Vec<Section<'a>> {
        // (header start, header end, kind)
        let mut markers: Vec<(usize, usize, SectionKind)> = Vec::new();

        if let Some(start) = text.find(&self.headers.incident_summary) {
            markers.push((
                start,
                start + self.headers.incident_summary.len(),
                SectionKind::IncidentSummary,
            ));
        }
        if let Some(start) = text.find(&self.headers.crash_date) {
            markers.push((
                start,
                start + self.headers.crash_date.len(),
                SectionKind::CrashDate,
            ));
        }
        for caps in self.vehicle_re.captures_iter(text) {
            let whole = match caps.get(0) {
                Some(m) => m,
                None => continue,
            };
            let number = match caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()) {
                Some(n) => n,
                None => continue,
            };
            markers.push((whole.start(), whole.end(), SectionKind::Vehicle(number)));
        }

        markers.sort_by_key(|&(start, _, _)| start);

        // A header that starts inside another header's text is not a boundary.
        let mut kept: Vec<(usize, usize, SectionKind)> = Vec::with_capacity(markers.len());
        for marker in markers {
            match kept.last() {
                Some(&(_, prev_end, _)) if marker.0 < prev_end => continue,
                _ => kept.push(marker),
            }
        }

        kept.iter()
            .enumerate()
            .map(|(i, &(start, end, kind))| {
                let body_end = kept.get(i + 1).map(|m| m.0).unwrap_or(text.len());
                Section {
                    kind,
                    offset: start,
                    body: &text[end..body_end],
                }
            })
            .collect()
    }
}

impl Default for SectionLocator {
    fn default() -> Self {
        Self::new(&HeaderTable::default()).unwrap()
    }
}
