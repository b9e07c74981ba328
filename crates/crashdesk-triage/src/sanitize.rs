//! Field sanitizer — strips encoding artifacts and model-client serialization noise.
//!
//! The artifact patterns live in a versioned JSON rule table (see
//! `rules/artifacts-v1.json`) rather than in code, so a new client wrapper
//! format only needs a new table. Two rule lists are kept:
//!
//! - `reply_rules` run once over a whole reply before it is segmented
//!   (wrapper removal, escaped newlines back to real newlines).
//! - `field_rules` run over every extracted value until nothing changes.
//!
//! Rules are applied in table order. Replacements must be ASCII so that a
//! sanitized string never needs a second non-ASCII pass.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crashdesk_core::{Error, Result};

/// Built-in artifact table shipped with the crate.
pub const DEFAULT_ARTIFACT_TABLE_JSON: &str = include_str!("../rules/artifacts-v1.json");

static DEFAULT_SANITIZER: Lazy<FieldSanitizer> = Lazy::new(|| {
    let table: ArtifactTable = serde_json::from_str(DEFAULT_ARTIFACT_TABLE_JSON).unwrap();
    FieldSanitizer::new(&table).unwrap()
});

/// One `pattern -> replacement` rule as stored in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRule {
    pub pattern: String,
    #[serde(default)]
    pub replacement: String,
    /// Treat `pattern` as a regular expression instead of a literal.
    #[serde(default)]
    pub regex: bool,
}

/// Versioned artifact table, loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTable {
    pub version: u32,
    #[serde(default)]
    pub reply_rules: Vec<ArtifactRule>,
    #[serde(default)]
    pub field_rules: Vec<ArtifactRule>,
}

impl ArtifactTable {
    /// The table compiled into the crate.
    pub fn builtin() -> Self {
        serde_json::from_str(DEFAULT_ARTIFACT_TABLE_JSON).unwrap()
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    Literal(String),
    Pattern(Regex),
}

#[derive(Debug, Clone)]
struct CompiledRule {
    matcher: Matcher,
    replacement: String,
}

impl CompiledRule {
    fn compile(rule: &ArtifactRule) -> Result<Self> {
        if rule.pattern.is_empty() {
            return Err(Error::Config("artifact rule with empty pattern".into()));
        }
        if !rule.replacement.is_ascii() {
            return Err(Error::Config(format!(
                "artifact rule {:?} has a non-ASCII replacement",
                rule.pattern
            )));
        }
        let matcher = if rule.regex {
            let re = Regex::new(&rule.pattern).map_err(|e| {
                Error::Config(format!("invalid artifact pattern {:?}: {}", rule.pattern, e))
            })?;
            Matcher::Pattern(re)
        } else {
            Matcher::Literal(rule.pattern.clone())
        };
        Ok(Self {
            matcher,
            replacement: rule.replacement.clone(),
        })
    }

    fn apply(&self, text: &str) -> String {
        match &self.matcher {
            Matcher::Literal(lit) => text.replace(lit.as_str(), &self.replacement),
            Matcher::Pattern(re) => re
                .replace_all(text, NoExpand(&self.replacement))
                .into_owned(),
        }
    }
}

/// Compiled artifact table. Cheap to clone, holds no mutable state.
#[derive(Debug, Clone)]
pub struct FieldSanitizer {
    version: u32,
    reply_rules: Vec<CompiledRule>,
    field_rules: Vec<CompiledRule>,
}

impl FieldSanitizer {
    /// Compile a rule table.
    pub fn new(table: &ArtifactTable) -> Result<Self> {
        let reply_rules = table
            .reply_rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        let field_rules = table
            .field_rules
            .iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            version: table.version,
            reply_rules,
            field_rules,
        })
    }

    /// Load a rule table from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let table: ArtifactTable = serde_json::from_str(&raw)?;
        Self::new(&table)
    }

    /// Load the override table at `path` if there is one, else the built-in table.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(s) => {
                debug!("Loaded artifact table v{} from {}", s.version, path.display());
                s
            }
            Err(e) => {
                warn!(
                    "Ignoring artifact table {}: {}; using built-in table",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Version of the rule table this sanitizer was compiled from.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Clean a single extracted value.
    ///
    /// Non-ASCII characters become spaces, field rules run until nothing
    /// changes, and the result is trimmed. Passes continue only while the
    /// text shrinks, so a table whose rules never grow their input always
    /// reaches a fixed point and sanitizing twice is a no-op.
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = strip_non_ascii(text).trim().to_string();
        loop {
            let next = self
                .field_rules
                .iter()
                .fold(current.clone(), |acc, rule| rule.apply(&acc))
                .trim()
                .to_string();
            if next == current {
                return current;
            }
            if next.len() >= current.len() {
                debug!("Field rules stopped shrinking at {} bytes", next.len());
                return next;
            }
            current = next;
        }
    }

    /// Undo client-wrapper serialization on a whole reply before segmentation.
    pub fn unwrap_reply(&self, reply: &str) -> String {
        let cleaned = strip_non_ascii(reply);
        self.reply_rules
            .iter()
            .fold(cleaned, |acc, rule| rule.apply(&acc))
    }
}

impl Default for FieldSanitizer {
    fn default() -> Self {
        DEFAULT_SANITIZER.clone()
    }
}

/// Replace every character at or above code point 128 with a space.
pub fn strip_non_ascii(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() { c } else { ' ' })
        .collect()
}

/// Sanitize with the built-in table.
pub fn sanitize(text: &str) -> String {
    DEFAULT_SANITIZER.sanitize(text)
}
