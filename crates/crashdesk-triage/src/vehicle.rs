//! Per-vehicle field extraction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::injury::InjuryStatus;
use crate::NOT_SPECIFIED;

/// Fields the reply template defines for each vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleField {
    OwnerName,
    OwnerAddress,
    Make,
    Model,
    Year,
    Damage,
    Injuries,
    InsuranceCompany,
    InsurancePolicyNumber,
    TowingCompany,
}

impl VehicleField {
    pub const ALL: [VehicleField; 10] = [
        VehicleField::OwnerName,
        VehicleField::OwnerAddress,
        VehicleField::Make,
        VehicleField::Model,
        VehicleField::Year,
        VehicleField::Damage,
        VehicleField::Injuries,
        VehicleField::InsuranceCompany,
        VehicleField::InsurancePolicyNumber,
        VehicleField::TowingCompany,
    ];

    /// Storage key, e.g. `insurance_policy_number`.
    pub fn key(&self) -> &'static str {
        match self {
            VehicleField::OwnerName => "owner_name",
            VehicleField::OwnerAddress => "owner_address",
            VehicleField::Make => "make",
            VehicleField::Model => "model",
            VehicleField::Year => "year",
            VehicleField::Damage => "damage",
            VehicleField::Injuries => "injuries",
            VehicleField::InsuranceCompany => "insurance_company",
            VehicleField::InsurancePolicyNumber => "insurance_policy_number",
            VehicleField::TowingCompany => "towing_company",
        }
    }

    /// Label as it appears in the reply template.
    pub fn label(&self) -> &'static str {
        match self {
            VehicleField::OwnerName => "Owner Name",
            VehicleField::OwnerAddress => "Owner Address",
            VehicleField::Make => "Make",
            VehicleField::Model => "Model",
            VehicleField::Year => "Year",
            VehicleField::Damage => "Damage",
            VehicleField::Injuries => "Injuries",
            VehicleField::InsuranceCompany => "Insurance Company",
            VehicleField::InsurancePolicyNumber => "Insurance Policy #",
            VehicleField::TowingCompany => "Towing Company",
        }
    }

    /// Recognize a template label, ignoring case, list bullets and markdown emphasis.
    pub fn from_label(label: &str) -> Option<Self> {
        let cleaned = label
            .trim()
            .trim_matches(|c: char| c == '-' || c == '*' || c == '_' || c.is_whitespace())
            .to_lowercase();
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        match cleaned.as_str() {
            "owner name" => Some(VehicleField::OwnerName),
            "owner address" => Some(VehicleField::OwnerAddress),
            "make" => Some(VehicleField::Make),
            "model" => Some(VehicleField::Model),
            "year" => Some(VehicleField::Year),
            "damage" => Some(VehicleField::Damage),
            "injuries" => Some(VehicleField::Injuries),
            "insurance company" => Some(VehicleField::InsuranceCompany),
            "insurance policy #" | "insurance policy number" | "insurance policy" => {
                Some(VehicleField::InsurancePolicyNumber)
            }
            "towing company" => Some(VehicleField::TowingCompany),
            _ => None,
        }
    }
}

/// A field value: integers where coercion succeeded, text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Fields extracted for one `VEHICLE N:` block.
///
/// Only fields present in the reply are stored; accessors fall back to
/// the `"Not specified"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleFields {
    /// Number taken from the block header (`VEHICLE 2:` → 2).
    pub vehicle_number: u32,
    #[serde(flatten)]
    pub fields: BTreeMap<VehicleField, FieldValue>,
}

impl VehicleFields {
    pub fn new(vehicle_number: u32) -> Self {
        Self {
            vehicle_number,
            fields: BTreeMap::new(),
        }
    }

    /// Store an already-sanitized value, applying the field's coercion rules.
    ///
    /// Returns `false` when the field was already set; the first value wins.
    pub fn set(&mut self, field: VehicleField, sanitized: &str) -> bool {
        if self.fields.contains_key(&field) {
            return false;
        }
        let value = if sanitized.is_empty() {
            NOT_SPECIFIED.to_string()
        } else {
            sanitized.to_string()
        };
        let value = match field {
            VehicleField::Year => match value.parse::<i64>() {
                Ok(year) => FieldValue::Integer(year),
                Err(_) => FieldValue::Text(value),
            },
            VehicleField::Injuries => {
                FieldValue::Text(InjuryStatus::normalize(&value).as_str().to_string())
            }
            _ => FieldValue::Text(value),
        };
        self.fields.insert(field, value);
        true
    }

    pub fn get(&self, field: VehicleField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    /// Field rendered as text, or the sentinel when absent.
    pub fn text(&self, field: VehicleField) -> String {
        self.fields
            .get(&field)
            .map(|v| v.to_string())
            .unwrap_or_else(|| NOT_SPECIFIED.to_string())
    }

    /// Model year, when it was coerced to an integer that fits a year.
    pub fn year(&self) -> Option<i32> {
        self.fields
            .get(&VehicleField::Year)
            .and_then(FieldValue::as_integer)
            .and_then(|y| i32::try_from(y).ok())
    }

    pub fn injuries(&self) -> InjuryStatus {
        self.fields
            .get(&VehicleField::Injuries)
            .and_then(FieldValue::as_text)
            .map(InjuryStatus::normalize)
            .unwrap_or(InjuryStatus::NotSpecified)
    }

    pub fn damage(&self) -> String {
        self.text(VehicleField::Damage)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
