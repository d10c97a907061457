//! Observation types: one tabular row of sensor readings plus metadata.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::defaults;

// ============================================================================
// Cell Values
// ============================================================================

/// A single parsed cell.
///
/// Parsing happens once at load time so every later stage can tell a blank
/// reading apart from a malformed one without re-reading the raw text.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// A finite numeric reading.
    Number(f64),
    /// Non-numeric text (identifiers, labels, or a corrupt reading).
    Text(String),
    /// Blank, `NaN`, `null` or `-`.
    Missing,
}

static MISSING: CellValue = CellValue::Missing;

impl CellValue {
    /// Parse a raw CSV field.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_null_token(trimmed) {
            return Self::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Self::Number(v),
            Ok(_) => Self::Missing,
            Err(_) => Self::Text(trimmed.to_string()),
        }
    }

    /// Keep a raw field as text, for identifier columns that must round-trip
    /// exactly. Only the null tokens become `Missing`.
    pub fn verbatim(raw: &str) -> Self {
        let trimmed = raw.trim();
        if is_null_token(trimmed) {
            Self::Missing
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// JSON counterpart of [`CellValue::verbatim`]: numbers keep the text
    /// they were written with.
    pub fn verbatim_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::String(s) => Self::verbatim(s),
            other => Self::verbatim(&other.to_string()),
        }
    }

    /// Convert a JSON value (stdin input path).
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Missing,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(v) if v.is_finite() => Self::Number(v),
                _ => Self::Missing,
            },
            serde_json::Value::String(s) => Self::parse(s),
            serde_json::Value::Bool(b) => Self::Text(b.to_string()),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

fn is_null_token(s: &str) -> bool {
    s.is_empty()
        || s.eq_ignore_ascii_case("nan")
        || s.eq_ignore_ascii_case("null")
        || s.eq_ignore_ascii_case("none")
        || s == "-"
}

// ============================================================================
// Run Identifier
// ============================================================================

/// Opaque run identifier, preserved verbatim into the report.
///
/// Serializes untagged. Only canonical integer text (`42`, `-3`, no leading
/// zeros) becomes a JSON number; `007` and `1.50` stay strings exactly as
/// written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RunId {
    Number(i64),
    Text(String),
}

impl RunId {
    /// Build from a `Run_ID` cell, synthesizing the 1-based ordinal when the
    /// cell is blank.
    pub fn from_cell(cell: &CellValue, ordinal: usize) -> Self {
        match cell {
            CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
                #[allow(clippy::cast_possible_truncation)]
                Self::Number(*v as i64)
            }
            CellValue::Number(v) => Self::Text(v.to_string()),
            CellValue::Text(s) => canonical_integer(s).map_or_else(|| Self::Text(s.clone()), Self::Number),
            CellValue::Missing => Self::ordinal(ordinal),
        }
    }

    pub fn ordinal(ordinal: usize) -> Self {
        Self::Number(i64::try_from(ordinal).unwrap_or(i64::MAX))
    }
}

/// `Some(n)` only when `s` is exactly how `n` prints.
fn canonical_integer(s: &str) -> Option<i64> {
    let n: i64 = s.parse().ok()?;
    (n.to_string() == s).then_some(n)
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

// ============================================================================
// Observation
// ============================================================================

/// One sensor snapshot: column name -> parsed cell.
///
/// Rows are independent; nothing here refers to neighbouring rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// 1-based position within the batch.
    pub ordinal: usize,
    cells: HashMap<String, CellValue>,
}

impl Observation {
    pub fn new(ordinal: usize) -> Self {
        Self {
            ordinal,
            cells: HashMap::new(),
        }
    }

    /// Build from `(column, value)` pairs.
    pub fn from_cells<I, S>(ordinal: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = (S, CellValue)>,
        S: Into<String>,
    {
        Self {
            ordinal,
            cells: cells.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.cells.insert(column.into(), value);
    }

    /// Cell for `column`, `Missing` when the column is absent.
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&MISSING)
    }

    /// Identifier for the report: `Run_ID` if present, otherwise the ordinal.
    pub fn run_id(&self) -> RunId {
        RunId::from_cell(self.get(defaults::RUN_ID_COLUMN), self.ordinal)
    }

    /// Ground-truth leak position in meters, when the row carries one.
    pub fn actual_location(&self) -> Option<f64> {
        self.get(defaults::LOCATION_COLUMN).as_number()
    }

    /// Ground-truth leak label.
    ///
    /// `leak`, `yes`, `true`, `1` (trimmed, any case) are leaks; any other
    /// text or number is no-leak. A blank label is `None`.
    pub fn leak_label(&self) -> Option<bool> {
        match self.get(defaults::LABEL_COLUMN) {
            CellValue::Missing => None,
            CellValue::Number(v) => Some(*v == 1.0),
            CellValue::Text(s) => {
                let normalized = s.trim().to_lowercase();
                Some(defaults::POSITIVE_LABELS.contains(&normalized.as_str()))
            }
        }
    }
}
