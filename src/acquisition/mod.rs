//! Sensor data acquisition module
//!
//! Loads a batch of sensor snapshots into a [`Dataset`]. Two sources:
//! delimited text files with a header row (the normal path) and JSON objects
//! one per line on stdin (single-snapshot submissions).

pub mod csv_source;
pub mod stdin_source;

pub use csv_source::load_csv;
pub use stdin_source::load_json_lines;

use crate::types::Observation;

/// A loaded batch: header order plus one observation per row.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Human-readable origin for logging (file path or "stdin").
    pub source: String,
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    pub observations: Vec<Observation>,
}

impl Dataset {
    pub fn new(source: impl Into<String>, columns: Vec<String>, observations: Vec<Observation>) -> Self {
        Self {
            source: source.into(),
            columns,
            observations,
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Observation whose `Run_ID` renders as `run_id`.
    pub fn find_run(&self, run_id: &str) -> Option<&Observation> {
        self.observations
            .iter()
            .find(|o| o.run_id().to_string() == run_id)
    }
}
