//! JSON-lines Observation Source
//!
//! Reads one JSON object per line, each a `{column: value}` snapshot. Used for
//! single-reading submissions: `echo '{"P_0": 100000, ...}' | pipeguard predict --stdin`

use std::io::BufRead;
use tracing::warn;

use super::Dataset;
use crate::config::defaults;
use crate::error::PipelineError;
use crate::types::{CellValue, Observation};

/// Read observations from a line-oriented JSON stream.
///
/// Blank lines are ignored. Lines that are not JSON objects are logged and
/// skipped; an I/O failure on the stream itself is fatal.
pub fn load_json_lines<R: BufRead>(reader: R, source: &str) -> Result<Dataset, PipelineError> {
    let mut columns: Vec<String> = Vec::new();
    let mut observations = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line
            .map_err(|e| PipelineError::Dataset(format!("{source} line {}: {e}", idx + 1)))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let object = match serde_json::from_str::<serde_json::Value>(trimmed) {
            Ok(serde_json::Value::Object(map)) => map,
            Ok(_) => {
                warn!(line = idx + 1, "[StdinSource] Expected a JSON object, skipping");
                continue;
            }
            Err(e) => {
                warn!(line = idx + 1, "[StdinSource] Failed to parse observation: {}", e);
                continue;
            }
        };

        let ordinal = observations.len() + 1;
        let mut obs = Observation::new(ordinal);
        for (key, value) in &object {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
            let cell = if key == defaults::RUN_ID_COLUMN {
                CellValue::verbatim_json(value)
            } else {
                CellValue::from_json(value)
            };
            obs.insert(key.clone(), cell);
        }
        observations.push(obs);
    }

    Ok(Dataset::new(source, columns, observations))
}
