//! Report assembly and stdout rendering.
//!
//! Stdout carries exactly one JSON line per invocation: the report, a
//! subcommand payload, or `{"error": "..."}`. Everything else goes to the
//! tracing subscriber on stderr.

use serde::Serialize;

use crate::types::{BatchSummary, PredictionResult, Report};

/// Collects row results in input order and keeps the counters in step.
#[derive(Debug, Default)]
pub struct ReportAssembler {
    summary: BatchSummary,
    results: Vec<PredictionResult>,
}

impl ReportAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(rows: usize) -> Self {
        Self {
            summary: BatchSummary::default(),
            results: Vec::with_capacity(rows),
        }
    }

    pub fn push(&mut self, result: PredictionResult) {
        self.summary.record(result.status);
        self.results.push(result);
    }

    pub fn finish(self) -> Report {
        Report {
            summary: self.summary,
            results: self.results,
        }
    }
}

/// Serialize any payload as a single JSON line (no trailing newline).
pub fn render_line<T: Serialize>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(payload)
}

/// `{"error": message}`.
pub fn render_error(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}
