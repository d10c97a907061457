//! Report types: per-row prediction results and the batch payload.
//!
//! Every `PredictionResult` carries every key whatever ran, so consumers can
//! rely on a fixed schema. Constructors are the only way to build one, which
//! keeps the location/delta invariants in one place.

use serde::{Deserialize, Serialize};

use super::RunId;

/// Row outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakStatus {
    Leak,
    NoLeak,
    Error,
}

/// Where a `location_pred` came from. Not part of the wire schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Regressor,
    AcousticCentroid,
}

/// One row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub run_id: RunId,
    pub status: LeakStatus,
    /// Leak probability in [0, 1]. `None` only for error rows.
    pub probability: Option<f64>,
    /// Estimated leak position (m). Only ever set on leak rows.
    pub location_pred: Option<f64>,
    /// Ground-truth leak position (m) when the input carried one.
    pub actual_location: Option<f64>,
    /// `|location_pred - actual_location|` when both are present.
    pub delta_x: Option<f64>,
    /// Row diagnostic. Only ever set on error rows.
    pub message: Option<String>,
    #[serde(skip)]
    pub location_source: Option<LocationSource>,
}

impl PredictionResult {
    /// A row classified as leaking. `location` is `None` when neither the
    /// regressor nor the centroid could place it.
    pub fn leak(
        run_id: RunId,
        probability: f64,
        location: Option<(f64, LocationSource)>,
        actual_location: Option<f64>,
    ) -> Self {
        let location_pred = location.map(|(x, _)| x);
        Self {
            run_id,
            status: LeakStatus::Leak,
            probability: Some(probability),
            location_pred,
            actual_location,
            delta_x: delta(location_pred, actual_location),
            message: None,
            location_source: location.map(|(_, source)| source),
        }
    }

    pub fn no_leak(run_id: RunId, probability: f64, actual_location: Option<f64>) -> Self {
        Self {
            run_id,
            status: LeakStatus::NoLeak,
            probability: Some(probability),
            location_pred: None,
            actual_location,
            delta_x: None,
            message: None,
            location_source: None,
        }
    }

    pub fn error(run_id: RunId, message: impl Into<String>) -> Self {
        Self {
            run_id,
            status: LeakStatus::Error,
            probability: None,
            location_pred: None,
            actual_location: None,
            delta_x: None,
            message: Some(message.into()),
            location_source: None,
        }
    }
}

fn delta(pred: Option<f64>, actual: Option<f64>) -> Option<f64> {
    match (pred, actual) {
        (Some(p), Some(a)) => Some((p - a).abs()),
        _ => None,
    }
}

/// Batch counters.
///
/// `total == leak + no_leak`; rows that errored are counted only in `error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub leak: usize,
    pub no_leak: usize,
    pub error: usize,
}

impl BatchSummary {
    pub fn record(&mut self, status: LeakStatus) {
        match status {
            LeakStatus::Leak => {
                self.leak += 1;
                self.total += 1;
            }
            LeakStatus::NoLeak => {
                self.no_leak += 1;
                self.total += 1;
            }
            LeakStatus::Error => self.error += 1,
        }
    }
}

/// The single payload written to stdout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: BatchSummary,
    pub results: Vec<PredictionResult>,
}
