//! Training-data preparation.
//!
//! Applies the same [`FeatureDeriver`] the inference pipeline uses to a
//! labelled dataset, so a model fit on the output sees exactly the vectors it
//! will be asked about later.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use super::FeatureDeriver;
use crate::acquisition::Dataset;
use crate::config::defaults;
use crate::error::PipelineError;
use crate::types::RunId;

/// One labelled feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRow {
    pub run_id: RunId,
    pub features: Vec<f64>,
    pub label: bool,
    /// Leak position in meters, when recorded.
    pub location: Option<f64>,
}

/// Derived feature matrix plus labels.
#[derive(Debug, Clone, Default)]
pub struct TrainingSet {
    pub feature_names: Vec<String>,
    pub rows: Vec<TrainingRow>,
    /// Rows dropped for a blank label or underivable features.
    pub skipped: usize,
}

/// One-line outcome of a preparation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreparationSummary {
    pub status: &'static str,
    pub rows: usize,
    pub features: usize,
    pub leak: usize,
    pub no_leak: usize,
    pub skipped: usize,
}

impl TrainingSet {
    pub fn summary(&self) -> PreparationSummary {
        PreparationSummary {
            status: "preprocessing_complete",
            rows: self.rows.len(),
            features: self.feature_names.len(),
            leak: self.leak_count(),
            no_leak: self.no_leak_count(),
            skipped: self.skipped,
        }
    }

    pub fn leak_count(&self) -> usize {
        self.rows.iter().filter(|r| r.label).count()
    }

    pub fn no_leak_count(&self) -> usize {
        self.rows.len() - self.leak_count()
    }

    /// Write the matrix as CSV: `Run_ID`, features, `LeakLabel` (0/1),
    /// `Leak_Location` (blank when unknown).
    pub fn write_csv(&self, path: &Path) -> Result<(), PipelineError> {
        let io_err = |e: csv::Error| PipelineError::Dataset(format!("failed to write {}: {e}", path.display()));

        let mut wtr = csv::Writer::from_path(path).map_err(io_err)?;

        let mut header = Vec::with_capacity(self.feature_names.len() + 3);
        header.push(defaults::RUN_ID_COLUMN.to_string());
        header.extend(self.feature_names.iter().cloned());
        header.push(defaults::LABEL_COLUMN.to_string());
        header.push(defaults::LOCATION_COLUMN.to_string());
        wtr.write_record(&header).map_err(io_err)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(header.len());
            record.push(row.run_id.to_string());
            record.extend(row.features.iter().map(f64::to_string));
            record.push(if row.label { "1".into() } else { "0".into() });
            record.push(row.location.map(|x| x.to_string()).unwrap_or_default());
            wtr.write_record(&record).map_err(io_err)?;
        }

        wtr.flush()
            .map_err(|e| PipelineError::Dataset(format!("failed to flush {}: {e}", path.display())))?;
        Ok(())
    }
}

/// Derive a labelled training matrix.
///
/// Both `LeakLabel` and `Leak_Location` must be present in the header. Rows
/// with a blank label or a sensor value that cannot be read are skipped.
pub fn prepare_training_set(dataset: &Dataset) -> Result<TrainingSet, PipelineError> {
    let missing: Vec<&str> = [defaults::LABEL_COLUMN, defaults::LOCATION_COLUMN]
        .into_iter()
        .filter(|c| !dataset.has_column(c))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Schema(format!(
            "{} is missing required column(s): {}",
            dataset.source,
            missing.join(", ")
        )));
    }

    let deriver = FeatureDeriver::from_dataset(dataset)?;
    let mut set = TrainingSet {
        feature_names: deriver.feature_names().to_vec(),
        ..TrainingSet::default()
    };

    for obs in &dataset.observations {
        let Some(label) = obs.leak_label() else {
            debug!(row = obs.ordinal, "Blank label, skipping");
            set.skipped += 1;
            continue;
        };
        match deriver.derive(obs) {
            Ok(features) => set.rows.push(TrainingRow {
                run_id: obs.run_id(),
                features,
                label,
                location: obs.actual_location(),
            }),
            Err(e) => {
                debug!(row = obs.ordinal, error = %e, "Row skipped");
                set.skipped += 1;
            }
        }
    }

    info!(
        rows = set.rows.len(),
        features = set.feature_names.len(),
        leak = set.leak_count(),
        no_leak = set.no_leak_count(),
        skipped = set.skipped,
        "Training data prepared"
    );
    Ok(set)
}
