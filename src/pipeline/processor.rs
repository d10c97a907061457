//! Leak Inference Processor
//!
//! Per row:
//! 1. Derive features. Failure marks the row `error` and the batch continues.
//! 2. Classify and capture the probability (1.0 / 0.0 when the model has no
//!    score).
//! 3. On leak, locate with the regressor if loaded, else or on regressor
//!    failure with the acoustic centroid.
//! 4. Attach `actual_location` / `delta_x` when the row carries ground truth.
//!
//! Rows are independent. With `parallel` set they run on the rayon pool;
//! results are collected in input order either way.

use rayon::prelude::*;
use tracing::{debug, info};

use super::ReportAssembler;
use crate::acquisition::Dataset;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, RowError};
use crate::features::{FeatureAlignment, FeatureDeriver};
use crate::models::{LeakClassifier, LeakRegressor};
use crate::physics_engine::{estimate_location, LocationEstimate};
use crate::types::{LocationSource, Observation, PredictionResult, Report};

/// Two-stage leak classifier + locator over a batch.
pub struct InferencePipeline {
    classifier: Box<dyn LeakClassifier>,
    regressor: Option<Box<dyn LeakRegressor>>,
    min_acoustic_sensors: usize,
    parallel: bool,
}

/// Per-batch state shared by every row.
struct BatchPlan {
    deriver: FeatureDeriver,
    classifier_alignment: FeatureAlignment,
    regressor_alignment: Option<FeatureAlignment>,
}

impl InferencePipeline {
    pub fn new(classifier: Box<dyn LeakClassifier>) -> Self {
        Self {
            classifier,
            regressor: None,
            min_acoustic_sensors: crate::config::defaults::MIN_ACOUSTIC_SENSORS,
            parallel: false,
        }
    }

    /// Build with the tunables from `config`.
    pub fn from_config(
        classifier: Box<dyn LeakClassifier>,
        regressor: Option<Box<dyn LeakRegressor>>,
        config: &PipelineConfig,
    ) -> Self {
        Self::new(classifier)
            .with_regressor(regressor)
            .with_min_acoustic_sensors(config.fallback.min_acoustic_sensors)
            .with_parallel(config.inference.parallel)
    }

    #[must_use]
    pub fn with_regressor(mut self, regressor: Option<Box<dyn LeakRegressor>>) -> Self {
        self.regressor = regressor;
        self
    }

    #[must_use]
    pub fn with_min_acoustic_sensors(mut self, n: usize) -> Self {
        self.min_acoustic_sensors = n;
        self
    }

    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn has_regressor(&self) -> bool {
        self.regressor.is_some()
    }

    /// Run the whole batch.
    ///
    /// Fails only when the batch as a whole cannot be interpreted (no sensor
    /// columns). Row-level problems end up in the report.
    pub fn run(&self, dataset: &Dataset) -> Result<Report, PipelineError> {
        let deriver = FeatureDeriver::from_dataset(dataset)?;
        let plan = BatchPlan {
            classifier_alignment: deriver.alignment(self.classifier.feature_schema(), "classifier"),
            regressor_alignment: self
                .regressor
                .as_ref()
                .map(|r| deriver.alignment(r.feature_schema(), "regressor")),
            deriver,
        };

        let results: Vec<PredictionResult> = if self.parallel {
            dataset
                .observations
                .par_iter()
                .map(|obs| self.process_row(&plan, obs))
                .collect()
        } else {
            dataset
                .observations
                .iter()
                .map(|obs| self.process_row(&plan, obs))
                .collect()
        };

        let mut assembler = ReportAssembler::with_capacity(results.len());
        let (mut by_regressor, mut by_centroid) = (0usize, 0usize);
        for result in results {
            match result.location_source {
                Some(LocationSource::Regressor) => by_regressor += 1,
                Some(LocationSource::AcousticCentroid) => by_centroid += 1,
                None => {}
            }
            assembler.push(result);
        }
        let report = assembler.finish();

        info!(
            source = %dataset.source,
            total = report.summary.total,
            leak = report.summary.leak,
            no_leak = report.summary.no_leak,
            error = report.summary.error,
            located_by_regressor = by_regressor,
            located_by_centroid = by_centroid,
            "Inference complete"
        );
        Ok(report)
    }

    fn process_row(&self, plan: &BatchPlan, obs: &Observation) -> PredictionResult {
        let run_id = obs.run_id();
        match self.classify_and_locate(plan, obs) {
            Ok(result) => result,
            Err(e) => {
                debug!(row = obs.ordinal, run_id = %run_id, error = %e, "Row failed");
                PredictionResult::error(run_id, e.to_string())
            }
        }
    }

    fn classify_and_locate(&self, plan: &BatchPlan, obs: &Observation) -> Result<PredictionResult, RowError> {
        let features = plan.deriver.derive(obs)?;
        let x = plan.classifier_alignment.apply(&features);

        let classifier_err = |e: crate::models::ModelError| RowError::Classifier(e.to_string());
        let is_leak = self.classifier.predict(&x).map_err(classifier_err)?;
        let probability = match self.classifier.predict_probability(&x).map_err(classifier_err)? {
            Some(p) if p.is_finite() => p.clamp(0.0, 1.0),
            Some(p) => return Err(RowError::Classifier(format!("non-finite probability {p}"))),
            None if is_leak => 1.0,
            None => 0.0,
        };

        let run_id = obs.run_id();
        let actual = obs.actual_location();
        if !is_leak {
            return Ok(PredictionResult::no_leak(run_id, probability, actual));
        }

        let location = self
            .locate_with_regressor(plan, &features, obs)
            .or_else(|| self.locate_with_centroid(plan, &features, obs));
        Ok(PredictionResult::leak(run_id, probability, location, actual))
    }

    fn locate_with_regressor(
        &self,
        plan: &BatchPlan,
        features: &[f64],
        obs: &Observation,
    ) -> Option<(f64, LocationSource)> {
        let regressor = self.regressor.as_ref()?;
        let x = plan
            .regressor_alignment
            .as_ref()
            .map_or_else(|| features.to_vec(), |a| a.apply(features));

        match regressor.predict(&x) {
            Ok(m) if m.is_finite() => Some((m, LocationSource::Regressor)),
            Ok(m) => {
                debug!(row = obs.ordinal, value = m, "Regressor returned non-finite location, falling back");
                None
            }
            Err(e) => {
                debug!(row = obs.ordinal, error = %e, "Regressor failed, falling back");
                None
            }
        }
    }

    fn locate_with_centroid(
        &self,
        plan: &BatchPlan,
        features: &[f64],
        obs: &Observation,
    ) -> Option<(f64, LocationSource)> {
        let samples = plan.deriver.acoustic_samples(features);
        match estimate_location(&samples, self.min_acoustic_sensors) {
            LocationEstimate::Estimated(m) => Some((m, LocationSource::AcousticCentroid)),
            LocationEstimate::Gap(reason) => {
                debug!(row = obs.ordinal, reason = ?reason, "Leak could not be located");
                None
            }
        }
    }
}
