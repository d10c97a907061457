//! Feature Deriver
//!
//! Turns one observation into the fixed-order vector the models were fit on:
//!
//! ```text
//! [P_* by index] ++ [A_* by index] ++ [dP_0 .. dP_{n-2}] ++ [dA_0 .. dA_{m-2}]
//! ```
//!
//! where `dP_i = P_{i+1} - P_i` over adjacent pressure sensors and likewise
//! for acoustic. Sensor columns are ordered numerically by their index suffix
//! so `P_10` sorts after `P_2`; equal or non-numeric suffixes keep header
//! order, non-numeric after numeric. `Run_ID`, `LeakLabel` and
//! `Leak_Location` never enter the vector.
//!
//! The layout is discovered once per batch from the header. Deriving a row is
//! pure; a blank or non-numeric sensor cell fails that row only.

pub mod training;

pub use training::{prepare_training_set, PreparationSummary, TrainingRow, TrainingSet};

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::acquisition::Dataset;
use crate::config::defaults;
use crate::error::{PipelineError, RowError};
use crate::physics_engine::AcousticSample;
use crate::types::{CellValue, Observation};

// ============================================================================
// Sensor Layout
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Pressure,
    Acoustic,
}

/// One sensor column discovered in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorColumn {
    pub name: String,
    pub kind: SensorKind,
    /// Numeric index suffix. For acoustic sensors this is the distance along
    /// the pipeline in meters.
    pub position: Option<f64>,
}

fn sensor_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([PA])_(.*)$").expect("sensor column pattern is valid"))
}

/// Classify a column name, `None` for anything that is not a sensor.
pub fn parse_sensor_column(name: &str) -> Option<SensorColumn> {
    let caps = sensor_pattern().captures(name)?;
    let kind = match &caps[1] {
        "P" => SensorKind::Pressure,
        _ => SensorKind::Acoustic,
    };
    let position = caps[2].parse::<f64>().ok().filter(|v| v.is_finite());
    Some(SensorColumn {
        name: name.to_string(),
        kind,
        position,
    })
}

/// Ordered pressure and acoustic sensor columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorLayout {
    pub pressure: Vec<SensorColumn>,
    pub acoustic: Vec<SensorColumn>,
}

impl SensorLayout {
    /// Discover sensors from header names.
    pub fn from_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        let mut layout = Self::default();
        let mut seen = std::collections::HashSet::new();
        for name in columns {
            let name = name.as_ref();
            if !seen.insert(name) {
                continue;
            }
            if let Some(col) = parse_sensor_column(name) {
                match col.kind {
                    SensorKind::Pressure => layout.pressure.push(col),
                    SensorKind::Acoustic => layout.acoustic.push(col),
                }
            }
        }
        sort_by_position(&mut layout.pressure);
        sort_by_position(&mut layout.acoustic);
        layout
    }

    pub fn is_empty(&self) -> bool {
        self.pressure.is_empty() && self.acoustic.is_empty()
    }

    /// Feature names in vector order.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::with_capacity(self.feature_count());
        names.extend(self.pressure.iter().map(|c| c.name.clone()));
        names.extend(self.acoustic.iter().map(|c| c.name.clone()));
        names.extend(
            (0..self.pressure.len().saturating_sub(1))
                .map(|i| format!("{}{i}", defaults::PRESSURE_DIFF_PREFIX)),
        );
        names.extend(
            (0..self.acoustic.len().saturating_sub(1))
                .map(|i| format!("{}{i}", defaults::ACOUSTIC_DIFF_PREFIX)),
        );
        names
    }

    pub fn feature_count(&self) -> usize {
        let p = self.pressure.len();
        let a = self.acoustic.len();
        p + a + p.saturating_sub(1) + a.saturating_sub(1)
    }
}

/// Stable sort: numeric positions ascending, then non-numeric in header order.
fn sort_by_position(columns: &mut [SensorColumn]) {
    columns.sort_by(|a, b| match (a.position, b.position) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

// ============================================================================
// Feature Deriver
// ============================================================================

/// Derives feature vectors for every row of one batch.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    layout: SensorLayout,
    names: Vec<String>,
}

impl FeatureDeriver {
    pub fn new(layout: SensorLayout) -> Self {
        let names = layout.feature_names();
        Self { layout, names }
    }

    /// Discover the layout from a dataset header.
    ///
    /// A batch without a single `P_` or `A_` column cannot produce any
    /// feature and is a schema error.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self, PipelineError> {
        let layout = SensorLayout::from_columns(dataset.columns.as_slice());
        if layout.is_empty() {
            return Err(PipelineError::Schema(format!(
                "no sensor columns found in {} (expected {}<index> / {}<index>)",
                dataset.source,
                defaults::PRESSURE_PREFIX,
                defaults::ACOUSTIC_PREFIX
            )));
        }
        debug!(
            pressure = layout.pressure.len(),
            acoustic = layout.acoustic.len(),
            features = layout.feature_count(),
            "Sensor layout discovered"
        );
        Ok(Self::new(layout))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    /// Derive the feature vector of one row.
    pub fn derive(&self, obs: &Observation) -> Result<Vec<f64>, RowError> {
        let pressure = read_group(&self.layout.pressure, obs)?;
        let acoustic = read_group(&self.layout.acoustic, obs)?;

        let mut values = Vec::with_capacity(self.names.len());
        values.extend_from_slice(&pressure);
        values.extend_from_slice(&acoustic);
        values.extend(pressure.windows(2).map(|w| w[1] - w[0]));
        values.extend(acoustic.windows(2).map(|w| w[1] - w[0]));
        Ok(values)
    }

    /// Raw pressure readings (sensor order) from a derived vector.
    pub fn pressure_values<'a>(&self, features: &'a [f64]) -> &'a [f64] {
        let end = self.layout.pressure.len().min(features.len());
        &features[..end]
    }

    /// Acoustic readings paired with their pipeline coordinate. Sensors
    /// without a numeric coordinate are left out.
    pub fn acoustic_samples(&self, features: &[f64]) -> Vec<AcousticSample> {
        let offset = self.layout.pressure.len();
        self.layout
            .acoustic
            .iter()
            .enumerate()
            .filter_map(|(i, col)| {
                let amplitude = *features.get(offset + i)?;
                col.position.map(|position_m| AcousticSample {
                    sensor: i,
                    position_m,
                    amplitude,
                })
            })
            .collect()
    }

    /// Plan for reindexing derived vectors onto a model's declared schema.
    ///
    /// `None` (the model declares nothing) keeps the derived order.
    pub fn alignment(&self, schema: Option<&[String]>, model: &str) -> FeatureAlignment {
        let Some(schema) = schema else {
            return FeatureAlignment::Identity;
        };

        let index: HashMap<&str, usize> = self
            .names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();

        let slots: Vec<Option<usize>> = schema.iter().map(|n| index.get(n.as_str()).copied()).collect();

        let missing: Vec<&str> = schema
            .iter()
            .zip(&slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(n, _)| n.as_str())
            .collect();
        if !missing.is_empty() {
            warn!(
                model,
                count = missing.len(),
                columns = %missing.join(","),
                "Model expects features absent from input, filling with 0.0"
            );
        }
        let unused = self.names.len().saturating_sub(slots.iter().flatten().count());
        if unused > 0 {
            debug!(model, unused, "Derived features not used by model");
        }

        FeatureAlignment::Reindex(slots)
    }
}

fn read_group(columns: &[SensorColumn], obs: &Observation) -> Result<Vec<f64>, RowError> {
    columns
        .iter()
        .map(|col| match obs.get(&col.name) {
            CellValue::Number(v) => Ok(*v),
            CellValue::Missing => Err(RowError::MissingValue(col.name.clone())),
            CellValue::Text(s) => Err(RowError::NonNumeric {
                column: col.name.clone(),
                value: s.clone(),
            }),
        })
        .collect()
}

// ============================================================================
// Alignment
// ============================================================================

/// How to map a derived vector onto what a model expects.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureAlignment {
    /// Use the derived vector as-is.
    Identity,
    /// One slot per model feature: index into the derived vector, or `None`
    /// for a feature the input lacks (filled with 0.0).
    Reindex(Vec<Option<usize>>),
}

impl FeatureAlignment {
    pub fn apply(&self, features: &[f64]) -> Vec<f64> {
        match self {
            Self::Identity => features.to_vec(),
            Self::Reindex(slots) => slots
                .iter()
                .map(|slot| slot.and_then(|i| features.get(i).copied()).unwrap_or(0.0))
                .collect(),
        }
    }
}
