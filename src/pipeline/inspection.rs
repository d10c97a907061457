//! Per-row physics screening, for operators asking "why this row?".

use serde::Serialize;

use crate::acquisition::Dataset;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::features::FeatureDeriver;
use crate::physics_engine::{screen, ScreeningBreakdown, ScreeningThresholds};
use crate::types::{Observation, RunId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedRow {
    pub run_id: RunId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakdown: Option<ScreeningBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionReport {
    pub rows: Vec<InspectedRow>,
}

/// Screen every row, or only the row whose `Run_ID` renders as `run_id`.
pub fn inspect(
    dataset: &Dataset,
    config: &PipelineConfig,
    run_id: Option<&str>,
) -> Result<InspectionReport, PipelineError> {
    let deriver = FeatureDeriver::from_dataset(dataset)?;
    let thresholds = ScreeningThresholds::from(&config.screening);
    let min_sensors = config.fallback.min_acoustic_sensors;

    let selected: Vec<&Observation> = match run_id {
        Some(id) => vec![dataset
            .find_run(id)
            .ok_or_else(|| PipelineError::RunNotFound(id.to_string()))?],
        None => dataset.observations.iter().collect(),
    };

    let rows = selected
        .into_iter()
        .map(|obs| match deriver.derive(obs) {
            Ok(features) => InspectedRow {
                run_id: obs.run_id(),
                breakdown: Some(screen(
                    deriver.pressure_values(&features),
                    &deriver.acoustic_samples(&features),
                    thresholds,
                    min_sensors,
                )),
                error: None,
            },
            Err(e) => InspectedRow {
                run_id: obs.run_id(),
                breakdown: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    Ok(InspectionReport { rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::csv_source::read_delimited;

    const CSV: &str = "\
Run_ID,P_0,P_100,P_200,A_0,A_100,A_200
Run_1,100000,99995,99950,0.02,0.05,0.7
Run_2,100000,99995,99990,0.02,0.05,0.04
Run_3,100000,,99990,0.02,0.05,0.04
";

    #[test]
    fn test_inspect_all_rows() {
        let ds = read_delimited(CSV.as_bytes(), b',', "mem").expect("parse");
        let report = inspect(&ds, &PipelineConfig::default(), None).expect("inspect");

        assert_eq!(report.rows.len(), 3);
        let first = report.rows[0].breakdown.as_ref().expect("breakdown");
        assert!(first.leak_suspected);
        assert_eq!(first.peak_position_m, Some(200.0));
        assert!(!report.rows[1].breakdown.as_ref().expect("breakdown").leak_suspected);
        assert!(report.rows[2].error.is_some());
    }

    #[test]
    fn test_inspect_single_run() {
        let ds = read_delimited(CSV.as_bytes(), b',', "mem").expect("parse");
        let report = inspect(&ds, &PipelineConfig::default(), Some("Run_2")).expect("inspect");
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].run_id, RunId::Text("Run_2".into()));

        let err = inspect(&ds, &PipelineConfig::default(), Some("Run_9")).expect_err("unknown");
        assert!(matches!(err, PipelineError::RunNotFound(_)));
    }
}
