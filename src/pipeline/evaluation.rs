//! Model evaluation against labelled data.
//!
//! Compares a finished [`Report`] with the `LeakLabel` / `Leak_Location`
//! ground truth of the dataset it was produced from.

use serde::Serialize;
use tracing::info;

use crate::acquisition::Dataset;
use crate::config::defaults;
use crate::error::PipelineError;
use crate::types::{LeakStatus, Report};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// Rows with a label and a successful prediction.
    pub samples: usize,
    /// `None` when no row could be scored.
    pub accuracy: Option<f64>,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
    /// Mean `delta_x` over true leaks that were located.
    pub location_mae: Option<f64>,
    pub located: usize,
    /// Unlabelled rows plus error rows.
    pub skipped: usize,
}

/// Score `report` against the labels in `dataset`.
pub fn evaluate(dataset: &Dataset, report: &Report) -> Result<EvaluationReport, PipelineError> {
    if !dataset.has_column(defaults::LABEL_COLUMN) {
        return Err(PipelineError::Schema(format!(
            "{} is missing required column: {}",
            dataset.source,
            defaults::LABEL_COLUMN
        )));
    }

    let mut cm = [[0usize; 2]; 2];
    let mut skipped = 0usize;
    let mut delta_sum = 0.0;
    let mut located = 0usize;

    for (obs, result) in dataset.observations.iter().zip(&report.results) {
        let Some(truth) = obs.leak_label() else {
            skipped += 1;
            continue;
        };
        let predicted = match result.status {
            LeakStatus::Leak => true,
            LeakStatus::NoLeak => false,
            LeakStatus::Error => {
                skipped += 1;
                continue;
            }
        };
        cm[usize::from(truth)][usize::from(predicted)] += 1;

        if truth {
            if let Some(d) = result.delta_x {
                delta_sum += d;
                located += 1;
            }
        }
    }

    let samples: usize = cm.iter().flatten().sum();
    #[allow(clippy::cast_precision_loss)]
    let accuracy = (samples > 0).then(|| (cm[0][0] + cm[1][1]) as f64 / samples as f64);
    #[allow(clippy::cast_precision_loss)]
    let location_mae = (located > 0).then(|| delta_sum / located as f64);

    info!(
        samples,
        accuracy = accuracy.unwrap_or(f64::NAN),
        located,
        skipped,
        "Evaluation complete"
    );

    Ok(EvaluationReport {
        samples,
        accuracy,
        confusion_matrix: cm,
        location_mae,
        located,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::csv_source::read_delimited;
    use crate::pipeline::ReportAssembler;
    use crate::types::{LocationSource, PredictionResult, RunId};

    #[test]
    fn test_confusion_and_mae() {
        let ds = read_delimited(
            "Run_ID,P_0,A_0,LeakLabel,Leak_Location\n1,1,1,leak,400\n2,1,1,no,\n3,1,1,leak,600\n4,1,1,no,\n5,1,1,,\n6,1,1,leak,100\n"
                .as_bytes(),
            b',',
            "mem",
        )
        .expect("parse");

        let mut asm = ReportAssembler::new();
        asm.push(PredictionResult::leak(
            RunId::Number(1),
            0.9,
            Some((450.0, LocationSource::Regressor)),
            Some(400.0),
        ));
        asm.push(PredictionResult::no_leak(RunId::Number(2), 0.1, None));
        asm.push(PredictionResult::no_leak(RunId::Number(3), 0.4, Some(600.0)));
        asm.push(PredictionResult::leak(RunId::Number(4), 0.7, None, None));
        asm.push(PredictionResult::no_leak(RunId::Number(5), 0.1, None));
        asm.push(PredictionResult::error(RunId::Number(6), "bad"));
        let eval = evaluate(&ds, &asm.finish()).expect("evaluate");

        assert_eq!(eval.samples, 4);
        assert_eq!(eval.confusion_matrix, [[1, 1], [1, 1]]);
        assert_eq!(eval.accuracy, Some(0.5));
        assert_eq!(eval.located, 1);
        assert_eq!(eval.location_mae, Some(50.0));
        assert_eq!(eval.skipped, 2);
    }

    #[test]
    fn test_requires_labels() {
        let ds = read_delimited("P_0,A_0\n1,1\n".as_bytes(), b',', "mem").expect("parse");
        let report = ReportAssembler::new().finish();
        assert!(matches!(evaluate(&ds, &report), Err(PipelineError::Schema(_))));
    }
}
