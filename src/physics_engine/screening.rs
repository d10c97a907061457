//! Rule-based leak screening
//!
//! The operator-facing explanation of a single snapshot: where the acoustic
//! peak is, how sharp the pressure drop is at that sensor compared with the
//! upstream baseline, and how each sensor contributes to the centroid.
//!
//! Rule: `peak > acoustic_threshold_v && local_drop > pressure_drop_factor * baseline_drop`
//!
//! - baseline drop: `|P_1 - P_0|`
//! - local drop at peak sensor k: `|P_k - P_{k-1}|`, or the baseline when k = 0

use serde::Serialize;

use super::{estimate_location, AcousticSample, GapReason, LocationEstimate};
use crate::config::ScreeningConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreeningThresholds {
    pub acoustic_threshold_v: f64,
    pub pressure_drop_factor: f64,
}

impl From<&ScreeningConfig> for ScreeningThresholds {
    fn from(cfg: &ScreeningConfig) -> Self {
        Self {
            acoustic_threshold_v: cfg.acoustic_threshold_v,
            pressure_drop_factor: cfg.pressure_drop_factor,
        }
    }
}

/// One `x_i * A_i` numerator term.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CentroidTerm {
    pub position_m: f64,
    pub amplitude: f64,
    pub term: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreeningBreakdown {
    pub peak_amplitude: Option<f64>,
    pub peak_index: Option<usize>,
    pub peak_position_m: Option<f64>,
    pub baseline_drop: Option<f64>,
    pub local_drop: Option<f64>,
    pub leak_suspected: bool,
    pub thresholds: ScreeningThresholds,
    pub centroid_terms: Vec<CentroidTerm>,
    pub numerator: f64,
    pub denominator: f64,
    pub centroid: Option<f64>,
    pub centroid_gap: Option<GapReason>,
}

/// Screen one snapshot.
///
/// `pressure` is in sensor order; `acoustic` holds the positioned acoustic
/// readings. The peak is paired with the pressure sensor whose ordinal
/// matches [`AcousticSample::sensor`].
pub fn screen(
    pressure: &[f64],
    acoustic: &[AcousticSample],
    thresholds: ScreeningThresholds,
    min_sensors: usize,
) -> ScreeningBreakdown {
    // First maximum wins on ties.
    let peak = acoustic.iter().fold(None::<&AcousticSample>, |best, s| match best {
        Some(b) if b.amplitude >= s.amplitude => best,
        _ => Some(s),
    });

    let baseline_drop = abs_drop(pressure, 1);
    let local_drop = peak.and_then(|p| match p.sensor {
        0 => baseline_drop,
        k => abs_drop(pressure, k),
    });

    let leak_suspected = match (peak, local_drop, baseline_drop) {
        (Some(p), Some(local), Some(base)) => {
            p.amplitude > thresholds.acoustic_threshold_v
                && local > thresholds.pressure_drop_factor * base
        }
        _ => false,
    };

    let centroid_terms: Vec<CentroidTerm> = acoustic
        .iter()
        .map(|s| CentroidTerm {
            position_m: s.position_m,
            amplitude: s.amplitude,
            term: s.position_m * s.amplitude,
        })
        .collect();

    let estimate = estimate_location(acoustic, min_sensors);
    let centroid_gap = match estimate {
        LocationEstimate::Gap(reason) => Some(reason),
        LocationEstimate::Estimated(_) => None,
    };

    ScreeningBreakdown {
        peak_amplitude: peak.map(|s| s.amplitude),
        peak_index: peak.map(|s| s.sensor),
        peak_position_m: peak.map(|s| s.position_m),
        baseline_drop,
        local_drop,
        leak_suspected,
        thresholds,
        numerator: centroid_terms.iter().map(|t| t.term).sum(),
        denominator: centroid_terms.iter().map(|t| t.amplitude).sum(),
        centroid_terms,
        centroid: estimate.meters(),
        centroid_gap,
    }
}

/// `|P_k - P_{k-1}|`, if both sensors exist.
fn abs_drop(pressure: &[f64], k: usize) -> Option<f64> {
    let cur = pressure.get(k)?;
    let prev = pressure.get(k.checked_sub(1)?)?;
    Some((cur - prev).abs())
}
