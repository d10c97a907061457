//! Acoustic centroid leak locator
//!
//! A leak radiates noise that is loudest at the sensors closest to it, so the
//! amplitude-weighted mean sensor position approximates the leak position:
//!
//! ```text
//! location = Σ(x_i * A_i) / Σ(A_i)
//! ```

use serde::Serialize;

use super::AcousticSample;

/// Why no location could be produced. Not an error: the row still succeeds
/// with a null `location_pred`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GapReason {
    /// Fewer usable acoustic sensors than the configured minimum.
    TooFewSensors,
    /// Amplitudes sum to zero or less.
    NoAcousticSignal,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationEstimate {
    Estimated(f64),
    Gap(GapReason),
}

impl LocationEstimate {
    pub fn meters(self) -> Option<f64> {
        match self {
            Self::Estimated(x) => Some(x),
            Self::Gap(_) => None,
        }
    }
}

/// Amplitude-weighted centroid over every sample.
///
/// `min_sensors` is clamped to at least 2: a single sensor has no spread to
/// locate anything within.
pub fn estimate_location(samples: &[AcousticSample], min_sensors: usize) -> LocationEstimate {
    if samples.len() < min_sensors.max(2) {
        return LocationEstimate::Gap(GapReason::TooFewSensors);
    }

    let total: f64 = samples.iter().map(|s| s.amplitude).sum();
    if total <= 0.0 || total.is_nan() {
        return LocationEstimate::Gap(GapReason::NoAcousticSignal);
    }

    let weighted: f64 = samples.iter().map(|s| s.position_m * s.amplitude).sum();
    let x = weighted / total;
    if x.is_finite() {
        LocationEstimate::Estimated(x)
    } else {
        LocationEstimate::Gap(GapReason::NoAcousticSignal)
    }
}
