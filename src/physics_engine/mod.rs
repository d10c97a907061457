//! Physics Engine Module
//!
//! Deterministic leak calculations from raw sensor readings. Nothing here
//! depends on a trained model.
//!
//! - `estimate_location()` - amplitude-weighted acoustic centroid, the
//!   fallback when no regressor can place a leak
//! - `screen()` - rule-based peak/pressure-drop breakdown used by `inspect`

pub mod location;
pub mod screening;

pub use location::{estimate_location, GapReason, LocationEstimate};
pub use screening::{screen, CentroidTerm, ScreeningBreakdown, ScreeningThresholds};

/// One acoustic reading at a known pipeline coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcousticSample {
    /// Ordinal among all `A_` columns, so the reading can be paired with the
    /// pressure sensor of the same ordinal.
    pub sensor: usize,
    /// Distance along the pipeline (m), from the `A_<coord>` column suffix.
    pub position_m: f64,
    /// Measured amplitude (V).
    pub amplitude: f64,
}

impl AcousticSample {
    pub const fn new(sensor: usize, position_m: f64, amplitude: f64) -> Self {
        Self {
            sensor,
            position_m,
            amplitude,
        }
    }
}
