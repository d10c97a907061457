//! Trained model seam.
//!
//! The inference pipeline only sees the two traits below. Concrete models are
//! loaded by [`store::ModelStore`] and injected into the pipeline constructor,
//! which is also how tests swap in fixed-output mocks.
//!
//! A model may declare the ordered feature names it was fit on through
//! `feature_schema()`. When it does, derived vectors are reindexed onto that
//! schema before every call; when it does not, vectors are passed in derived
//! order and must already match.

pub mod forest;
pub mod store;

pub use forest::{ForestArtifact, ForestClassifier, ForestRegressor, ModelTask, Node, Tree};
pub use store::ModelStore;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed model artifact: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    Invalid(String),

    #[error("expected a {expected} artifact, found {found}")]
    WrongTask { expected: ModelTask, found: ModelTask },

    #[error("model expects {expected} features, got {got}")]
    FeatureCount { expected: usize, got: usize },
}

/// Binary leak / no-leak predictor.
pub trait LeakClassifier: Send + Sync {
    /// `true` means leak.
    fn predict(&self, features: &[f64]) -> Result<bool, ModelError>;

    /// Leak probability in [0, 1], or `None` for models without a score.
    fn predict_probability(&self, features: &[f64]) -> Result<Option<f64>, ModelError>;

    /// Ordered feature names the model was fit on, if it declares them.
    fn feature_schema(&self) -> Option<&[String]> {
        None
    }
}

/// Leak position predictor (meters along the pipeline).
pub trait LeakRegressor: Send + Sync {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError>;

    fn feature_schema(&self) -> Option<&[String]> {
        None
    }
}
