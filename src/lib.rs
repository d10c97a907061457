//! PipeGuard: Pipeline Leak Detection
//!
//! Two-stage inference over batches of pressure/acoustic sensor snapshots.
//!
//! ## Architecture
//!
//! - **Acquisition**: CSV / JSON-lines input into a [`Dataset`]
//! - **Features**: `P_*`, `A_*` columns plus adjacent-sensor differences
//! - **Models**: leak classifier (required) and leak locator (optional)
//! - **Physics Engine**: acoustic centroid fallback and rule-based screening
//! - **Pipeline**: per-row classify-then-locate, report assembly, evaluation

pub mod acquisition;
pub mod config;
pub mod error;
pub mod features;
pub mod models;
pub mod physics_engine;
pub mod pipeline;
pub mod types;

// Re-export configuration
pub use config::PipelineConfig;

// Re-export commonly used types
pub use acquisition::Dataset;
pub use error::{ErrorKind, PipelineError, RowError};
pub use types::{
    BatchSummary, CellValue, LeakStatus, LocationSource, Observation, PredictionResult, Report,
    RunId,
};

// Re-export the model seam
pub use models::{LeakClassifier, LeakRegressor, ModelError, ModelStore};

// Re-export pipeline entry points
pub use pipeline::{evaluate, inspect, InferencePipeline, ReportAssembler};
