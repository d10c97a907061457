//! Shared data structures for pipeline leak detection
//!
//! This module defines the core types that flow through the pipeline:
//! - Ingestion: `Observation`, `CellValue`, `RunId` (one sensor snapshot)
//! - Output: `PredictionResult`, `BatchSummary`, `Report` (the JSON payload)

mod observation;
mod report;

pub use observation::*;
pub use report::*;
