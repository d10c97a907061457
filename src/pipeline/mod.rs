//! Inference Pipeline Module
//!
//! ```text
//! Dataset ──> FeatureDeriver ──> LeakClassifier ──┬─ no leak ──────────────────────┐
//!                                                 └─ leak ─> LeakRegressor ────────┤
//!                                                            └─(absent/failed)─>   │
//!                                                               acoustic centroid ─┤
//!                                                                                  v
//!                                                                          ReportAssembler
//! ```
//!
//! One invocation, one dataset, one report. Models are handed in by the
//! caller; nothing here reads artifacts from disk.

mod evaluation;
mod inspection;
mod processor;
mod report;

pub use evaluation::{evaluate, EvaluationReport};
pub use inspection::{inspect, InspectedRow, InspectionReport};
pub use processor::InferencePipeline;
pub use report::{render_error, render_line, ReportAssembler};
