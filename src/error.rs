//! Error taxonomy.
//!
//! Anything in [`PipelineError`] stops the run before a report is produced.
//! [`RowError`] is confined to one row and becomes a `status: error` entry.
//! A leak that cannot be placed is not an error at all, see
//! [`crate::physics_engine::LocationEstimate::Gap`].

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;
use crate::models::ModelError;

/// Broad category of a fatal error, for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/invalid config, input file or mandatory model artifact.
    Configuration,
    /// Mandatory columns absent.
    Schema,
    /// Input exists but is not readable as tabular data.
    Dataset,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("File not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Leak detector model not found: {}", .0.display())]
    ClassifierMissing(PathBuf),

    #[error("Leak detector model could not be loaded: {0}")]
    ClassifierInvalid(#[source] ModelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Run_ID not found: {0}")]
    RunNotFound(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound(_)
            | Self::ClassifierMissing(_)
            | Self::ClassifierInvalid(_)
            | Self::Config(_) => ErrorKind::Configuration,
            Self::Schema(_) => ErrorKind::Schema,
            Self::Dataset(_) | Self::RunNotFound(_) => ErrorKind::Dataset,
        }
    }
}

/// A failure confined to one observation. The batch carries on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("missing value in column {0}")]
    MissingValue(String),

    #[error("non-numeric value {value:?} in column {column}")]
    NonNumeric { column: String, value: String },

    #[error("classifier failed: {0}")]
    Classifier(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            PipelineError::InputNotFound(PathBuf::from("x.csv")).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            PipelineError::ClassifierMissing(PathBuf::from("m")).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(PipelineError::Schema("x".into()).kind(), ErrorKind::Schema);
        assert_eq!(PipelineError::Dataset("x".into()).kind(), ErrorKind::Dataset);
    }

    #[test]
    fn test_row_error_messages() {
        assert_eq!(
            RowError::MissingValue("P_100".into()).to_string(),
            "missing value in column P_100"
        );
        assert_eq!(
            RowError::NonNumeric { column: "A_0".into(), value: "abc".into() }.to_string(),
            "non-numeric value \"abc\" in column A_0"
        );
    }

    #[test]
    fn test_missing_file_message() {
        let e = PipelineError::InputNotFound(PathBuf::from("/tmp/missing.csv"));
        assert_eq!(e.to_string(), "File not found: /tmp/missing.csv");
    }
}
