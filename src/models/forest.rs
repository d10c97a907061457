//! Decision-forest artifacts and inference.
//!
//! # Artifact format
//!
//! One JSON document per model:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "task": "classifier",
//!   "feature_names": ["P_0", "P_500", "A_0", "A_500", "dP_0", "dA_0"],
//!   "n_features": 6,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 3, "threshold": 0.2, "left": 1, "right": 2 },
//!         { "value": 0.05 },
//!         { "value": 0.97 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! Node 0 is the root. A split sends `x[feature] <= threshold` left, anything
//! else right. Children always sit after their parent, so traversal cannot
//! loop. Classifier leaves hold the leak probability of that leaf; the forest
//! probability is the mean over trees. Regressor leaves hold meters; the
//! forest prediction is the mean over trees.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{LeakClassifier, LeakRegressor, ModelError};
use crate::config::defaults::ARTIFACT_FORMAT_VERSION;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTask {
    Classifier,
    Regressor,
}

impl fmt::Display for ModelTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classifier => write!(f, "classifier"),
            Self::Regressor => write!(f, "regressor"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl Node {
    pub const fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Self::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    pub const fn leaf(value: f64) -> Self {
        Self::Leaf { value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk from the root to a leaf. Assumes a validated tree.
    fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().unwrap_or(0.0);
                    idx = if x <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }
}

/// A serialized forest, classifier or regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestArtifact {
    pub format_version: u32,
    pub task: ModelTask,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    pub n_features: usize,
    pub trees: Vec<Tree>,
}

impl ForestArtifact {
    pub fn new(task: ModelTask, n_features: usize, trees: Vec<Tree>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            task,
            feature_names: None,
            n_features,
            trees,
        }
    }

    #[must_use]
    pub fn with_feature_names(mut self, names: Vec<String>) -> Self {
        self.n_features = names.len();
        self.feature_names = Some(names);
        self
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Structural checks run on every load and save.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ModelError::Invalid(format!(
                "unsupported format_version {} (expected {ARTIFACT_FORMAT_VERSION})",
                self.format_version
            )));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.n_features {
                return Err(ModelError::Invalid(format!(
                    "{} feature names declared for n_features = {}",
                    names.len(),
                    self.n_features
                )));
            }
        }
        if self.trees.is_empty() {
            return Err(ModelError::Invalid("forest has no trees".into()));
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::Invalid(format!("tree {t} has no nodes")));
            }
            let len = tree.nodes.len();
            for (i, node) in tree.nodes.iter().enumerate() {
                match *node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if feature >= self.n_features {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: feature {feature} out of range"
                            )));
                        }
                        if !threshold.is_finite() {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: non-finite threshold"
                            )));
                        }
                        if left <= i || right <= i || left >= len || right >= len {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: child index out of order or range"
                            )));
                        }
                    }
                    Node::Leaf { value } => {
                        if !value.is_finite() {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: non-finite leaf"
                            )));
                        }
                        if self.task == ModelTask::Classifier && !(0.0..=1.0).contains(&value) {
                            return Err(ModelError::Invalid(format!(
                                "tree {t} node {i}: classifier leaf {value} outside [0, 1]"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn mean(&self, features: &[f64]) -> Result<f64, ModelError> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureCount {
                expected: self.n_features,
                got: features.len(),
            });
        }
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        #[allow(clippy::cast_precision_loss)]
        Ok(sum / self.trees.len() as f64)
    }

    fn expect_task(&self, task: ModelTask) -> Result<(), ModelError> {
        if self.task == task {
            Ok(())
        } else {
            Err(ModelError::WrongTask {
                expected: task,
                found: self.task,
            })
        }
    }
}

// ============================================================================
// Classifier / Regressor wrappers
// ============================================================================

/// Forest leak classifier. Leak iff mean probability > threshold.
#[derive(Debug, Clone)]
pub struct ForestClassifier {
    artifact: ForestArtifact,
    threshold: f64,
}

impl ForestClassifier {
    pub fn new(artifact: ForestArtifact, threshold: f64) -> Result<Self, ModelError> {
        artifact.expect_task(ModelTask::Classifier)?;
        artifact.validate()?;
        Ok(Self {
            artifact,
            threshold,
        })
    }
}

impl LeakClassifier for ForestClassifier {
    fn predict(&self, features: &[f64]) -> Result<bool, ModelError> {
        Ok(self.artifact.mean(features)? > self.threshold)
    }

    fn predict_probability(&self, features: &[f64]) -> Result<Option<f64>, ModelError> {
        self.artifact.mean(features).map(|p| Some(p.clamp(0.0, 1.0)))
    }

    fn feature_schema(&self) -> Option<&[String]> {
        self.artifact.feature_names.as_deref()
    }
}

/// Forest leak locator.
#[derive(Debug, Clone)]
pub struct ForestRegressor {
    artifact: ForestArtifact,
}

impl ForestRegressor {
    pub fn new(artifact: ForestArtifact) -> Result<Self, ModelError> {
        artifact.expect_task(ModelTask::Regressor)?;
        artifact.validate()?;
        Ok(Self { artifact })
    }
}

impl LeakRegressor for ForestRegressor {
    fn predict(&self, features: &[f64]) -> Result<f64, ModelError> {
        self.artifact.mean(features)
    }

    fn feature_schema(&self) -> Option<&[String]> {
        self.artifact.feature_names.as_deref()
    }
}
