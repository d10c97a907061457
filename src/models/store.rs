//! Model artifact store.
//!
//! Resolves artifact paths from config, loads them once per invocation and
//! writes them atomically (temp file, then rename) in the same format.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{ForestArtifact, ForestClassifier, ForestRegressor, ModelError, ModelTask};
use crate::config::PipelineConfig;
use crate::error::PipelineError;

#[derive(Debug, Clone)]
pub struct ModelStore {
    classifier_path: PathBuf,
    regressor_path: PathBuf,
    decision_threshold: f64,
}

impl ModelStore {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            classifier_path: config.classifier_path(),
            regressor_path: config.regressor_path(),
            decision_threshold: config.inference.decision_threshold,
        }
    }

    pub fn classifier_path(&self) -> &Path {
        &self.classifier_path
    }

    pub fn regressor_path(&self) -> &Path {
        &self.regressor_path
    }

    /// Load the mandatory classifier. Any failure is fatal for the run.
    pub fn load_classifier(&self) -> Result<ForestClassifier, PipelineError> {
        if !self.classifier_path.exists() {
            return Err(PipelineError::ClassifierMissing(self.classifier_path.clone()));
        }
        let artifact =
            read_artifact(&self.classifier_path, ModelTask::Classifier).map_err(PipelineError::ClassifierInvalid)?;
        ForestClassifier::new(artifact, self.decision_threshold).map_err(PipelineError::ClassifierInvalid)
    }

    /// Load the optional regressor. Absence or a bad artifact degrades to the
    /// acoustic centroid for every row.
    pub fn load_regressor(&self) -> Option<ForestRegressor> {
        if !self.regressor_path.exists() {
            info!(
                path = %self.regressor_path.display(),
                "No leak locator model, using acoustic centroid"
            );
            return None;
        }
        match read_artifact(&self.regressor_path, ModelTask::Regressor).and_then(ForestRegressor::new) {
            Ok(reg) => Some(reg),
            Err(e) => {
                warn!(
                    path = %self.regressor_path.display(),
                    error = %e,
                    "Leak locator model unusable, using acoustic centroid"
                );
                None
            }
        }
    }

    pub fn save_classifier(&self, artifact: &ForestArtifact) -> Result<(), ModelError> {
        write_artifact(&self.classifier_path, artifact, ModelTask::Classifier)
    }

    pub fn save_regressor(&self, artifact: &ForestArtifact) -> Result<(), ModelError> {
        write_artifact(&self.regressor_path, artifact, ModelTask::Regressor)
    }
}

fn read_artifact(path: &Path, task: ModelTask) -> Result<ForestArtifact, ModelError> {
    let bytes = std::fs::read(path).map_err(|e| ModelError::Io(path.to_path_buf(), e))?;
    let artifact = ForestArtifact::from_bytes(&bytes)?;
    if artifact.task != task {
        return Err(ModelError::WrongTask {
            expected: task,
            found: artifact.task,
        });
    }

    info!(
        path = %path.display(),
        task = %task,
        trees = artifact.trees.len(),
        features = artifact.n_features,
        schema = artifact.feature_names.is_some(),
        md5 = %format!("{:x}", md5::compute(&bytes)),
        "Loaded model artifact"
    );
    Ok(artifact)
}

fn write_artifact(path: &Path, artifact: &ForestArtifact, task: ModelTask) -> Result<(), ModelError> {
    if artifact.task != task {
        return Err(ModelError::WrongTask {
            expected: task,
            found: artifact.task,
        });
    }
    artifact.validate()?;
    let bytes = artifact.to_bytes()?;

    let io_err = |e: std::io::Error| ModelError::Io(path.to_path_buf(), e);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, &bytes).map_err(io_err)?;
    std::fs::rename(&tmp_path, path).map_err(io_err)?;

    info!(path = %path.display(), task = %task, "Saved model artifact");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeakClassifier, LeakRegressor, Node, Tree};

    fn store_in(dir: &Path) -> ModelStore {
        let mut cfg = PipelineConfig::default();
        cfg.models.dir = dir.to_path_buf();
        ModelStore::from_config(&cfg)
    }

    fn stump(task: ModelTask, below: f64, above: f64) -> ForestArtifact {
        ForestArtifact::new(
            task,
            1,
            vec![Tree::new(vec![Node::split(0, 0.2, 1, 2), Node::leaf(below), Node::leaf(above)])],
        )
    }

    #[test]
    fn test_missing_classifier_is_fatal() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let err = store_in(dir.path()).load_classifier().expect_err("missing");
        assert!(matches!(err, PipelineError::ClassifierMissing(_)));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let store = store_in(&dir.path().join("nested"));

        store
            .save_classifier(&stump(ModelTask::Classifier, 0.1, 0.9))
            .expect("save classifier");
        store
            .save_regressor(&stump(ModelTask::Regressor, 100.0, 700.0))
            .expect("save regressor");
        assert!(!store.classifier_path().with_extension("json.tmp").exists());

        let clf = store.load_classifier().expect("load classifier");
        assert!(clf.predict(&[0.5]).expect("predict"));
        let reg = store.load_regressor().expect("load regressor");
        assert_eq!(reg.predict(&[0.0]).expect("predict"), 100.0);
    }

    #[test]
    fn test_save_rejects_wrong_task() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let store = store_in(dir.path());
        assert!(matches!(
            store.save_classifier(&stump(ModelTask::Regressor, 1.0, 2.0)),
            Err(ModelError::WrongTask { .. })
        ));
    }

    #[test]
    fn test_undecodable_classifier_is_invalid() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let store = store_in(dir.path());
        std::fs::write(store.classifier_path(), b"not json").expect("write");

        let err = store.load_classifier().expect_err("invalid");
        assert!(matches!(err, PipelineError::ClassifierInvalid(ModelError::Decode(_))));
    }

    #[test]
    fn test_regressor_absent_or_broken_degrades() {
        let dir = tempfile::tempdir().expect("tmpdir");
        let store = store_in(dir.path());
        assert!(store.load_regressor().is_none());

        std::fs::write(store.regressor_path(), b"{}").expect("write");
        assert!(store.load_regressor().is_none());

        // A classifier artifact in the regressor slot is rejected too.
        let bytes = stump(ModelTask::Classifier, 0.0, 1.0).to_bytes().expect("bytes");
        std::fs::write(store.regressor_path(), bytes).expect("write");
        assert!(store.load_regressor().is_none());
    }
}
