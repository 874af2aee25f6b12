//! Persisted model artifacts

use crate::error::{FarecastError, Result};
use crate::training::{MetricsRecord, ModelName, TrainedModel};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to reload and serve a trained model: the fitted model
/// itself, the exact feature schema it was trained on, its identity, and
/// the metrics it earned at training time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: TrainedModel,
    pub feature_names: Vec<String>,
    pub model_name: ModelName,
    pub metrics: MetricsRecord,
}

/// Reads and writes artifacts as pretty-printed JSON
pub struct ArtifactStore;

impl ArtifactStore {
    pub fn save(artifact: &ModelArtifact, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(artifact)?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), model = %artifact.model_name, "artifact saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<ModelArtifact> {
        if !path.exists() {
            return Err(FarecastError::ArtifactNotFound(path.to_path_buf()));
        }
        let json = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&json)
            .map_err(|e| FarecastError::ArtifactCorrupt(e.to_string()))?;
        tracing::info!(
            path = %path.display(),
            model = %artifact.model_name,
            n_features = artifact.feature_names.len(),
            "artifact loaded"
        );
        Ok(artifact)
    }
}
