//! On-disk layout of a trained model directory.

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoding::FeatureEncoder;
use crate::model::Model;

pub const MODEL_FILE: &str = "animal_health_model.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";
pub const INFO_FILE: &str = "model_info.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Metadata saved next to the model for reference and load-time checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub feature_names: Vec<String>,
    pub categorical_features: Vec<String>,
    pub target_classes: Vec<String>,
    pub model_name: String,
    pub accuracy: f64,
    pub trained_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifacts {
    pub model: Model,
    pub encoders: FeatureEncoder,
    pub info: ModelInfo,
}

impl Artifacts {
    pub fn paths(dir: &Path) -> [PathBuf; 3] {
        [dir.join(MODEL_FILE), dir.join(ENCODERS_FILE), dir.join(INFO_FILE)]
    }

    #[tracing::instrument(skip(self), fields(model = self.model.name()))]
    pub fn save(&self, dir: &Path) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir).map_err(|source| ArtifactError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let [model_path, encoders_path, info_path] = Self::paths(dir);
        write_json(&model_path, &self.model)?;
        tracing::info!(path = %model_path.display(), "Model saved");
        write_json(&encoders_path, &self.encoders)?;
        tracing::info!(path = %encoders_path.display(), "Label encoders saved");
        write_json(&info_path, &self.info)?;
        tracing::info!(path = %info_path.display(), "Model info saved");
        Ok(())
    }

    #[tracing::instrument]
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let [model_path, encoders_path, info_path] = Self::paths(dir);
        Ok(Self {
            model: read_json(&model_path)?,
            encoders: read_json(&encoders_path)?,
            info: read_json(&info_path)?,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    let bytes = serde_json::to_vec(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, bytes).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
