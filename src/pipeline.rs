use anyhow::Result;
use ndarray::Array1;
use std::path::Path;

use crate::artifacts::{ArtifactError, Artifacts, ModelInfo};
use crate::encoding::{EncodeError, FeatureEncoder};
use crate::engine::Engine;
use crate::model::{Model, argmax};
use crate::types::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector, Prediction};

/// Number of classes the serving path understands: 0 = critical, 1 = normal.
pub const SERVING_CLASSES: usize = 2;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Encoders(#[from] EncodeError),
    #[error("model expects {actual} features, serving provides {expected}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("model predicts {actual} classes, serving expects {expected}")]
    ClassCount { expected: usize, actual: usize },
    #[error("model info lists features {actual:?}, serving uses {expected:?}")]
    FeatureNames {
        expected: Vec<String>,
        actual: Vec<String>,
    },
}

/// Loaded model plus the encoders it was trained with. Immutable once built.
#[derive(Debug)]
pub struct PredictionPipeline {
    model: Model,
    encoders: FeatureEncoder,
    info: ModelInfo,
}

impl PredictionPipeline {
    pub fn new(artifacts: Artifacts) -> Result<Self, PipelineError> {
        let Artifacts {
            model,
            encoders,
            info,
        } = artifacts;

        if model.n_features() != FEATURE_COUNT {
            return Err(PipelineError::FeatureCount {
                expected: FEATURE_COUNT,
                actual: model.n_features(),
            });
        }
        if model.n_classes() != SERVING_CLASSES {
            return Err(PipelineError::ClassCount {
                expected: SERVING_CLASSES,
                actual: model.n_classes(),
            });
        }
        if info.feature_names != FEATURE_NAMES {
            return Err(PipelineError::FeatureNames {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                actual: info.feature_names,
            });
        }
        encoders.validate()?;

        Ok(Self {
            model,
            encoders,
            info,
        })
    }

    #[tracing::instrument]
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let pipeline = Self::new(Artifacts::load(dir)?)?;
        tracing::info!(
            model = pipeline.model.name(),
            accuracy = pipeline.info.accuracy,
            "Model loaded successfully"
        );
        Ok(pipeline)
    }

    pub fn encoders(&self) -> &FeatureEncoder {
        &self.encoders
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }
}

impl Engine for PredictionPipeline {
    fn model_name(&self) -> &str {
        self.model.name()
    }

    fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let row = Array1::from(features.as_row());
        let probabilities = self.model.predict_proba(row.view())?;
        let class = argmax(&probabilities);
        tracing::debug!(?features, class, ?probabilities, "Prediction computed");
        Ok(Prediction {
            class,
            probabilities,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{DecisionTree, TreeParams};
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn info() -> ModelInfo {
        ModelInfo {
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            categorical_features: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            target_classes: vec!["critical".into(), "normal".into()],
            model_name: "DecisionTree".into(),
            accuracy: 1.0,
            trained_at: chrono::Utc::now(),
        }
    }

    /// Critical whenever the general-symptom column is non-zero.
    fn tree(n_features: usize, n_classes: usize) -> Model {
        let rows = [[2.0, 0.0, 0.0, 0.0, 0.0, 0.0], [2.0, 0.0, 0.0, 9.0, 0.0, 0.0]];
        let data: Vec<f64> = rows.iter().flat_map(|r| r[..n_features].to_vec()).collect();
        let x = Array2::from_shape_vec((2, n_features), data).unwrap();
        let y = [1, 0];
        let tree = DecisionTree::fit(
            &x,
            &y,
            n_classes,
            &TreeParams::default(),
            &mut ChaCha8Rng::seed_from_u64(0),
        )
        .unwrap();
        Model::DecisionTree(tree)
    }

    fn pipeline() -> PredictionPipeline {
        PredictionPipeline::new(Artifacts {
            model: tree(6, 2),
            encoders: FeatureEncoder::builtin(),
            info: info(),
        })
        .unwrap()
    }

    #[test]
    fn predicts_class_and_distribution() {
        let pipeline = pipeline();
        let fever = FeatureVector([2, 0, 0, 9, 0, 0]);
        let healthy = FeatureVector([2, 0, 0, 0, 0, 0]);

        let prediction = pipeline.predict(&fever).unwrap();
        assert_eq!(prediction.class, 0);
        assert_eq!(prediction.probabilities, vec![1.0, 0.0]);

        assert_eq!(pipeline.predict(&healthy).unwrap().class, 1);
    }

    #[test]
    fn prediction_is_deterministic() {
        let pipeline = pipeline();
        let features = FeatureVector([4, 1, 5, 9, 13, 17]);
        let first = pipeline.predict(&features).unwrap();
        for _ in 0..10 {
            assert_eq!(pipeline.predict(&features).unwrap(), first);
        }
    }

    #[test]
    fn rejects_wrong_feature_count() {
        let err = PredictionPipeline::new(Artifacts {
            model: tree(5, 2),
            encoders: FeatureEncoder::builtin(),
            info: info(),
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::FeatureCount { expected: 6, actual: 5 }));
    }

    #[test]
    fn rejects_wrong_class_count() {
        let err = PredictionPipeline::new(Artifacts {
            model: tree(6, 3),
            encoders: FeatureEncoder::builtin(),
            info: info(),
        })
        .unwrap_err();
        assert!(matches!(err, PipelineError::ClassCount { expected: 2, actual: 3 }));
    }

    #[test]
    fn missing_directory_is_an_artifact_error() {
        let dir = std::env::temp_dir().join(format!("animal-health-missing-{}", uuid::Uuid::new_v4()));
        let err = PredictionPipeline::load(&dir).unwrap_err();
        assert!(matches!(err, PipelineError::Artifact(ArtifactError::Read { .. })));
    }
}
