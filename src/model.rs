use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use crate::forest::RandomForest;
use crate::tree::DecisionTree;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("expected {expected} values, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("model must have at least one class")]
    NoClasses,
    #[error("label {label} is out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },
    #[error("forest has no estimators")]
    NoEstimators,
}

/// A trained classifier as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DecisionTree(_) => "DecisionTree",
            Self::RandomForest(_) => "RandomForest",
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Self::DecisionTree(tree) => tree.n_features(),
            Self::RandomForest(forest) => forest.n_features(),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            Self::DecisionTree(tree) => tree.n_classes(),
            Self::RandomForest(forest) => forest.n_classes(),
        }
    }

    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Result<Vec<f64>, ModelError> {
        match self {
            Self::DecisionTree(tree) => tree.predict_proba(row),
            Self::RandomForest(forest) => forest.predict_proba(row),
        }
    }

    pub fn predict(&self, row: ArrayView1<f64>) -> Result<usize, ModelError> {
        Ok(argmax(&self.predict_proba(row)?))
    }
}

/// Index of the largest value; the first one wins ties.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_idx, best), (idx, &v)| {
            if v > best { (idx, v) } else { (best_idx, best) }
        })
        .0
}
