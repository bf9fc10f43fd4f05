use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::ModelError;
use crate::tree::{DecisionTree, TreeParams};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
        }
    }
}

/// Bagged ensemble of decision trees. Each tree sees a bootstrap sample and
/// considers `ceil(sqrt(n_features))` candidate features per split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if params.n_estimators == 0 {
            return Err(ModelError::NoEstimators);
        }
        let n_rows = x.nrows();
        if n_rows == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }

        let tree_params = TreeParams {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            max_features: Some((x.ncols() as f64).sqrt().ceil() as usize),
        };

        let mut trees = Vec::with_capacity(params.n_estimators);
        for _ in 0..params.n_estimators {
            let sample: Vec<usize> = (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect();
            trees.push(DecisionTree::fit_rows(x, y, &sample, n_classes, &tree_params, &mut *rng)?);
        }

        tracing::debug!(n_estimators = trees.len(), "Random forest fitted");

        Ok(Self {
            n_features: x.ncols(),
            n_classes,
            trees,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Mean of the per-tree class distributions.
    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Result<Vec<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NoEstimators);
        }

        let mut total = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in total.iter_mut().zip(tree.predict_proba(row)?) {
                *acc += p;
            }
        }

        let n = self.trees.len() as f64;
        Ok(total.into_iter().map(|p| p / n).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn training_set() -> (Array2<f64>, Vec<usize>) {
        let x = array![
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [5.0, 5.0],
            [5.0, 6.0],
            [6.0, 5.0],
            [6.0, 6.0]
        ];
        (x, vec![0, 0, 0, 0, 1, 1, 1, 1])
    }

    #[test]
    fn separates_clusters() {
        let (x, y) = training_set();
        let params = ForestParams {
            n_estimators: 25,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, 2, &params, &mut ChaCha8Rng::seed_from_u64(42)).unwrap();

        assert_eq!(forest.n_estimators(), 25);
        let low = forest.predict_proba(array![0.5, 0.5].view()).unwrap();
        let high = forest.predict_proba(array![5.5, 5.5].view()).unwrap();
        assert!(low[0] > low[1]);
        assert!(high[1] > high[0]);
        assert!((low.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_gives_same_forest() {
        let (x, y) = training_set();
        let params = ForestParams {
            n_estimators: 10,
            ..ForestParams::default()
        };
        let a = RandomForest::fit(&x, &y, 2, &params, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let b = RandomForest::fit(&x, &y, 2, &params, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_estimators_is_rejected() {
        let (x, y) = training_set();
        let params = ForestParams {
            n_estimators: 0,
            ..ForestParams::default()
        };
        let err = RandomForest::fit(&x, &y, 2, &params, &mut ChaCha8Rng::seed_from_u64(1)).unwrap_err();
        assert!(matches!(err, ModelError::NoEstimators));
    }
}
