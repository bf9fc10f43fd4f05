//! CART decision tree over dense `f64` features with per-class leaf
//! frequencies, so predictions carry a probability distribution.

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::model::ModelError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Number of candidate features per split; `None` means all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        /// Normalised class frequencies of the training rows that reached
        /// this leaf.
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    n_features: usize,
    n_classes: usize,
    root: Node,
}

struct Builder<'a, R> {
    x: &'a Array2<f64>,
    y: &'a [usize],
    n_classes: usize,
    params: &'a TreeParams,
    rng: &'a mut R,
}

fn class_counts(y: &[usize], rows: &[usize], n_classes: usize) -> Vec<usize> {
    let mut counts = vec![0usize; n_classes];
    for &row in rows {
        counts[y[row]] += 1;
    }
    counts
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn leaf(counts: &[usize]) -> Node {
    let total: usize = counts.iter().sum();
    let distribution = if total == 0 {
        vec![1.0 / counts.len() as f64; counts.len()]
    } else {
        counts.iter().map(|&c| c as f64 / total as f64).collect()
    };
    Node::Leaf { distribution }
}

impl<R: Rng> Builder<'_, R> {
    fn build(&mut self, rows: &[usize], depth: usize) -> Node {
        let counts = class_counts(self.y, rows, self.n_classes);
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;

        if pure || depth >= self.params.max_depth || rows.len() < self.params.min_samples_split {
            return leaf(&counts);
        }

        match self.best_split(rows, &counts) {
            Some((feature, threshold)) => {
                let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                    .iter()
                    .partition(|&&row| self.x[[row, feature]] <= threshold);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.build(&left_rows, depth + 1)),
                    right: Box::new(self.build(&right_rows, depth + 1)),
                }
            }
            None => leaf(&counts),
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        let mut features: Vec<usize> = (0..n_features).collect();
        if let Some(k) = self.params.max_features {
            let k = k.clamp(1, n_features);
            features.shuffle(&mut *self.rng);
            features.truncate(k);
            features.sort_unstable();
        }
        features
    }

    /// Lowest weighted Gini split that strictly improves on the parent.
    fn best_split(&mut self, rows: &[usize], parent_counts: &[usize]) -> Option<(usize, f64)> {
        let total = rows.len();
        let parent_impurity = gini(parent_counts, total);
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in self.candidate_features() {
            let mut sorted: Vec<(f64, usize)> = rows
                .iter()
                .map(|&row| (self.x[[row, feature]], self.y[row]))
                .collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = vec![0usize; self.n_classes];
            let mut right = parent_counts.to_vec();

            for i in 0..total - 1 {
                let (value, class) = sorted[i];
                left[class] += 1;
                right[class] -= 1;

                let next = sorted[i + 1].0;
                if next <= value {
                    continue;
                }

                let n_left = i + 1;
                let n_right = total - n_left;
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / total as f64;

                if impurity < parent_impurity
                    && best.is_none_or(|(_, _, best_impurity)| impurity < best_impurity)
                {
                    best = Some((feature, (value + next) / 2.0, impurity));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

impl DecisionTree {
    pub fn fit<R: Rng>(
        x: &Array2<f64>,
        y: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        let rows: Vec<usize> = (0..x.nrows()).collect();
        Self::fit_rows(x, y, &rows, n_classes, params, rng)
    }

    /// Fits on a subset of rows; duplicates are allowed (bootstrap samples).
    pub fn fit_rows<R: Rng>(
        x: &Array2<f64>,
        y: &[usize],
        rows: &[usize],
        n_classes: usize,
        params: &TreeParams,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        if x.nrows() != y.len() {
            return Err(ModelError::ShapeMismatch {
                expected: x.nrows(),
                actual: y.len(),
            });
        }
        if rows.is_empty() || x.ncols() == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if n_classes == 0 {
            return Err(ModelError::NoClasses);
        }
        if let Some(&label) = y.iter().find(|&&label| label >= n_classes) {
            return Err(ModelError::LabelOutOfRange { label, n_classes });
        }

        let mut builder = Builder {
            x,
            y,
            n_classes,
            params,
            rng,
        };
        let root = builder.build(rows, 0);

        Ok(Self {
            n_features: x.ncols(),
            n_classes,
            root,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }

    pub fn predict_proba(&self, row: ArrayView1<f64>) -> Result<Vec<f64>, ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return Ok(distribution.clone()),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().ok_or(ModelError::ShapeMismatch {
                        expected: self.n_features,
                        actual: row.len(),
                    })?;
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(7)
    }

    #[test]
    fn perfectly_fits_separable_data() {
        let x = array![[0.0], [1.0], [10.0], [11.0]];
        let y = [0, 0, 1, 1];
        let tree = DecisionTree::fit(&x, &y, 2, &TreeParams::default(), &mut rng()).unwrap();

        for (row, &label) in x.rows().into_iter().zip(&y) {
            let proba = tree.predict_proba(row).unwrap();
            assert_eq!(proba[label], 1.0);
        }
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn depth_limit_produces_mixed_leaves() {
        let x = array![[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let y = [0, 1, 1, 0];
        let params = TreeParams {
            max_depth: 0,
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng()).unwrap();

        let proba = tree.predict_proba(x.row(0)).unwrap();
        assert_eq!(proba, vec![0.5, 0.5]);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let x = array![[0.0, 2.0], [1.0, 2.0], [1.0, 3.0], [2.0, 3.0], [2.0, 2.0]];
        let y = [0, 0, 1, 1, 0];
        let params = TreeParams {
            max_depth: 1,
            ..TreeParams::default()
        };
        let tree = DecisionTree::fit(&x, &y, 2, &params, &mut rng()).unwrap();

        for row in x.rows() {
            let sum: f64 = tree.predict_proba(row).unwrap().iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn wrong_row_width_is_an_error() {
        let x = array![[0.0, 1.0], [1.0, 0.0]];
        let tree = DecisionTree::fit(&x, &[0, 1], 2, &TreeParams::default(), &mut rng()).unwrap();
        let err = tree.predict_proba(array![1.0].view()).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn rejects_out_of_range_labels() {
        let x = array![[0.0], [1.0]];
        let err = DecisionTree::fit(&x, &[0, 3], 2, &TreeParams::default(), &mut rng()).unwrap_err();
        assert!(matches!(err, ModelError::LabelOutOfRange { label: 3, n_classes: 2 }));
    }

    #[test]
    fn survives_a_serde_round_trip() {
        let x = array![[0.0], [1.0], [10.0], [11.0]];
        let tree = DecisionTree::fit(&x, &[0, 0, 1, 1], 2, &TreeParams::default(), &mut rng()).unwrap();
        let json = serde_json::to_string(&tree).unwrap();
        let restored: DecisionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tree);
    }
}
