//! CART regression tree

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Best split found for one node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree minimizing squared error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Number of features drawn at each split (None = all)
    pub max_features: Option<usize>,
    /// Seed for per-split feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_regressor()
    }
}

impl DecisionTree {
    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
            feature_importances: None,
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    /// Set number of features considered per split
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(ForecastError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        if n_samples == 0 {
            return Err(ForecastError::ValidationError(
                "Cannot fit a tree on an empty dataset".to_string(),
            ));
        }

        if self.min_samples_leaf == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "min_samples_leaf".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        self.n_features = n_features;

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];

        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances, &mut rng));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || is_pure(&y_subset);

        if should_stop {
            return TreeNode::Leaf {
                value: mean(&y_subset),
                n_samples,
            };
        }

        let Some(best) = self.find_best_split(x, y, indices, rng) else {
            return TreeNode::Leaf {
                value: mean(&y_subset),
                n_samples,
            };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        if left_indices.len() < self.min_samples_leaf || right_indices.len() < self.min_samples_leaf {
            return TreeNode::Leaf {
                value: mean(&y_subset),
                n_samples,
            };
        }

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: variance(&y_subset),
        }
    }

    /// Search for the split with the largest variance reduction.
    ///
    /// With `max_features = k` the features are visited in a seeded random
    /// order: the first `k` are scanned together, and the remaining ones are
    /// only visited, one at a time, while no split with positive gain exists.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let n_features = x.ncols();
        let mut order: Vec<usize> = (0..n_features).collect();
        let k = match self.max_features {
            Some(k) if k < n_features => {
                order.shuffle(rng);
                k.max(1)
            }
            _ => n_features,
        };
        let (drawn, rest) = order.split_at(k);
        let mut drawn = drawn.to_vec();
        drawn.sort_unstable();

        let n = indices.len();
        let (total_sum, total_sq_sum) = indices
            .iter()
            .fold((0.0f64, 0.0f64), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
        let scan = NodeScan {
            x,
            y,
            indices,
            total_sum,
            total_sq_sum,
            parent_impurity: node_variance(n, total_sum, total_sq_sum),
            min_leaf: self.min_samples_leaf,
        };

        let feature_results: Vec<Option<SplitCandidate>> = drawn
            .par_iter()
            .map(|&feature_idx| scan.best_for_feature(feature_idx))
            .collect();

        // first feature wins ties so the result does not depend on scan order
        let best = feature_results
            .into_iter()
            .flatten()
            .fold(None, |best: Option<SplitCandidate>, cand| match best {
                Some(b) if b.gain >= cand.gain => Some(b),
                _ => Some(cand),
            });

        best.or_else(|| {
            rest.iter()
                .find_map(|&feature_idx| scan.best_for_feature(feature_idx))
        })
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(ForecastError::ModelNotFitted)?;

        if x.ncols() != self.n_features {
            return Err(ForecastError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|sample| predict_sample(root, &sample))
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth (a single leaf has depth 1)
    pub fn get_depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => node_depth(node),
        }
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => count_leaves(node),
        }
    }
}

/// Node-level sums shared by the per-feature sweeps
struct NodeScan<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    indices: &'a [usize],
    total_sum: f64,
    total_sq_sum: f64,
    parent_impurity: f64,
    min_leaf: usize,
}

impl NodeScan<'_> {
    /// Sort one feature and sweep it with running sums
    fn best_for_feature(&self, feature_idx: usize) -> Option<SplitCandidate> {
        let n = self.indices.len();
        let mut pairs: Vec<(f64, f64)> = self
            .indices
            .iter()
            .map(|&i| (self.x[[i, feature_idx]], self.y[i]))
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let mut left_sum = 0.0f64;
        let mut left_sq_sum = 0.0f64;
        let mut best_gain = 0.0f64;
        let mut best_threshold = 0.0f64;

        for i in 0..n.saturating_sub(1) {
            let (value, target) = pairs[i];
            left_sum += target;
            left_sq_sum += target * target;

            let next_value = pairs[i + 1].0;
            if value >= next_value {
                continue;
            }

            let left_count = i + 1;
            let right_count = n - left_count;
            if left_count < self.min_leaf || right_count < self.min_leaf {
                continue;
            }

            let left_impurity = node_variance(left_count, left_sum, left_sq_sum);
            let right_impurity = node_variance(
                right_count,
                self.total_sum - left_sum,
                self.total_sq_sum - left_sq_sum,
            );
            let weighted_impurity = (left_count as f64 * left_impurity
                + right_count as f64 * right_impurity)
                / n as f64;

            let gain = self.parent_impurity - weighted_impurity;
            if gain > best_gain {
                best_gain = gain;
                let mid = (value + next_value) / 2.0;
                // midpoint can round up to the right value for adjacent floats
                best_threshold = if mid >= next_value { value } else { mid };
            }
        }

        (best_gain > 0.0).then_some(SplitCandidate {
            feature_idx,
            threshold: best_threshold,
            gain: best_gain,
        })
    }
}

fn predict_sample(node: &TreeNode, sample: &ArrayView1<f64>) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split { feature_idx, threshold, left, right, .. } => {
            if sample[*feature_idx] <= *threshold {
                predict_sample(left, sample)
            } else {
                predict_sample(right, sample)
            }
        }
    }
}

fn node_depth(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn count_leaves(node: &TreeNode) -> usize {
    match node {
        TreeNode::Leaf { .. } => 1,
        TreeNode::Split { left, right, .. } => count_leaves(left) + count_leaves(right),
    }
}

/// Var = E[X²] - E[X]², clamped against rounding
fn node_variance(count: usize, sum: f64, sq_sum: f64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;
    (sq_sum / n - (sum / n).powi(2)).max(0.0)
}

fn variance(y: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    let m = mean(y);
    y.iter().map(|&v| (v - m).powi(2)).sum::<f64>() / y.len() as f64
}

fn mean(y: &[f64]) -> f64 {
    if y.is_empty() {
        return 0.0;
    }
    y.iter().sum::<f64>() / y.len() as f64
}

fn is_pure(y: &[f64]) -> bool {
    match y.first() {
        None => true,
        Some(&first) => y.iter().all(|&v| (v - first).abs() < 1e-10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regressor_simple() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();

        // unbounded depth memorizes distinct inputs
        for (p, a) in predictions.iter().zip(y.iter()) {
            assert!((p - a).abs() < 1e-12, "expected {}, got {}", a, p);
        }
    }

    #[test]
    fn test_step_function_split() {
        let x = array![[0.0], [1.0], [2.0], [3.0], [10.0], [11.0], [12.0], [13.0]];
        let y = array![5.0, 5.0, 5.0, 5.0, 50.0, 50.0, 50.0, 50.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_depth(), 2);
        assert_eq!(tree.get_n_leaves(), 2);

        let preds = tree.predict(&array![[2.5], [6.4], [6.6], [100.0]]).unwrap();
        assert_eq!(preds[0], 5.0);
        assert_eq!(preds[1], 5.0);
        assert_eq!(preds[2], 50.0);
        assert_eq!(preds[3], 50.0);
    }

    #[test]
    fn test_max_depth() {
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0], [5.0, 5.0], [6.0, 6.0]];
        let y = array![1.0, 4.0, 9.0, 16.0, 25.0, 36.0];

        let mut tree = DecisionTree::new_regressor().with_max_depth(2);
        tree.fit(&x, &y).unwrap();

        // depth counts levels of nodes, max_depth counts edges
        assert!(tree.get_depth() <= 3);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![7.0, 7.0, 7.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        assert_eq!(tree.get_n_leaves(), 1);
        let preds = tree.predict(&x).unwrap();
        assert!(preds.iter().all(|&p| p == 7.0));
    }

    #[test]
    fn test_feature_importances() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut tree = DecisionTree::new_regressor();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances().unwrap();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![1.0, 2.0, 3.0, 100.0];

        let mut tree = DecisionTree::new_regressor().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();

        // only the 2/2 split is allowed
        assert_eq!(tree.get_n_leaves(), 2);
    }

    #[test]
    fn test_max_features_is_seeded() {
        let x = array![
            [1.0, 5.0, 2.0],
            [2.0, 3.0, 8.0],
            [3.0, 9.0, 1.0],
            [4.0, 1.0, 7.0],
            [5.0, 4.0, 3.0],
            [6.0, 2.0, 6.0],
        ];
        let y = array![1.0, 3.0, 2.0, 6.0, 4.0, 5.0];

        let fit = |seed| {
            let mut tree = DecisionTree::new_regressor()
                .with_max_features(1)
                .with_random_state(seed);
            tree.fit(&x, &y).unwrap();
            tree.predict(&x).unwrap()
        };

        assert_eq!(fit(7), fit(7));
    }

    #[test]
    fn test_undrawn_feature_still_splits() {
        // column 0 is constant, column 1 carries the target
        let x = Array2::from_shape_fn((20, 2), |(r, c)| if c == 0 { 3.0 } else { r as f64 });
        let y = x.column(1).to_owned();

        for seed in 0..20 {
            let mut tree = DecisionTree::new_regressor()
                .with_max_features(1)
                .with_random_state(seed);
            tree.fit(&x, &y).unwrap();

            assert_eq!(tree.get_n_leaves(), 20, "seed {} stopped early", seed);
            assert_eq!(tree.predict(&x).unwrap(), y);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let tree = DecisionTree::new_regressor();
        let result = tree.predict(&array![[1.0]]);
        assert!(matches!(result, Err(ForecastError::ModelNotFitted)));
    }

    #[test]
    fn test_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        let mut tree = DecisionTree::new_regressor();
        assert!(matches!(tree.fit(&x, &y), Err(ForecastError::ShapeError { .. })));
    }
}
