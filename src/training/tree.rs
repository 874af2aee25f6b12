//! Regression tree, the base learner for both ensembles

use crate::error::{FarecastError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A node in a fitted regression tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// CART-style regression tree with variance (MSE) splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    n_features: usize,
    feature_importances: Option<Vec<f64>>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(FarecastError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(FarecastError::ValidationError(
                "cannot fit a tree on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_node(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(importances);

        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = sums(y, indices);
        let mean = sum / n_samples as f64;
        let impurity = sq_sum / n_samples as f64 - mean * mean;

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.is_some_and(|d| depth >= d)
            || impurity <= 1e-12;

        if should_stop {
            return TreeNode::Leaf {
                value: mean,
                n_samples,
            };
        }

        match self.find_best_split(x, y, indices, impurity) {
            Some(split) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

                if left_indices.len() < self.min_samples_leaf
                    || right_indices.len() < self.min_samples_leaf
                {
                    return TreeNode::Leaf {
                        value: mean,
                        n_samples,
                    };
                }

                importances[split.feature_idx] += n_samples as f64 * split.gain;

                let left = Box::new(self.build_node(x, y, &left_indices, depth + 1, importances));
                let right = Box::new(self.build_node(x, y, &right_indices, depth + 1, importances));

                TreeNode::Split {
                    feature_idx: split.feature_idx,
                    threshold: split.threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => TreeNode::Leaf {
                value: mean,
                n_samples,
            },
        }
    }

    /// Best variance-reducing split across all features. Each feature is
    /// scanned independently (rayon) with a sorted prefix-sum sweep.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent_impurity: f64,
    ) -> Option<SplitCandidate> {
        let n = indices.len();

        (0..x.ncols())
            .into_par_iter()
            .filter_map(|feature_idx| {
                let mut pairs: Vec<(f64, f64)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], y[i]))
                    .collect();
                pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

                let total_sum: f64 = pairs.iter().map(|(_, yi)| yi).sum();
                let total_sq: f64 = pairs.iter().map(|(_, yi)| yi * yi).sum();

                let mut best: Option<SplitCandidate> = None;
                let mut left_sum = 0.0;
                let mut left_sq = 0.0;

                for i in 1..n {
                    left_sum += pairs[i - 1].1;
                    left_sq += pairs[i - 1].1 * pairs[i - 1].1;

                    // Only split where the feature value actually changes
                    if pairs[i - 1].0 == pairs[i].0 {
                        continue;
                    }
                    if i < self.min_samples_leaf || n - i < self.min_samples_leaf {
                        continue;
                    }

                    let left_n = i as f64;
                    let right_n = (n - i) as f64;
                    let right_sum = total_sum - left_sum;
                    let right_sq = total_sq - left_sq;

                    let left_var = left_sq / left_n - (left_sum / left_n).powi(2);
                    let right_var = right_sq / right_n - (right_sum / right_n).powi(2);
                    let weighted = (left_n * left_var + right_n * right_var) / n as f64;
                    let gain = parent_impurity - weighted;

                    if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                        best = Some(SplitCandidate {
                            feature_idx,
                            threshold: (pairs[i - 1].0 + pairs[i].0) / 2.0,
                            gain,
                        });
                    }
                }
                best
            })
            .max_by(|a, b| a.gain.partial_cmp(&b.gain).unwrap_or(std::cmp::Ordering::Equal))
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(FarecastError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let row = x.row(i).to_vec();
                predict_sample(root, &row)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.feature_importances.as_deref()
    }

    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

fn sums(y: &Array1<f64>, indices: &[usize]) -> (f64, f64) {
    let mut sum = 0.0;
    let mut sq_sum = 0.0;
    for &i in indices {
        sum += y[i];
        sq_sum += y[i] * y[i];
    }
    (sum, sq_sum)
}

fn predict_sample(node: &TreeNode, sample: &[f64]) -> f64 {
    match node {
        TreeNode::Leaf { value, .. } => *value,
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            ..
        } => {
            if sample[*feature_idx] <= *threshold {
                predict_sample(left, sample)
            } else {
                predict_sample(right, sample)
            }
        }
    }
}
