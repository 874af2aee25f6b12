//! Random forest regressor built on bootstrap-sampled regression trees

use crate::error::{FarecastError, Result};
use crate::training::config::ForestParams;
use crate::training::tree::RegressionTree;
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Bagging ensemble of regression trees. Each tree gets its own bootstrap
/// sample drawn from a per-tree rng seeded off the base seed, so the fit is
/// deterministic for a given seed regardless of thread scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    params: ForestParams,
    seed: u64,
    n_features: usize,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams, seed: u64) -> Self {
        Self {
            trees: Vec::new(),
            params,
            seed,
            n_features: 0,
        }
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
                "cannot fit a forest on zero samples".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let params = self.params.clone();
        let base_seed = self.seed;

        let trees: Result<Vec<RegressionTree>> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let indices: Vec<usize> =
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

                let x_boot = x.select(Axis(0), &indices);
                let y_boot = y.select(Axis(0), &indices);

                let mut tree = RegressionTree::new()
                    .with_max_depth(params.max_depth)
                    .with_min_samples_split(params.min_samples_split)
                    .with_min_samples_leaf(params.min_samples_leaf);
                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect();

        self.trees = trees?;
        tracing::debug!(n_trees = self.trees.len(), "random forest fitted");
        Ok(self)
    }

    /// Predict as the mean over all trees
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(FarecastError::ModelNotFitted);
        }

        let per_tree: Result<Vec<Array1<f64>>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect();
        let per_tree = per_tree?;

        let mut mean = Array1::zeros(x.nrows());
        for pred in &per_tree {
            mean += pred;
        }
        mean /= self.trees.len() as f64;
        Ok(mean)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Importances averaged over the ensemble
    pub fn feature_importances(&self) -> Option<Vec<f64>> {
        if self.trees.is_empty() {
            return None;
        }
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            if let Some(importances) = tree.feature_importances() {
                for (total, imp) in totals.iter_mut().zip(importances) {
                    *total += imp;
                }
            }
        }
        for total in &mut totals {
            *total /= self.trees.len() as f64;
        }
        Some(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn small_params() -> ForestParams {
        ForestParams {
            n_estimators: 20,
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    #[test]
    fn test_fits_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 50.0, 50.0, 50.0];

        let mut forest = RandomForestRegressor::new(small_params(), 42);
        forest.fit(&x, &y).unwrap();
        assert_eq!(forest.n_trees(), 20);

        let pred = forest.predict(&array![[2.0], [11.0]]).unwrap();
        assert!(pred[0] < 30.0);
        assert!(pred[1] > 30.0);
    }

    #[test]
    fn test_deterministic_for_seed() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];

        let mut a = RandomForestRegressor::new(small_params(), 42);
        let mut b = RandomForestRegressor::new(small_params(), 42);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();

        let pa = a.predict(&x).unwrap();
        let pb = b.predict(&x).unwrap();
        for (va, vb) in pa.iter().zip(pb.iter()) {
            assert_eq!(va, vb);
        }
    }

    #[test]
    fn test_predict_before_fit() {
        let forest = RandomForestRegressor::new(small_params(), 42);
        let err = forest.predict(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, FarecastError::ModelNotFitted));
    }
}
