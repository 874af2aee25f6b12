//! Gradient boosting regressor with squared-error loss

use crate::error::{FarecastError, Result};
use crate::training::config::BoostingParams;
use crate::training::tree::RegressionTree;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

/// Sequential ensemble where each tree fits the residuals of the model so
/// far and contributes its prediction scaled by the learning rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    trees: Vec<RegressionTree>,
    init_value: f64,
    params: BoostingParams,
    /// Row fraction fitted per stage; 1.0 disables subsampling
    subsample: f64,
    seed: u64,
    is_fitted: bool,
}

impl GradientBoostingRegressor {
    pub fn new(params: BoostingParams, seed: u64) -> Self {
        Self {
            trees: Vec::new(),
            init_value: 0.0,
            params,
            subsample: 1.0,
            seed,
            is_fitted: false,
        }
    }

    pub fn with_subsample(mut self, subsample: f64) -> Self {
        self.subsample = subsample;
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
                "cannot fit boosting on zero samples".to_string(),
            ));
        }

        self.init_value = y.mean().unwrap_or(0.0);
        self.trees = Vec::with_capacity(self.params.n_estimators);

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut current = Array1::from_elem(n_samples, self.init_value);

        for _ in 0..self.params.n_estimators {
            let residuals = y - &current;

            let mut tree = RegressionTree::new().with_max_depth(self.params.max_depth);

            if self.subsample < 1.0 {
                let subset_len =
                    ((n_samples as f64 * self.subsample).round() as usize).max(1);
                let mut indices: Vec<usize> = (0..n_samples).collect();
                indices.shuffle(&mut rng);
                indices.truncate(subset_len);

                let x_sub = x.select(Axis(0), &indices);
                let r_sub = residuals.select(Axis(0), &indices);
                tree.fit(&x_sub, &r_sub)?;
            } else {
                tree.fit(x, &residuals)?;
            }

            let update = tree.predict(x)?;
            current = current + update * self.params.learning_rate;
            self.trees.push(tree);
        }

        self.is_fitted = true;
        tracing::debug!(n_stages = self.trees.len(), "gradient boosting fitted");
        Ok(self)
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(FarecastError::ModelNotFitted);
        }

        let mut predictions = Array1::from_elem(x.nrows(), self.init_value);
        for tree in &self.trees {
            let update = tree.predict(x)?;
            predictions = predictions + update * self.params.learning_rate;
        }
        Ok(predictions)
    }

    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }
}
