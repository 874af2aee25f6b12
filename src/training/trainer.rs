//! Trains every candidate model on a shared split and records metrics

use crate::error::{FarecastError, Result};
use crate::training::boosting::GradientBoostingRegressor;
use crate::training::config::{ModelName, TrainerConfig, CANDIDATES};
use crate::training::forest::RandomForestRegressor;
use crate::training::linear::LinearRegression;
use crate::training::metrics::MetricsRecord;
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// A fitted model of any candidate family, with unified prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainedModel {
    LinearRegression(LinearRegression),
    RandomForest(RandomForestRegressor),
    GradientBoosting(GradientBoostingRegressor),
}

impl TrainedModel {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::LinearRegression(model) => model.predict(x),
            TrainedModel::RandomForest(model) => model.predict(x),
            TrainedModel::GradientBoosting(model) => model.predict(x),
        }
    }

    pub fn name(&self) -> ModelName {
        match self {
            TrainedModel::LinearRegression(_) => ModelName::LinearRegression,
            TrainedModel::RandomForest(_) => ModelName::RandomForest,
            TrainedModel::GradientBoosting(_) => ModelName::GradientBoosting,
        }
    }
}

/// One trained candidate with its evaluation
#[derive(Debug, Clone)]
pub struct TrainedCandidate {
    pub name: ModelName,
    pub model: TrainedModel,
    pub metrics: MetricsRecord,
}

/// Shuffled train/test split, deterministic for a given seed.
/// The test partition size is `ceil(n * test_size)`, leaving at least one
/// sample on each side when `n >= 2`.
pub fn train_test_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
    let n = x.nrows();
    if n != y.len() {
        return Err(FarecastError::ShapeError {
            expected: format!("y length = {}", n),
            actual: format!("y length = {}", y.len()),
        });
    }
    if n < 2 {
        return Err(FarecastError::ValidationError(format!(
            "need at least 2 samples to split, got {n}"
        )));
    }
    if !(0.0..1.0).contains(&test_size) || test_size <= 0.0 {
        return Err(FarecastError::ValidationError(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);

    Ok((
        x.select(Axis(0), train_idx),
        x.select(Axis(0), test_idx),
        y.select(Axis(0), train_idx),
        y.select(Axis(0), test_idx),
    ))
}

/// Trains all candidate families on one shared split
pub struct Trainer {
    config: TrainerConfig,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(TrainerConfig::default())
    }
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Fit every candidate in registration order on the given split and
    /// evaluate each on both partitions.
    pub fn train_all(
        &self,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> Result<Vec<TrainedCandidate>> {
        let x_train = sanitize_features(x_train);
        let x_test = sanitize_features(x_test);
        let y_train = sanitize_target(y_train);
        let y_test = sanitize_target(y_test);

        let mut candidates = Vec::with_capacity(CANDIDATES.len());
        for name in CANDIDATES {
            tracing::info!(model = %name, "training candidate");
            let model = self.fit_one(name, &x_train, &y_train)?;

            let train_pred = model.predict(&x_train)?;
            let test_pred = model.predict(&x_test)?;
            let metrics = MetricsRecord::compute(&y_train, &train_pred, &y_test, &test_pred);

            tracing::info!(
                model = %name,
                train_r2 = metrics.train_r2,
                test_r2 = metrics.test_r2,
                test_mae = metrics.test_mae,
                "candidate evaluated"
            );

            candidates.push(TrainedCandidate {
                name,
                model,
                metrics,
            });
        }
        Ok(candidates)
    }

    fn fit_one(
        &self,
        name: ModelName,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<TrainedModel> {
        match name {
            ModelName::LinearRegression => {
                let mut model = LinearRegression::new();
                model.fit(x, y)?;
                Ok(TrainedModel::LinearRegression(model))
            }
            ModelName::RandomForest => {
                let mut model =
                    RandomForestRegressor::new(self.config.forest.clone(), self.config.seed);
                model.fit(x, y)?;
                Ok(TrainedModel::RandomForest(model))
            }
            ModelName::GradientBoosting => {
                let mut model =
                    GradientBoostingRegressor::new(self.config.boosting.clone(), self.config.seed);
                model.fit(x, y)?;
                Ok(TrainedModel::GradientBoosting(model))
            }
        }
    }
}

/// Non-finite feature cells become 0.0, matching the zero-fill applied to
/// absent columns at inference time.
fn sanitize_features(x: &Array2<f64>) -> Array2<f64> {
    x.mapv(|v| if v.is_finite() { v } else { 0.0 })
}

/// Non-finite targets fall back to the mean of the finite values
fn sanitize_target(y: &Array1<f64>) -> Array1<f64> {
    let finite: Vec<f64> = y.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() == y.len() {
        return y.clone();
    }
    let mean = if finite.is_empty() {
        0.0
    } else {
        finite.iter().sum::<f64>() / finite.len() as f64
    };
    y.mapv(|v| if v.is_finite() { v } else { mean })
}
