//! Training configuration

use serde::{Deserialize, Serialize};

/// The candidate models, in their fixed registration order.
/// Selection ties break toward the earlier entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    LinearRegression,
    RandomForest,
    GradientBoosting,
}

/// Fixed candidate order used by the trainer and the selector
pub const CANDIDATES: [ModelName; 3] = [
    ModelName::LinearRegression,
    ModelName::RandomForest,
    ModelName::GradientBoosting,
];

impl ModelName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::LinearRegression => "linear_regression",
            ModelName::RandomForest => "random_forest",
            ModelName::GradientBoosting => "gradient_boosting",
        }
    }
}

impl std::fmt::Display for ModelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
        }
    }
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 150,
            max_depth: 10,
            learning_rate: 0.1,
        }
    }
}

/// Configuration for a training run. All randomness derives from one seed
/// and all candidates see the same split, so metrics are comparable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Fraction of records held out for testing
    pub test_size: f64,
    /// Seed for the split and for any internal model randomness
    pub seed: u64,
    pub forest: ForestParams,
    pub boosting: BoostingParams,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
            forest: ForestParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_forest(mut self, forest: ForestParams) -> Self {
        self.forest = forest;
        self
    }

    pub fn with_boosting(mut self, boosting: BoostingParams) -> Self {
        self.boosting = boosting;
        self
    }
}
