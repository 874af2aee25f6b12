//! Model training: candidate families, shared split, metrics, selection

pub mod boosting;
pub mod config;
pub mod forest;
pub mod linear;
pub mod metrics;
pub mod selector;
pub mod trainer;
pub mod tree;

pub use boosting::GradientBoostingRegressor;
pub use config::{BoostingParams, ForestParams, ModelName, TrainerConfig, CANDIDATES};
pub use forest::RandomForestRegressor;
pub use linear::LinearRegression;
pub use metrics::MetricsRecord;
pub use selector::select_best;
pub use trainer::{train_test_split, TrainedCandidate, TrainedModel, Trainer};
pub use tree::RegressionTree;
