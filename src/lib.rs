//! # farecast
//!
//! Trip cost estimation for ride-hailing records.
//!
//! The pipeline loads historical trips from CSV, derives a fixed feature
//! schema, trains three candidate regressors on a shared deterministic
//! split, persists the best one (by held-out R-squared) as a JSON artifact,
//! and serves predictions that are reindexed to the persisted schema so the
//! model always sees the matrix layout it was trained on.
//!
//! ```no_run
//! use farecast::data::RecordLoader;
//! use farecast::features::FeatureBuilder;
//! use farecast::training::{select_best, train_test_split, Trainer, TrainerConfig};
//!
//! # fn main() -> farecast::error::Result<()> {
//! let records = RecordLoader::load(std::path::Path::new("rides.csv"))?;
//! let prepared = FeatureBuilder::new().prepare(&records)?;
//! let config = TrainerConfig::default();
//! let (x_train, x_test, y_train, y_test) =
//!     train_test_split(&prepared.x, &prepared.y, config.test_size, config.seed)?;
//! let candidates = Trainer::new(config).train_all(&x_train, &y_train, &x_test, &y_test)?;
//! let best = select_best(&candidates)?;
//! # let _ = best;
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod cli;
pub mod data;
pub mod error;
pub mod features;
pub mod inference;
pub mod training;

pub use artifact::{ArtifactStore, ModelArtifact};
pub use data::RecordLoader;
pub use error::{FarecastError, Result};
pub use features::{FeatureBuilder, PreparedData};
pub use inference::{BatchOutput, Predictor, RecordOutcome};
pub use training::{select_best, train_test_split, ModelName, TrainedModel, Trainer, TrainerConfig};
