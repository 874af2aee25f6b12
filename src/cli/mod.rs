//! Command-line entry points for training and prediction

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::data::RecordLoader;
use crate::error::{FarecastError, Result};
use crate::features::FeatureBuilder;
use crate::inference::{Predictor, RecordOutcome};
use crate::training::{select_best, train_test_split, Trainer, TrainerConfig};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "farecast", about = "Trip cost estimation pipeline", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train all candidate models and persist the best one
    Train {
        /// CSV file of historical trip records
        #[arg(long)]
        data: PathBuf,
        /// Where to write the model artifact (JSON)
        #[arg(long, default_value = "model.json")]
        output: PathBuf,
        /// Fraction of records held out for testing
        #[arg(long, default_value_t = 0.2)]
        test_size: f64,
        /// Seed for the split and model randomness
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Predict trip costs with a persisted model
    Predict {
        /// Path to a model artifact produced by `train`
        #[arg(long)]
        model: PathBuf,
        /// CSV file of records to score
        #[arg(long)]
        data: Option<PathBuf>,
        /// A single record as a JSON object of column/value pairs
        #[arg(long)]
        record: Option<String>,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Train {
            data,
            output,
            test_size,
            seed,
        } => cmd_train(&data, &output, test_size, seed),
        Commands::Predict {
            model,
            data,
            record,
        } => cmd_predict(&model, data.as_deref(), record.as_deref()),
    }
}

fn cmd_train(
    data: &std::path::Path,
    output: &std::path::Path,
    test_size: f64,
    seed: u64,
) -> Result<()> {
    let records = RecordLoader::load(data)?;
    let prepared = FeatureBuilder::new().prepare(&records)?;
    tracing::info!(
        rows = prepared.x.nrows(),
        features = prepared.schema.len(),
        dropped = prepared.dropped_rows,
        "prepared training data"
    );

    let config = TrainerConfig::default()
        .with_test_size(test_size)
        .with_seed(seed);
    let (x_train, x_test, y_train, y_test) =
        train_test_split(&prepared.x, &prepared.y, config.test_size, config.seed)?;

    let trainer = Trainer::new(config);
    let candidates = trainer.train_all(&x_train, &y_train, &x_test, &y_test)?;

    for candidate in &candidates {
        println!(
            "{:<20} test R2 {:>8.4}  test MAE {:>10.4}",
            candidate.name.as_str(),
            candidate.metrics.test_r2,
            candidate.metrics.test_mae,
        );
    }

    let best = select_best(&candidates)?;
    let winner = candidates
        .into_iter()
        .find(|c| c.name == best)
        .ok_or(FarecastError::NoModelsAvailable)?;

    let artifact = ModelArtifact {
        model: winner.model,
        feature_names: prepared.schema,
        model_name: winner.name,
        metrics: winner.metrics,
    };
    ArtifactStore::save(&artifact, output)?;
    println!("best model: {} -> {}", best, output.display());
    Ok(())
}

fn cmd_predict(
    model: &std::path::Path,
    data: Option<&std::path::Path>,
    record: Option<&str>,
) -> Result<()> {
    let mut predictor = Predictor::new();
    predictor.load(model)?;

    match (data, record) {
        (Some(path), None) => {
            let records = RecordLoader::load(path)?;
            let output = predictor.predict_batch(&records)?;
            if !output.filled_columns.is_empty() {
                eprintln!(
                    "warning: zero-filled absent columns: {}",
                    output.filled_columns.join(", ")
                );
            }
            for (idx, outcome) in output.outcomes.iter().enumerate() {
                match outcome {
                    RecordOutcome::Predicted(value) => println!("{idx}\t{value:.2}"),
                    RecordOutcome::Failed(reason) => println!("{idx}\tfailed: {reason}"),
                }
            }
            Ok(())
        }
        (None, Some(json)) => {
            let record: HashMap<String, f64> = serde_json::from_str(json).map_err(|e| {
                FarecastError::ValidationError(format!("invalid record JSON: {e}"))
            })?;
            let prediction = predictor.predict_record(&record)?;
            println!("{prediction:.2}");
            Ok(())
        }
        _ => Err(FarecastError::ValidationError(
            "provide exactly one of --data or --record".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_train_args() {
        let cli = Cli::parse_from(["farecast", "train", "--data", "rides.csv"]);
        match cli.command {
            Commands::Train {
                data,
                output,
                test_size,
                seed,
            } => {
                assert_eq!(data, PathBuf::from("rides.csv"));
                assert_eq!(output, PathBuf::from("model.json"));
                assert_eq!(test_size, 0.2);
                assert_eq!(seed, 42);
            }
            _ => panic!("expected train command"),
        }
    }

    #[test]
    fn test_predict_args() {
        let cli = Cli::parse_from([
            "farecast",
            "predict",
            "--model",
            "model.json",
            "--record",
            "{\"Ride Distance\": 20.0}",
        ]);
        match cli.command {
            Commands::Predict { model, record, .. } => {
                assert_eq!(model, PathBuf::from("model.json"));
                assert!(record.is_some());
            }
            _ => panic!("expected predict command"),
        }
    }
}
