//! End-to-end pipeline tests: CSV in, trained artifact out, predictions back

use farecast::artifact::{ArtifactStore, ModelArtifact};
use farecast::data::RecordLoader;
use farecast::features::FeatureBuilder;
use farecast::inference::{Predictor, RecordOutcome};
use farecast::training::{
    select_best, train_test_split, BoostingParams, ForestParams, Trainer, TrainerConfig,
};
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

/// Small hyperparameters so the full pipeline stays fast under test
fn fast_config() -> TrainerConfig {
    TrainerConfig::default()
        .with_forest(ForestParams {
            n_estimators: 10,
            max_depth: 6,
            min_samples_split: 2,
            min_samples_leaf: 1,
        })
        .with_boosting(BoostingParams {
            n_estimators: 25,
            max_depth: 3,
            learning_rate: 0.1,
        })
}

fn sample_csv(n: usize) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "Ride Distance,Driver Ratings,Customer Rating,Avg VTAT,Avg CTAT,Booking Value"
    )
    .unwrap();
    for i in 0..n {
        let distance = 5.0 + (i % 45) as f64;
        let driver = 3.0 + (i % 20) as f64 / 10.0;
        let customer = 3.5 + (i % 15) as f64 / 10.0;
        let vtat = 5.0 + (i % 12) as f64;
        let ctat = 3.0 + (i % 9) as f64;
        let value = 30.0 + 7.5 * distance + 2.0 * vtat;
        writeln!(
            file,
            "{distance},{driver},{customer},{vtat},{ctat},{value:.2}"
        )
        .unwrap();
    }
    file.flush().unwrap();
    file
}

fn train_artifact(records: &DataFrame) -> ModelArtifact {
    let prepared = FeatureBuilder::new().prepare(records).unwrap();
    let config = fast_config();
    let (x_train, x_test, y_train, y_test) =
        train_test_split(&prepared.x, &prepared.y, config.test_size, config.seed).unwrap();
    let candidates = Trainer::new(config)
        .train_all(&x_train, &y_train, &x_test, &y_test)
        .unwrap();
    let best = select_best(&candidates).unwrap();
    let winner = candidates.into_iter().find(|c| c.name == best).unwrap();
    ModelArtifact {
        model: winner.model,
        feature_names: prepared.schema,
        model_name: winner.name,
        metrics: winner.metrics,
    }
}

#[test]
fn train_save_load_predict() {
    let csv = sample_csv(80);
    let records = RecordLoader::load(csv.path()).unwrap();
    let artifact = train_artifact(&records);

    assert!(artifact.metrics.test_r2.is_finite());
    assert!(artifact.metrics.test_r2 <= 1.0);
    assert!(artifact.metrics.test_mae >= 0.0);
    assert!(artifact.metrics.train_mse >= 0.0);

    let model_file = NamedTempFile::new().unwrap();
    ArtifactStore::save(&artifact, model_file.path()).unwrap();
    let loaded = ArtifactStore::load(model_file.path()).unwrap();
    assert_eq!(loaded.feature_names, artifact.feature_names);
    assert_eq!(loaded.model_name, artifact.model_name);
    assert_eq!(loaded.metrics, artifact.metrics);

    // the reloaded model must agree with the in-memory one
    let batch = df!(
        "Ride Distance" => &[20.0, 40.0],
        "Driver Ratings" => &[4.5, 3.8],
        "Customer Rating" => &[4.7, 4.1],
        "Avg VTAT" => &[15.0, 8.0],
        "Avg CTAT" => &[10.0, 5.0]
    )
    .unwrap();

    let before = Predictor::with_artifact(artifact)
        .predict_batch(&batch)
        .unwrap();
    let after = Predictor::with_artifact(loaded).predict_batch(&batch).unwrap();
    for (a, b) in before.outcomes.iter().zip(after.outcomes.iter()) {
        match (a, b) {
            (RecordOutcome::Predicted(va), RecordOutcome::Predicted(vb)) => {
                assert!((va - vb).abs() < 1e-6);
            }
            other => panic!("unexpected outcomes: {other:?}"),
        }
    }
}

#[test]
fn worked_example_record() {
    let csv = sample_csv(80);
    let records = RecordLoader::load(csv.path()).unwrap();
    let artifact = train_artifact(&records);
    let predictor = Predictor::with_artifact(artifact);

    let record: HashMap<String, f64> = [
        ("Ride Distance".to_string(), 20.0),
        ("Driver Ratings".to_string(), 4.5),
        ("Customer Rating".to_string(), 4.7),
        ("Avg VTAT".to_string(), 15.0),
        ("Avg CTAT".to_string(), 10.0),
    ]
    .into_iter()
    .collect();

    let prediction = predictor.predict_record(&record).unwrap();
    assert!(prediction.is_finite());
    // fares in the training data are strictly positive and well away from 0
    assert!(prediction > 0.0);
}

#[test]
fn predict_with_every_base_column_missing() {
    let csv = sample_csv(60);
    let records = RecordLoader::load(csv.path()).unwrap();
    let artifact = train_artifact(&records);
    let predictor = Predictor::with_artifact(artifact);

    let df = df!("Booking ID" => &["B-1", "B-2"]).unwrap();
    let output = predictor.predict_batch(&df).unwrap();
    assert_eq!(output.predicted_count(), 2);
    assert_eq!(output.filled_columns.len(), 5);
}

#[test]
fn training_without_one_base_column_narrows_schema() {
    let csv = sample_csv(60);
    let records = RecordLoader::load(csv.path()).unwrap();
    let narrowed = records.drop("Avg VTAT").unwrap();

    let artifact = train_artifact(&narrowed);
    assert!(!artifact.feature_names.iter().any(|c| c == "Avg VTAT"));
    assert!(!artifact.feature_names.iter().any(|c| c == "total_time"));
    assert!(!artifact
        .feature_names
        .iter()
        .any(|c| c == "time_per_distance"));
    assert!(artifact.feature_names.iter().any(|c| c == "rating_diff"));

    // the narrowed model still serves full records; extra input is ignored
    let predictor = Predictor::with_artifact(artifact);
    let df = df!(
        "Ride Distance" => &[20.0],
        "Driver Ratings" => &[4.5],
        "Customer Rating" => &[4.7],
        "Avg VTAT" => &[15.0],
        "Avg CTAT" => &[10.0]
    )
    .unwrap();
    let output = predictor.predict_batch(&df).unwrap();
    assert_eq!(output.predicted_count(), 1);
}

#[test]
fn extend_is_idempotent_on_inference_input() {
    let builder = FeatureBuilder::new();
    let df = df!(
        "Ride Distance" => &[20.0, 5.0],
        "Driver Ratings" => &[4.5, 3.5],
        "Customer Rating" => &[4.7, 4.0],
        "Avg VTAT" => &[15.0, 8.0],
        "Avg CTAT" => &[10.0, 5.0]
    )
    .unwrap();

    let once = builder.extend(&df).unwrap();
    let twice = builder.extend(&once).unwrap();
    assert_eq!(once.shape(), twice.shape());
    for name in once.get_column_names() {
        let a = once.column(name.as_str()).unwrap().as_materialized_series();
        let b = twice.column(name.as_str()).unwrap().as_materialized_series();
        assert!(a.equals(b));
    }
}

#[test]
fn missing_targets_are_dropped_not_trained_on() {
    let df = df!(
        "Ride Distance" => &[Some(10.0), Some(20.0), Some(30.0), Some(40.0)],
        "Driver Ratings" => &[Some(4.0), Some(4.5), Some(5.0), Some(3.9)],
        "Customer Rating" => &[Some(4.2), Some(4.1), Some(4.8), Some(4.4)],
        "Avg VTAT" => &[Some(10.0), Some(12.0), Some(14.0), Some(9.0)],
        "Avg CTAT" => &[Some(5.0), Some(6.0), Some(7.0), Some(4.0)],
        "Booking Value" => &[Some(100.0), None, Some(300.0), Some(400.0)]
    )
    .unwrap();

    let prepared = FeatureBuilder::new().prepare(&df).unwrap();
    assert_eq!(prepared.dropped_rows, 1);
    assert_eq!(prepared.y.len(), 3);
    assert!(prepared.y.iter().all(|v| v.is_finite()));
}

#[test]
fn loader_rejects_missing_file() {
    let err = RecordLoader::load(std::path::Path::new("/no/such/file.csv")).unwrap_err();
    assert!(matches!(err, farecast::FarecastError::DataSourceMissing(_)));
}
