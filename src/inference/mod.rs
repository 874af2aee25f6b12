//! Serving predictions from a persisted artifact

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::data::BASE_COLUMNS;
use crate::error::{FarecastError, Result};
use crate::features::{to_matrix, FeatureBuilder};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;

/// Outcome for a single input record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Predicted(f64),
    Failed(String),
}

/// Result of a batch prediction
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// One outcome per input row, in input order
    pub outcomes: Vec<RecordOutcome>,
    /// Base columns absent from the input that were zero-filled.
    /// Surfaced so callers can tell a real estimate from a degraded one.
    pub filled_columns: Vec<String>,
}

impl BatchOutput {
    pub fn predicted_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RecordOutcome::Predicted(_)))
            .count()
    }
}

/// Loads an artifact and serves predictions against its persisted schema
#[derive(Debug, Default)]
pub struct Predictor {
    artifact: Option<ModelArtifact>,
    builder: FeatureBuilder,
}

impl Predictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_artifact(artifact: ModelArtifact) -> Self {
        Self {
            artifact: Some(artifact),
            builder: FeatureBuilder::new(),
        }
    }

    /// Load the artifact from disk, replacing any currently loaded model
    pub fn load(&mut self, path: &Path) -> Result<()> {
        self.artifact = Some(ArtifactStore::load(path)?);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.artifact.is_some()
    }

    pub fn artifact(&self) -> Option<&ModelArtifact> {
        self.artifact.as_ref()
    }

    /// Predict for a batch of raw records.
    ///
    /// Base columns absent from the input are added as zeros (and reported),
    /// null cells in present base columns become zeros, then the derive rules
    /// run and the frame is reindexed to the persisted schema. The model
    /// therefore always sees the exact matrix layout it was trained on.
    pub fn predict_batch(&self, records: &DataFrame) -> Result<BatchOutput> {
        let artifact = self.artifact.as_ref().ok_or(FarecastError::ModelNotLoaded)?;
        let n_rows = records.height();
        if n_rows == 0 {
            return Err(FarecastError::ValidationError(
                "empty input batch".to_string(),
            ));
        }

        let mut work = records.clone();
        let mut filled_columns = Vec::new();
        for name in BASE_COLUMNS {
            match work.column(name) {
                Ok(_) => {
                    // Nulls in a present column become 0.0; the derive rules
                    // then see a fully dense column.
                    let col = work.column(name)?.cast(&DataType::Float64)?;
                    let dense: Float64Chunked = col
                        .f64()?
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(0.0)))
                        .collect();
                    work.with_column(dense.with_name(name.into()).into_series())?;
                }
                Err(_) => {
                    let zeros = Float64Chunked::full(name.into(), 0.0, n_rows);
                    work.with_column(zeros.into_series())?;
                    filled_columns.push(name.to_string());
                }
            }
        }
        if !filled_columns.is_empty() {
            tracing::warn!(columns = ?filled_columns, "zero-filled absent input columns");
        }

        let extended = self.builder.extend(&work)?;
        let x = to_matrix(&extended, &artifact.feature_names)?;

        // Rows carrying non-finite values are reported individually instead
        // of poisoning the whole batch.
        let mut bad_rows = vec![false; n_rows];
        let x = ndarray::Array2::from_shape_fn(x.raw_dim(), |(r, c)| {
            let v = x[[r, c]];
            if v.is_finite() {
                v
            } else {
                bad_rows[r] = true;
                0.0
            }
        });

        let predictions = artifact.model.predict(&x)?;

        let outcomes = predictions
            .iter()
            .enumerate()
            .map(|(row, pred)| {
                if bad_rows[row] {
                    RecordOutcome::Failed("non-finite feature value".to_string())
                } else if !pred.is_finite() {
                    RecordOutcome::Failed("non-finite prediction".to_string())
                } else {
                    RecordOutcome::Predicted(*pred)
                }
            })
            .collect();

        Ok(BatchOutput {
            outcomes,
            filled_columns,
        })
    }

    /// Predict for a single record given as column/value pairs
    pub fn predict_record(&self, record: &HashMap<String, f64>) -> Result<f64> {
        let columns: Vec<Column> = record
            .iter()
            .map(|(name, value)| {
                Float64Chunked::full(name.as_str().into(), *value, 1)
                    .into_series()
                    .into()
            })
            .collect();
        let df = DataFrame::new(columns)?;

        let output = self.predict_batch(&df)?;
        match &output.outcomes[0] {
            RecordOutcome::Predicted(value) => Ok(*value),
            RecordOutcome::Failed(reason) => {
                Err(FarecastError::ComputationError(reason.clone()))
            }
        }
    }
}
