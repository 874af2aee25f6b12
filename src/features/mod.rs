//! Feature derivation from raw trip records
//!
//! Converts raw columns into the fixed numeric schema the models are trained
//! on. The same derive-rule table runs at training and inference time, so the
//! two paths cannot drift apart: a rule fires exactly when all of its source
//! columns are present, and the ordered union of base columns plus rule
//! outputs *is* the persisted schema.

use crate::data::{BASE_COLUMNS, TARGET_COLUMN};
use crate::error::{FarecastError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;

/// Epsilon guarding time_per_distance against division by zero
const DISTANCE_EPS: f64 = 1e-8;

const DISTANCE_BOUNDS: [f64; 3] = [10.0, 25.0, 50.0];
const RATING_BOUNDS: [f64; 3] = [3.0, 4.0, 4.5];

/// One derived-feature rule: fires iff every required column is present.
pub struct DeriveRule {
    /// Source columns that must all be present
    pub required: &'static [&'static str],
    /// Columns the rule appends, in schema order
    pub outputs: &'static [&'static str],
    derive: fn(&DataFrame) -> Result<Vec<Series>>,
}

/// The shared rule table. Order is load-bearing: it defines the schema
/// suffix after the base columns.
pub const DERIVE_RULES: &[DeriveRule] = &[
    DeriveRule {
        required: &["Ride Distance"],
        outputs: &[
            "distance_category_short",
            "distance_category_medium",
            "distance_category_long",
            "distance_category_very_long",
        ],
        derive: derive_distance_category,
    },
    DeriveRule {
        required: &["Driver Ratings", "Customer Rating"],
        outputs: &["rating_diff"],
        derive: derive_rating_diff,
    },
    DeriveRule {
        required: &["Driver Ratings", "Customer Rating"],
        outputs: &["avg_rating"],
        derive: derive_avg_rating,
    },
    DeriveRule {
        required: &["Avg VTAT", "Avg CTAT"],
        outputs: &["total_time"],
        derive: derive_total_time,
    },
    DeriveRule {
        required: &["Avg VTAT", "Avg CTAT", "Ride Distance"],
        outputs: &["time_per_distance"],
        derive: derive_time_per_distance,
    },
    DeriveRule {
        required: &["Driver Ratings"],
        outputs: &[
            "driver_rating_category_low",
            "driver_rating_category_medium",
            "driver_rating_category_high",
            "driver_rating_category_excellent",
        ],
        derive: derive_driver_rating_category,
    },
    DeriveRule {
        required: &["Customer Rating"],
        outputs: &[
            "customer_rating_category_low",
            "customer_rating_category_medium",
            "customer_rating_category_high",
            "customer_rating_category_excellent",
        ],
        derive: derive_customer_rating_category,
    },
];

/// Extract a column as `Option<f64>` values, casting if needed
fn col_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let col = df
        .column(name)
        .map_err(|_| FarecastError::FeatureNotFound(name.to_string()))?;
    let casted = col
        .cast(&DataType::Float64)
        .map_err(|e| FarecastError::DataError(e.to_string()))?;
    Ok(casted
        .f64()
        .map_err(|e| FarecastError::DataError(e.to_string()))?
        .into_iter()
        .collect())
}

/// Index of the bucket a value falls into: first boundary it does not exceed.
/// Values at or below the lowest boundary land in the first bucket.
fn bucket_index(value: f64, bounds: &[f64]) -> usize {
    bounds
        .iter()
        .position(|b| value <= *b)
        .unwrap_or(bounds.len())
}

/// Expand a numeric column into fixed one-hot bucket columns.
/// A null source value contributes zero to every bucket.
fn one_hot(
    outputs: &[&'static str],
    values: &[Option<f64>],
    bounds: &[f64],
) -> Vec<Series> {
    outputs
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let ca: Float64Chunked = values
                .iter()
                .map(|opt| {
                    Some(match opt {
                        Some(v) if bucket_index(*v, bounds) == idx => 1.0,
                        _ => 0.0,
                    })
                })
                .collect();
            ca.with_name((*name).into()).into_series()
        })
        .collect()
}

fn zip_derive(
    a: &[Option<f64>],
    b: &[Option<f64>],
    name: &'static str,
    f: impl Fn(f64, f64) -> f64,
) -> Series {
    let ca: Float64Chunked = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => Some(f(*x, *y)),
            _ => None,
        })
        .collect();
    ca.with_name(name.into()).into_series()
}

fn derive_distance_category(df: &DataFrame) -> Result<Vec<Series>> {
    let values = col_f64(df, "Ride Distance")?;
    Ok(one_hot(DERIVE_RULES[0].outputs, &values, &DISTANCE_BOUNDS))
}

fn derive_rating_diff(df: &DataFrame) -> Result<Vec<Series>> {
    let driver = col_f64(df, "Driver Ratings")?;
    let customer = col_f64(df, "Customer Rating")?;
    Ok(vec![zip_derive(&driver, &customer, "rating_diff", |d, c| d - c)])
}

fn derive_avg_rating(df: &DataFrame) -> Result<Vec<Series>> {
    let driver = col_f64(df, "Driver Ratings")?;
    let customer = col_f64(df, "Customer Rating")?;
    Ok(vec![zip_derive(&driver, &customer, "avg_rating", |d, c| {
        (d + c) / 2.0
    })])
}

fn derive_total_time(df: &DataFrame) -> Result<Vec<Series>> {
    let vtat = col_f64(df, "Avg VTAT")?;
    let ctat = col_f64(df, "Avg CTAT")?;
    Ok(vec![zip_derive(&vtat, &ctat, "total_time", |v, c| v + c)])
}

fn derive_time_per_distance(df: &DataFrame) -> Result<Vec<Series>> {
    let vtat = col_f64(df, "Avg VTAT")?;
    let ctat = col_f64(df, "Avg CTAT")?;
    let distance = col_f64(df, "Ride Distance")?;
    let ca: Float64Chunked = vtat
        .iter()
        .zip(ctat.iter())
        .zip(distance.iter())
        .map(|((v, c), d)| match (v, c, d) {
            (Some(v), Some(c), Some(d)) => Some((v + c) / (d + DISTANCE_EPS)),
            _ => None,
        })
        .collect();
    Ok(vec![ca.with_name("time_per_distance".into()).into_series()])
}

fn derive_driver_rating_category(df: &DataFrame) -> Result<Vec<Series>> {
    let values = col_f64(df, "Driver Ratings")?;
    Ok(one_hot(DERIVE_RULES[5].outputs, &values, &RATING_BOUNDS))
}

fn derive_customer_rating_category(df: &DataFrame) -> Result<Vec<Series>> {
    let values = col_f64(df, "Customer Rating")?;
    Ok(one_hot(DERIVE_RULES[6].outputs, &values, &RATING_BOUNDS))
}

/// Output of [`FeatureBuilder::prepare`]: everything the trainer needs,
/// returned as one immutable value.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Feature matrix, columns ordered by `schema`
    pub x: Array2<f64>,
    /// Target values, aligned with `x` rows
    pub y: Array1<f64>,
    /// Ordered feature names — persisted with the trained model
    pub schema: Vec<String>,
    /// Rows removed because the target was missing
    pub dropped_rows: usize,
}

/// Builds the numeric feature schema from raw trip records
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder;

impl FeatureBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Prepare raw records for training: drop rows with a missing target
    /// (reporting the count), median-impute missing predictor values, apply
    /// the derive rules, and produce matrix + target + schema.
    pub fn prepare(&self, records: &DataFrame) -> Result<PreparedData> {
        let initial = records.height();

        let target_col = records
            .column(TARGET_COLUMN)
            .map_err(|_| FarecastError::FeatureNotFound(TARGET_COLUMN.to_string()))?;
        let mask = target_col.as_materialized_series().is_not_null();
        let df = records.filter(&mask)?;
        let dropped_rows = initial - df.height();
        if dropped_rows > 0 {
            tracing::info!(dropped = dropped_rows, "dropped records with missing target");
        }
        if df.height() == 0 {
            return Err(FarecastError::ValidationError(
                "no records with a target value".to_string(),
            ));
        }

        let present = self.present_base_columns(&df);
        if present.is_empty() {
            return Err(FarecastError::ValidationError(
                "no usable predictor columns in input".to_string(),
            ));
        }

        // Median imputation over the training data, per column, before the
        // split — inference never recomputes these (it zero-fills instead),
        // so predictions cannot depend on batch composition.
        let mut work = df.clone();
        for name in &present {
            let values = col_f64(&work, name)?;
            let missing = values.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                let median = median_of(&values);
                let filled: Float64Chunked = values
                    .iter()
                    .map(|opt| Some(opt.unwrap_or(median)))
                    .collect();
                work.with_column(filled.with_name((*name).into()).into_series())?;
                tracing::info!(column = name, filled = missing, median, "imputed missing predictor values");
            }
        }

        let extended = self.extend(&work)?;
        let schema = self.schema_for(&present);
        let x = to_matrix(&extended, &schema)?;

        let y: Array1<f64> = col_f64(&extended, TARGET_COLUMN)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();

        Ok(PreparedData {
            x,
            y,
            schema,
            dropped_rows,
        })
    }

    /// Apply the derive rules to a frame. Identical for training and
    /// inference, and idempotent: re-running it recomputes the same derived
    /// columns from the unchanged base columns.
    pub fn extend(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for rule in DERIVE_RULES {
            if rule.required.iter().all(|c| out.column(c).is_ok()) {
                for series in (rule.derive)(&out)? {
                    out.with_column(series)?;
                }
            }
        }
        Ok(out)
    }

    /// Base predictor columns actually present in a frame, in fixed order
    pub fn present_base_columns(&self, df: &DataFrame) -> Vec<&'static str> {
        BASE_COLUMNS
            .iter()
            .copied()
            .filter(|c| df.column(c).is_ok())
            .collect()
    }

    /// The schema implied by a set of present base columns: those columns,
    /// then the outputs of every rule whose sources are all present.
    pub fn schema_for(&self, present_base: &[&'static str]) -> Vec<String> {
        let mut schema: Vec<String> = present_base.iter().map(|s| s.to_string()).collect();
        for rule in DERIVE_RULES {
            if rule.required.iter().all(|c| present_base.contains(c)) {
                schema.extend(rule.outputs.iter().map(|s| s.to_string()));
            }
        }
        schema
    }
}

fn median_of(values: &[Option<f64>]) -> f64 {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return 0.0;
    }
    present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    }
}

/// Reindex a frame to a schema, producing a row-major matrix.
///
/// Schema columns absent from the frame become all-zero columns and null
/// cells become 0.0. This is the mechanism that guarantees a model never
/// sees a differently shaped or ordered matrix than it was trained on.
pub fn to_matrix(df: &DataFrame, schema: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = schema.len();

    let col_data: Vec<Vec<f64>> = schema
        .iter()
        .map(|name| match df.column(name) {
            Ok(_) => {
                let values = col_f64(df, name)?;
                Ok(values.into_iter().map(|v| v.unwrap_or(0.0)).collect())
            }
            Err(_) => Ok(vec![0.0; n_rows]),
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_df() -> DataFrame {
        df!(
            "Ride Distance" => &[20.0, 5.0, 60.0],
            "Driver Ratings" => &[4.5, 3.5, 2.0],
            "Customer Rating" => &[4.7, 4.0, 4.9],
            "Avg VTAT" => &[15.0, 8.0, 30.0],
            "Avg CTAT" => &[10.0, 5.0, 20.0],
            "Booking Value" => &[150.0, 60.0, 480.0]
        )
        .unwrap()
    }

    #[test]
    fn test_extend_adds_derived_columns() {
        let builder = FeatureBuilder::new();
        let out = builder.extend(&sample_df()).unwrap();

        let diff = out.column("rating_diff").unwrap().f64().unwrap();
        assert!((diff.get(0).unwrap() + 0.2).abs() < 1e-12);

        let avg = out.column("avg_rating").unwrap().f64().unwrap();
        assert!((avg.get(0).unwrap() - 4.6).abs() < 1e-12);

        let total = out.column("total_time").unwrap().f64().unwrap();
        assert!((total.get(0).unwrap() - 25.0).abs() < 1e-12);

        // 20.0 is in (10, 25] => medium
        let medium = out.column("distance_category_medium").unwrap().f64().unwrap();
        assert_eq!(medium.get(0).unwrap(), 1.0);
        let short = out.column("distance_category_short").unwrap().f64().unwrap();
        assert_eq!(short.get(0).unwrap(), 0.0);
    }

    #[test]
    fn test_extend_is_idempotent() {
        let builder = FeatureBuilder::new();
        let once = builder.extend(&sample_df()).unwrap();
        let twice = builder.extend(&once).unwrap();

        assert_eq!(once.width(), twice.width());
        for name in once.get_column_names() {
            let a = once.column(name.as_str()).unwrap().as_materialized_series();
            let b = twice.column(name.as_str()).unwrap().as_materialized_series();
            assert!(a.equals(b), "column {name} changed on re-extend");
        }
    }

    #[test]
    fn test_prepare_drops_missing_targets() {
        let df = df!(
            "Ride Distance" => &[Some(10.0), Some(20.0), Some(30.0)],
            "Driver Ratings" => &[Some(4.0), Some(4.5), Some(5.0)],
            "Customer Rating" => &[Some(4.2), Some(4.1), Some(4.8)],
            "Avg VTAT" => &[Some(10.0), Some(12.0), Some(14.0)],
            "Avg CTAT" => &[Some(5.0), Some(6.0), Some(7.0)],
            "Booking Value" => &[Some(100.0), None, Some(300.0)]
        )
        .unwrap();

        let prepared = FeatureBuilder::new().prepare(&df).unwrap();
        assert_eq!(prepared.dropped_rows, 1);
        assert_eq!(prepared.x.nrows(), 2);
        assert_eq!(prepared.y.len(), 2);
    }

    #[test]
    fn test_prepare_imputes_with_median() {
        let df = df!(
            "Ride Distance" => &[Some(10.0), None, Some(30.0)],
            "Driver Ratings" => &[Some(4.0), Some(4.5), Some(5.0)],
            "Customer Rating" => &[Some(4.2), Some(4.1), Some(4.8)],
            "Avg VTAT" => &[Some(10.0), Some(12.0), Some(14.0)],
            "Avg CTAT" => &[Some(5.0), Some(6.0), Some(7.0)],
            "Booking Value" => &[100.0, 200.0, 300.0]
        )
        .unwrap();

        let prepared = FeatureBuilder::new().prepare(&df).unwrap();
        // Median of [10, 30] = 20; distance is the first schema column
        assert!((prepared.x[[1, 0]] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_base_column_skips_dependent_rules() {
        let df = df!(
            "Ride Distance" => &[10.0, 20.0],
            "Driver Ratings" => &[4.0, 4.5],
            "Customer Rating" => &[4.2, 4.1],
            "Avg CTAT" => &[5.0, 6.0],
            "Booking Value" => &[100.0, 200.0]
        )
        .unwrap();

        let prepared = FeatureBuilder::new().prepare(&df).unwrap();
        assert!(!prepared.schema.iter().any(|c| c == "total_time"));
        assert!(!prepared.schema.iter().any(|c| c == "time_per_distance"));
        assert!(prepared.schema.iter().any(|c| c == "rating_diff"));
    }

    #[test]
    fn test_to_matrix_zero_fills_absent_schema_columns() {
        let df = df!("a" => &[1.0, 2.0]).unwrap();
        let schema = vec!["a".to_string(), "b".to_string()];
        let m = to_matrix(&df, &schema).unwrap();
        assert_eq!(m[[0, 0]], 1.0);
        assert_eq!(m[[0, 1]], 0.0);
        assert_eq!(m[[1, 1]], 0.0);
    }

    #[test]
    fn test_bucket_index_boundaries() {
        assert_eq!(bucket_index(5.0, &DISTANCE_BOUNDS), 0);
        assert_eq!(bucket_index(10.0, &DISTANCE_BOUNDS), 0);
        assert_eq!(bucket_index(10.1, &DISTANCE_BOUNDS), 1);
        assert_eq!(bucket_index(25.0, &DISTANCE_BOUNDS), 1);
        assert_eq!(bucket_index(50.0, &DISTANCE_BOUNDS), 2);
        assert_eq!(bucket_index(50.1, &DISTANCE_BOUNDS), 3);
        // sub-boundary values land in the first bucket
        assert_eq!(bucket_index(-1.0, &DISTANCE_BOUNDS), 0);
    }
}
