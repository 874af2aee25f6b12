//! Evaluation metrics for trained models

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// The fixed metric set computed once per trained model.
///
/// The serialized key names are a stable contract consumed outside the
/// pipeline; do not rename them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(rename = "Training MSE")]
    pub train_mse: f64,
    #[serde(rename = "Training R2")]
    pub train_r2: f64,
    #[serde(rename = "Training MAE")]
    pub train_mae: f64,
    #[serde(rename = "Test MSE")]
    pub test_mse: f64,
    #[serde(rename = "Test R2")]
    pub test_r2: f64,
    #[serde(rename = "Test MAE")]
    pub test_mae: f64,
}

impl MetricsRecord {
    /// Compute the full metric set from train and test predictions
    pub fn compute(
        y_train: &Array1<f64>,
        train_pred: &Array1<f64>,
        y_test: &Array1<f64>,
        test_pred: &Array1<f64>,
    ) -> Self {
        Self {
            train_mse: mse(y_train, train_pred),
            train_r2: r2(y_train, train_pred),
            train_mae: mae(y_train, train_pred),
            test_mse: mse(y_test, test_pred),
            test_r2: r2(y_test, test_pred),
            test_mae: mae(y_test, test_pred),
        }
    }
}

/// Mean squared error
pub fn mse(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p) * (t - p))
        .sum::<f64>()
        / n
}

/// Mean absolute error
pub fn mae(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n
}

/// Coefficient of determination. Can be negative for a poor model and is
/// never clamped; a constant target yields 0.0 so the value stays finite.
pub fn r2(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let y_mean = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        assert!(mse(&y_true, &y_pred) < 0.01);
        assert!(mae(&y_true, &y_pred) < 0.1);
        assert!(r2(&y_true, &y_pred) > 0.9);
    }

    #[test]
    fn test_r2_can_be_negative() {
        let y_true = array![1.0, 2.0, 3.0];
        let y_pred = array![10.0, 10.0, 10.0];
        assert!(r2(&y_true, &y_pred) < 0.0);
    }

    #[test]
    fn test_r2_constant_target() {
        let y_true = array![5.0, 5.0, 5.0];
        let y_pred = array![4.0, 5.0, 6.0];
        assert_eq!(r2(&y_true, &y_pred), 0.0);
    }

    #[test]
    fn test_metrics_record_keys() {
        let y = array![1.0, 2.0];
        let p = array![1.0, 2.0];
        let record = MetricsRecord::compute(&y, &p, &y, &p);
        let json = serde_json::to_string(&record).unwrap();
        for key in [
            "Training MSE",
            "Training R2",
            "Training MAE",
            "Test MSE",
            "Test R2",
            "Test MAE",
        ] {
            assert!(json.contains(key), "missing key {key}");
        }
    }
}
