//! Picks the winning candidate by held-out R-squared

use crate::error::{FarecastError, Result};
use crate::training::config::ModelName;
use crate::training::trainer::TrainedCandidate;

/// Argmax over test R-squared. Strict comparison, so on an exact tie the
/// candidate registered earlier wins.
pub fn select_best(candidates: &[TrainedCandidate]) -> Result<ModelName> {
    let mut best: Option<&TrainedCandidate> = None;
    for candidate in candidates {
        let beats = match best {
            Some(current) => candidate.metrics.test_r2 > current.metrics.test_r2,
            None => true,
        };
        if beats {
            best = Some(candidate);
        }
    }

    let winner = best.ok_or(FarecastError::NoModelsAvailable)?;
    tracing::info!(
        model = %winner.name,
        test_r2 = winner.metrics.test_r2,
        "selected best model"
    );
    Ok(winner.name)
}
