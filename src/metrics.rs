//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

/// Guard against division by zero when actual demand is 0 on a given day
const MAPE_EPSILON: f64 = 1e-8;

/// Forecast accuracy metrics computed against held-out actuals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Derived accuracy score, `clamp(1 - MAPE/100, 0, 1)`
    pub accuracy: f64,
}

/// Evaluate forecast predictions against actual values.
///
/// Fails with `EvaluationUnavailable` when there is nothing to evaluate
/// (empty test partition) and `InvalidParameter` when the two slices differ
/// in length.
pub fn evaluate_forecast(actual: &[f64], predicted: &[f64]) -> Result<ForecastMetrics> {
    if actual.is_empty() {
        return Err(ForecastError::EvaluationUnavailable(
            "empty test partition".to_string(),
        ));
    }
    if actual.len() != predicted.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }

    let n = actual.len() as f64;

    let mae = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / n;

    let mse = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / n;
    let rmse = mse.sqrt();

    let mape = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs() / a.abs().max(MAPE_EPSILON))
        .sum::<f64>()
        / n
        * 100.0;

    let accuracy = (1.0 - mape / 100.0).clamp(0.0, 1.0);

    Ok(ForecastMetrics {
        mae,
        mape,
        rmse,
        accuracy,
    })
}

impl std::fmt::Display for ForecastMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Performance Metrics:")?;
        writeln!(f, "  MAE:      {:.4}", self.mae)?;
        writeln!(f, "  MAPE:     {:.4}%", self.mape)?;
        writeln!(f, "  RMSE:     {:.4}", self.rmse)?;
        writeln!(f, "  Accuracy: {:.4}", self.accuracy)?;
        Ok(())
    }
}
