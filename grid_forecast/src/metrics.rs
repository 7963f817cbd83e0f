//! Metrics for evaluating forecast performance

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Floor of the MAPE denominator, so zero actuals do not divide by zero
const MAPE_EPSILON: f64 = f64::EPSILON;

fn check_lengths(predicted: &[f64], actual: &[f64]) -> Result<()> {
    if predicted.len() != actual.len() || predicted.is_empty() {
        return Err(ForecastError::ValidationError(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }
    Ok(())
}

/// Mean absolute percentage error as a fraction (`0.05` is 5%)
pub fn mean_absolute_percentage_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;
    let total: f64 = predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| (a - p).abs() / a.abs().max(MAPE_EPSILON))
        .sum();
    Ok(total / actual.len() as f64)
}

/// Root mean squared error
pub fn root_mean_squared_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;
    let mse: f64 = predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    Ok(mse.sqrt())
}

/// Mean absolute error
pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Result<f64> {
    check_lengths(predicted, actual)?;
    Ok(predicted
        .iter()
        .zip(actual.iter())
        .map(|(p, a)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64)
}

/// Accuracy of a prediction over the holdout window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldoutAccuracy {
    /// Mean absolute percentage error (fraction)
    pub mape: f64,
    /// Root mean squared error
    pub rmse: f64,
    /// Mean absolute error
    pub mae: f64,
}

impl fmt::Display for HoldoutAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Holdout Accuracy:")?;
        writeln!(f, "  MAPE: {:.2}%", self.mape * 100.0)?;
        writeln!(f, "  RMSE: {:.4}", self.rmse)?;
        write!(f, "  MAE: {:.4}", self.mae)
    }
}

/// Score a prediction against the withheld actuals
pub fn evaluate_holdout(predicted: &[f64], actual: &[f64]) -> Result<HoldoutAccuracy> {
    let mape = mean_absolute_percentage_error(predicted, actual)?;
    if !mape.is_finite() {
        return Err(ForecastError::ValidationError(
            "Holdout MAPE is not finite".to_string(),
        ));
    }
    Ok(HoldoutAccuracy {
        mape,
        rmse: root_mean_squared_error(predicted, actual)?,
        mae: mean_absolute_error(predicted, actual)?,
    })
}
