//! Forecasting models for daily time series

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt::Debug;

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Forecasted values
    pub(crate) values: Vec<f64>,
    /// Number of periods forecasted
    horizons: usize,
    /// Prediction intervals (optional)
    pub(crate) intervals: Option<Vec<(f64, f64)>>,
}

impl ForecastResult {
    /// Create a new forecast result
    pub fn new(values: Vec<f64>, horizons: usize) -> Result<Self> {
        if values.len() != horizons {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match horizons ({})",
                values.len(),
                horizons
            )));
        }

        Ok(Self {
            values,
            horizons,
            intervals: None,
        })
    }

    /// Create a new forecast result with prediction intervals
    pub fn new_with_intervals(
        values: Vec<f64>,
        horizons: usize,
        intervals: Vec<(f64, f64)>,
    ) -> Result<Self> {
        let mut result = Self::new(values, horizons)?;

        if result.values.len() != intervals.len() {
            return Err(ForecastError::ValidationError(format!(
                "Values length ({}) doesn't match intervals length ({})",
                result.values.len(),
                intervals.len()
            )));
        }

        result.intervals = Some(intervals);
        Ok(result)
    }

    /// Get the forecasted values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the number of periods forecasted
    pub fn horizons(&self) -> usize {
        self.horizons
    }

    /// Get the prediction intervals, if available
    pub fn intervals(&self) -> Option<&[(f64, f64)]> {
        self.intervals.as_deref()
    }

    /// Intervals, or `value × (1 ± spread)` when the model exposes none
    pub fn intervals_or_spread(&self, spread: f64) -> Vec<(f64, f64)> {
        match &self.intervals {
            Some(intervals) => intervals.clone(),
            None => self
                .values
                .iter()
                .map(|v| {
                    let margin = (v * spread).abs();
                    (v - margin, v + margin)
                })
                .collect(),
        }
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Generate forecast for the days after the training data
    fn forecast(&self, horizon: usize) -> Result<ForecastResult>;

    /// Number of observations the model was fitted on
    fn training_len(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on time series data
pub trait ForecastModel: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Trained: TrainedForecastModel + 'static;

    /// Train the model on time series data
    fn train(&self, data: &TimeSeriesData) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Two-sided standard normal quantile for an interval coverage level
pub fn z_score(level: f64) -> Result<f64> {
    if level <= 0.0 || level >= 1.0 {
        return Err(ForecastError::InvalidParameter(
            "Interval level must be between 0 and 1".to_string(),
        ));
    }
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
    Ok(normal.inverse_cdf((1.0 + level) / 2.0))
}

pub mod seasonal_ar;
pub mod trend_seasonal;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_z_score_95() {
        assert_relative_eq!(z_score(0.95).unwrap(), 1.959964, epsilon = 1e-5);
        assert!(z_score(1.0).is_err());
    }

    #[test]
    fn test_spread_reconstruction() {
        let result = ForecastResult::new(vec![100.0, 50.0], 2).unwrap();
        let bands = result.intervals_or_spread(0.2);
        assert_relative_eq!(bands[0].0, 80.0);
        assert_relative_eq!(bands[0].1, 120.0);
        assert_relative_eq!(bands[1].0, 40.0);
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        assert!(ForecastResult::new(vec![1.0], 2).is_err());
        assert!(ForecastResult::new_with_intervals(vec![1.0], 1, vec![]).is_err());
    }
}
