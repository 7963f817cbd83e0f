//! Utility functions for the grid_forecast crate

use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;

/// The `horizon` calendar days following `last`
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|step| last + Duration::days(step))
        .collect()
}

/// Seeded generator of daily series with trend, seasonality and noise.
///
/// Used by tests and demos in place of real telemetry.
#[derive(Debug, Clone)]
pub struct SyntheticSeries {
    /// First date of the series
    pub start: NaiveDate,
    /// Number of days
    pub days: usize,
    /// Starting level
    pub level: f64,
    /// Linear trend added per day
    pub trend_per_day: f64,
    /// Amplitude of the weekly cycle
    pub weekly_amplitude: f64,
    /// Amplitude of the yearly cycle
    pub yearly_amplitude: f64,
    /// Standard deviation of Gaussian noise
    pub noise_std: f64,
    /// RNG seed
    pub seed: u64,
}

impl Default for SyntheticSeries {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            days: 730,
            level: 200.0,
            trend_per_day: 0.02,
            weekly_amplitude: 15.0,
            yearly_amplitude: 20.0,
            noise_std: 3.0,
            seed: 7,
        }
    }
}

impl SyntheticSeries {
    /// Generate the series
    pub fn generate(&self) -> Result<TimeSeriesData> {
        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let dates: Vec<NaiveDate> = (0..self.days as i64)
            .map(|i| self.start + Duration::days(i))
            .collect();
        let values = (0..self.days)
            .map(|i| {
                let t = i as f64;
                self.level
                    + self.trend_per_day * t
                    + self.weekly_amplitude * (2.0 * PI * t / 7.0).sin()
                    + self.yearly_amplitude * (2.0 * PI * t / 365.25).sin()
                    + noise.sample(&mut rng)
            })
            .collect();

        TimeSeriesData::new(dates, values)
    }
}
