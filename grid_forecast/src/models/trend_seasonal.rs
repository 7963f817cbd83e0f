//! Additive trend + seasonality regression
//!
//! The trend is piecewise linear with potential changepoints spread over
//! the first part of the history; slope adjustments at changepoints and
//! the Fourier coefficients of the yearly and weekly components are
//! shrunk with Gaussian priors, which turns the fit into one ridge
//! regression. Values are scaled by their largest magnitude before
//! fitting so the prior scales do not depend on the signal's unit.

use crate::config::{GrowthMode, SeasonalityMode, TrendSeasonalConfig};
use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{z_score, ForecastModel, ForecastResult, TrainedForecastModel};
use crate::utils::future_dates;
use chrono::{Datelike, NaiveDate};
use grid_math::fourier::{fourier_terms, WEEK_DAYS, YEAR_DAYS};
use grid_math::linalg::{dot, ridge_least_squares};

/// Smallest history the regression accepts
const MIN_OBSERVATIONS: usize = 14;

/// Trend + seasonality regression model
#[derive(Debug, Clone)]
pub struct TrendSeasonalModel {
    /// Name of the model
    name: String,
    /// Regression settings
    config: TrendSeasonalConfig,
    /// Trend shape
    growth: GrowthMode,
    /// Seasonality combination
    seasonality: SeasonalityMode,
    /// Prediction interval coverage
    interval_level: f64,
}

/// Column layout of the regression for one fitted history
#[derive(Debug, Clone)]
struct Design {
    start: NaiveDate,
    span_days: f64,
    linear: bool,
    changepoints: Vec<f64>,
    yearly_order: usize,
    weekly_order: usize,
}

impl Design {
    fn row(&self, date: NaiveDate) -> Vec<f64> {
        let t = (date - self.start).num_days() as f64 / self.span_days;
        let day = date.num_days_from_ce() as f64;

        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        if self.linear {
            row.push(t);
            row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));
        }
        row.extend(fourier_terms(day, YEAR_DAYS, self.yearly_order));
        row.extend(fourier_terms(day, WEEK_DAYS, self.weekly_order));
        row
    }

    fn width(&self) -> usize {
        let trend = if self.linear { 2 + self.changepoints.len() } else { 1 };
        trend + 2 * (self.yearly_order + self.weekly_order)
    }

    fn penalties(&self, config: &TrendSeasonalConfig) -> Vec<f64> {
        let changepoint = 1.0 / config.changepoint_prior_scale.powi(2);
        let seasonal = (1.0 / config.seasonality_prior_scale.powi(2)).max(1e-8);

        let mut penalties = vec![0.0];
        if self.linear {
            penalties.push(0.0);
            penalties.extend(std::iter::repeat(changepoint).take(self.changepoints.len()));
        }
        penalties.extend(
            std::iter::repeat(seasonal).take(2 * (self.yearly_order + self.weekly_order)),
        );
        penalties
    }
}

/// Trained trend + seasonality model
#[derive(Debug, Clone)]
pub struct TrainedTrendSeasonal {
    /// Name of the model
    name: String,
    /// Column layout
    design: Design,
    /// Regression coefficients on the scaled target
    coefficients: Vec<f64>,
    /// Target scale
    y_scale: f64,
    /// Residual standard deviation on the fitted scale
    sigma: f64,
    /// Normal quantile of the interval level
    z: f64,
    /// Seasonality combination
    seasonality: SeasonalityMode,
    /// Last training date
    last_date: NaiveDate,
    /// Number of training observations
    n: usize,
}

impl TrendSeasonalModel {
    /// Create a linear-growth, additive model
    pub fn new(config: TrendSeasonalConfig, interval_level: f64) -> Result<Self> {
        if config.changepoint_prior_scale <= 0.0 || config.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Prior scales must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&config.changepoint_range) {
            return Err(ForecastError::InvalidParameter(
                "Changepoint range must be between 0 and 1".to_string(),
            ));
        }
        z_score(interval_level)?;

        let mut model = Self {
            name: String::new(),
            config,
            growth: GrowthMode::Linear,
            seasonality: SeasonalityMode::Additive,
            interval_level,
        };
        model.refresh_name();
        Ok(model)
    }

    /// Use the given trend shape
    pub fn with_growth(mut self, growth: GrowthMode) -> Self {
        self.growth = growth;
        self.refresh_name();
        self
    }

    /// Use the given seasonality mode
    pub fn with_seasonality_mode(mut self, seasonality: SeasonalityMode) -> Self {
        self.seasonality = seasonality;
        self.refresh_name();
        self
    }

    fn refresh_name(&mut self) {
        self.name = format!(
            "TrendSeasonal({:?}, {:?})",
            self.growth, self.seasonality
        )
        .to_lowercase();
    }

    fn design_for(&self, data: &TimeSeriesData) -> Result<Design> {
        let (start, last) = data
            .first_date()
            .zip(data.last_date())
            .ok_or_else(|| ForecastError::ModelFit("Empty time series data".to_string()))?;
        let n = data.len();
        let linear = self.growth == GrowthMode::Linear;

        let changepoints = if linear {
            let count = self.config.changepoints.min(n / 10);
            (1..=count)
                .map(|k| self.config.changepoint_range * k as f64 / count as f64)
                .collect()
        } else {
            Vec::new()
        };

        let yearly_order = if n >= self.config.yearly_min_days {
            self.config.yearly_order
        } else {
            0
        };

        Ok(Design {
            start,
            span_days: ((last - start).num_days() as f64).max(1.0),
            linear,
            changepoints,
            yearly_order,
            weekly_order: self.config.weekly_order,
        })
    }
}

impl ForecastModel for TrendSeasonalModel {
    type Trained = TrainedTrendSeasonal;

    fn train(&self, data: &TimeSeriesData) -> Result<TrainedTrendSeasonal> {
        let n = data.len();
        if n < MIN_OBSERVATIONS {
            return Err(ForecastError::ModelFit(format!(
                "{} needs at least {} observations, got {}",
                self.name, MIN_OBSERVATIONS, n
            )));
        }

        let target: Vec<f64> = match self.seasonality {
            SeasonalityMode::Additive => data.values().to_vec(),
            SeasonalityMode::Multiplicative => {
                if data.values().iter().any(|v| *v <= 0.0) {
                    return Err(ForecastError::ModelFit(
                        "Multiplicative seasonality requires strictly positive values".to_string(),
                    ));
                }
                data.values().iter().map(|v| v.ln()).collect()
            }
        };

        let y_scale = target.iter().map(|v| v.abs()).fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let scaled: Vec<f64> = target.iter().map(|v| v / y_scale).collect();

        let design = self.design_for(data)?;
        let rows: Vec<Vec<f64>> = data.dates().iter().map(|d| design.row(*d)).collect();
        let coefficients = ridge_least_squares(&rows, &scaled, &design.penalties(&self.config))
            .map_err(|e| ForecastError::ModelFit(format!("{}: {}", self.name, e)))?;

        let rss: f64 = rows
            .iter()
            .zip(scaled.iter())
            .map(|(row, y)| (y - dot(row, &coefficients)).powi(2))
            .sum();
        let dof = n.saturating_sub(design.width()).max(1);
        let sigma = (rss / dof as f64).sqrt() * y_scale;
        if !sigma.is_finite() {
            return Err(ForecastError::ModelFit(format!(
                "{}: residual scale is not finite",
                self.name
            )));
        }

        let last_date = data
            .last_date()
            .ok_or_else(|| ForecastError::ModelFit("Empty time series data".to_string()))?;

        Ok(TrainedTrendSeasonal {
            name: self.name.clone(),
            design,
            coefficients,
            y_scale,
            sigma,
            z: z_score(self.interval_level)?,
            seasonality: self.seasonality,
            last_date,
            n,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedTrendSeasonal {
    /// Residual standard deviation on the fitted scale
    pub fn residual_std(&self) -> f64 {
        self.sigma
    }
}

impl TrainedForecastModel for TrainedTrendSeasonal {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let dates = future_dates(self.last_date, horizon);
        let mut values = Vec::with_capacity(horizon);
        let mut intervals = Vec::with_capacity(horizon);

        for (step, date) in dates.iter().enumerate() {
            let mean = dot(&self.design.row(*date), &self.coefficients) * self.y_scale;
            // Uncertainty grows with distance from the training data
            let half_width =
                self.z * self.sigma * (1.0 + (step + 1) as f64 / self.n as f64).sqrt();

            let (point, lower, upper) = match self.seasonality {
                SeasonalityMode::Additive => (mean, mean - half_width, mean + half_width),
                SeasonalityMode::Multiplicative => (
                    mean.exp(),
                    (mean - half_width).exp(),
                    (mean + half_width).exp(),
                ),
            };
            values.push(point);
            intervals.push((lower, upper));
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "{} produced non-finite forecasts",
                self.name
            )));
        }

        ForecastResult::new_with_intervals(values, horizon, intervals)
    }

    fn training_len(&self) -> usize {
        self.n
    }

    fn name(&self) -> &str {
        &self.name
    }
}
