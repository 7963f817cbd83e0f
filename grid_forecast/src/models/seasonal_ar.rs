//! Seasonal autoregression with automatic order selection
//!
//! Differencing orders come from unit-root tests (seasonal strength for the
//! weekly difference, KPSS for first differences). The AR order is then
//! chosen by AIC over subset models with lags `1..p` and `period·1..period·P`,
//! all fitted by least squares on the same conditional sample so their
//! criteria are comparable.

use crate::config::SeasonalArConfig;
use crate::data::TimeSeriesData;
use crate::error::{ForecastError, Result};
use crate::models::{z_score, ForecastModel, ForecastResult, TrainedForecastModel};
use grid_math::linalg::{dot, ridge_least_squares};
use grid_math::polynomial::{ar_operator, difference, differencing_operator, multiply, psi_weights};
use grid_math::stationarity::{ndiffs, nsdiffs};
use rayon::prelude::*;
use serde::Serialize;

/// Selected model orders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonalArOrder {
    /// Non-seasonal AR order
    pub p: usize,
    /// First differences
    pub d: usize,
    /// Seasonal AR order
    pub seasonal_p: usize,
    /// Seasonal differences
    pub seasonal_d: usize,
    /// Seasonal period
    pub period: usize,
}

impl SeasonalArOrder {
    /// Lags used by the AR polynomial, ascending and unique
    pub fn lags(&self) -> Vec<usize> {
        let mut lags: Vec<usize> = (1..=self.p)
            .chain((1..=self.seasonal_p).map(|j| j * self.period))
            .collect();
        lags.sort_unstable();
        lags.dedup();
        lags
    }
}

/// Seasonal autoregression model
#[derive(Debug, Clone)]
pub struct SeasonalArModel {
    /// Name of the model
    name: String,
    /// Order search settings
    config: SeasonalArConfig,
    /// Prediction interval coverage
    interval_level: f64,
}

/// One fitted candidate of the order search
#[derive(Debug, Clone)]
struct CandidateFit {
    order: SeasonalArOrder,
    coefficients: Vec<f64>,
    constant: f64,
    sigma2: f64,
    aic: f64,
}

/// Trained seasonal autoregression
#[derive(Debug, Clone)]
pub struct TrainedSeasonalAr {
    /// Name of the model
    name: String,
    /// Selected orders
    order: SeasonalArOrder,
    /// AR coefficients, aligned with `order.lags()`
    coefficients: Vec<f64>,
    /// Constant of the differenced process
    constant: f64,
    /// Innovation variance
    sigma2: f64,
    /// AR operator times differencing operator, applied to the raw series
    operator: Vec<f64>,
    /// Last observations needed by the recursion
    tail: Vec<f64>,
    /// Normal quantile of the interval level
    z: f64,
    /// Number of training observations
    n: usize,
}

impl SeasonalArModel {
    /// Create a new model
    pub fn new(config: SeasonalArConfig, interval_level: f64) -> Result<Self> {
        if config.period < 2 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal period must be at least 2".to_string(),
            ));
        }
        z_score(interval_level)?;

        Ok(Self {
            name: format!("SeasonalAR[{}]", config.period),
            config,
            interval_level,
        })
    }

    /// Candidate `(p, P)` pairs of the search
    fn candidate_orders(&self) -> Vec<(usize, usize)> {
        let mut orders = Vec::new();
        for p in 0..=self.config.max_p {
            for seasonal_p in 0..=self.config.max_seasonal_p {
                if p + seasonal_p <= self.config.max_order {
                    orders.push((p, seasonal_p));
                }
            }
        }
        orders
    }

    /// Least squares fit of one candidate on rows `start..w.len()`
    fn fit_candidate(
        &self,
        w: &[f64],
        start: usize,
        order: SeasonalArOrder,
        with_constant: bool,
    ) -> Result<CandidateFit> {
        let lags = order.lags();
        let width = lags.len() + usize::from(with_constant);
        let rows = w.len().saturating_sub(start);
        if rows <= width + 2 {
            return Err(ForecastError::ModelFit(format!(
                "{} rows cannot fit {} parameters",
                rows, width
            )));
        }

        let design: Vec<Vec<f64>> = (start..w.len())
            .map(|t| {
                let mut row = Vec::with_capacity(width);
                if with_constant {
                    row.push(1.0);
                }
                row.extend(lags.iter().map(|l| w[t - l]));
                row
            })
            .collect();
        let target = &w[start..];

        let beta = ridge_least_squares(&design, target, &vec![0.0; width])?;
        let rss: f64 = design
            .iter()
            .zip(target.iter())
            .map(|(row, y)| (y - dot(row, &beta)).powi(2))
            .sum();
        let sigma2 = (rss / rows as f64).max(f64::MIN_POSITIVE);
        let aic = rows as f64 * sigma2.ln() + 2.0 * (width + 1) as f64;

        let (constant, coefficients) = if with_constant {
            (beta[0], beta[1..].to_vec())
        } else {
            (0.0, beta)
        };

        Ok(CandidateFit {
            order,
            coefficients,
            constant,
            sigma2,
            aic,
        })
    }
}

impl ForecastModel for SeasonalArModel {
    type Trained = TrainedSeasonalAr;

    fn train(&self, data: &TimeSeriesData) -> Result<TrainedSeasonalAr> {
        let n = data.len();
        if n < self.config.min_observations {
            return Err(ForecastError::ModelFit(format!(
                "{} needs at least {} observations, got {}",
                self.name, self.config.min_observations, n
            )));
        }
        let period = self.config.period;
        let y = data.values();

        let seasonal_d = if self.config.max_seasonal_d > 0 && n > 2 * period {
            nsdiffs(y, period)?.min(self.config.max_seasonal_d)
        } else {
            0
        };
        let mut z = y.to_vec();
        for _ in 0..seasonal_d {
            z = difference(&z, period);
        }

        let d = ndiffs(&z, self.config.max_d)?;
        let mut w = z;
        for _ in 0..d {
            w = difference(&w, 1);
        }

        let with_constant = d + seasonal_d < 2;
        let orders = self.candidate_orders();
        let start = orders
            .iter()
            .map(|(p, seasonal_p)| (*p).max(seasonal_p * period))
            .max()
            .unwrap_or(0);

        let best = orders
            .par_iter()
            .filter_map(|&(p, seasonal_p)| {
                let order = SeasonalArOrder {
                    p,
                    d,
                    seasonal_p,
                    seasonal_d,
                    period,
                };
                self.fit_candidate(&w, start, order, with_constant).ok()
            })
            .filter(|fit| fit.aic.is_finite())
            .min_by(|a, b| a.aic.total_cmp(&b.aic))
            .ok_or_else(|| {
                ForecastError::ModelFit(format!(
                    "{}: no candidate order could be fitted on {} observations",
                    self.name, n
                ))
            })?;

        let ar = ar_operator(&best.order.lags(), &best.coefficients)?;
        let operator = multiply(&ar, &differencing_operator(d, seasonal_d, period));
        let memory = operator.len().saturating_sub(1);
        if memory > n {
            return Err(ForecastError::ModelFit(format!(
                "{}: recursion needs {} observations, got {}",
                self.name, memory, n
            )));
        }

        let order = best.order;
        tracing::debug!(
            p = order.p,
            d = order.d,
            seasonal_p = order.seasonal_p,
            seasonal_d = order.seasonal_d,
            aic = best.aic,
            "selected seasonal AR order"
        );

        Ok(TrainedSeasonalAr {
            name: format!(
                "SeasonalAR({},{},0)({},{},0)[{}]",
                order.p, order.d, order.seasonal_p, order.seasonal_d, period
            ),
            order,
            coefficients: best.coefficients,
            constant: best.constant,
            sigma2: best.sigma2,
            operator,
            tail: y[n - memory..].to_vec(),
            z: z_score(self.interval_level)?,
            n,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedSeasonalAr {
    /// Selected orders
    pub fn order(&self) -> SeasonalArOrder {
        self.order
    }

    /// AR coefficients aligned with [`SeasonalArOrder::lags`]
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Constant of the differenced process
    pub fn constant(&self) -> f64 {
        self.constant
    }
}

impl TrainedForecastModel for TrainedSeasonalAr {
    fn forecast(&self, horizon: usize) -> Result<ForecastResult> {
        let memory = self.operator.len() - 1;
        let mut history = self.tail.clone();
        let mut values = Vec::with_capacity(horizon);

        for _ in 0..horizon {
            let len = history.len();
            let mut next = self.constant;
            for i in 1..=memory {
                next -= self.operator[i] * history[len - i];
            }
            history.push(next);
            values.push(next);
        }

        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "{} produced non-finite forecasts",
                self.name
            )));
        }

        let psi = psi_weights(&self.operator, horizon);
        let mut cumulative = 0.0;
        let mut intervals = Vec::with_capacity(horizon);
        for (value, weight) in values.iter().zip(psi.iter()) {
            cumulative += weight * weight;
            let half_width = self.z * (self.sigma2 * cumulative).sqrt();
            intervals.push((value - half_width, value + half_width));
        }

        if intervals.iter().all(|(l, u)| l.is_finite() && u.is_finite()) {
            ForecastResult::new_with_intervals(values, horizon, intervals)
        } else {
            // Caller reconstructs a band from the point forecast
            ForecastResult::new(values, horizon)
        }
    }

    fn training_len(&self) -> usize {
        self.n
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::SyntheticSeries;
    use approx::assert_relative_eq;

    #[test]
    fn test_order_lags_merge_seasonal_terms() {
        let order = SeasonalArOrder {
            p: 2,
            d: 0,
            seasonal_p: 2,
            seasonal_d: 0,
            period: 7,
        };
        assert_eq!(order.lags(), vec![1, 2, 7, 14]);
    }

    #[test]
    fn test_candidate_orders_respect_total_order() {
        let config = SeasonalArConfig {
            max_order: 2,
            ..SeasonalArConfig::default()
        };
        let model = SeasonalArModel::new(config, 0.95).unwrap();
        assert!(model.candidate_orders().iter().all(|(p, sp)| p + sp <= 2));
        assert!(model.candidate_orders().contains(&(0, 0)));
    }

    #[test]
    fn test_weekly_series_forecast() {
        let data = SyntheticSeries {
            days: 200,
            trend_per_day: 0.0,
            yearly_amplitude: 0.0,
            ..SyntheticSeries::default()
        }
        .generate()
        .unwrap();

        let model = SeasonalArModel::new(SeasonalArConfig::default(), 0.95).unwrap();
        let trained = model.train(&data).unwrap();
        let forecast = trained.forecast(14).unwrap();

        assert_eq!(forecast.values().len(), 14);
        let intervals = forecast.intervals().unwrap();
        for ((lower, upper), value) in intervals.iter().zip(forecast.values()) {
            assert!(lower <= value && value <= upper);
        }
        // Bands widen with the horizon
        let first = intervals[0].1 - intervals[0].0;
        let last = intervals[13].1 - intervals[13].0;
        assert!(last >= first);
    }

    #[test]
    fn test_constant_series_forecasts_level() {
        let dates = crate::utils::future_dates("2024-01-01".parse().unwrap(), 80);
        let data = TimeSeriesData::new(dates, vec![50.0; 80]).unwrap();

        let config = SeasonalArConfig {
            max_seasonal_d: 0,
            ..SeasonalArConfig::default()
        };
        let trained = SeasonalArModel::new(config, 0.95)
            .unwrap()
            .train(&data)
            .unwrap();
        let forecast = trained.forecast(3).unwrap();
        for value in forecast.values() {
            assert_relative_eq!(*value, 50.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_too_short_history_fails() {
        let dates = crate::utils::future_dates("2024-01-01".parse().unwrap(), 20);
        let data = TimeSeriesData::new(dates, (0..20).map(f64::from).collect()).unwrap();
        let model = SeasonalArModel::new(SeasonalArConfig::default(), 0.95).unwrap();
        assert!(matches!(model.train(&data), Err(ForecastError::ModelFit(_))));
    }
}
