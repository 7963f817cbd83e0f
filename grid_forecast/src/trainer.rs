//! Ensemble trainer
//!
//! Trains the trend + seasonality model and, when the profile allows it,
//! the seasonal autoregression on one signal's history, scores both on a
//! withheld suffix, weights them by their holdout errors and produces the
//! production forecast run.

use crate::config::{SignalConfig, TrainerConfig};
use crate::data::{Signal, TimeSeriesData};
use crate::ensemble::{Committee, Validation, Weights};
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastPoint, ForecastRun};
use crate::metrics::{evaluate_holdout, HoldoutAccuracy};
use crate::models::seasonal_ar::SeasonalArModel;
use crate::models::trend_seasonal::TrendSeasonalModel;
use crate::models::{ForecastModel, TrainedForecastModel};
use crate::utils::future_dates;
use chrono::{DateTime, Utc};
use grid_math::stats::median;
use tracing::{debug, info, warn};

/// Observations examined by partial-tail trimming
const TAIL_LEN: usize = 5;
/// Observations before the tail used as the trimming reference
const TAIL_REFERENCE_LEN: usize = 90;
/// Tail values below this share of the reference median are dropped
const TAIL_RATIO: f64 = 0.5;

/// Result of training one signal
#[derive(Debug)]
pub struct TrainingRun {
    /// Trained signal
    pub signal: Signal,
    /// Series after preparation (window, trimming, scaling, gap filling)
    pub train_series: TimeSeriesData,
    /// Production models
    pub committee: Committee,
    /// Holdout validation outcome
    pub validation: Validation,
    /// Points to persist
    pub forecast: ForecastRun,
}

/// Holdout scores of the two models
struct HoldoutScores {
    primary: HoldoutAccuracy,
    primary_pred: Vec<f64>,
    secondary: Option<(HoldoutAccuracy, Vec<f64>)>,
    actual: Vec<f64>,
}

/// Drop any of the last five values below half the median of the ninety
/// values before them; upstream publishes partial figures for recent days.
pub fn trim_partial_tail(series: &TimeSeriesData) -> Result<TimeSeriesData> {
    let n = series.len();
    if n <= TAIL_REFERENCE_LEN + TAIL_LEN {
        return Ok(series.clone());
    }
    let values = series.values();
    let reference = median(&values[n - TAIL_LEN - TAIL_REFERENCE_LEN..n - TAIL_LEN])?;
    let threshold = TAIL_RATIO * reference;

    let partial: Vec<_> = series.dates()[n - TAIL_LEN..]
        .iter()
        .zip(values[n - TAIL_LEN..].iter())
        .filter(|(_, v)| **v < threshold)
        .map(|(d, _)| *d)
        .collect();

    if partial.is_empty() {
        return Ok(series.clone());
    }
    debug!(dropped = partial.len(), threshold, "trimmed partial tail values");
    Ok(series.without_dates(&partial))
}

/// Ensemble trainer
#[derive(Debug, Clone)]
pub struct EnsembleTrainer {
    config: TrainerConfig,
}

impl EnsembleTrainer {
    /// Create a trainer with validated settings
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Trainer settings
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Apply the profile's window, tail trimming, scaling and gap filling
    pub fn prepare(&self, profile: &SignalConfig, history: &TimeSeriesData) -> Result<TimeSeriesData> {
        let mut series = match profile.window_months {
            Some(months) => history.last_months(months),
            None => history.clone(),
        };
        if profile.trim_partial_tail {
            series = trim_partial_tail(&series)?;
        }
        if (profile.scale_factor - 1.0).abs() > f64::EPSILON {
            series = series.scaled(profile.scale_factor);
        }
        Ok(series.fill_daily_gaps())
    }

    /// Train and forecast, stamping the run with the current time
    pub fn train_and_forecast(
        &self,
        profile: &SignalConfig,
        history: &TimeSeriesData,
    ) -> Result<TrainingRun> {
        self.train_and_forecast_at(profile, history, Utc::now())
    }

    /// Train and forecast with a fixed generation timestamp
    pub fn train_and_forecast_at(
        &self,
        profile: &SignalConfig,
        history: &TimeSeriesData,
        generated_at: DateTime<Utc>,
    ) -> Result<TrainingRun> {
        let secondary_model = if profile.primary_only {
            None
        } else {
            Some(SeasonalArModel::new(
                self.config.seasonal_ar.clone(),
                self.config.interval_level,
            )?)
        };
        self.train_with_secondary(profile, history, secondary_model, generated_at)
    }

    /// Train with a caller-supplied second committee member
    ///
    /// `None` trains the trend + seasonality model alone.
    pub fn train_with_secondary<S: ForecastModel>(
        &self,
        profile: &SignalConfig,
        history: &TimeSeriesData,
        secondary_model: Option<S>,
        generated_at: DateTime<Utc>,
    ) -> Result<TrainingRun> {
        let signal = profile.signal();
        let series = self.prepare(profile, history)?;

        let required = if profile.window_months.is_some() {
            self.config.min_windowed_history_days
        } else {
            self.config.min_history_days
        };
        if series.len() < required {
            return Err(ForecastError::DataInsufficient(format!(
                "{} has {} observations, {} required",
                signal.id,
                series.len(),
                required
            )));
        }

        let primary_model = TrendSeasonalModel::new(
            self.config.trend_seasonal.clone(),
            self.config.interval_level,
        )?
        .with_growth(profile.growth)
        .with_seasonality_mode(profile.seasonality_mode);

        let holdout = self.config.validation_days;
        let scores = if holdout > 0
            && series.len() >= holdout + self.config.min_validation_train_days
        {
            Some(self.score_holdout(&signal, &primary_model, secondary_model.as_ref(), &series)?)
        } else {
            None
        };

        let primary_full = primary_model.train(&series)?;
        // Model B is refitted only when it survived the holdout (or there was none)
        let refit_secondary = match &scores {
            Some(scores) => scores.secondary.is_some(),
            None => true,
        };
        let secondary_full = match secondary_model.as_ref().filter(|_| refit_secondary) {
            Some(model) => match model.train(&series) {
                Ok(trained) => Some(trained),
                Err(e) => {
                    warn!(
                        signal = %signal.id,
                        model = model.name(),
                        error = %e,
                        "secondary model dropped on full refit"
                    );
                    None
                }
            },
            None => None,
        };

        let (committee, validation) = match (scores, secondary_full) {
            (Some(scores), Some(secondary)) => match scores.secondary {
                Some((secondary_accuracy, secondary_pred)) => {
                    let weights = Weights::from_holdout_errors(
                        scores.primary.mape,
                        secondary_accuracy.mape,
                    );
                    let ensemble_pred = weights.combine(&scores.primary_pred, &secondary_pred)?;
                    let ensemble = evaluate_holdout(&ensemble_pred, &scores.actual)?;
                    (
                        Committee::Pair {
                            primary: Box::new(primary_full),
                            secondary: Box::new(secondary),
                            weights,
                        },
                        Validation::Validated {
                            weights,
                            ensemble,
                            primary: scores.primary,
                            secondary: Some(secondary_accuracy),
                        },
                    )
                }
                None => Self::primary_alone(primary_full, scores.primary, None),
            },
            (Some(scores), None) => Self::primary_alone(
                primary_full,
                scores.primary,
                scores.secondary.map(|(accuracy, _)| accuracy),
            ),
            (None, secondary) => {
                let reason = format!(
                    "{} observations, {} needed before a {}-day holdout",
                    series.len(),
                    self.config.min_validation_train_days,
                    holdout
                );
                match secondary {
                    Some(secondary) => {
                        let weights = Weights::from_defaults(self.config.default_weights);
                        (
                            Committee::Pair {
                                primary: Box::new(primary_full),
                                secondary: Box::new(secondary),
                                weights,
                            },
                            Validation::Unvalidated {
                                default_weights: weights,
                                reason,
                            },
                        )
                    }
                    None => (
                        Committee::Single {
                            primary: Box::new(primary_full),
                        },
                        Validation::Unvalidated {
                            default_weights: Weights::single(),
                            reason,
                        },
                    ),
                }
            }
        };

        let weights = committee.weights();
        debug!(
            signal = %signal.id,
            primary = weights.primary,
            secondary = weights.secondary,
            validated = validation.is_validated(),
            "committee weights"
        );

        let forecast = self.build_run(profile, &series, &committee, &validation, generated_at)?;
        info!(
            signal = %signal.id,
            points = forecast.len(),
            models = ?committee.member_names(),
            mape = ?validation.accuracy().map(|a| a.mape),
            "trained signal"
        );

        Ok(TrainingRun {
            signal,
            train_series: series,
            committee,
            validation,
            forecast,
        })
    }

    fn primary_alone(
        primary: impl TrainedForecastModel + 'static,
        primary_accuracy: HoldoutAccuracy,
        secondary_accuracy: Option<HoldoutAccuracy>,
    ) -> (Committee, Validation) {
        (
            Committee::Single {
                primary: Box::new(primary),
            },
            Validation::Validated {
                weights: Weights::single(),
                ensemble: primary_accuracy,
                primary: primary_accuracy,
                secondary: secondary_accuracy,
            },
        )
    }

    /// Fit on all but the last `validation_days` and score on them
    fn score_holdout<S: ForecastModel>(
        &self,
        signal: &Signal,
        primary: &TrendSeasonalModel,
        secondary: Option<&S>,
        series: &TimeSeriesData,
    ) -> Result<HoldoutScores> {
        let (train, test) = series.split_holdout(self.config.validation_days)?;
        let horizon = test.len();

        let primary_pred = primary.train(&train)?.forecast(horizon)?.values().to_vec();
        let primary_accuracy = evaluate_holdout(&primary_pred, test.values())?;

        let secondary = match secondary {
            Some(model) => {
                let scored = model
                    .train(&train)
                    .and_then(|trained| trained.forecast(horizon))
                    .and_then(|result| {
                        let pred = result.values().to_vec();
                        evaluate_holdout(&pred, test.values()).map(|accuracy| (accuracy, pred))
                    });
                match scored {
                    Ok(scored) => Some(scored),
                    Err(e) => {
                        warn!(
                            signal = %signal.id,
                            model = model.name(),
                            error = %e,
                            "secondary model dropped on holdout"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        Ok(HoldoutScores {
            primary: primary_accuracy,
            primary_pred,
            secondary,
            actual: test.values().to_vec(),
        })
    }

    fn build_run(
        &self,
        profile: &SignalConfig,
        series: &TimeSeriesData,
        committee: &Committee,
        validation: &Validation,
        generated_at: DateTime<Utc>,
    ) -> Result<ForecastRun> {
        let horizon = self.config.horizon_days;
        let last = series
            .last_date()
            .ok_or_else(|| ForecastError::DataInsufficient("empty series".to_string()))?;
        let combined = committee.forecast(horizon, self.config.fallback_spread)?;
        let bands = combined.intervals_or_spread(self.config.fallback_spread);

        let accuracy = validation.accuracy();
        let confidence = validation.confidence_score();

        let mut points = Vec::with_capacity(horizon);
        for (step, ((date, value), (lower, upper))) in future_dates(last, horizon)
            .into_iter()
            .zip(combined.values().iter().copied())
            .zip(bands.iter().copied())
            .enumerate()
        {
            if !(value.is_finite() && lower.is_finite() && upper.is_finite()) {
                return Err(ForecastError::ModelFit(format!(
                    "{}: non-finite combined forecast on {}",
                    profile.id, date
                )));
            }
            let (point, lower, upper) = bound_values(profile, value, lower, upper);

            points.push(ForecastPoint {
                source: profile.id.clone(),
                model_version: self.config.model_version.clone(),
                target_date: date,
                generated_at,
                point_estimate: point,
                interval_lower: Some(lower),
                interval_upper: Some(upper),
                horizon_days: (step + 1) as u32,
                accuracy_mape: accuracy.map(|a| a.mape),
                accuracy_rmse: accuracy.map(|a| a.rmse),
                confidence_score: confidence,
            });
        }

        Ok(ForecastRun {
            source: profile.id.clone(),
            model_version: self.config.model_version.clone(),
            generated_at,
            points,
        })
    }
}

/// Clamp at zero, apply the floor, then restore `lower <= point <= upper`
fn bound_values(profile: &SignalConfig, point: f64, lower: f64, upper: f64) -> (f64, f64, f64) {
    let mut values = [point, lower, upper];
    if profile.non_negative {
        for v in values.iter_mut() {
            *v = v.max(0.0);
        }
    }
    if let Some(floor) = profile.floor {
        for v in values.iter_mut() {
            *v = v.max(floor);
        }
    }
    let [point, lower, upper] = values;
    (point, lower.min(point), upper.max(point))
}
