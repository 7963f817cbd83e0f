//! Trainer and per-signal configuration

use crate::data::Signal;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Trend shape of the trend + seasonality model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthMode {
    /// Piecewise-linear trend with changepoints
    #[default]
    Linear,
    /// Constant level (mean-reverting series such as spot prices)
    Flat,
}

/// How seasonal terms combine with the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// `y = trend + seasonal`
    #[default]
    Additive,
    /// `y = trend × seasonal`, fitted on the log scale
    Multiplicative,
}

/// Settings of the trend + seasonality regression (Model A)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSeasonalConfig {
    /// Fourier order of the yearly component
    pub yearly_order: usize,
    /// Fourier order of the weekly component
    pub weekly_order: usize,
    /// Number of potential trend changepoints
    pub changepoints: usize,
    /// Share of the history in which changepoints are placed
    pub changepoint_range: f64,
    /// Prior scale of changepoint slope adjustments
    pub changepoint_prior_scale: f64,
    /// Prior scale of seasonal coefficients
    pub seasonality_prior_scale: f64,
    /// Minimum history (days) to include the yearly component
    pub yearly_min_days: usize,
}

impl Default for TrendSeasonalConfig {
    fn default() -> Self {
        Self {
            yearly_order: 10,
            weekly_order: 3,
            changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly_min_days: 365,
        }
    }
}

/// Settings of the seasonal autoregression order search (Model B)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalArConfig {
    /// Seasonal period in days
    pub period: usize,
    /// Largest non-seasonal AR order searched
    pub max_p: usize,
    /// Largest seasonal AR order searched
    pub max_seasonal_p: usize,
    /// Largest total order `p + P`
    pub max_order: usize,
    /// Largest number of first differences
    pub max_d: usize,
    /// Largest number of seasonal differences
    pub max_seasonal_d: usize,
    /// Minimum number of observations to attempt a fit
    pub min_observations: usize,
}

impl Default for SeasonalArConfig {
    fn default() -> Self {
        Self {
            period: 7,
            max_p: 3,
            max_seasonal_p: 2,
            max_order: 5,
            max_d: 2,
            max_seasonal_d: 1,
            min_observations: 60,
        }
    }
}

/// Committee weights used when no holdout validation is possible
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultWeights {
    /// Weight of the trend + seasonality model
    pub primary: f64,
    /// Weight of the seasonal autoregression
    pub secondary: f64,
}

impl Default for DefaultWeights {
    fn default() -> Self {
        Self {
            primary: 0.6,
            secondary: 0.4,
        }
    }
}

/// Ensemble trainer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Number of future days forecast per run
    pub horizon_days: usize,
    /// Withheld suffix used to measure accuracy
    pub validation_days: usize,
    /// Coverage of prediction intervals
    pub interval_level: f64,
    /// Version tag written on every forecast row
    pub model_version: String,
    /// Earliest history date fetched for training
    pub history_start: NaiveDate,
    /// Minimum observations to train a signal
    pub min_history_days: usize,
    /// Minimum observations for signals with a `window_months` profile
    pub min_windowed_history_days: usize,
    /// Minimum observations before the holdout for validation to run
    pub min_validation_train_days: usize,
    /// Weights when validation is skipped
    pub default_weights: DefaultWeights,
    /// Relative half-width for members that expose no interval
    pub fallback_spread: f64,
    /// Model A settings
    pub trend_seasonal: TrendSeasonalConfig,
    /// Model B settings
    pub seasonal_ar: SeasonalArConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            horizon_days: 90,
            validation_days: 30,
            interval_level: 0.95,
            model_version: "ENSEMBLE_v1".to_string(),
            history_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            min_history_days: 365,
            min_windowed_history_days: 120,
            min_validation_train_days: 365,
            default_weights: DefaultWeights::default(),
            fallback_spread: 0.2,
            trend_seasonal: TrendSeasonalConfig::default(),
            seasonal_ar: SeasonalArConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_days must be positive".to_string(),
            ));
        }
        if self.interval_level <= 0.0 || self.interval_level >= 1.0 {
            return Err(ForecastError::InvalidParameter(
                "interval_level must be between 0 and 1".to_string(),
            ));
        }
        if self.fallback_spread < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "fallback_spread must be non-negative".to_string(),
            ));
        }
        let w = self.default_weights;
        if w.primary < 0.0 || w.secondary < 0.0 || w.primary + w.secondary <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "default weights must be non-negative with a positive sum".to_string(),
            ));
        }
        if self.model_version.trim().is_empty() {
            return Err(ForecastError::InvalidParameter(
                "model_version must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Training profile of one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// Signal identifier
    pub id: String,
    /// Physical unit
    #[serde(default)]
    pub unit: String,
    /// Human description
    #[serde(default)]
    pub description: String,
    /// Clamp forecasts at zero
    #[serde(default = "default_true")]
    pub non_negative: bool,
    /// Never fit the seasonal autoregression for this signal
    #[serde(default)]
    pub primary_only: bool,
    /// Trend shape of Model A
    #[serde(default)]
    pub growth: GrowthMode,
    /// Seasonality mode of Model A
    #[serde(default)]
    pub seasonality_mode: SeasonalityMode,
    /// Train only on the last N months
    #[serde(default)]
    pub window_months: Option<u32>,
    /// Historical minimum applied to forecasts
    #[serde(default)]
    pub floor: Option<f64>,
    /// Multiplier applied to raw history
    #[serde(default = "default_scale")]
    pub scale_factor: f64,
    /// Drop suspiciously low values among the last five days
    #[serde(default)]
    pub trim_partial_tail: bool,
}

fn default_true() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

impl SignalConfig {
    /// Minimal profile with defaults
    pub fn new(id: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            unit: unit.to_string(),
            description: String::new(),
            non_negative: true,
            primary_only: false,
            growth: GrowthMode::Linear,
            seasonality_mode: SeasonalityMode::Additive,
            window_months: None,
            floor: None,
            scale_factor: 1.0,
            trim_partial_tail: false,
        }
    }

    /// The signal this profile trains
    pub fn signal(&self) -> Signal {
        Signal {
            id: self.id.clone(),
            unit: self.unit.clone(),
            non_negative: self.non_negative,
        }
    }

    /// Profiles of the indicators tracked by default
    pub fn builtin() -> Vec<SignalConfig> {
        let volume = |id: &str, description: &str| SignalConfig {
            description: description.to_string(),
            trim_partial_tail: true,
            ..SignalConfig::new(id, "GWh")
        };

        vec![
            volume("GENERATION_TOTAL", "Total generation of the interconnected system"),
            volume("DEMAND", "National real demand"),
            SignalConfig {
                description: "National spot price".to_string(),
                primary_only: true,
                growth: GrowthMode::Flat,
                seasonality_mode: SeasonalityMode::Multiplicative,
                window_months: Some(8),
                floor: Some(86.0),
                ..SignalConfig::new("SPOT_PRICE", "$/kWh")
            },
            SignalConfig {
                description: "Scarcity price".to_string(),
                ..SignalConfig::new("SCARCITY_PRICE", "$/kWh")
            },
            volume("HYDRO_INFLOWS", "Hydrological energy inflows"),
            volume("RESERVOIR_ENERGY", "Useful reservoir storage"),
            SignalConfig {
                description: "Useful reservoir volume".to_string(),
                scale_factor: 100.0,
                ..SignalConfig::new("RESERVOIR_PCT", "%")
            },
            volume("LOSSES", "Technical and non-technical system losses"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(TrainerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_interval_level() {
        let config = TrainerConfig {
            interval_level: 1.5,
            ..TrainerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builtin_profiles_have_unique_ids() {
        let profiles = SignalConfig::builtin();
        let mut ids: Vec<&str> = profiles.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), profiles.len());
    }
}
