//! Anomaly detection configuration

use crate::error::{AnomalyError, Result};
use crate::severity::{SeverityThresholds, ThresholdTable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An indicator watched for anomalies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSpec {
    /// History signal identifier
    pub id: String,
    /// Human-readable name used in narratives
    pub display_name: String,
    /// Unit used in narratives
    #[serde(default)]
    pub unit: String,
    /// Forecast source compared against; defaults to `id`
    #[serde(default)]
    pub forecast_source: Option<String>,
    /// Indicator-specific thresholds
    #[serde(default)]
    pub thresholds: Option<SeverityThresholds>,
    /// Factor turning history values into the forecast unit
    #[serde(default = "unit_scale")]
    pub scale_factor: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl IndicatorSpec {
    /// Create an indicator whose forecasts are stored under its own id
    pub fn new(id: &str, display_name: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            unit: unit.to_string(),
            forecast_source: None,
            thresholds: None,
            scale_factor: unit_scale(),
        }
    }

    /// Multiply history values by `factor` before comparing them
    pub fn with_scale_factor(mut self, factor: f64) -> Self {
        self.scale_factor = factor;
        self
    }

    /// Use explicit thresholds
    pub fn with_thresholds(mut self, thresholds: SeverityThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Source whose forecasts this indicator is compared with
    pub fn forecast_source(&self) -> &str {
        self.forecast_source.as_deref().unwrap_or(&self.id)
    }

    /// The key indicators of the interconnected system
    pub fn builtin() -> Vec<IndicatorSpec> {
        let table = ThresholdTable::builtin();
        // Reservoir history is a fraction of useful volume, forecasts are percent
        [
            ("GENERATION_TOTAL", "Total generation", "GWh", 1.0),
            ("SPOT_PRICE", "Spot price", "$/kWh", 1.0),
            ("RESERVOIR_PCT", "Reservoir level", "%", 100.0),
        ]
        .iter()
        .map(|(id, name, unit, scale)| {
            IndicatorSpec::new(id, name, unit)
                .with_thresholds(table.for_indicator(id))
                .with_scale_factor(*scale)
        })
        .collect()
    }
}

/// Evaluator and dispatcher settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    /// Observations averaged for the historical reference
    pub lookback_observations: usize,
    /// Calendar days of history fetched before the evaluation date
    pub lookback_days: i64,
    /// Largest distance (days) between the current date and a matched forecast
    pub forecast_window_days: i64,
    /// Time allowed for one indicator
    pub per_call_timeout_secs: u64,
    /// Time allowed for a whole dispatch
    pub total_timeout_secs: u64,
    /// Thresholds of indicators without their own
    pub fallback_thresholds: SeverityThresholds,
    /// Watched indicators
    pub indicators: Vec<IndicatorSpec>,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            lookback_observations: 30,
            lookback_days: 60,
            forecast_window_days: 2,
            per_call_timeout_secs: 10,
            total_timeout_secs: 30,
            fallback_thresholds: SeverityThresholds::default(),
            indicators: IndicatorSpec::builtin(),
        }
    }
}

impl AnomalyConfig {
    /// Check value ranges and indicator definitions
    pub fn validate(&self) -> Result<()> {
        if self.lookback_observations == 0 {
            return Err(AnomalyError::Config(
                "lookback_observations must be positive".to_string(),
            ));
        }
        if self.lookback_days <= 0 || self.forecast_window_days < 0 {
            return Err(AnomalyError::Config(
                "lookback_days must be positive and forecast_window_days non-negative".to_string(),
            ));
        }
        if self.per_call_timeout_secs == 0 || self.total_timeout_secs == 0 {
            return Err(AnomalyError::Config("timeouts must be positive".to_string()));
        }
        self.fallback_thresholds.validate()?;

        let mut seen = std::collections::HashSet::new();
        for indicator in &self.indicators {
            if !seen.insert(indicator.id.as_str()) {
                return Err(AnomalyError::Config(format!(
                    "indicator {} is listed more than once",
                    indicator.id
                )));
            }
            if let Some(thresholds) = &indicator.thresholds {
                thresholds.validate()?;
            }
            if !(indicator.scale_factor.is_finite() && indicator.scale_factor > 0.0) {
                return Err(AnomalyError::Config(format!(
                    "indicator {} has a non-positive scale_factor",
                    indicator.id
                )));
            }
        }
        Ok(())
    }

    /// Per-indicator thresholds with the configured fallback
    pub fn threshold_table(&self) -> ThresholdTable {
        self.indicators
            .iter()
            .filter_map(|i| i.thresholds.map(|t| (i.id.as_str(), t)))
            .fold(ThresholdTable::new(self.fallback_thresholds), |table, (id, t)| {
                table.with(id, t)
            })
    }

    /// Per-indicator timeout
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_secs(self.per_call_timeout_secs)
    }

    /// Whole-dispatch timeout
    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }
}
