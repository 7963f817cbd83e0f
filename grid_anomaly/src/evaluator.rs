//! Anomaly evaluator
//!
//! Compares an indicator's latest observation with the average of the
//! observations before it and, when the forecast source is trusted, with
//! the forecast nearest to the observation date. The larger deviation
//! decides the severity.

use crate::config::{AnomalyConfig, IndicatorSpec};
use crate::error::Result;
use crate::policy::{ConfidencePolicy, ConfidenceTier, PolicyLookup};
use crate::severity::{Deviation, Severity, ThresholdTable};
use chrono::{Duration, NaiveDate};
use grid_forecast::data::HistorySource;
use grid_forecast::forecast::ForecastPoint;
use grid_forecast::store::ForecastStore;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::warn;

/// Whether an indicator could be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    /// Deviations and severity were computed
    Evaluated,
    /// No current value or no history to average
    InsufficientData,
    /// The evaluation failed or timed out
    Unavailable,
}

/// Evaluation of one indicator on one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyAssessment {
    /// Indicator identifier
    pub indicator: String,
    /// Human-readable name
    pub display_name: String,
    /// Unit of the values
    pub unit: String,
    /// Evaluation status
    pub status: AssessmentStatus,
    /// Latest observation on or before the evaluation date
    pub current_value: Option<f64>,
    /// Date of the latest observation
    pub current_date: Option<NaiveDate>,
    /// Mean of the observations preceding the current one
    pub historical_avg_30d: Option<f64>,
    /// Number of observations in the average
    pub history_observations: usize,
    /// Matched forecast value
    pub forecast_value: Option<f64>,
    /// Target date of the matched forecast
    pub forecast_date: Option<NaiveDate>,
    /// Confidence score of the matched forecast
    pub forecast_confidence: Option<f64>,
    /// Deviation from the historical average
    pub deviation_vs_historical_pct: Option<Deviation>,
    /// Deviation from the forecast, when the forecast counts
    pub deviation_vs_forecast_pct: Option<Deviation>,
    /// A forecast was found but its tier kept it out of the severity
    pub forecast_excluded: bool,
    /// Largest counted deviation
    pub max_deviation_pct: Option<Deviation>,
    /// Resulting severity
    pub severity: Severity,
    /// Tier of the forecast source
    pub confidence_tier: ConfidenceTier,
    /// Disclaimer of the forecast source
    pub disclaimer: String,
    /// One-line description for operators
    pub narrative: String,
    /// Problems met during evaluation
    pub note: Option<String>,
}

impl AnomalyAssessment {
    fn empty(indicator: &IndicatorSpec, policy: ConfidencePolicy, status: AssessmentStatus) -> Self {
        Self {
            indicator: indicator.id.clone(),
            display_name: indicator.display_name.clone(),
            unit: indicator.unit.clone(),
            status,
            current_value: None,
            current_date: None,
            historical_avg_30d: None,
            history_observations: 0,
            forecast_value: None,
            forecast_date: None,
            forecast_confidence: None,
            deviation_vs_historical_pct: None,
            deviation_vs_forecast_pct: None,
            forecast_excluded: false,
            max_deviation_pct: None,
            severity: Severity::Normal,
            confidence_tier: policy.tier,
            disclaimer: policy.tier.disclaimer().to_string(),
            narrative: String::new(),
            note: None,
        }
    }

    /// Whether the assessment is critical or a warning
    pub fn is_flagged(&self) -> bool {
        self.severity > Severity::Normal
    }
}

/// Evaluates indicators against history and forecasts
pub struct AnomalyEvaluator {
    history: Arc<dyn HistorySource>,
    forecasts: Arc<dyn ForecastStore>,
    policies: Arc<dyn PolicyLookup>,
    thresholds: ThresholdTable,
    config: AnomalyConfig,
}

impl std::fmt::Debug for AnomalyEvaluator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnomalyEvaluator")
            .field("thresholds", &self.thresholds)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AnomalyEvaluator {
    /// Create an evaluator with validated settings
    pub fn new(
        history: Arc<dyn HistorySource>,
        forecasts: Arc<dyn ForecastStore>,
        policies: Arc<dyn PolicyLookup>,
        config: AnomalyConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            history,
            forecasts,
            policies,
            thresholds: config.threshold_table(),
            config,
        })
    }

    /// Evaluator settings
    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    /// Configured indicators
    pub fn indicators(&self) -> &[IndicatorSpec] {
        &self.config.indicators
    }

    /// An `Unavailable` assessment carrying the indicator's policy
    pub fn unavailable(&self, indicator: &IndicatorSpec, note: impl Into<String>) -> AnomalyAssessment {
        let policy = self.policies.read_policy(indicator.forecast_source());
        let mut assessment =
            AnomalyAssessment::empty(indicator, policy, AssessmentStatus::Unavailable);
        let note = note.into();
        assessment.narrative = format!("{}: not available ({})", indicator.display_name, note);
        assessment.note = Some(note);
        assessment
    }

    /// Evaluate a configured indicator by id
    pub fn evaluate_id(&self, indicator_id: &str, as_of: NaiveDate) -> AnomalyAssessment {
        match self.indicators().iter().find(|i| i.id == indicator_id) {
            Some(indicator) => self.evaluate(indicator, as_of),
            None => self.unavailable(
                &IndicatorSpec::new(indicator_id, indicator_id, ""),
                "indicator is not configured",
            ),
        }
    }

    /// Evaluate one indicator as of a date
    pub fn evaluate(&self, indicator: &IndicatorSpec, as_of: NaiveDate) -> AnomalyAssessment {
        let source = indicator.forecast_source();
        let policy = self.policies.read_policy(source);

        let since = as_of - Duration::days(self.config.lookback_days);
        let history = match self.history.fetch_history(&indicator.id, since) {
            Ok(history) => history.until(as_of),
            Err(e) => {
                warn!(indicator = %indicator.id, error = %e, "history read failed");
                return self.unavailable(indicator, format!("history read failed: {}", e));
            }
        };

        let mut assessment =
            AnomalyAssessment::empty(indicator, policy, AssessmentStatus::InsufficientData);

        let scale = indicator.scale_factor;
        let Some((current_date, raw_current)) = history.last() else {
            assessment.narrative = format!(
                "{}: no observation on or before {}",
                indicator.display_name, as_of
            );
            return assessment;
        };
        let current = raw_current * scale;
        assessment.current_value = Some(current);
        assessment.current_date = Some(current_date);

        let previous = &history.values()[..history.len() - 1];
        let window = &previous[previous.len().saturating_sub(self.config.lookback_observations)..];
        if window.is_empty() {
            assessment.narrative = format!(
                "{}: {:.1} {}, no earlier observations to compare with",
                indicator.display_name, current, indicator.unit
            );
            return assessment;
        }
        let average = window.iter().sum::<f64>() * scale / window.len() as f64;
        assessment.status = AssessmentStatus::Evaluated;
        assessment.historical_avg_30d = Some(average);
        assessment.history_observations = window.len();

        let historical = Deviation::between(current, average);
        assessment.deviation_vs_historical_pct = Some(historical);
        let mut max_deviation = historical;

        let forecast = match self.forecasts.read_forecast_near(
            source,
            current_date,
            self.config.forecast_window_days,
        ) {
            Ok(found) => found,
            Err(e) => {
                warn!(indicator = %indicator.id, error = %e, "forecast lookup failed");
                assessment.note = Some(format!("forecast lookup failed: {}", e));
                None
            }
        };

        if let Some(point) = &forecast {
            assessment.forecast_value = Some(point.point_estimate);
            assessment.forecast_date = Some(point.target_date);
            assessment.forecast_confidence = point.confidence_score;

            if policy.tier.permits_severity() {
                let vs_forecast = Deviation::between(current, point.point_estimate);
                assessment.deviation_vs_forecast_pct = Some(vs_forecast);
                max_deviation = max_deviation.max(vs_forecast);
            } else {
                assessment.forecast_excluded = true;
                warn!(
                    indicator = %indicator.id,
                    tier = %policy.tier,
                    source,
                    "forecast excluded from severity"
                );
            }
        }

        assessment.max_deviation_pct = Some(max_deviation);
        assessment.severity = self
            .thresholds
            .for_indicator(&indicator.id)
            .classify(max_deviation);
        assessment.narrative = narrative(indicator, &assessment, average, forecast.as_ref());
        assessment
    }
}

fn narrative(
    indicator: &IndicatorSpec,
    assessment: &AnomalyAssessment,
    average: f64,
    forecast: Option<&ForecastPoint>,
) -> String {
    let current = assessment.current_value.unwrap_or_default();
    let direction = if current > average {
        "above"
    } else if current < average {
        "below"
    } else {
        "in line with"
    };
    let deviation = assessment
        .max_deviation_pct
        .unwrap_or(Deviation::Percent(0.0));

    let mut text = format!(
        "{}: {:.1} {} ({} the {}-observation average of {:.1} {}, deviation {})",
        indicator.display_name,
        current,
        indicator.unit,
        direction,
        assessment.history_observations,
        average,
        indicator.unit,
        deviation
    );

    let confidence = match assessment.forecast_confidence {
        Some(c) => format!("confidence {:.0}%", c * 100.0),
        None => "confidence not validated".to_string(),
    };

    // Writing to a String cannot fail
    if let Some(point) = forecast {
        if assessment.forecast_excluded {
            let _ = write!(
                text,
                ". Forecast available ({:.1} {}, {}) but not used: {} source, severity based on the historical average only.",
                point.point_estimate, indicator.unit, confidence, assessment.confidence_tier
            );
        } else {
            let _ = write!(
                text,
                ". Forecast for {}: {:.1} {} ({}).",
                point.target_date, point.point_estimate, indicator.unit, confidence
            );
            if assessment.confidence_tier == ConfidenceTier::Reliable {
                text.push_str(" Moderate-precision forecast included in the severity.");
            }
        }
    }
    text
}
