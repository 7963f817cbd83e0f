//! Accuracy-weighted combination of forecast models

use crate::config::DefaultWeights;
use crate::error::{ForecastError, Result};
use crate::metrics::HoldoutAccuracy;
use crate::models::{ForecastResult, TrainedForecastModel};
use serde::{Deserialize, Serialize};

/// Weights of the two committee members, summing to one
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    /// Weight of the trend + seasonality model
    pub primary: f64,
    /// Weight of the seasonal autoregression
    pub secondary: f64,
}

impl Weights {
    /// All weight on the primary model
    pub fn single() -> Self {
        Self {
            primary: 1.0,
            secondary: 0.0,
        }
    }

    /// Normalised configured defaults
    pub fn from_defaults(defaults: DefaultWeights) -> Self {
        let total = defaults.primary + defaults.secondary;
        if total <= 0.0 || !total.is_finite() {
            return Self::single();
        }
        Self {
            primary: defaults.primary / total,
            secondary: defaults.secondary / total,
        }
    }

    /// Inverse-error weights from the two holdout MAPEs
    pub fn from_holdout_errors(primary_mape: f64, secondary_mape: f64) -> Self {
        let weights = holdout_weights(&[primary_mape, secondary_mape]);
        Self {
            primary: weights[0],
            secondary: weights[1],
        }
    }

    /// Sum of both weights
    pub fn sum(&self) -> f64 {
        self.primary + self.secondary
    }

    /// Weighted combination of two equally long predictions
    pub fn combine(&self, primary: &[f64], secondary: &[f64]) -> Result<Vec<f64>> {
        if primary.len() != secondary.len() {
            return Err(ForecastError::ValidationError(format!(
                "Cannot combine predictions of length {} and {}",
                primary.len(),
                secondary.len()
            )));
        }
        Ok(primary
            .iter()
            .zip(secondary.iter())
            .map(|(a, b)| self.primary * a + self.secondary * b)
            .collect())
    }
}

/// Weights `w_i = 1 - mape_i / Σ mape`, renormalised to sum to one.
///
/// A single model gets weight 1; a zero (or non-finite) error total gives
/// equal weights.
pub fn holdout_weights(mapes: &[f64]) -> Vec<f64> {
    match mapes.len() {
        0 => Vec::new(),
        1 => vec![1.0],
        n => {
            let total: f64 = mapes.iter().sum();
            if total <= 0.0 || !total.is_finite() {
                return vec![1.0 / n as f64; n];
            }
            let raw: Vec<f64> = mapes.iter().map(|m| 1.0 - m / total).collect();
            let raw_total: f64 = raw.iter().sum();
            raw.iter().map(|w| w / raw_total).collect()
        }
    }
}

/// `clamp(1 - mape, 0, 1)`
pub fn confidence_score(mape: f64) -> f64 {
    (1.0 - mape).clamp(0.0, 1.0)
}

/// Outcome of the holdout validation step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validation {
    /// Models were scored on the withheld suffix
    Validated {
        /// Committee weights
        weights: Weights,
        /// Accuracy of the reported prediction
        ensemble: HoldoutAccuracy,
        /// Accuracy of the trend + seasonality model alone
        primary: HoldoutAccuracy,
        /// Accuracy of the seasonal autoregression, when it fitted
        secondary: Option<HoldoutAccuracy>,
    },
    /// Too little history to withhold a validation window
    Unvalidated {
        /// Weights applied instead
        default_weights: Weights,
        /// Why validation was skipped
        reason: String,
    },
}

impl Validation {
    /// Weights the committee should use
    pub fn weights(&self) -> Weights {
        match self {
            Validation::Validated { weights, .. } => *weights,
            Validation::Unvalidated {
                default_weights, ..
            } => *default_weights,
        }
    }

    /// Reported holdout accuracy, if validated
    pub fn accuracy(&self) -> Option<HoldoutAccuracy> {
        match self {
            Validation::Validated { ensemble, .. } => Some(*ensemble),
            Validation::Unvalidated { .. } => None,
        }
    }

    /// Confidence derived from the reported MAPE, if validated
    pub fn confidence_score(&self) -> Option<f64> {
        self.accuracy().map(|a| confidence_score(a.mape))
    }

    /// Whether a holdout was scored
    pub fn is_validated(&self) -> bool {
        matches!(self, Validation::Validated { .. })
    }
}

/// Production models and how they combine
#[derive(Debug)]
pub enum Committee {
    /// Only the trend + seasonality model
    Single {
        /// The fitted model
        primary: Box<dyn TrainedForecastModel>,
    },
    /// Both models, combined with weights
    Pair {
        /// Trend + seasonality model
        primary: Box<dyn TrainedForecastModel>,
        /// Seasonal autoregression
        secondary: Box<dyn TrainedForecastModel>,
        /// Combination weights
        weights: Weights,
    },
}

impl Committee {
    /// Effective weights
    pub fn weights(&self) -> Weights {
        match self {
            Committee::Single { .. } => Weights::single(),
            Committee::Pair { weights, .. } => *weights,
        }
    }

    /// Names of the member models
    pub fn member_names(&self) -> Vec<&str> {
        match self {
            Committee::Single { primary } => vec![primary.name()],
            Committee::Pair {
                primary, secondary, ..
            } => vec![primary.name(), secondary.name()],
        }
    }

    /// Combined point forecast and bounds.
    ///
    /// A member without intervals contributes `value × (1 ± spread)`.
    pub fn forecast(&self, horizon: usize, spread: f64) -> Result<ForecastResult> {
        match self {
            Committee::Single { primary } => {
                let result = primary.forecast(horizon)?;
                let intervals = result.intervals_or_spread(spread);
                ForecastResult::new_with_intervals(result.values().to_vec(), horizon, intervals)
            }
            Committee::Pair {
                primary,
                secondary,
                weights,
            } => {
                let a = primary.forecast(horizon)?;
                let b = secondary.forecast(horizon)?;
                let a_bands = a.intervals_or_spread(spread);
                let b_bands = b.intervals_or_spread(spread);

                let values = weights.combine(a.values(), b.values())?;
                let lower = weights.combine(
                    &a_bands.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
                    &b_bands.iter().map(|(l, _)| *l).collect::<Vec<_>>(),
                )?;
                let upper = weights.combine(
                    &a_bands.iter().map(|(_, u)| *u).collect::<Vec<_>>(),
                    &b_bands.iter().map(|(_, u)| *u).collect::<Vec<_>>(),
                )?;

                ForecastResult::new_with_intervals(
                    values,
                    horizon,
                    lower.into_iter().zip(upper).collect(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_holdout_weights_favour_lower_error() {
        let weights = Weights::from_holdout_errors(0.05, 0.15);
        assert_relative_eq!(weights.primary, 0.75, epsilon = 1e-12);
        assert_relative_eq!(weights.secondary, 0.25, epsilon = 1e-12);
        assert_relative_eq!(weights.sum(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_holdout_weights_edge_cases() {
        assert_eq!(holdout_weights(&[0.3]), vec![1.0]);
        assert_eq!(holdout_weights(&[0.0, 0.0]), vec![0.5, 0.5]);
        assert!(holdout_weights(&[]).is_empty());

        let three = holdout_weights(&[0.1, 0.2, 0.3]);
        assert_relative_eq!(three.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(three[0] > three[1] && three[1] > three[2]);
    }

    #[test]
    fn test_default_weights_normalised() {
        let weights = Weights::from_defaults(DefaultWeights {
            primary: 3.0,
            secondary: 1.0,
        });
        assert_relative_eq!(weights.primary, 0.75);
        assert_relative_eq!(weights.secondary, 0.25);
    }

    #[test]
    fn test_confidence_score_clamped() {
        assert_relative_eq!(confidence_score(0.08), 0.92, epsilon = 1e-12);
        assert_eq!(confidence_score(1.7), 0.0);
        assert_eq!(confidence_score(-0.1), 1.0);
    }

    #[test]
    fn test_unvalidated_has_no_confidence() {
        let validation = Validation::Unvalidated {
            default_weights: Weights::single(),
            reason: "short history".to_string(),
        };
        assert_eq!(validation.confidence_score(), None);
        assert_eq!(validation.accuracy(), None);
        assert!(!validation.is_validated());
    }
}
