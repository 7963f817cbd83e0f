//! Deviations and severity classification

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity of an indicator's deviation, ordered `Normal < Warning < Critical`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Within the expected range
    Normal,
    /// Above the warning threshold
    Warning,
    /// Above the critical threshold
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Normal => "normal",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        })
    }
}

/// Relative deviation of an observation from a reference value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deviation {
    /// `|observed - reference| / |reference| × 100`
    Percent(f64),
    /// The reference is zero and the observation is not
    Unbounded,
}

impl Deviation {
    /// Deviation of `observed` from `reference`; zero when both are zero
    pub fn between(observed: f64, reference: f64) -> Self {
        if reference == 0.0 {
            if observed == 0.0 {
                Deviation::Percent(0.0)
            } else {
                Deviation::Unbounded
            }
        } else {
            Deviation::Percent((observed - reference).abs() * 100.0 / reference.abs())
        }
    }

    /// The percentage, if bounded
    pub fn percent(self) -> Option<f64> {
        match self {
            Deviation::Percent(p) => Some(p),
            Deviation::Unbounded => None,
        }
    }

    /// The larger of two deviations; `Unbounded` dominates
    pub fn max(self, other: Deviation) -> Deviation {
        match (self, other) {
            (Deviation::Percent(a), Deviation::Percent(b)) => Deviation::Percent(a.max(b)),
            _ => Deviation::Unbounded,
        }
    }
}

impl fmt::Display for Deviation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deviation::Percent(p) => write!(f, "{:.0}%", p),
            Deviation::Unbounded => f.write_str("undefined (zero reference)"),
        }
    }
}

/// Warning and critical thresholds in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    /// Deviations above this are warnings
    pub warning: f64,
    /// Deviations above this are critical
    pub critical: f64,
}

impl SeverityThresholds {
    /// Create thresholds, requiring `0 <= warning <= critical`
    pub fn new(warning: f64, critical: f64) -> Result<Self> {
        let thresholds = Self { warning, critical };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.warning >= 0.0 && self.warning <= self.critical && self.critical.is_finite()) {
            return Err(AnomalyError::Config(format!(
                "thresholds must satisfy 0 <= warning ({}) <= critical ({})",
                self.warning, self.critical
            )));
        }
        Ok(())
    }

    /// Strictly greater than `critical` is critical, than `warning` a warning
    pub fn classify(&self, deviation: Deviation) -> Severity {
        match deviation {
            Deviation::Unbounded => Severity::Critical,
            Deviation::Percent(p) if p > self.critical => Severity::Critical,
            Deviation::Percent(p) if p > self.warning => Severity::Warning,
            Deviation::Percent(_) => Severity::Normal,
        }
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            warning: 15.0,
            critical: 30.0,
        }
    }
}

/// Thresholds per indicator with a fallback
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable {
    by_indicator: HashMap<String, SeverityThresholds>,
    fallback: SeverityThresholds,
}

impl ThresholdTable {
    /// Empty table with the given fallback
    pub fn new(fallback: SeverityThresholds) -> Self {
        Self {
            by_indicator: HashMap::new(),
            fallback,
        }
    }

    /// Set an indicator's thresholds
    pub fn with(mut self, indicator: &str, thresholds: SeverityThresholds) -> Self {
        self.by_indicator.insert(indicator.to_string(), thresholds);
        self
    }

    /// Thresholds calibrated on a year of daily deviations
    pub fn builtin() -> Self {
        let stable = SeverityThresholds {
            warning: 10.0,
            critical: 25.0,
        };
        Self::new(SeverityThresholds::default())
            .with("GENERATION_TOTAL", stable)
            .with("RESERVOIR_PCT", stable)
            .with(
                "SPOT_PRICE",
                SeverityThresholds {
                    warning: 20.0,
                    critical: 40.0,
                },
            )
    }

    /// Thresholds of an indicator, or the fallback
    pub fn for_indicator(&self, indicator: &str) -> SeverityThresholds {
        self.by_indicator
            .get(indicator)
            .copied()
            .unwrap_or(self.fallback)
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self::builtin()
    }
}
