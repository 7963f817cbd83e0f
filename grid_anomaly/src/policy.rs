//! Confidence policy registry
//!
//! Every forecast source is assigned a tier from offline validation
//! campaigns. The tier decides whether the source's forecasts may influence
//! anomaly severity and which disclaimer accompanies them. Sources missing
//! from the table fall back to the `UNKNOWN` policy, so lookups never fail.

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Trust level of a forecast source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceTier {
    /// Holdout MAPE within a few percent
    VeryReliable,
    /// Moderate precision, directional reference
    Reliable,
    /// High uncertainty
    Acceptable,
    /// No holdout validation
    Experimental,
    /// Source not in the policy table
    Unknown,
}

impl ConfidenceTier {
    /// Whether forecasts of this tier may contribute to severity
    pub fn permits_severity(self) -> bool {
        matches!(self, ConfidenceTier::VeryReliable | ConfidenceTier::Reliable)
    }

    /// Canonical identifier
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceTier::VeryReliable => "VERY_RELIABLE",
            ConfidenceTier::Reliable => "RELIABLE",
            ConfidenceTier::Acceptable => "ACCEPTABLE",
            ConfidenceTier::Experimental => "EXPERIMENTAL",
            ConfidenceTier::Unknown => "UNKNOWN",
        }
    }

    /// Disclaimer shown next to forecasts of this tier
    pub fn disclaimer(self) -> &'static str {
        match self {
            ConfidenceTier::VeryReliable => "",
            ConfidenceTier::Reliable => {
                "Moderate-precision forecast. Use it as a directional reference."
            }
            ConfidenceTier::Acceptable => {
                "High uncertainty. Treat the prediction interval as the main guide."
            }
            ConfidenceTier::Experimental => {
                "Experimental forecast: little history and no holdout validation. \
                 Do not use it for critical decisions."
            }
            ConfidenceTier::Unknown => "Source not recognised by the confidence policy.",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Policy of one forecast source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidencePolicy {
    /// Trust level
    pub tier: ConfidenceTier,
    /// Highest holdout MAPE observed when the tier was assigned
    pub mape_ceiling: Option<f64>,
    /// Whether prediction intervals are trustworthy
    pub use_intervals: bool,
    /// Whether a disclaimer must accompany the forecast
    pub requires_disclaimer: bool,
}

impl ConfidencePolicy {
    /// Policy of sources missing from the table
    pub const UNKNOWN: ConfidencePolicy = ConfidencePolicy {
        tier: ConfidenceTier::Unknown,
        mape_ceiling: None,
        use_intervals: false,
        requires_disclaimer: true,
    };

    fn new(tier: ConfidenceTier, mape_ceiling: Option<f64>) -> Self {
        let trusted = tier.permits_severity() || tier == ConfidenceTier::Acceptable;
        Self {
            tier,
            mape_ceiling,
            use_intervals: trusted,
            requires_disclaimer: tier != ConfidenceTier::VeryReliable,
        }
    }

    /// Whether presentation layers should draw the prediction interval
    pub fn shows_intervals(&self) -> bool {
        self.use_intervals
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

/// Read access to confidence policies
pub trait PolicyLookup: Send + Sync {
    /// Policy of `source`; unknown sources get [`ConfidencePolicy::UNKNOWN`]
    fn read_policy(&self, source: &str) -> ConfidencePolicy;

    /// Disclaimer text of `source`'s tier
    fn disclaimer_text(&self, source: &str) -> &'static str {
        self.read_policy(source).tier.disclaimer()
    }
}

/// One row of a policy file
#[derive(Debug, Clone, Deserialize)]
struct PolicyEntry {
    source: String,
    tier: ConfidenceTier,
    #[serde(default)]
    mape_ceiling: Option<f64>,
    #[serde(default)]
    use_intervals: Option<bool>,
    #[serde(default)]
    requires_disclaimer: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PolicyFile {
    #[serde(default)]
    policy: Vec<PolicyEntry>,
}

/// Immutable table of source policies
#[derive(Debug, Clone, Default)]
pub struct ConfidencePolicyRegistry {
    policies: HashMap<String, ConfidencePolicy>,
}

impl ConfidencePolicyRegistry {
    /// Table curated from the latest validation campaign
    pub fn builtin() -> Self {
        use ConfidenceTier::*;
        let table = [
            ("GENERATION_TOTAL", VeryReliable, Some(0.05)),
            ("DEMAND", VeryReliable, Some(0.05)),
            ("SCARCITY_PRICE", VeryReliable, Some(0.02)),
            ("RESERVOIR_ENERGY", VeryReliable, Some(0.01)),
            ("RESERVOIR_PCT", VeryReliable, Some(0.05)),
            ("LOSSES", VeryReliable, Some(0.15)),
            ("HYDRO", VeryReliable, Some(0.05)),
            ("BIOMASS", VeryReliable, Some(0.10)),
            ("HYDRO_INFLOWS", Reliable, Some(0.25)),
            ("THERMAL", Reliable, Some(0.20)),
            ("SOLAR", Reliable, Some(0.25)),
            ("WIND", Acceptable, Some(0.30)),
            ("SPOT_PRICE", Experimental, None),
        ];

        Self {
            policies: table
                .iter()
                .map(|(source, tier, ceiling)| {
                    (source.to_string(), ConfidencePolicy::new(*tier, *ceiling))
                })
                .collect(),
        }
    }

    /// Build from explicit entries, rejecting duplicates
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, ConfidencePolicy)>,
    {
        let mut policies = HashMap::new();
        for (source, policy) in entries {
            if policy.tier == ConfidenceTier::Unknown {
                return Err(AnomalyError::Policy(format!(
                    "{}: UNKNOWN is reserved for unregistered sources",
                    source
                )));
            }
            if policy.mape_ceiling.is_some_and(|m| !(0.0..=1.0).contains(&m)) {
                return Err(AnomalyError::Policy(format!(
                    "{}: mape_ceiling must be a fraction between 0 and 1",
                    source
                )));
            }
            if policies.insert(source.clone(), policy).is_some() {
                return Err(AnomalyError::Policy(format!(
                    "{} is listed more than once",
                    source
                )));
            }
        }
        Ok(Self { policies })
    }

    /// Parse a `[[policy]]` table
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: PolicyFile = toml::from_str(text)?;
        Self::from_entries(file.policy.into_iter().map(|entry| {
            let defaults = ConfidencePolicy::new(entry.tier, entry.mape_ceiling);
            (
                entry.source,
                ConfidencePolicy {
                    use_intervals: entry.use_intervals.unwrap_or(defaults.use_intervals),
                    requires_disclaimer: entry
                        .requires_disclaimer
                        .unwrap_or(defaults.requires_disclaimer),
                    ..defaults
                },
            )
        }))
    }

    /// Load a `[[policy]]` table from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Policy of `source`, or the `UNKNOWN` default
    pub fn get_policy(&self, source: &str) -> ConfidencePolicy {
        self.policies
            .get(source)
            .copied()
            .unwrap_or(ConfidencePolicy::UNKNOWN)
    }

    /// Disclaimer of `source`'s tier; empty for `VERY_RELIABLE`
    pub fn get_disclaimer_text(&self, source: &str) -> &'static str {
        self.get_policy(source).tier.disclaimer()
    }

    /// Registered sources, sorted
    pub fn sources(&self) -> Vec<&str> {
        let mut sources: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        sources.sort_unstable();
        sources
    }

    /// Number of registered sources
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    /// Whether no source is registered
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl PolicyLookup for ConfidencePolicyRegistry {
    fn read_policy(&self, source: &str) -> ConfidencePolicy {
        self.get_policy(source)
    }
}
