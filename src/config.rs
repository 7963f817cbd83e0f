//! Combined configuration file
//!
//! One TOML document drives both the trainer and the detector:
//!
//! ```toml
//! policy_file = "policies.toml"
//!
//! [trainer]
//! horizon_days = 90
//! history_start = "2020-01-01"
//!
//! [[signals]]
//! id = "DEMAND"
//! unit = "GWh"
//!
//! [anomaly]
//! lookback_observations = 30
//! ```

use grid_anomaly::{AnomalyConfig, ConfidencePolicyRegistry};
use grid_forecast::config::{SignalConfig, TrainerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The document is not valid TOML for this schema
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Values are out of range or inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Trainer, signal, detector and policy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridcastConfig {
    /// Ensemble trainer settings
    pub trainer: TrainerConfig,
    /// Signals to train
    pub signals: Vec<SignalConfig>,
    /// Anomaly detector settings
    pub anomaly: AnomalyConfig,
    /// Curated policy table; the built-in table is used when absent
    pub policy_file: Option<PathBuf>,
}

impl Default for GridcastConfig {
    fn default() -> Self {
        Self {
            trainer: TrainerConfig::default(),
            signals: SignalConfig::builtin(),
            anomaly: AnomalyConfig::default(),
            policy_file: None,
        }
    }
}

impl GridcastConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: GridcastConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;

        // Policy paths are relative to the configuration file
        if let (Some(policy), Some(dir)) = (config.policy_file.as_mut(), path.parent()) {
            if policy.is_relative() {
                *policy = dir.join(&*policy);
            }
        }
        Ok(config)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.trainer
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.anomaly
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut seen = std::collections::HashSet::new();
        for signal in &self.signals {
            if !seen.insert(signal.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "signal {} is listed more than once",
                    signal.id
                )));
            }
        }

        // Indicators must compare history in the unit their forecasts were trained in
        for indicator in &self.anomaly.indicators {
            if let Some(signal) = self.signal(indicator.forecast_source()) {
                if (signal.scale_factor - indicator.scale_factor).abs() > f64::EPSILON {
                    return Err(ConfigError::Invalid(format!(
                        "indicator {} uses scale_factor {} but signal {} is trained with {}",
                        indicator.id,
                        indicator.scale_factor,
                        signal.id,
                        signal.scale_factor
                    )));
                }
            }
        }
        Ok(())
    }

    /// The configured policy table, or the built-in one
    pub fn policy_registry(&self) -> grid_anomaly::Result<ConfidencePolicyRegistry> {
        match &self.policy_file {
            Some(path) => ConfidencePolicyRegistry::from_file(path),
            None => Ok(ConfidencePolicyRegistry::builtin()),
        }
    }

    /// Profile of a configured signal
    pub fn signal(&self, id: &str) -> Option<&SignalConfig> {
        self.signals.iter().find(|s| s.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = GridcastConfig::from_toml_str("").unwrap();
        assert_eq!(config, GridcastConfig::default());
        assert!(config.signal("SPOT_PRICE").is_some());
    }

    #[test]
    fn test_invalid_sections_rejected() {
        let err = GridcastConfig::from_toml_str("[anomaly]\nlookback_observations = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = GridcastConfig::from_toml_str("[trainer]\nhorizon_days = \"soon\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
