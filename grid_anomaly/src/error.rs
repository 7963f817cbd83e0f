//! Error types for the grid_anomaly crate

use grid_forecast::ForecastError;
use thiserror::Error;

/// Errors raised while building the detector
///
/// Evaluation itself never fails: problems become an assessment status.
#[derive(Debug, Error)]
pub enum AnomalyError {
    /// Invalid thresholds, windows or indicator definitions
    #[error("Configuration error: {0}")]
    Config(String),

    /// A policy table could not be read or is inconsistent
    #[error("Policy error: {0}")]
    Policy(String),

    /// Error from history sources or forecast stores
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from TOML parsing
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Error from JSON serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, AnomalyError>;
