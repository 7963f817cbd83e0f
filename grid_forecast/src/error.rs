//! Error types for the grid_forecast crate

use grid_math::MathError;
use thiserror::Error;

/// Custom error types for the grid_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Not enough history to train or evaluate; the signal is skipped
    #[error("Insufficient data: {0}")]
    DataInsufficient(String),

    /// A model could not be fitted; callers may degrade to other models
    #[error("Model fit failed: {0}")]
    ModelFit(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error related to parameter validation
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error reading or writing persisted forecasts
    #[error("Store error: {0}")]
    Store(String),

    /// Error from numerical kernels
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ForecastError {
    /// Whether this error means "skip the signal" rather than "it broke"
    pub fn is_data_insufficient(&self) -> bool {
        matches!(self, ForecastError::DataInsufficient(_))
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;
