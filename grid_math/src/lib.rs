//! # Grid Math
//!
//! Numerical kernels shared by the grid forecasting crates.
//! This crate provides least-squares solvers, lag polynomials and
//! differencing, descriptive statistics, Fourier features and the
//! stationarity diagnostics used to pick differencing orders.

use thiserror::Error;

pub mod fourier;
pub mod linalg;
pub mod polynomial;
pub mod stationarity;
pub mod stats;

/// Errors that can occur in numerical calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Singular matrix: {0}")]
    SingularMatrix(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;
