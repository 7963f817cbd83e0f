//! Lag polynomials and differencing
//!
//! A lag polynomial is stored as its coefficients `c_0, c_1, ..., c_n`,
//! meaning `c_0 + c_1 B + ... + c_n B^n` where `B` is the backshift operator.

use crate::{MathError, Result};

/// Apply `(1 - B^lag)` to a series; the result is `lag` values shorter.
pub fn difference(values: &[f64], lag: usize) -> Vec<f64> {
    if lag == 0 {
        return values.to_vec();
    }
    values
        .iter()
        .skip(lag)
        .zip(values.iter())
        .map(|(current, previous)| current - previous)
        .collect()
}

/// Product of two lag polynomials
pub fn multiply(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// `(1 - B)^d (1 - B^period)^seasonal_d`
pub fn differencing_operator(d: usize, seasonal_d: usize, period: usize) -> Vec<f64> {
    let mut poly = vec![1.0];
    for _ in 0..d {
        poly = multiply(&poly, &[1.0, -1.0]);
    }
    if period > 0 {
        let mut seasonal = vec![0.0; period + 1];
        seasonal[0] = 1.0;
        seasonal[period] = -1.0;
        for _ in 0..seasonal_d {
            poly = multiply(&poly, &seasonal);
        }
    }
    poly
}

/// Autoregressive polynomial `1 - Σ φ_l B^l` for the given lags.
pub fn ar_operator(lags: &[usize], coefficients: &[f64]) -> Result<Vec<f64>> {
    if lags.len() != coefficients.len() {
        return Err(MathError::InvalidInput(format!(
            "{} lags but {} coefficients",
            lags.len(),
            coefficients.len()
        )));
    }
    let order = lags.iter().copied().max().unwrap_or(0);
    let mut poly = vec![0.0; order + 1];
    poly[0] = 1.0;
    for (&lag, &phi) in lags.iter().zip(coefficients.iter()) {
        if lag == 0 {
            return Err(MathError::InvalidInput("lag 0 is not an AR term".to_string()));
        }
        poly[lag] -= phi;
    }
    Ok(poly)
}

/// Moving-average weights `ψ_0..ψ_{horizon-1}` of a process whose full
/// autoregressive operator is `operator` (with `operator[0] == 1`).
///
/// The h-step forecast error variance is `σ² Σ_{j<h} ψ_j²`.
pub fn psi_weights(operator: &[f64], horizon: usize) -> Vec<f64> {
    let mut psi = Vec::with_capacity(horizon);
    for j in 0..horizon {
        if j == 0 {
            psi.push(1.0);
            continue;
        }
        let mut value = 0.0;
        for i in 1..operator.len().min(j + 1) {
            value -= operator[i] * psi[j - i];
        }
        psi.push(value);
    }
    psi
}
