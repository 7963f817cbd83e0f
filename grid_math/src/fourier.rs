//! Fourier features for periodic components

use std::f64::consts::PI;

/// Average length of a year in days
pub const YEAR_DAYS: f64 = 365.25;

/// Length of a week in days
pub const WEEK_DAYS: f64 = 7.0;

/// Sine/cosine pairs `[sin(2πkt/P), cos(2πkt/P)]` for `k = 1..=order`.
pub fn fourier_terms(t: f64, period: f64, order: usize) -> Vec<f64> {
    let mut terms = Vec::with_capacity(order * 2);
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * t / period;
        terms.push(angle.sin());
        terms.push(angle.cos());
    }
    terms
}
