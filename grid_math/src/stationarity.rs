//! Stationarity diagnostics used to choose differencing orders

use crate::polynomial::difference;
use crate::stats::{mean, variance};
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// 5% critical value of the KPSS level-stationarity statistic
pub const KPSS_CRITICAL_5PCT: f64 = 0.463;

/// Seasonal strength above which one seasonal difference is taken
pub const SEASONAL_STRENGTH_THRESHOLD: f64 = 0.64;

/// Outcome of a KPSS level-stationarity test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KpssTest {
    /// Test statistic
    pub statistic: f64,
    /// Bandwidth used for the long-run variance
    pub lags: usize,
}

impl KpssTest {
    /// Whether the null of level stationarity is rejected at 5%
    pub fn rejects_stationarity(&self) -> bool {
        self.statistic > KPSS_CRITICAL_5PCT
    }
}

/// KPSS statistic for level stationarity with a Bartlett-weighted
/// long-run variance and bandwidth `⌊3√n / 13⌋`.
pub fn kpss_level(values: &[f64]) -> Result<KpssTest> {
    let n = values.len();
    if n < 8 {
        return Err(MathError::InsufficientData(format!(
            "KPSS needs at least 8 observations, got {}",
            n
        )));
    }

    let m = mean(values)?;
    let residuals: Vec<f64> = values.iter().map(|v| v - m).collect();
    let lags = ((3.0 * (n as f64).sqrt()) / 13.0).floor() as usize;

    let mut partial = 0.0;
    let mut eta = 0.0;
    for e in &residuals {
        partial += e;
        eta += partial * partial;
    }
    eta /= (n * n) as f64;

    let mut long_run = residuals.iter().map(|e| e * e).sum::<f64>() / n as f64;
    for lag in 1..=lags {
        let weight = 1.0 - lag as f64 / (lags as f64 + 1.0);
        let cov: f64 = residuals
            .iter()
            .skip(lag)
            .zip(residuals.iter())
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n as f64;
        long_run += 2.0 * weight * cov;
    }

    let statistic = if long_run <= 1e-12 { 0.0 } else { eta / long_run };

    Ok(KpssTest { statistic, lags })
}

/// Number of first differences (at most `max_d`) needed before the KPSS
/// test stops rejecting level stationarity.
pub fn ndiffs(values: &[f64], max_d: usize) -> Result<usize> {
    let mut series = values.to_vec();
    let mut d = 0;
    while d < max_d {
        if series.len() < 8 {
            break;
        }
        if !kpss_level(&series)?.rejects_stationarity() {
            break;
        }
        series = difference(&series, 1);
        d += 1;
    }
    Ok(d)
}

/// Strength of a seasonal pattern with the given period, in `[0, 1]`.
///
/// The series is detrended with a centred moving average of one period;
/// the strength is `1 - Var(remainder) / Var(seasonal + remainder)`.
pub fn seasonal_strength(values: &[f64], period: usize) -> Result<f64> {
    if period < 2 {
        return Err(MathError::InvalidInput(
            "Seasonal period must be at least 2".to_string(),
        ));
    }
    let n = values.len();
    if n < 2 * period + 1 {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations for period {}",
            2 * period + 1,
            period
        )));
    }

    let half = period / 2;
    let mut detrended: Vec<(usize, f64)> = Vec::with_capacity(n);
    for t in half..(n - half) {
        let trend = if period % 2 == 1 {
            values[t - half..=t + half].iter().sum::<f64>() / period as f64
        } else {
            // 2xP moving average for even periods
            let window = &values[t - half..=t + half];
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            (inner + 0.5 * (window[0] + window[window.len() - 1])) / period as f64
        };
        detrended.push((t, values[t] - trend));
    }

    let mut phase_sum = vec![0.0; period];
    let mut phase_count = vec![0usize; period];
    for (t, value) in &detrended {
        phase_sum[t % period] += value;
        phase_count[t % period] += 1;
    }
    let mut index: Vec<f64> = phase_sum
        .iter()
        .zip(phase_count.iter())
        .map(|(s, c)| if *c > 0 { s / *c as f64 } else { 0.0 })
        .collect();
    let centre = index.iter().sum::<f64>() / period as f64;
    for value in index.iter_mut() {
        *value -= centre;
    }

    let combined: Vec<f64> = detrended.iter().map(|(_, v)| *v).collect();
    let remainder: Vec<f64> = detrended
        .iter()
        .map(|(t, v)| v - index[t % period])
        .collect();

    let total = variance(&combined)?;
    if total <= 1e-12 {
        return Ok(0.0);
    }
    Ok((1.0 - variance(&remainder)? / total).clamp(0.0, 1.0))
}

/// Number of seasonal differences (0 or 1) suggested by the seasonal strength.
pub fn nsdiffs(values: &[f64], period: usize) -> Result<usize> {
    let strength = seasonal_strength(values, period)?;
    Ok(usize::from(strength > SEASONAL_STRENGTH_THRESHOLD))
}
