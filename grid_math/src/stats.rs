//! Descriptive statistics over plain `f64` slices

use crate::{MathError, Result};

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance
pub fn variance(values: &[f64]) -> Result<f64> {
    let m = mean(values)?;
    Ok(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> Result<f64> {
    Ok(variance(values)?.sqrt())
}

/// Median (average of the two middle values for even lengths)
pub fn median(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the median of an empty series".to_string(),
        ));
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Ok((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Ok(sorted[mid])
    }
}

/// Sample autocorrelation at `lag`
pub fn autocorrelation(values: &[f64], lag: usize) -> Result<f64> {
    if lag == 0 {
        return Ok(1.0);
    }
    if values.len() <= lag + 1 {
        return Err(MathError::InsufficientData(format!(
            "Need more than {} observations for lag {} autocorrelation",
            lag + 1,
            lag
        )));
    }

    let m = mean(values)?;
    let denominator: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denominator.abs() < 1e-12 {
        return Ok(0.0);
    }

    let numerator: f64 = values
        .iter()
        .skip(lag)
        .zip(values.iter())
        .map(|(a, b)| (a - m) * (b - m))
        .sum();

    Ok(numerator / denominator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_and_variance() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&data).unwrap(), 5.0);
        assert_relative_eq!(variance(&data).unwrap(), 4.0);
        assert_relative_eq!(std_dev(&data).unwrap(), 2.0);
    }

    #[test]
    fn test_median() {
        assert_relative_eq!(median(&[3.0, 1.0, 2.0]).unwrap(), 2.0);
        assert_relative_eq!(median(&[4.0, 1.0, 3.0, 2.0]).unwrap(), 2.5);
        assert!(median(&[]).is_err());
    }

    #[test]
    fn test_autocorrelation_of_alternating_series() {
        let data: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!(autocorrelation(&data, 1).unwrap() < -0.9);
        assert!(autocorrelation(&data, 2).unwrap() > 0.9);
    }

    #[test]
    fn test_constant_series_has_zero_autocorrelation() {
        assert_relative_eq!(autocorrelation(&[3.0; 10], 1).unwrap(), 0.0);
    }
}
