//! Persisted forecast rows and nearest-date matching

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One predicted value for one future date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Signal the forecast is for
    pub source: String,
    /// Version tag of the producing model
    pub model_version: String,
    /// Predicted date
    pub target_date: NaiveDate,
    /// When the run was produced
    pub generated_at: DateTime<Utc>,
    /// Point forecast
    pub point_estimate: f64,
    /// Lower prediction bound
    pub interval_lower: Option<f64>,
    /// Upper prediction bound
    pub interval_upper: Option<f64>,
    /// Days between the training cutoff and `target_date`
    pub horizon_days: u32,
    /// Holdout MAPE of the run (fraction), absent when not validated
    pub accuracy_mape: Option<f64>,
    /// Holdout RMSE of the run, absent when not validated
    pub accuracy_rmse: Option<f64>,
    /// `clamp(1 - accuracy_mape, 0, 1)`, absent when not validated
    pub confidence_score: Option<f64>,
}

impl ForecastPoint {
    /// Whether both bounds exist and enclose the point estimate
    pub fn bounds_ordered(&self) -> bool {
        match (self.interval_lower, self.interval_upper) {
            (Some(lower), Some(upper)) => lower <= self.point_estimate && self.point_estimate <= upper,
            _ => true,
        }
    }
}

/// All points one training run produced for one signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRun {
    /// Signal the run is for
    pub source: String,
    /// Version tag shared by every point
    pub model_version: String,
    /// Generation timestamp shared by every point
    pub generated_at: DateTime<Utc>,
    /// Points in ascending target date order
    pub points: Vec<ForecastPoint>,
}

impl ForecastRun {
    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the run has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point for a target date
    pub fn point_on(&self, date: NaiveDate) -> Option<&ForecastPoint> {
        self.points.iter().find(|p| p.target_date == date)
    }
}

/// Order candidates for a query date: closest target first, then the most
/// recently generated run, then the earlier target date.
pub fn compare_nearest(target: NaiveDate, a: &ForecastPoint, b: &ForecastPoint) -> Ordering {
    let distance = |p: &ForecastPoint| (p.target_date - target).num_days().abs();
    distance(a)
        .cmp(&distance(b))
        .then_with(|| b.generated_at.cmp(&a.generated_at))
        .then_with(|| a.target_date.cmp(&b.target_date))
}

/// The best candidate within `window_days` of `target`
pub fn nearest_forecast<'a, I>(
    candidates: I,
    target: NaiveDate,
    window_days: i64,
) -> Option<&'a ForecastPoint>
where
    I: IntoIterator<Item = &'a ForecastPoint>,
{
    candidates
        .into_iter()
        .filter(|p| (p.target_date - target).num_days().abs() <= window_days)
        .min_by(|a, b| compare_nearest(target, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn point(target: NaiveDate, generated_day: u32) -> ForecastPoint {
        ForecastPoint {
            source: "DEMAND".to_string(),
            model_version: "ENSEMBLE_v1".to_string(),
            target_date: target,
            generated_at: Utc.with_ymd_and_hms(2024, 5, generated_day, 6, 0, 0).unwrap(),
            point_estimate: 200.0,
            interval_lower: Some(180.0),
            interval_upper: Some(220.0),
            horizon_days: 1,
            accuracy_mape: Some(0.04),
            accuracy_rmse: Some(8.0),
            confidence_score: Some(0.96),
        }
    }

    #[test]
    fn test_nearest_never_picks_farther_date() {
        let t: NaiveDate = "2024-06-10".parse().unwrap();
        let rows = vec![
            point(t - Duration::days(2), 1),
            point(t, 1),
            point(t + Duration::days(2), 1),
        ];
        let found = nearest_forecast(&rows, t + Duration::days(1), 2).unwrap();
        assert_ne!(found.target_date, t - Duration::days(2));
        // Equal distance and generation: earlier target wins
        assert_eq!(found.target_date, t);
    }

    #[test]
    fn test_tie_prefers_most_recent_run() {
        let t: NaiveDate = "2024-06-10".parse().unwrap();
        let rows = vec![point(t, 1), point(t + Duration::days(2), 3)];
        let found = nearest_forecast(&rows, t + Duration::days(1), 2).unwrap();
        assert_eq!(found.target_date, t + Duration::days(2));
    }

    #[test]
    fn test_outside_window_is_a_miss() {
        let t: NaiveDate = "2024-06-10".parse().unwrap();
        let rows = vec![point(t + Duration::days(5), 1)];
        assert!(nearest_forecast(&rows, t, 2).is_none());
    }
}
