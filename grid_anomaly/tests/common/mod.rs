#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use grid_anomaly::{AnomalyConfig, AnomalyEvaluator, ConfidencePolicyRegistry};
use grid_forecast::data::{HistorySource, InMemoryHistory};
use grid_forecast::error::{ForecastError, Result as ForecastResult};
use grid_forecast::forecast::{ForecastPoint, ForecastRun};
use grid_forecast::store::{ForecastStore, InMemoryForecastStore};
use grid_forecast::TimeSeriesData;
use std::sync::Arc;

pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

/// Daily series ending on `as_of()`
pub fn series(values: &[f64]) -> TimeSeriesData {
    let n = values.len() as i64;
    let dates = (0..n).map(|i| as_of() - Duration::days(n - 1 - i)).collect();
    TimeSeriesData::new(dates, values.to_vec()).unwrap()
}

/// Thirty observations at `average` followed by `current`
pub fn steady_then(average: f64, current: f64) -> TimeSeriesData {
    let mut values = vec![average; 30];
    values.push(current);
    series(&values)
}

pub fn forecast_run(source: &str, value: f64, confidence: Option<f64>) -> ForecastRun {
    let generated_at = Utc.with_ymd_and_hms(2025, 2, 20, 6, 0, 0).unwrap();
    ForecastRun {
        source: source.to_string(),
        model_version: "ENSEMBLE_v1".to_string(),
        generated_at,
        points: vec![ForecastPoint {
            source: source.to_string(),
            model_version: "ENSEMBLE_v1".to_string(),
            target_date: as_of(),
            generated_at,
            point_estimate: value,
            interval_lower: Some(value * 0.9),
            interval_upper: Some(value * 1.1),
            horizon_days: 9,
            accuracy_mape: confidence.map(|c| 1.0 - c),
            accuracy_rmse: confidence.map(|_| 2.5),
            confidence_score: confidence,
        }],
    }
}

pub fn evaluator(
    history: Arc<dyn HistorySource>,
    forecasts: Arc<dyn ForecastStore>,
) -> AnomalyEvaluator {
    AnomalyEvaluator::new(
        history,
        forecasts,
        Arc::new(ConfidencePolicyRegistry::builtin()),
        AnomalyConfig::default(),
    )
    .unwrap()
}

pub fn with_history(signal: &str, data: TimeSeriesData) -> Arc<InMemoryHistory> {
    Arc::new(InMemoryHistory::new().with_series(signal, data))
}

pub fn empty_store() -> Arc<InMemoryForecastStore> {
    Arc::new(InMemoryForecastStore::new())
}

/// History source that is always down
pub struct BrokenHistory;

impl HistorySource for BrokenHistory {
    fn fetch_history(&self, _signal_id: &str, _since: NaiveDate) -> ForecastResult<TimeSeriesData> {
        Err(ForecastError::DataError("connection refused".to_string()))
    }
}

/// Forecast store that is always down
pub struct BrokenStore;

impl ForecastStore for BrokenStore {
    fn replace_run(&self, _run: &ForecastRun) -> ForecastResult<usize> {
        Err(ForecastError::Store("read-only".to_string()))
    }

    fn read_forecast_near(
        &self,
        _source: &str,
        _target: NaiveDate,
        _window_days: i64,
    ) -> ForecastResult<Option<ForecastPoint>> {
        Err(ForecastError::Store("forecast table missing".to_string()))
    }

    fn points_for(&self, _source: &str, _model_version: &str) -> ForecastResult<Vec<ForecastPoint>> {
        Err(ForecastError::Store("forecast table missing".to_string()))
    }
}

/// History source that stalls on one signal
pub struct SlowHistory {
    pub inner: InMemoryHistory,
    pub slow_signal: String,
    pub delay: std::time::Duration,
}

impl HistorySource for SlowHistory {
    fn fetch_history(&self, signal_id: &str, since: NaiveDate) -> ForecastResult<TimeSeriesData> {
        if signal_id == self.slow_signal {
            std::thread::sleep(self.delay);
        }
        self.inner.fetch_history(signal_id, since)
    }
}

/// History source that panics on one signal
pub struct PanickingHistory {
    pub inner: InMemoryHistory,
    pub failing_signal: String,
}

impl HistorySource for PanickingHistory {
    fn fetch_history(&self, signal_id: &str, since: NaiveDate) -> ForecastResult<TimeSeriesData> {
        if signal_id == self.failing_signal {
            panic!("history driver crashed on {}", signal_id);
        }
        self.inner.fetch_history(signal_id, since)
    }
}
