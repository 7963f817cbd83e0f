//! Time series data handling for forecasting

use crate::error::{ForecastError, Result};
use chrono::{Duration, Months, NaiveDate};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// A named daily time series tracked by the system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signal {
    /// Identifier shared by history, forecasts and policies
    pub id: String,
    /// Physical unit (GWh, $/kWh, %)
    pub unit: String,
    /// Whether forecasts must be clamped to non-negative values
    pub non_negative: bool,
}

impl Signal {
    /// Create a non-negative signal
    pub fn new(id: &str, unit: &str) -> Self {
        Self {
            id: id.to_string(),
            unit: unit.to_string(),
            non_negative: true,
        }
    }

    /// Allow negative forecasts for this signal
    pub fn allowing_negative(mut self) -> Self {
        self.non_negative = false;
        self
    }
}

/// One immutable daily measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalObservation {
    /// Signal identifier
    pub signal_id: String,
    /// Measurement date
    pub date: NaiveDate,
    /// Measured value
    pub value: f64,
}

/// Row layout of history CSV files
#[derive(Debug, Clone, Deserialize)]
struct ObservationRecord {
    date: NaiveDate,
    value: f64,
}

/// Ascending daily series with unique dates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesData {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl TimeSeriesData {
    /// Create a series, rejecting unsorted or duplicate dates and non-finite values
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "{} dates but {} values",
                dates.len(),
                values.len()
            )));
        }
        if let Some(pair) = dates.windows(2).find(|w| w[1] <= w[0]) {
            return Err(ForecastError::DataError(format!(
                "dates must be strictly ascending ({} followed by {})",
                pair[0], pair[1]
            )));
        }
        if let Some(idx) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(format!(
                "non-finite value on {}",
                dates[idx]
            )));
        }

        Ok(Self { dates, values })
    }

    /// Build a series from observations in any order
    pub fn from_observations(mut observations: Vec<HistoricalObservation>) -> Result<Self> {
        observations.sort_by_key(|o| o.date);
        let (dates, values) = observations.into_iter().map(|o| (o.date, o.value)).unzip();
        Self::new(dates, values)
    }

    /// Observation dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Observation values
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// First observation date
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last observation date
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Latest observation as `(date, value)`
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.dates.last().copied().zip(self.values.last().copied())
    }

    /// Observations for one signal
    pub fn observations(&self, signal_id: &str) -> Vec<HistoricalObservation> {
        self.dates
            .iter()
            .zip(self.values.iter())
            .map(|(date, value)| HistoricalObservation {
                signal_id: signal_id.to_string(),
                date: *date,
                value: *value,
            })
            .collect()
    }

    /// Observations on or after `since`
    pub fn since(&self, since: NaiveDate) -> Self {
        let start = self.dates.partition_point(|d| *d < since);
        Self {
            dates: self.dates[start..].to_vec(),
            values: self.values[start..].to_vec(),
        }
    }

    /// Observations on or before `until`
    pub fn until(&self, until: NaiveDate) -> Self {
        let end = self.dates.partition_point(|d| *d <= until);
        Self {
            dates: self.dates[..end].to_vec(),
            values: self.values[..end].to_vec(),
        }
    }

    /// Keep only the last `months` calendar months before the last observation
    pub fn last_months(&self, months: u32) -> Self {
        match self
            .last_date()
            .and_then(|last| last.checked_sub_months(Months::new(months)))
        {
            Some(start) => self.since(start),
            None => self.clone(),
        }
    }

    /// Split off the last `holdout` observations
    pub fn split_holdout(&self, holdout: usize) -> Result<(Self, Self)> {
        if holdout == 0 || holdout >= self.len() {
            return Err(ForecastError::ValidationError(format!(
                "holdout of {} does not fit a series of {}",
                holdout,
                self.len()
            )));
        }
        let cut = self.len() - holdout;
        Ok((
            Self {
                dates: self.dates[..cut].to_vec(),
                values: self.values[..cut].to_vec(),
            },
            Self {
                dates: self.dates[cut..].to_vec(),
                values: self.values[cut..].to_vec(),
            },
        ))
    }

    /// Multiply every value by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            dates: self.dates.clone(),
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Remove the observations at the given dates
    pub fn without_dates(&self, excluded: &[NaiveDate]) -> Self {
        let (dates, values) = self
            .dates
            .iter()
            .zip(self.values.iter())
            .filter(|(d, _)| !excluded.contains(d))
            .map(|(d, v)| (*d, *v))
            .unzip();
        Self { dates, values }
    }

    /// Insert missing calendar days by linear interpolation
    pub fn fill_daily_gaps(&self) -> Self {
        if self.len() < 2 {
            return self.clone();
        }
        let mut dates = Vec::with_capacity(self.len());
        let mut values = Vec::with_capacity(self.len());

        for i in 0..self.len() - 1 {
            let (d0, v0) = (self.dates[i], self.values[i]);
            let (d1, v1) = (self.dates[i + 1], self.values[i + 1]);
            let gap = (d1 - d0).num_days();
            dates.push(d0);
            values.push(v0);
            for step in 1..gap {
                let frac = step as f64 / gap as f64;
                dates.push(d0 + Duration::days(step));
                values.push(v0 + (v1 - v0) * frac);
            }
        }
        dates.push(self.dates[self.len() - 1]);
        values.push(self.values[self.len() - 1]);

        Self { dates, values }
    }
}

/// Data loader for history files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a `date,value` CSV file into a series
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesData> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load `date,value` CSV rows from any reader
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<TimeSeriesData> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in csv_reader.deserialize::<ObservationRecord>() {
            rows.push(record?);
        }
        rows.sort_by_key(|r| r.date);

        let (dates, values) = rows.into_iter().map(|r| (r.date, r.value)).unzip();
        TimeSeriesData::new(dates, values)
    }
}

/// Source of historical observations
pub trait HistorySource: Send + Sync {
    /// Ascending observations for `signal_id` on or after `since`
    fn fetch_history(&self, signal_id: &str, since: NaiveDate) -> Result<TimeSeriesData>;
}

/// History held in memory, keyed by signal id
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    series: RwLock<HashMap<String, TimeSeriesData>>,
}

impl InMemoryHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the series of a signal
    pub fn insert(&self, signal_id: &str, data: TimeSeriesData) {
        self.series.write().insert(signal_id.to_string(), data);
    }

    /// Builder form of [`InMemoryHistory::insert`]
    pub fn with_series(self, signal_id: &str, data: TimeSeriesData) -> Self {
        self.insert(signal_id, data);
        self
    }
}

impl HistorySource for InMemoryHistory {
    fn fetch_history(&self, signal_id: &str, since: NaiveDate) -> Result<TimeSeriesData> {
        Ok(self
            .series
            .read()
            .get(signal_id)
            .map(|data| data.since(since))
            .unwrap_or_default())
    }
}

/// History stored as one `<signal>.csv` file per signal in a directory
#[derive(Debug, Clone)]
pub struct CsvHistoryDirectory {
    root: PathBuf,
}

impl CsvHistoryDirectory {
    /// Use the given directory
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Path of the file holding a signal's history
    pub fn path_for(&self, signal_id: &str) -> PathBuf {
        self.root.join(format!("{}.csv", signal_id))
    }
}

impl HistorySource for CsvHistoryDirectory {
    fn fetch_history(&self, signal_id: &str, since: NaiveDate) -> Result<TimeSeriesData> {
        let path = self.path_for(signal_id);
        if !path.exists() {
            return Ok(TimeSeriesData::default());
        }
        Ok(DataLoader::from_csv(path)?.since(since))
    }
}
