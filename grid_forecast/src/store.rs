//! Forecast persistence
//!
//! A store keeps the latest run per `(source, model_version)`. Replacing a
//! run is atomic with respect to readers: they see either the old points or
//! the new ones, never a mix.

use crate::error::{ForecastError, Result};
use crate::forecast::{nearest_forecast, ForecastPoint, ForecastRun};
use chrono::NaiveDate;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Persistence of forecast runs
pub trait ForecastStore: Send + Sync {
    /// Delete every point of `(run.source, run.model_version)` and insert the
    /// run's points; returns the number of points written.
    fn replace_run(&self, run: &ForecastRun) -> Result<usize>;

    /// Closest point for `source` within `window_days` of `target`
    fn read_forecast_near(
        &self,
        source: &str,
        target: NaiveDate,
        window_days: i64,
    ) -> Result<Option<ForecastPoint>>;

    /// Stored points of one run, ascending by target date
    fn points_for(&self, source: &str, model_version: &str) -> Result<Vec<ForecastPoint>>;
}

type RunKey = (String, String);

fn check_run(run: &ForecastRun) -> Result<()> {
    if let Some(point) = run
        .points
        .iter()
        .find(|p| p.source != run.source || p.model_version != run.model_version)
    {
        return Err(ForecastError::Store(format!(
            "point for {}/{} in run {}/{}",
            point.source, point.model_version, run.source, run.model_version
        )));
    }
    Ok(())
}

fn sorted_points(run: &ForecastRun) -> Vec<ForecastPoint> {
    let mut points = run.points.clone();
    points.sort_by_key(|p| p.target_date);
    points
}

/// Store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryForecastStore {
    runs: RwLock<BTreeMap<RunKey, Vec<ForecastPoint>>>,
}

impl InMemoryForecastStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored points
    pub fn len(&self) -> usize {
        self.runs.read().values().map(Vec::len).sum()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ForecastStore for InMemoryForecastStore {
    fn replace_run(&self, run: &ForecastRun) -> Result<usize> {
        check_run(run)?;
        let points = sorted_points(run);
        let written = points.len();
        self.runs
            .write()
            .insert((run.source.clone(), run.model_version.clone()), points);
        Ok(written)
    }

    fn read_forecast_near(
        &self,
        source: &str,
        target: NaiveDate,
        window_days: i64,
    ) -> Result<Option<ForecastPoint>> {
        let runs = self.runs.read();
        let candidates = runs
            .iter()
            .filter(|((s, _), _)| s == source)
            .flat_map(|(_, points)| points.iter());
        Ok(nearest_forecast(candidates, target, window_days).cloned())
    }

    fn points_for(&self, source: &str, model_version: &str) -> Result<Vec<ForecastPoint>> {
        Ok(self
            .runs
            .read()
            .get(&(source.to_string(), model_version.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Store persisted as one JSON array of points
#[derive(Debug)]
pub struct JsonFileForecastStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileForecastStore {
    /// Use the given file; it is created on the first write
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<ForecastPoint>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn save(&self, points: &[ForecastPoint]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        let written = fs::write(&tmp, serde_json::to_vec_pretty(points)?)
            .and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl ForecastStore for JsonFileForecastStore {
    fn replace_run(&self, run: &ForecastRun) -> Result<usize> {
        check_run(run)?;
        let _guard = self.lock.lock();

        let mut points = self.load()?;
        points.retain(|p| !(p.source == run.source && p.model_version == run.model_version));
        let fresh = sorted_points(run);
        let written = fresh.len();
        points.extend(fresh);
        self.save(&points)?;
        Ok(written)
    }

    fn read_forecast_near(
        &self,
        source: &str,
        target: NaiveDate,
        window_days: i64,
    ) -> Result<Option<ForecastPoint>> {
        let _guard = self.lock.lock();
        let points = self.load()?;
        Ok(nearest_forecast(
            points.iter().filter(|p| p.source == source),
            target,
            window_days,
        )
        .cloned())
    }

    fn points_for(&self, source: &str, model_version: &str) -> Result<Vec<ForecastPoint>> {
        let _guard = self.lock.lock();
        let mut points: Vec<ForecastPoint> = self
            .load()?
            .into_iter()
            .filter(|p| p.source == source && p.model_version == model_version)
            .collect();
        points.sort_by_key(|p| p.target_date);
        Ok(points)
    }
}
