//! # Grid Anomaly
//!
//! Daily anomaly detection for grid indicators. Each indicator's latest
//! observation is compared with its recent average and, when the forecast
//! source's confidence tier allows it, with the stored forecast closest to
//! the observation date.
//!
//! ## Quick Start
//!
//! ```no_run
//! use grid_anomaly::{AnomalyConfig, AnomalyEvaluator, ConfidencePolicyRegistry, Dispatcher};
//! use grid_forecast::data::CsvHistoryDirectory;
//! use grid_forecast::JsonFileForecastStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> grid_anomaly::Result<()> {
//! let evaluator = AnomalyEvaluator::new(
//!     Arc::new(CsvHistoryDirectory::new("data/history")),
//!     Arc::new(JsonFileForecastStore::new("data/forecasts.json")),
//!     Arc::new(ConfidencePolicyRegistry::builtin()),
//!     AnomalyConfig::default(),
//! )?;
//!
//! let as_of = chrono::NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//! let report = Dispatcher::new(Arc::new(evaluator)).dispatch(as_of).await;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod policy;
pub mod severity;

pub use crate::config::{AnomalyConfig, IndicatorSpec};
pub use crate::dispatcher::{DispatchReport, Dispatcher};
pub use crate::error::{AnomalyError, Result};
pub use crate::evaluator::{AnomalyAssessment, AnomalyEvaluator, AssessmentStatus};
pub use crate::policy::{ConfidencePolicy, ConfidencePolicyRegistry, ConfidenceTier, PolicyLookup};
pub use crate::severity::{Deviation, Severity, SeverityThresholds, ThresholdTable};
