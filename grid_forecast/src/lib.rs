//! # Grid Forecast
//!
//! Ensemble forecasting of daily grid-sector indicators (generation, demand,
//! prices, reservoir levels) with honest holdout accuracy.
//!
//! ## Features
//!
//! - Daily series handling with windowing, partial-tail trimming and gap filling
//! - Trend + seasonality regression (piecewise-linear trend, Fourier seasonality)
//! - Seasonal autoregression with differencing tests and AIC order search
//! - Holdout-weighted ensemble with combined prediction intervals
//! - Forecast stores (in memory, JSON file) with nearest-date lookup
//! - Parallel batch training with per-signal outcomes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use grid_forecast::config::{SignalConfig, TrainerConfig};
//! use grid_forecast::data::DataLoader;
//! use grid_forecast::store::{ForecastStore, InMemoryForecastStore};
//! use grid_forecast::trainer::EnsembleTrainer;
//!
//! # fn main() -> grid_forecast::error::Result<()> {
//! let history = DataLoader::from_csv("history/DEMAND.csv")?;
//! let trainer = EnsembleTrainer::new(TrainerConfig::default())?;
//! let run = trainer.train_and_forecast(&SignalConfig::new("DEMAND", "GWh"), &history)?;
//!
//! let store = InMemoryForecastStore::new();
//! store.replace_run(&run.forecast)?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod store;
pub mod trainer;
pub mod utils;

// Re-export commonly used types
pub use crate::batch::{train_batch, BatchReport, SignalOutcome};
pub use crate::config::{SignalConfig, TrainerConfig};
pub use crate::data::{DataLoader, HistorySource, Signal, TimeSeriesData};
pub use crate::ensemble::{Committee, Validation, Weights};
pub use crate::error::ForecastError;
pub use crate::forecast::{ForecastPoint, ForecastRun};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::store::{ForecastStore, InMemoryForecastStore, JsonFileForecastStore};
pub use crate::trainer::{EnsembleTrainer, TrainingRun};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
