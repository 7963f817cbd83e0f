//! # gridcast
//!
//! Forecasting and anomaly detection for the sector indicators of an
//! interconnected power grid.
//!
//! - [`grid_forecast`] trains a two-model ensemble per signal, validates it
//!   on a holdout and persists the forecast with accuracy metadata.
//! - [`grid_anomaly`] compares each day's observations with their recent
//!   average and with trusted forecasts, and explains the result.
//!
//! This crate ties both together behind one configuration file and the
//! `gridcast` command line tool.
//!
//! ## Example
//!
//! ```
//! use gridcast::GridcastConfig;
//!
//! let config = GridcastConfig::from_toml_str(
//!     r#"
//!     [trainer]
//!     horizon_days = 30
//!
//!     [anomaly]
//!     forecast_window_days = 1
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.trainer.horizon_days, 30);
//! assert!(config.signal("DEMAND").is_some());
//! ```

pub mod config;

pub use crate::config::{ConfigError, GridcastConfig};
pub use grid_anomaly;
pub use grid_forecast;

/// Version of the gridcast crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
