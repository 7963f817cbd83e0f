//! Parallel training of many signals

use crate::config::SignalConfig;
use crate::data::HistorySource;
use crate::error::Result;
use crate::store::ForecastStore;
use crate::trainer::EnsembleTrainer;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// What happened to one signal
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SignalOutcome {
    /// A run was written
    Trained {
        /// Points written
        rows: usize,
        /// Reported holdout MAPE, if validated
        mape: Option<f64>,
    },
    /// Not enough history
    Skipped {
        /// Why
        reason: String,
    },
    /// Training or persistence failed
    Failed {
        /// Error text
        error: String,
    },
}

/// Outcome of a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Per-signal outcomes, in profile order
    pub outcomes: Vec<(String, SignalOutcome)>,
}

impl BatchReport {
    /// Signals that produced a run
    pub fn trained(&self) -> usize {
        self.count(|o| matches!(o, SignalOutcome::Trained { .. }))
    }

    /// Signals skipped for insufficient history
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, SignalOutcome::Skipped { .. }))
    }

    /// Signals that failed
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, SignalOutcome::Failed { .. }))
    }

    /// Outcome of one signal
    pub fn outcome(&self, signal_id: &str) -> Option<&SignalOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == signal_id)
            .map(|(_, outcome)| outcome)
    }

    fn count(&self, predicate: impl Fn(&SignalOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Training batch: {} trained, {} skipped, {} failed",
            self.trained(),
            self.skipped(),
            self.failed()
        )?;
        for (id, outcome) in &self.outcomes {
            match outcome {
                SignalOutcome::Trained { rows, mape } => match mape {
                    Some(mape) => writeln!(f, "  {:<18} {} rows, MAPE {:.2}%", id, rows, mape * 100.0)?,
                    None => writeln!(f, "  {:<18} {} rows, not validated", id, rows)?,
                },
                SignalOutcome::Skipped { reason } => writeln!(f, "  {:<18} skipped: {}", id, reason)?,
                SignalOutcome::Failed { error } => writeln!(f, "  {:<18} failed: {}", id, error)?,
            }
        }
        Ok(())
    }
}

fn train_one(
    trainer: &EnsembleTrainer,
    profile: &SignalConfig,
    history: &dyn HistorySource,
    store: &dyn ForecastStore,
) -> Result<SignalOutcome> {
    let series = history.fetch_history(&profile.id, trainer.config().history_start)?;
    let run = trainer.train_and_forecast(profile, &series)?;
    let rows = store.replace_run(&run.forecast)?;
    Ok(SignalOutcome::Trained {
        rows,
        mape: run.validation.accuracy().map(|a| a.mape),
    })
}

/// Train every profile in parallel and persist each run.
///
/// One signal's failure never affects another.
pub fn train_batch(
    trainer: &EnsembleTrainer,
    profiles: &[SignalConfig],
    history: &dyn HistorySource,
    store: &dyn ForecastStore,
) -> BatchReport {
    let outcomes: Vec<(String, SignalOutcome)> = profiles
        .par_iter()
        .map(|profile| {
            let outcome = match train_one(trainer, profile, history, store) {
                Ok(outcome) => outcome,
                Err(e) if e.is_data_insufficient() => {
                    warn!(signal = %profile.id, reason = %e, "signal skipped");
                    SignalOutcome::Skipped {
                        reason: e.to_string(),
                    }
                }
                Err(e) => {
                    warn!(signal = %profile.id, error = %e, "signal failed");
                    SignalOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            (profile.id.clone(), outcome)
        })
        .collect();

    let report = BatchReport { outcomes };
    info!(
        trained = report.trained(),
        skipped = report.skipped(),
        failed = report.failed(),
        "training batch finished"
    );
    report
}
