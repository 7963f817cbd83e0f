//! Concurrent evaluation of all configured indicators
//!
//! Each indicator runs on the blocking pool under its own timeout, and the
//! whole dispatch is bounded by a deadline. A slow or failing indicator only
//! degrades its own assessment.

use crate::evaluator::{AnomalyAssessment, AnomalyEvaluator, AssessmentStatus};
use crate::error::Result;
use crate::severity::Severity;
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{info, warn};

/// Assessments of one dispatch, most severe first
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    /// Evaluation date
    pub as_of: NaiveDate,
    /// One assessment per configured indicator
    pub assessments: Vec<AnomalyAssessment>,
    /// Indicators with status `evaluated`
    pub evaluated: usize,
    /// Critical assessments
    pub critical: usize,
    /// Warning assessments
    pub warning: usize,
    /// Indicators that could not be evaluated in time or at all
    pub unavailable: usize,
    /// One-line summary
    pub summary: String,
}

impl DispatchReport {
    fn new(as_of: NaiveDate, mut assessments: Vec<AnomalyAssessment>) -> Self {
        // Stable: configuration order is kept within a severity
        assessments.sort_by(|a, b| b.severity.cmp(&a.severity));

        let count = |status| assessments.iter().filter(|a| a.status == status).count();
        let evaluated = count(AssessmentStatus::Evaluated);
        let unavailable = count(AssessmentStatus::Unavailable);
        let critical = assessments
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .count();
        let warning = assessments
            .iter()
            .filter(|a| a.severity == Severity::Warning)
            .count();

        let summary = if critical + warning == 0 {
            format!(
                "{}: {} of {} indicators evaluated, no anomalies",
                as_of,
                evaluated,
                assessments.len()
            )
        } else {
            format!(
                "{}: {} critical, {} warning across {} indicators",
                as_of,
                critical,
                warning,
                assessments.len()
            )
        };

        Self {
            as_of,
            assessments,
            evaluated,
            critical,
            warning,
            unavailable,
            summary,
        }
    }

    /// Whether any indicator is flagged
    pub fn has_anomalies(&self) -> bool {
        self.critical + self.warning > 0
    }

    /// Assessment of an indicator
    pub fn assessment(&self, indicator: &str) -> Option<&AnomalyAssessment> {
        self.assessments.iter().find(|a| a.indicator == indicator)
    }

    /// Pretty JSON rendering
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs the evaluator over every configured indicator
#[derive(Debug, Clone)]
pub struct Dispatcher {
    evaluator: Arc<AnomalyEvaluator>,
    per_call: Duration,
    total: Duration,
}

impl Dispatcher {
    /// Dispatcher using the evaluator's configured timeouts
    pub fn new(evaluator: Arc<AnomalyEvaluator>) -> Self {
        let per_call = evaluator.config().per_call_timeout();
        let total = evaluator.config().total_timeout();
        Self {
            evaluator,
            per_call,
            total,
        }
    }

    /// Override both timeouts
    pub fn with_timeouts(mut self, per_call: Duration, total: Duration) -> Self {
        self.per_call = per_call;
        self.total = total;
        self
    }

    /// Evaluator in use
    pub fn evaluator(&self) -> &AnomalyEvaluator {
        &self.evaluator
    }

    /// Evaluate every indicator concurrently
    pub async fn dispatch(&self, as_of: NaiveDate) -> DispatchReport {
        let indicators = self.evaluator.indicators().to_vec();
        let deadline = Instant::now() + self.total;
        let mut tasks = JoinSet::new();

        for (idx, indicator) in indicators.iter().cloned().enumerate() {
            let evaluator = Arc::clone(&self.evaluator);
            let per_call = self.per_call;
            tasks.spawn(async move {
                let work =
                    tokio::task::spawn_blocking(move || evaluator.evaluate(&indicator, as_of));
                let outcome = match timeout(per_call, work).await {
                    Ok(Ok(assessment)) => Ok(assessment),
                    Ok(Err(e)) => Err(format!("evaluation task failed: {}", e)),
                    Err(_) => Err(format!(
                        "evaluation timed out after {} ms",
                        per_call.as_millis()
                    )),
                };
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<AnomalyAssessment>> = vec![None; indicators.len()];
        let mut deadline_reached = false;
        let mut join_failure = None;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((idx, Ok(assessment))))) => slots[idx] = Some(assessment),
                Ok(Some(Ok((idx, Err(note))))) => {
                    warn!(indicator = %indicators[idx].id, %note, "indicator degraded");
                    slots[idx] = Some(self.evaluator.unavailable(&indicators[idx], note));
                }
                // The index is lost with the task; its slot is filled below
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "dispatch task failed");
                    join_failure = Some(format!("evaluation task failed: {}", e));
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        pending = tasks.len(),
                        "dispatch deadline reached, abandoning remaining indicators"
                    );
                    tasks.abort_all();
                    deadline_reached = true;
                    break;
                }
            }
        }

        let assessments = slots
            .into_iter()
            .zip(&indicators)
            .map(|(slot, indicator)| {
                slot.unwrap_or_else(|| {
                    let note = match (&join_failure, deadline_reached) {
                        (Some(failure), false) => failure.clone(),
                        _ => "dispatch deadline exceeded".to_string(),
                    };
                    self.evaluator.unavailable(indicator, note)
                })
            })
            .collect();

        let report = DispatchReport::new(as_of, assessments);
        info!(
            as_of = %as_of,
            evaluated = report.evaluated,
            critical = report.critical,
            warning = report.warning,
            unavailable = report.unavailable,
            "anomaly dispatch finished"
        );
        report
    }
}
