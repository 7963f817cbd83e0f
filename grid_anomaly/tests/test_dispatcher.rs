mod common;

use common::*;
use grid_anomaly::{AssessmentStatus, Dispatcher, Severity};
use grid_forecast::data::InMemoryHistory;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn history() -> InMemoryHistory {
    InMemoryHistory::new()
        .with_series("GENERATION_TOTAL", steady_then(100.0, 100.0))
        .with_series("SPOT_PRICE", steady_then(100.0, 125.0))
        .with_series("RESERVOIR_PCT", steady_then(0.5, 0.3))
}

#[tokio::test(flavor = "multi_thread")]
async fn test_report_is_ordered_by_severity() {
    let dispatcher = Dispatcher::new(Arc::new(evaluator(Arc::new(history()), empty_store())));
    let report = dispatcher.dispatch(as_of()).await;

    let order: Vec<_> = report
        .assessments
        .iter()
        .map(|a| (a.indicator.as_str(), a.severity))
        .collect();
    assert_eq!(
        order,
        vec![
            ("RESERVOIR_PCT", Severity::Critical),
            ("SPOT_PRICE", Severity::Warning),
            ("GENERATION_TOTAL", Severity::Normal),
        ]
    );
    assert_eq!(report.evaluated, 3);
    assert_eq!(report.critical, 1);
    assert_eq!(report.warning, 1);
    assert!(report.has_anomalies());
    assert!(report.to_json().unwrap().contains("\"severity\": \"critical\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_slow_indicator_degrades_alone() {
    let slow = SlowHistory {
        inner: history(),
        slow_signal: "SPOT_PRICE".to_string(),
        delay: Duration::from_millis(800),
    };
    let dispatcher = Dispatcher::new(Arc::new(evaluator(Arc::new(slow), empty_store())))
        .with_timeouts(Duration::from_millis(100), Duration::from_secs(5));

    let report = dispatcher.dispatch(as_of()).await;
    assert_eq!(report.assessments.len(), 3);
    assert_eq!(report.unavailable, 1);
    assert_eq!(report.evaluated, 2);

    let spot = report.assessment("SPOT_PRICE").unwrap();
    assert_eq!(spot.status, AssessmentStatus::Unavailable);
    assert!(spot.note.as_deref().unwrap().contains("timed out"));
    assert_eq!(
        report.assessment("RESERVOIR_PCT").unwrap().severity,
        Severity::Critical
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_total_deadline_fills_missing_indicators() {
    let slow = SlowHistory {
        inner: history(),
        slow_signal: "GENERATION_TOTAL".to_string(),
        delay: Duration::from_millis(800),
    };
    let dispatcher = Dispatcher::new(Arc::new(evaluator(Arc::new(slow), empty_store())))
        .with_timeouts(Duration::from_secs(5), Duration::from_millis(150));

    let report = dispatcher.dispatch(as_of()).await;
    let generation = report.assessment("GENERATION_TOTAL").unwrap();
    assert_eq!(generation.status, AssessmentStatus::Unavailable);
    assert!(generation.note.as_deref().unwrap().contains("deadline"));
    assert_eq!(report.evaluated, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_failed_task_is_not_reported_as_deadline() {
    let failing = PanickingHistory {
        inner: history(),
        failing_signal: "SPOT_PRICE".to_string(),
    };
    let dispatcher = Dispatcher::new(Arc::new(evaluator(Arc::new(failing), empty_store())))
        .with_timeouts(Duration::from_secs(5), Duration::from_secs(10));

    let report = dispatcher.dispatch(as_of()).await;
    assert_eq!(report.evaluated, 2);
    assert_eq!(report.unavailable, 1);

    let spot = report.assessment("SPOT_PRICE").unwrap();
    assert_eq!(spot.status, AssessmentStatus::Unavailable);
    let note = spot.note.as_deref().unwrap();
    assert!(note.contains("evaluation task failed"), "note: {}", note);
    assert!(!note.contains("deadline"));
}
