mod common;

use approx::assert_relative_eq;
use common::*;
use grid_anomaly::{AssessmentStatus, ConfidenceTier, Deviation, IndicatorSpec, Severity};
use grid_forecast::config::{SignalConfig, TrainerConfig};
use grid_forecast::data::InMemoryHistory;
use grid_forecast::store::{ForecastStore, InMemoryForecastStore};
use grid_forecast::utils::SyntheticSeries;
use grid_forecast::EnsembleTrainer;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

fn generation() -> IndicatorSpec {
    IndicatorSpec::builtin().remove(0)
}

fn spot_price() -> IndicatorSpec {
    IndicatorSpec::builtin().remove(1)
}

fn reservoir() -> IndicatorSpec {
    IndicatorSpec::builtin().remove(2)
}

#[rstest]
#[case(100.0, 0.0, Severity::Normal)]
#[case(110.0, 10.0, Severity::Normal)]
#[case(115.0, 15.0, Severity::Warning)]
#[case(140.0, 40.0, Severity::Critical)]
#[case(60.0, 40.0, Severity::Critical)]
fn test_historical_deviation(#[case] current: f64, #[case] pct: f64, #[case] expected: Severity) {
    let evaluator = evaluator(with_history("GENERATION_TOTAL", steady_then(100.0, current)), empty_store());
    let assessment = evaluator.evaluate(&generation(), as_of());

    assert_eq!(assessment.status, AssessmentStatus::Evaluated);
    assert_eq!(assessment.historical_avg_30d, Some(100.0));
    assert_eq!(assessment.history_observations, 30);
    let deviation = assessment.max_deviation_pct.and_then(Deviation::percent).unwrap();
    assert_relative_eq!(deviation, pct, epsilon = 1e-9);
    assert_eq!(assessment.severity, expected);
    assert_eq!(assessment.forecast_value, None);
}

#[test]
fn test_trusted_forecast_raises_severity() {
    let store = empty_store();
    store
        .replace_run(&forecast_run("GENERATION_TOTAL", 140.0, Some(0.96)))
        .unwrap();
    let evaluator = evaluator(with_history("GENERATION_TOTAL", steady_then(100.0, 105.0)), store);

    let assessment = evaluator.evaluate(&generation(), as_of());
    assert_eq!(assessment.confidence_tier, ConfidenceTier::VeryReliable);
    assert_eq!(assessment.forecast_value, Some(140.0));
    let vs_forecast = assessment
        .deviation_vs_forecast_pct
        .and_then(Deviation::percent)
        .unwrap();
    assert_relative_eq!(vs_forecast, 25.0, epsilon = 1e-9);
    assert!(!assessment.forecast_excluded);
    // 25% is not strictly above the critical threshold
    assert_eq!(assessment.severity, Severity::Warning);
    assert!(assessment.narrative.contains("confidence 96%"));
    assert_eq!(assessment.disclaimer, "");
}

#[test]
fn test_experimental_forecast_is_excluded() {
    let store = empty_store();
    store
        .replace_run(&forecast_run("SPOT_PRICE", 70.0, None))
        .unwrap();
    let evaluator = evaluator(with_history("SPOT_PRICE", steady_then(100.0, 105.0)), store);

    let assessment = evaluator.evaluate(&spot_price(), as_of());
    assert_eq!(assessment.confidence_tier, ConfidenceTier::Experimental);
    assert_eq!(assessment.forecast_value, Some(70.0));
    assert!(assessment.forecast_excluded);
    assert_eq!(assessment.deviation_vs_forecast_pct, None);
    assert_eq!(assessment.max_deviation_pct, assessment.deviation_vs_historical_pct);
    assert_eq!(assessment.severity, Severity::Normal);
    assert!(assessment.narrative.contains("not used"));
    assert!(assessment.narrative.contains("not validated"));
    assert!(!assessment.disclaimer.is_empty());
}

#[test]
fn test_zero_average_is_critical() {
    let evaluator = evaluator(with_history("RESERVOIR_PCT", steady_then(0.0, 5.0)), empty_store());
    let assessment = evaluator.evaluate(&reservoir(), as_of());

    assert_eq!(assessment.deviation_vs_historical_pct, Some(Deviation::Unbounded));
    assert_eq!(assessment.severity, Severity::Critical);
}

#[test]
fn test_scaled_indicator_matches_trained_forecast_unit() {
    // Reservoir history is published as a fraction of useful volume
    let data = SyntheticSeries {
        level: 0.65,
        trend_per_day: 0.0,
        weekly_amplitude: 0.005,
        yearly_amplitude: 0.05,
        noise_std: 0.002,
        ..SyntheticSeries::default()
    }
    .generate()
    .unwrap();
    let evaluated_on = data.last_date().unwrap();
    let cutoff = evaluated_on - chrono::Duration::days(5);

    let profile = SignalConfig::builtin()
        .into_iter()
        .find(|p| p.id == "RESERVOIR_PCT")
        .unwrap();
    let trainer = EnsembleTrainer::new(TrainerConfig {
        horizon_days: 30,
        ..TrainerConfig::default()
    })
    .unwrap();
    let run = trainer
        .train_and_forecast(&profile, &data.until(cutoff))
        .unwrap();
    let store = Arc::new(InMemoryForecastStore::new());
    store.replace_run(&run.forecast).unwrap();

    let history = Arc::new(InMemoryHistory::new().with_series("RESERVOIR_PCT", data.clone()));
    let assessment = evaluator(history, store).evaluate(&reservoir(), evaluated_on);

    let raw_current = data.last().unwrap().1;
    assert_relative_eq!(assessment.current_value.unwrap(), raw_current * 100.0, epsilon = 1e-9);
    let forecast = assessment.forecast_value.unwrap();
    assert!(forecast > 50.0 && forecast < 80.0, "forecast {} is not a percentage", forecast);
    assert!(!assessment.forecast_excluded);
    let vs_forecast = assessment
        .deviation_vs_forecast_pct
        .and_then(Deviation::percent)
        .unwrap();
    assert!(vs_forecast < 10.0, "deviation vs forecast {}", vs_forecast);
    assert_eq!(assessment.severity, Severity::Normal);
}

#[test]
fn test_average_uses_recent_observations_only() {
    let mut values = vec![1000.0; 10];
    values.extend(vec![100.0; 30]);
    values.push(120.0);
    let evaluator = evaluator(with_history("GENERATION_TOTAL", series(&values)), empty_store());

    let assessment = evaluator.evaluate(&generation(), as_of());
    assert_eq!(assessment.historical_avg_30d, Some(100.0));
    assert_eq!(assessment.current_value, Some(120.0));
}

#[test]
fn test_later_observations_are_ignored() {
    let evaluator = evaluator(with_history("GENERATION_TOTAL", steady_then(100.0, 140.0)), empty_store());
    let earlier = as_of() - chrono::Duration::days(1);

    let assessment = evaluator.evaluate(&generation(), earlier);
    assert_eq!(assessment.current_date, Some(earlier));
    assert_eq!(assessment.current_value, Some(100.0));
    assert_eq!(assessment.severity, Severity::Normal);
}

#[test]
fn test_insufficient_history() {
    let evaluator = evaluator(with_history("GENERATION_TOTAL", series(&[100.0])), empty_store());
    let single = evaluator.evaluate(&generation(), as_of());
    assert_eq!(single.status, AssessmentStatus::InsufficientData);
    assert_eq!(single.current_value, Some(100.0));
    assert_eq!(single.severity, Severity::Normal);

    let missing = evaluator.evaluate(&spot_price(), as_of());
    assert_eq!(missing.status, AssessmentStatus::InsufficientData);
    assert_eq!(missing.current_value, None);
}

#[test]
fn test_history_failure_is_unavailable() {
    let evaluator = evaluator(Arc::new(BrokenHistory), empty_store());
    let assessment = evaluator.evaluate(&generation(), as_of());

    assert_eq!(assessment.status, AssessmentStatus::Unavailable);
    assert!(assessment.note.unwrap().contains("connection refused"));
    assert_eq!(assessment.confidence_tier, ConfidenceTier::VeryReliable);
}

#[test]
fn test_forecast_failure_falls_back_to_history() {
    let evaluator = evaluator(
        with_history("GENERATION_TOTAL", steady_then(100.0, 140.0)),
        Arc::new(BrokenStore),
    );
    let assessment = evaluator.evaluate(&generation(), as_of());

    assert_eq!(assessment.status, AssessmentStatus::Evaluated);
    assert_eq!(assessment.severity, Severity::Critical);
    assert!(assessment.note.unwrap().contains("forecast lookup failed"));
}

#[test]
fn test_unknown_indicator_id() {
    let evaluator = evaluator(with_history("GENERATION_TOTAL", steady_then(100.0, 100.0)), empty_store());
    let assessment = evaluator.evaluate_id("FREQUENCY", as_of());

    assert_eq!(assessment.status, AssessmentStatus::Unavailable);
    assert_eq!(assessment.confidence_tier, ConfidenceTier::Unknown);
}
