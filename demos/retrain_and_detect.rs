// Retrain two signals on synthetic history, then run the anomaly
// dispatcher ten days after the training cutoff.
use chrono::{Duration, NaiveDate};
use grid_anomaly::{AnomalyConfig, AnomalyEvaluator, ConfidencePolicyRegistry, Dispatcher, IndicatorSpec};
use grid_forecast::config::{SignalConfig, TrainerConfig};
use grid_forecast::data::InMemoryHistory;
use grid_forecast::utils::SyntheticSeries;
use grid_forecast::{train_batch, EnsembleTrainer, InMemoryForecastStore};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let generation = SyntheticSeries::default().generate()?;
    let price = SyntheticSeries {
        level: 320.0,
        trend_per_day: 0.0,
        yearly_amplitude: 40.0,
        noise_std: 12.0,
        seed: 11,
        ..SyntheticSeries::default()
    }
    .generate()?;

    let cutoff = NaiveDate::from_ymd_opt(2023, 12, 15).ok_or("invalid cutoff")?;
    let as_of = cutoff + Duration::days(10);

    // Train on data up to the cutoff only
    let training_history = InMemoryHistory::new()
        .with_series("GENERATION_TOTAL", generation.until(cutoff))
        .with_series("SPOT_PRICE", price.until(cutoff));
    let profiles: Vec<SignalConfig> = SignalConfig::builtin()
        .into_iter()
        .filter(|p| p.id == "GENERATION_TOTAL" || p.id == "SPOT_PRICE")
        .collect();

    let store = Arc::new(InMemoryForecastStore::new());
    let trainer = EnsembleTrainer::new(TrainerConfig {
        horizon_days: 30,
        ..TrainerConfig::default()
    })?;
    let batch = train_batch(&trainer, &profiles, &training_history, store.as_ref());
    println!("{}", batch);

    // Simulate a price spike on the evaluation date
    let mut observed = price.until(as_of);
    if let Some(last) = observed.last() {
        let mut dates = observed.dates().to_vec();
        let mut values = observed.values().to_vec();
        dates.pop();
        values.pop();
        dates.push(last.0);
        values.push(last.1 * 1.6);
        observed = grid_forecast::TimeSeriesData::new(dates, values)?;
    }
    let live_history = InMemoryHistory::new()
        .with_series("GENERATION_TOTAL", generation.clone())
        .with_series("SPOT_PRICE", observed);

    let config = AnomalyConfig {
        indicators: IndicatorSpec::builtin()
            .into_iter()
            .filter(|i| i.id != "RESERVOIR_PCT")
            .collect(),
        ..AnomalyConfig::default()
    };
    let evaluator = AnomalyEvaluator::new(
        Arc::new(live_history),
        store,
        Arc::new(ConfidencePolicyRegistry::builtin()),
        config,
    )?;

    let report = Dispatcher::new(Arc::new(evaluator)).dispatch(as_of).await;
    println!("{}", report.summary);
    for assessment in &report.assessments {
        println!("  [{}] {}", assessment.severity, assessment.narrative);
    }
    Ok(())
}
