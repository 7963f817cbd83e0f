//! gridcast command line tool
//!
//! - `train` retrains every configured signal and replaces its stored run
//! - `detect` evaluates the watched indicators for one date
//! - `policy` prints the confidence policy table

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use grid_anomaly::{AnomalyEvaluator, ConfidencePolicyRegistry, Dispatcher, PolicyLookup};
use grid_forecast::data::CsvHistoryDirectory;
use grid_forecast::{train_batch, EnsembleTrainer, JsonFileForecastStore};
use gridcast::GridcastConfig;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about = "Grid-sector forecasting and anomaly detection", long_about = None)]
struct Cli {
    /// Configuration file; built-in defaults when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Retrain signals and replace their stored forecasts
    Train {
        /// Directory holding one `<signal>.csv` per signal
        #[arg(long, default_value = "data/history")]
        history_dir: PathBuf,
        /// JSON forecast store
        #[arg(long, default_value = "data/forecasts.json")]
        store: PathBuf,
        /// Train only these signals
        #[arg(long = "signal")]
        signals: Vec<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the watched indicators
    Detect {
        /// Directory holding one `<signal>.csv` per signal
        #[arg(long, default_value = "data/history")]
        history_dir: PathBuf,
        /// JSON forecast store
        #[arg(long, default_value = "data/forecasts.json")]
        store: PathBuf,
        /// Evaluation date (YYYY-MM-DD); today when omitted
        #[arg(long)]
        as_of: Option<NaiveDate>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show confidence policies
    Policy {
        /// Show a single source
        source: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => GridcastConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => GridcastConfig::default(),
    };

    match cli.command {
        Commands::Train {
            history_dir,
            store,
            signals,
            json,
        } => train(&config, history_dir, store, &signals, json),
        Commands::Detect {
            history_dir,
            store,
            as_of,
            json,
        } => detect(&config, history_dir, store, as_of, json).await,
        Commands::Policy { source } => policy(&config, source.as_deref()),
    }
}

fn train(
    config: &GridcastConfig,
    history_dir: PathBuf,
    store: PathBuf,
    only: &[String],
    json: bool,
) -> Result<()> {
    let profiles: Vec<_> = if only.is_empty() {
        config.signals.clone()
    } else {
        only.iter()
            .map(|id| {
                config
                    .signal(id)
                    .cloned()
                    .with_context(|| format!("signal {} is not configured", id))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let trainer = EnsembleTrainer::new(config.trainer.clone())?;
    let history = CsvHistoryDirectory::new(history_dir);
    let store = JsonFileForecastStore::new(store);
    info!(signals = profiles.len(), store = %store.path().display(), "training");

    let report = train_batch(&trainer, &profiles, &history, &store);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

async fn detect(
    config: &GridcastConfig,
    history_dir: PathBuf,
    store: PathBuf,
    as_of: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let policies = config
        .policy_registry()
        .context("loading confidence policies")?;
    let evaluator = AnomalyEvaluator::new(
        Arc::new(CsvHistoryDirectory::new(history_dir)),
        Arc::new(JsonFileForecastStore::new(store)),
        Arc::new(policies),
        config.anomaly.clone(),
    )?;

    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let report = Dispatcher::new(Arc::new(evaluator)).dispatch(as_of).await;

    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }
    println!("{}", report.summary);
    for assessment in &report.assessments {
        println!(
            "  [{:<8}] {}",
            assessment.severity.to_string().to_uppercase(),
            assessment.narrative
        );
        if !assessment.disclaimer.is_empty() && assessment.forecast_value.is_some() {
            println!("             {}", assessment.disclaimer);
        }
    }
    Ok(())
}

fn policy(config: &GridcastConfig, source: Option<&str>) -> Result<()> {
    let registry: ConfidencePolicyRegistry = config
        .policy_registry()
        .context("loading confidence policies")?;

    let sources: Vec<&str> = match source {
        Some(source) => vec![source],
        None => registry.sources(),
    };
    for source in sources {
        let policy = registry.read_policy(source);
        let ceiling = policy
            .mape_ceiling
            .map(|m| format!("{:.0}%", m * 100.0))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<18} {:<14} mape<={:<5} intervals={:<5} {}",
            source,
            policy.tier.as_str(),
            ceiling,
            policy.use_intervals,
            registry.disclaimer_text(source)
        );
    }
    Ok(())
}
