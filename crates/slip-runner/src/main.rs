use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use confidence_calibrator::{CalibratorStore, TrainingResult};
use fallback_predictor::FallbackPredictor;
use prediction_core::FixturePrediction;
use prediction_orchestrator::{CalibratorSet, PredictionOutcome, PredictionService, StaticSource};
use serde::Serialize;
use slip_categorizer::{CategorizedSlips, CategoryRules, SlipCategorizer};

mod config;
mod input;

use config::RunnerConfig;
use input::{FixtureInput, HistorySample};

const USAGE: &str = "usage: slip-runner <train HISTORY.json | predict FIXTURES.json>";

enum Command {
    Train(PathBuf),
    Predict(PathBuf),
}

impl Command {
    fn from_args(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let command = args.next().context(USAGE)?;
        let path = args.next().map(PathBuf::from).context(USAGE)?;
        match command.as_str() {
            "train" => Ok(Command::Train(path)),
            "predict" => Ok(Command::Predict(path)),
            other => anyhow::bail!("unknown command '{other}'\n{USAGE}"),
        }
    }
}

#[derive(Serialize)]
struct Unavailable {
    fixture_id: i64,
    reason: String,
}

#[derive(Serialize)]
struct PredictReport {
    predictions: Vec<FixturePrediction>,
    fallback_fixtures: Vec<i64>,
    unavailable: Vec<Unavailable>,
    slips: CategorizedSlips,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    // Logs go to stderr so stdout stays machine-readable
    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    let command = Command::from_args(std::env::args().skip(1))?;
    let config = RunnerConfig::from_env()?;
    tracing::info!(
        "Model '{}' with {} calibration, store {}",
        config.model_name,
        config.calibration_method,
        config.database_url
    );

    sqlx::any::install_default_drivers();
    let pool = sqlx::AnyPool::connect(&config.database_url)
        .await
        .with_context(|| format!("Failed to open {}", config.database_url))?;
    let store = CalibratorStore::new(pool);
    store
        .init_schema()
        .await
        .context("Failed to create calibrator table")?;

    match command {
        Command::Train(path) => train(&config, &store, path).await,
        Command::Predict(path) => predict(&config, &store, path).await,
    }
}

async fn train(config: &RunnerConfig, store: &CalibratorStore, path: PathBuf) -> Result<()> {
    let samples: Vec<HistorySample> = input::read_json(&path)?;
    tracing::info!("Loaded {} historical samples from {}", samples.len(), path.display());

    let mut calibrators = CalibratorSet::new(&config.model_name, config.calibration_method);
    let mut results = Vec::new();
    for (market, (labels, batch)) in input::training_sets(&samples) {
        let result = calibrators.train(market, &labels, &batch);
        if let TrainingResult::Failed { message } = &result {
            tracing::warn!("Training {} calibrator failed: {}", market, message);
        }
        results.push((market, result));
    }

    let saved = calibrators.save_all(store).await;
    tracing::info!("Saved {} calibrators", saved);

    let report: Vec<_> = results
        .into_iter()
        .map(|(market, result)| serde_json::json!({ "market": market, "result": result }))
        .collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn predict(config: &RunnerConfig, store: &CalibratorStore, path: PathBuf) -> Result<()> {
    let fixtures: Vec<FixtureInput> = input::read_json(&path)?;
    let rules = CategoryRules::from_env().context("Invalid slip category configuration")?;

    let mut calibrators = CalibratorSet::new(&config.model_name, config.calibration_method);
    calibrators.load_all(store).await;

    let source = StaticSource::new(fixtures.iter().flat_map(|f| f.raw_predictions()));
    let service = PredictionService::new(calibrators, FallbackPredictor::default())
        .with_source(Arc::new(source));

    let contexts: Vec<_> = fixtures.into_iter().map(|f| f.fixture).collect();
    let outcomes = service.predict_all(&contexts).await;

    let mut report = PredictReport {
        predictions: Vec::new(),
        fallback_fixtures: Vec::new(),
        unavailable: Vec::new(),
        slips: CategorizedSlips::default(),
    };
    for outcome in outcomes {
        match outcome {
            PredictionOutcome::Primary(prediction) => report.predictions.push(prediction),
            PredictionOutcome::Fallback { prediction, .. } => {
                report.fallback_fixtures.push(prediction.fixture_id);
                report.predictions.push(prediction);
            }
            PredictionOutcome::Unavailable { fixture_id, reason } => {
                report.unavailable.push(Unavailable { fixture_id, reason })
            }
        }
    }

    report.slips = SlipCategorizer::new(rules).categorize(&report.predictions);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
