use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use prediction_core::{FixtureContext, Market, ProbabilityBatch, RawPrediction};
use serde::{Deserialize, Serialize};

/// One labelled historical classifier output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySample {
    pub market: Market,
    /// Index of the class that actually happened
    pub label: usize,
    pub probabilities: Vec<f64>,
}

/// Classifier output attached to a fixture in the predict input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketProbabilities {
    pub market: Market,
    pub probabilities: Vec<f64>,
}

/// Fixture plus whatever the ensemble produced for it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureInput {
    #[serde(flatten)]
    pub fixture: FixtureContext,
    /// Empty when the ensemble had nothing for this fixture
    #[serde(default)]
    pub markets: Vec<MarketProbabilities>,
}

impl FixtureInput {
    pub fn raw_predictions(&self) -> impl Iterator<Item = RawPrediction> + '_ {
        self.markets.iter().map(|m| RawPrediction {
            fixture_id: self.fixture.fixture_id,
            market: m.market,
            probabilities: m.probabilities.clone(),
        })
    }
}

pub fn read_json<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Split history into per-market (labels, probabilities) training sets
pub fn training_sets(samples: &[HistorySample]) -> BTreeMap<Market, (Vec<usize>, ProbabilityBatch)> {
    let mut grouped: BTreeMap<Market, (Vec<usize>, Vec<Vec<f64>>)> = BTreeMap::new();
    for sample in samples {
        let entry = grouped.entry(sample.market).or_default();
        entry.0.push(sample.label);
        entry.1.push(sample.probabilities.clone());
    }
    grouped
        .into_iter()
        .map(|(market, (labels, rows))| (market, (labels, ProbabilityBatch::MultiClass(rows))))
        .collect()
}
