use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{PredictionError, PredictionResult};

/// Tolerance used when checking that a probability vector sums to one
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-3;

/// Betting market a classifier produces probabilities for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    MatchResult,
    OverUnder,
    Btts,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::MatchResult, Market::OverUnder, Market::Btts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::MatchResult => "match_result",
            Market::OverUnder => "over_under",
            Market::Btts => "btts",
        }
    }

    /// Human-readable prediction type
    pub fn display_name(&self) -> &'static str {
        match self {
            Market::MatchResult => "Match Result",
            Market::OverUnder => "Over/Under",
            Market::Btts => "BTTS",
        }
    }

    /// Labels for each class index, in classifier output order
    pub fn class_labels(&self) -> &'static [&'static str] {
        match self {
            Market::MatchResult => &["Home Win", "Draw", "Away Win"],
            Market::OverUnder => &["Under 2.5", "Over 2.5"],
            Market::Btts => &["BTTS No", "BTTS Yes"],
        }
    }

    pub fn label_for(&self, class: usize) -> &'static str {
        self.class_labels().get(class).copied().unwrap_or("Unknown")
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "match_result" | "1x2" => Ok(Market::MatchResult),
            "over_under" | "ou" => Ok(Market::OverUnder),
            "btts" => Ok(Market::Btts),
            other => Err(PredictionError::UnknownMarket(other.to_string())),
        }
    }
}

/// A batch of classifier outputs.
///
/// Multi-class rows are full probability vectors; binary entries are the
/// positive-class probability on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbabilityBatch {
    MultiClass(Vec<Vec<f64>>),
    Binary(Vec<f64>),
}

impl ProbabilityBatch {
    pub fn len(&self) -> usize {
        match self {
            ProbabilityBatch::MultiClass(rows) => rows.len(),
            ProbabilityBatch::Binary(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Top-pick probability per sample (row max, or the scalar itself for binary input)
    pub fn top_probabilities(&self) -> Vec<f64> {
        match self {
            ProbabilityBatch::MultiClass(rows) => rows.iter().map(|row| row_max(row).1).collect(),
            ProbabilityBatch::Binary(values) => values.clone(),
        }
    }
}

/// Index and value of the largest entry. Earlier classes win ties.
pub fn row_max(row: &[f64]) -> (usize, f64) {
    row.iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, p)| if p > best.1 { (i, p) } else { best })
}

/// Classifier output for one fixture and one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPrediction {
    pub fixture_id: i64,
    pub market: Market,
    pub probabilities: Vec<f64>,
}

impl RawPrediction {
    pub fn new(fixture_id: i64, market: Market, probabilities: Vec<f64>) -> PredictionResult<Self> {
        let prediction = Self {
            fixture_id,
            market,
            probabilities,
        };
        prediction.validate()?;
        Ok(prediction)
    }

    /// Checks class count, finiteness and normalisation
    pub fn validate(&self) -> PredictionResult<()> {
        let expected = self.market.class_labels().len();
        if self.probabilities.len() != expected {
            return Err(PredictionError::InvalidProbabilities(format!(
                "{} expects {} classes, got {}",
                self.market,
                expected,
                self.probabilities.len()
            )));
        }
        if self
            .probabilities
            .iter()
            .any(|p| !p.is_finite() || *p < 0.0 || *p > 1.0)
        {
            return Err(PredictionError::InvalidProbabilities(format!(
                "fixture {}: probabilities must be within [0, 1]",
                self.fixture_id
            )));
        }
        let sum: f64 = self.probabilities.iter().sum();
        if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(PredictionError::InvalidProbabilities(format!(
                "fixture {}: probabilities sum to {:.4}",
                self.fixture_id, sum
            )));
        }
        Ok(())
    }

    /// Predicted class index and its probability
    pub fn top_class(&self) -> (usize, f64) {
        row_max(&self.probabilities)
    }
}

/// Where a prediction record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionOrigin {
    /// Calibrated output of the classifier ensemble
    Ensemble,
    /// Team-ranking heuristic used when the ensemble is unavailable
    Heuristic,
}

/// One market pick for one fixture, ready for categorization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub fixture_id: i64,
    pub market: Market,
    /// Predicted outcome label (e.g. "Home Win", "Over 2.5")
    pub label: String,
    /// Quoted decimal odds derived from confidence
    pub odds: f64,
    /// Calibrated confidence on a 0-100 scale
    pub confidence: f64,
    pub explanation: String,
    pub origin: PredictionOrigin,
}

/// Team as seen by the prediction pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    /// Current league position (1 = top of the table)
    #[serde(default)]
    pub league_position: Option<u32>,
}

/// Fixture metadata handed to prediction sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureContext {
    pub fixture_id: i64,
    pub home: TeamInfo,
    pub away: TeamInfo,
    #[serde(default)]
    pub kickoff: Option<DateTime<Utc>>,
    #[serde(default)]
    pub league: Option<String>,
}

/// All picks produced for one fixture in a prediction run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixturePrediction {
    pub fixture_id: i64,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub kickoff: Option<DateTime<Utc>>,
    pub records: Vec<PredictionRecord>,
}

impl FixturePrediction {
    pub fn new(fixture: &FixtureContext, records: Vec<PredictionRecord>) -> Self {
        Self {
            fixture_id: fixture.fixture_id,
            home_team: fixture.home.name.clone(),
            away_team: fixture.away.name.clone(),
            kickoff: fixture.kickoff,
            records,
        }
    }

    /// Highest-confidence pick, preferring lower odds at equal confidence
    pub fn best_pick(&self) -> Option<&PredictionRecord> {
        self.best_pick_where(|_| true)
    }

    /// Best pick among the records accepted by `filter`
    pub fn best_pick_where<F>(&self, filter: F) -> Option<&PredictionRecord>
    where
        F: Fn(&PredictionRecord) -> bool,
    {
        self.records.iter().filter(|r| filter(r)).min_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then(a.odds.total_cmp(&b.odds))
                .then(a.market.cmp(&b.market))
                .then(a.label.cmp(&b.label))
        })
    }
}
