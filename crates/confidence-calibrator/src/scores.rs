//! Percentage score recalibration
//!
//! Fixed per-market corrections for known over/under-confidence, used when no
//! trained calibrator is available.

use std::str::FromStr;

use prediction_core::Market;
use serde::{Deserialize, Serialize};

/// Model family whose bias the recalibration corrects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreModelType {
    MatchResult,
    OverUnder,
    Btts,
    Default,
}

impl ScoreModelType {
    /// (a, b) parameters: `a` is the logit temperature, `b` the logit offset
    pub fn parameters(&self) -> (f64, f64) {
        match self {
            // Overconfident: flatten towards 0.5
            ScoreModelType::MatchResult => (1.5, -0.3),
            ScoreModelType::OverUnder => (1.2, -0.1),
            // Underconfident: sharpen away from 0.5
            ScoreModelType::Btts => (0.9, 0.1),
            ScoreModelType::Default => (1.0, 0.0),
        }
    }

    /// Recalibrate one 0-100 score
    pub fn recalibrate(&self, score: f64) -> u8 {
        if !score.is_finite() {
            return 0;
        }
        let (a, b) = self.parameters();
        let p = (score / 100.0).clamp(0.001, 0.999);
        let logit = (p / (1.0 - p)).ln();
        let calibrated = 100.0 / (1.0 + (-(logit / a - b)).exp());
        calibrated.clamp(0.0, 100.0).round() as u8
    }
}

impl From<Market> for ScoreModelType {
    fn from(market: Market) -> Self {
        match market {
            Market::MatchResult => ScoreModelType::MatchResult,
            Market::OverUnder => ScoreModelType::OverUnder,
            Market::Btts => ScoreModelType::Btts,
        }
    }
}

impl FromStr for ScoreModelType {
    type Err = std::convert::Infallible;

    /// Unknown model types map to `Default` (no correction)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "match_result" => ScoreModelType::MatchResult,
            "over_under" => ScoreModelType::OverUnder,
            "btts" => ScoreModelType::Btts,
            _ => ScoreModelType::Default,
        })
    }
}

/// Apply the fixed sigmoid recalibration for `model_type` to a list of 0-100 scores.
/// Results are clamped to [0, 100] and rounded to the nearest integer.
pub fn calibrate_confidence_scores(raw_scores: &[f64], model_type: &str) -> Vec<u8> {
    let model = model_type
        .parse::<ScoreModelType>()
        .unwrap_or(ScoreModelType::Default);
    raw_scores.iter().map(|s| model.recalibrate(*s)).collect()
}
