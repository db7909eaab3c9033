//! Rollover accumulator search
//!
//! Bounded depth-first subset search over the eligible pool. Products that
//! overshoot the band are pruned, and a combination never holds two picks
//! from the same fixture.

use std::cmp::Ordering;

use prediction_core::PredictionRecord;
use serde::{Deserialize, Serialize};

use crate::categorizer::compare_picks;
use crate::error::{CategorizerError, CategorizerResult};
use crate::rules::BAND_EPSILON;

/// Bounds on the combination search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverSearch {
    /// Most picks allowed in one combination
    pub max_selections: usize,
    /// Only the strongest `max_pool` eligible picks are explored
    pub max_pool: usize,
    /// Combinations kept after ranking
    pub top_k: usize,
}

impl Default for RolloverSearch {
    fn default() -> Self {
        Self {
            max_selections: 4,
            max_pool: 20,
            top_k: 5,
        }
    }
}

impl RolloverSearch {
    pub fn validate(&self) -> CategorizerResult<()> {
        for (name, value) in [
            ("max_selections", self.max_selections),
            ("max_pool", self.max_pool),
            ("top_k", self.top_k),
        ] {
            if value == 0 {
                return Err(CategorizerError::InvalidRule {
                    category: "rollover".to_string(),
                    reason: format!("{name} must be at least 1"),
                });
            }
        }
        Ok(())
    }
}

/// A ranked accumulator candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverCombination {
    /// Picks in pool order (strongest first)
    pub selections: Vec<PredictionRecord>,
    /// Product of member odds, rounded to 2 decimals
    pub combined_odds: f64,
    /// Product of member confidences on a 0-100 scale, rounded to 2 decimals
    pub combined_confidence: f64,
    #[serde(default)]
    pub day_count: Option<u32>,
}

impl RolloverCombination {
    pub fn len(&self) -> usize {
        self.selections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn fixture_ids(&self) -> Vec<i64> {
        self.selections.iter().map(|s| s.fixture_id).collect()
    }
}

/// Unrounded candidate used while ranking
struct Candidate {
    indices: Vec<usize>,
    odds: f64,
    confidence: f64,
}

/// Find up to `search.top_k` combinations of `pool` whose odds product lies in
/// `[target - tolerance, target + tolerance]`.
///
/// Ranking: fewer selections, then higher combined confidence, then odds
/// closer to the target, then the selection keys in pool order.
pub fn search_combinations(
    pool: &[PredictionRecord],
    target: f64,
    tolerance: f64,
    search: &RolloverSearch,
    days: Option<u32>,
) -> Vec<RolloverCombination> {
    if pool.is_empty() || search.max_selections == 0 || search.top_k == 0 || !target.is_finite() {
        return Vec::new();
    }

    let mut ordered: Vec<&PredictionRecord> = pool
        .iter()
        .filter(|r| r.odds.is_finite() && r.odds > 0.0 && r.confidence.is_finite())
        .collect();
    ordered.sort_by(|a, b| compare_picks(a, b));
    ordered.truncate(search.max_pool);

    let lower = target - tolerance - BAND_EPSILON;
    let upper = target + tolerance + BAND_EPSILON;
    // With every factor >= 1 the product can only grow, so overshoot is final
    let monotone = ordered.iter().all(|r| r.odds >= 1.0);

    let mut found = Vec::new();
    let mut current = Vec::with_capacity(search.max_selections);
    explore(
        &ordered,
        0,
        1.0,
        1.0,
        &mut current,
        &Bounds {
            lower,
            upper,
            monotone,
            max_selections: search.max_selections,
        },
        &mut found,
    );

    found.sort_by(|a, b| rank(a, b, target));
    found.truncate(search.top_k);

    tracing::debug!(
        "Rollover search over {} picks (target {:.2} ± {:.2}) kept {} combinations",
        ordered.len(),
        target,
        tolerance,
        found.len()
    );

    found
        .into_iter()
        .map(|c| RolloverCombination {
            selections: c.indices.iter().map(|&i| ordered[i].clone()).collect(),
            combined_odds: round2(c.odds),
            combined_confidence: round2(c.confidence * 100.0),
            day_count: days,
        })
        .collect()
}

struct Bounds {
    lower: f64,
    upper: f64,
    monotone: bool,
    max_selections: usize,
}

fn explore(
    pool: &[&PredictionRecord],
    start: usize,
    odds: f64,
    confidence: f64,
    current: &mut Vec<usize>,
    bounds: &Bounds,
    found: &mut Vec<Candidate>,
) {
    for i in start..pool.len() {
        let pick = pool[i];
        if current.iter().any(|&j| pool[j].fixture_id == pick.fixture_id) {
            continue;
        }

        let next_odds = odds * pick.odds;
        if bounds.monotone && next_odds > bounds.upper {
            continue;
        }
        let next_confidence = confidence * (pick.confidence / 100.0);

        current.push(i);
        if next_odds >= bounds.lower && next_odds <= bounds.upper {
            found.push(Candidate {
                indices: current.clone(),
                odds: next_odds,
                confidence: next_confidence,
            });
        }
        if current.len() < bounds.max_selections {
            explore(pool, i + 1, next_odds, next_confidence, current, bounds, found);
        }
        current.pop();
    }
}

fn rank(a: &Candidate, b: &Candidate, target: f64) -> Ordering {
    a.indices
        .len()
        .cmp(&b.indices.len())
        .then(b.confidence.total_cmp(&a.confidence))
        .then((a.odds - target).abs().total_cmp(&(b.odds - target).abs()))
        // Indices refer to the sorted pool, so this compares selection keys
        .then(a.indices.cmp(&b.indices))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
