use std::cmp::Ordering;
use std::collections::BTreeMap;

use prediction_core::{FixturePrediction, PredictionRecord};
use serde::{Deserialize, Serialize};

use crate::rollover::{search_combinations, RolloverCombination};
use crate::rules::{CategoryKey, CategoryRules, OddsCategoryRule};

/// Pick ordering used everywhere a category ranks candidates.
///
/// Confidence descending, then odds ascending, then fixture id, market and
/// label so equal picks never depend on input order.
pub fn compare_picks(a: &PredictionRecord, b: &PredictionRecord) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.odds.total_cmp(&b.odds))
        .then(a.fixture_id.cmp(&b.fixture_id))
        .then(a.market.cmp(&b.market))
        .then(a.label.cmp(&b.label))
}

/// Output of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategorySlip {
    Singles {
        picks: Vec<PredictionRecord>,
    },
    Rollover {
        combinations: Vec<RolloverCombination>,
        /// Full filtered pool, for inspection
        eligible: Vec<PredictionRecord>,
        #[serde(default)]
        days: Option<u32>,
    },
}

impl CategorySlip {
    /// Records selected for the slip (rollover: the eligible pool)
    pub fn picks(&self) -> &[PredictionRecord] {
        match self {
            CategorySlip::Singles { picks } => picks,
            CategorySlip::Rollover { eligible, .. } => eligible,
        }
    }

    pub fn combinations(&self) -> &[RolloverCombination] {
        match self {
            CategorySlip::Singles { .. } => &[],
            CategorySlip::Rollover { combinations, .. } => combinations,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CategorySlip::Singles { picks } => picks.is_empty(),
            CategorySlip::Rollover { combinations, .. } => combinations.is_empty(),
        }
    }
}

/// Slips for every configured category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedSlips {
    pub categories: BTreeMap<CategoryKey, CategorySlip>,
}

impl CategorizedSlips {
    pub fn get(&self, key: CategoryKey) -> Option<&CategorySlip> {
        self.categories.get(&key)
    }

    pub fn picks(&self, key: CategoryKey) -> &[PredictionRecord] {
        self.get(key).map(CategorySlip::picks).unwrap_or(&[])
    }

    /// Per-category counts: singles count picks, rollover counts combinations
    pub fn summary(&self) -> BTreeMap<CategoryKey, usize> {
        self.categories
            .iter()
            .map(|(key, slip)| {
                let count = match slip {
                    CategorySlip::Singles { picks } => picks.len(),
                    CategorySlip::Rollover { combinations, .. } => combinations.len(),
                };
                (*key, count)
            })
            .collect()
    }
}

/// Builds category slips from per-fixture predictions
#[derive(Debug, Clone, Default)]
pub struct SlipCategorizer {
    rules: CategoryRules,
}

impl SlipCategorizer {
    pub fn new(rules: CategoryRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &CategoryRules {
        &self.rules
    }

    /// Run every category over the same input. Empty input gives empty slips.
    pub fn categorize(&self, fixtures: &[FixturePrediction]) -> CategorizedSlips {
        let categories = self
            .rules
            .iter()
            .map(|(key, rule)| (key, self.categorize_one(key, rule, fixtures)))
            .collect();

        let slips = CategorizedSlips { categories };
        tracing::info!(
            "Categorized {} fixtures: {:?}",
            fixtures.len(),
            slips.summary()
        );
        slips
    }

    /// Each fixture contributes at most its best pick that passes the rule
    fn categorize_one(
        &self,
        key: CategoryKey,
        rule: &OddsCategoryRule,
        fixtures: &[FixturePrediction],
    ) -> CategorySlip {
        let mut eligible: Vec<PredictionRecord> = fixtures
            .iter()
            .filter_map(|f| f.best_pick_where(|r| rule.accepts(r)))
            .cloned()
            .collect();
        eligible.sort_by(compare_picks);

        tracing::debug!("Category {}: {} eligible picks", key, eligible.len());

        if key.is_rollover() {
            let combinations = match rule.target_combined_odds {
                Some(target) => search_combinations(
                    &eligible,
                    target,
                    rule.tolerance,
                    self.rules.rollover_search(),
                    rule.days,
                ),
                None => Vec::new(),
            };
            CategorySlip::Rollover {
                combinations,
                eligible,
                days: rule.days,
            }
        } else {
            if let Some(limit) = rule.limit {
                eligible.truncate(limit);
            }
            CategorySlip::Singles { picks: eligible }
        }
    }
}
