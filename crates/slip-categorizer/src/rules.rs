use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use prediction_core::PredictionRecord;
use serde::{Deserialize, Serialize};

use crate::error::{CategorizerError, CategorizerResult};
use crate::rollover::RolloverSearch;

/// Slack applied to band comparisons so products like 1.45 * 2.0 land on 2.9
pub(crate) const BAND_EPSILON: f64 = 1e-9;

/// Named betting category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CategoryKey {
    #[serde(rename = "2_odds")]
    TwoOdds,
    #[serde(rename = "5_odds")]
    FiveOdds,
    #[serde(rename = "10_odds")]
    TenOdds,
    #[serde(rename = "rollover")]
    Rollover,
}

impl CategoryKey {
    pub const ALL: [CategoryKey; 4] = [
        CategoryKey::TwoOdds,
        CategoryKey::FiveOdds,
        CategoryKey::TenOdds,
        CategoryKey::Rollover,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKey::TwoOdds => "2_odds",
            CategoryKey::FiveOdds => "5_odds",
            CategoryKey::TenOdds => "10_odds",
            CategoryKey::Rollover => "rollover",
        }
    }

    pub fn is_rollover(&self) -> bool {
        matches!(self, CategoryKey::Rollover)
    }

    /// Prefix of the environment variables overriding this category's rule
    fn env_prefix(&self) -> &'static str {
        match self {
            CategoryKey::TwoOdds => "SLIP_2_ODDS",
            CategoryKey::FiveOdds => "SLIP_5_ODDS",
            CategoryKey::TenOdds => "SLIP_10_ODDS",
            CategoryKey::Rollover => "SLIP_ROLLOVER",
        }
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKey {
    type Err = CategorizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| CategorizerError::InvalidConfig {
                name: "category".to_string(),
                value: s.to_string(),
            })
    }
}

/// Selection rule for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsCategoryRule {
    pub min_odds: f64,
    pub max_odds: f64,
    /// Confidence floor on the 0-100 scale
    pub min_confidence: f64,
    /// Maximum singles returned; `None` keeps every qualifying pick
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub target_combined_odds: Option<f64>,
    /// Accepted distance of a combination's odds from the target
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    /// Rollover only: number of days the accumulator runs
    #[serde(default)]
    pub days: Option<u32>,
}

fn default_tolerance() -> f64 {
    0.1
}

impl OddsCategoryRule {
    pub fn singles(min_odds: f64, max_odds: f64, min_confidence: f64, limit: usize, target: f64) -> Self {
        Self {
            min_odds,
            max_odds,
            min_confidence,
            limit: Some(limit),
            target_combined_odds: Some(target),
            tolerance: default_tolerance(),
            days: None,
        }
    }

    /// Bounds are inclusive on both odds and confidence
    pub fn accepts(&self, record: &PredictionRecord) -> bool {
        record.odds >= self.min_odds
            && record.odds <= self.max_odds
            && record.confidence >= self.min_confidence
    }

    pub fn validate(&self, category: CategoryKey) -> CategorizerResult<()> {
        let invalid = |reason: String| CategorizerError::InvalidRule {
            category: category.to_string(),
            reason,
        };

        if !self.min_odds.is_finite() || !self.max_odds.is_finite() {
            return Err(invalid("odds bounds must be finite".to_string()));
        }
        if self.min_odds >= self.max_odds {
            return Err(invalid(format!(
                "min_odds {} must be below max_odds {}",
                self.min_odds, self.max_odds
            )));
        }
        if !(0.0..=100.0).contains(&self.min_confidence) {
            return Err(invalid(format!(
                "min_confidence {} is outside [0, 100]",
                self.min_confidence
            )));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(invalid(format!("tolerance {} must be >= 0", self.tolerance)));
        }
        if let Some(target) = self.target_combined_odds {
            if !target.is_finite() || target <= 0.0 {
                return Err(invalid(format!("target_combined_odds {target} must be positive")));
            }
        }
        if category.is_rollover() && self.target_combined_odds.is_none() {
            return Err(invalid("rollover needs target_combined_odds".to_string()));
        }
        Ok(())
    }
}

/// The full category table plus rollover search bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedRules")]
pub struct CategoryRules {
    rules: BTreeMap<CategoryKey, OddsCategoryRule>,
    rollover_search: RolloverSearch,
}

/// Deserialized table before validation
#[derive(Deserialize)]
struct UncheckedRules {
    rules: BTreeMap<CategoryKey, OddsCategoryRule>,
    #[serde(default)]
    rollover_search: RolloverSearch,
}

impl TryFrom<UncheckedRules> for CategoryRules {
    type Error = CategorizerError;

    fn try_from(unchecked: UncheckedRules) -> Result<Self, Self::Error> {
        CategoryRules::new(unchecked.rules, unchecked.rollover_search)
    }
}

impl Default for CategoryRules {
    fn default() -> Self {
        let mut rules = BTreeMap::new();
        rules.insert(
            CategoryKey::TwoOdds,
            OddsCategoryRule::singles(1.5, 2.5, 70.0, 5, 2.0),
        );
        rules.insert(
            CategoryKey::FiveOdds,
            OddsCategoryRule::singles(2.5, 5.0, 60.0, 3, 5.0),
        );
        rules.insert(
            CategoryKey::TenOdds,
            OddsCategoryRule::singles(5.0, 10.0, 50.0, 2, 10.0),
        );
        rules.insert(
            CategoryKey::Rollover,
            OddsCategoryRule {
                min_odds: 1.2,
                max_odds: 1.8,
                min_confidence: 75.0,
                limit: None,
                target_combined_odds: Some(3.0),
                tolerance: 0.1,
                days: Some(10),
            },
        );

        Self {
            rules,
            rollover_search: RolloverSearch::default(),
        }
    }
}

impl CategoryRules {
    pub fn new(
        rules: BTreeMap<CategoryKey, OddsCategoryRule>,
        rollover_search: RolloverSearch,
    ) -> CategorizerResult<Self> {
        for (key, rule) in &rules {
            rule.validate(*key)?;
        }
        rollover_search.validate()?;
        Ok(Self {
            rules,
            rollover_search,
        })
    }

    /// Defaults overridden by `SLIP_<CATEGORY>_<FIELD>` environment variables
    pub fn from_env() -> CategorizerResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable name
    pub fn from_lookup<F>(lookup: F) -> CategorizerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let mut rules = BTreeMap::new();

        for (key, rule) in defaults.rules {
            let prefix = key.env_prefix();
            let var = |field: &str| format!("{prefix}_{field}");
            let rule = OddsCategoryRule {
                min_odds: override_value(&lookup, &var("MIN_ODDS"), rule.min_odds)?,
                max_odds: override_value(&lookup, &var("MAX_ODDS"), rule.max_odds)?,
                min_confidence: override_value(&lookup, &var("MIN_CONFIDENCE"), rule.min_confidence)?,
                limit: override_option(&lookup, &var("LIMIT"), rule.limit)?,
                target_combined_odds: override_option(
                    &lookup,
                    &var("TARGET_ODDS"),
                    rule.target_combined_odds,
                )?,
                tolerance: override_value(&lookup, &var("TOLERANCE"), rule.tolerance)?,
                days: override_option(&lookup, &var("DAYS"), rule.days)?,
            };
            rules.insert(key, rule);
        }

        let search = defaults.rollover_search;
        let rollover_search = RolloverSearch {
            max_selections: override_value(
                &lookup,
                "SLIP_ROLLOVER_MAX_SELECTIONS",
                search.max_selections,
            )?,
            max_pool: override_value(&lookup, "SLIP_ROLLOVER_MAX_POOL", search.max_pool)?,
            top_k: override_value(&lookup, "SLIP_ROLLOVER_TOP_K", search.top_k)?,
        };

        Self::new(rules, rollover_search)
    }

    /// Replace one category's rule at runtime
    pub fn with_rule(mut self, key: CategoryKey, rule: OddsCategoryRule) -> CategorizerResult<Self> {
        rule.validate(key)?;
        self.rules.insert(key, rule);
        Ok(self)
    }

    /// Drop a category entirely
    pub fn without(mut self, key: CategoryKey) -> Self {
        self.rules.remove(&key);
        self
    }

    pub fn get(&self, key: CategoryKey) -> Option<&OddsCategoryRule> {
        self.rules.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryKey, &OddsCategoryRule)> {
        self.rules.iter().map(|(k, r)| (*k, r))
    }

    pub fn rollover_search(&self) -> &RolloverSearch {
        &self.rollover_search
    }
}

fn override_value<T, F>(lookup: &F, name: &str, current: T) -> CategorizerResult<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|_| CategorizerError::InvalidConfig {
                name: name.to_string(),
                value: raw,
            })
        }
        _ => Ok(current),
    }
}

/// Like `override_value`, but "none" clears the setting
fn override_option<T, F>(lookup: &F, name: &str, current: Option<T>) -> CategorizerResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if raw.trim().eq_ignore_ascii_case("none") => Ok(None),
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CategorizerError::InvalidConfig {
                name: name.to_string(),
                value: raw,
            }),
        _ => Ok(current),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let rules = CategoryRules::default();
        for (key, rule) in rules.iter() {
            rule.validate(key).unwrap();
        }
        assert_eq!(rules.iter().count(), 4);
        let rollover = rules.get(CategoryKey::Rollover).unwrap();
        assert_eq!(rollover.target_combined_odds, Some(3.0));
        assert_eq!(rollover.tolerance, 0.1);
    }

    #[test]
    fn test_rule_validation() {
        let mut rule = OddsCategoryRule::singles(2.0, 1.5, 70.0, 5, 2.0);
        assert!(rule.validate(CategoryKey::TwoOdds).is_err());

        rule = OddsCategoryRule::singles(1.5, 2.5, 120.0, 5, 2.0);
        assert!(rule.validate(CategoryKey::TwoOdds).is_err());

        rule = OddsCategoryRule::singles(1.5, 2.5, 70.0, 5, 2.0);
        rule.tolerance = -0.5;
        assert!(rule.validate(CategoryKey::TwoOdds).is_err());

        rule = OddsCategoryRule::singles(1.5, 2.5, 70.0, 5, 2.0);
        rule.target_combined_odds = None;
        assert!(rule.validate(CategoryKey::TwoOdds).is_ok());
        assert!(rule.validate(CategoryKey::Rollover).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let rules = CategoryRules::from_lookup(lookup_from(&[
            ("SLIP_ROLLOVER_TARGET_ODDS", "5.0"),
            ("SLIP_ROLLOVER_TOLERANCE", "0.25"),
            ("SLIP_2_ODDS_MIN_CONFIDENCE", "65"),
            ("SLIP_10_ODDS_LIMIT", "none"),
            ("SLIP_ROLLOVER_TOP_K", "3"),
        ]))
        .unwrap();

        let rollover = rules.get(CategoryKey::Rollover).unwrap();
        assert_eq!(rollover.target_combined_odds, Some(5.0));
        assert_eq!(rollover.tolerance, 0.25);
        assert_eq!(rules.get(CategoryKey::TwoOdds).unwrap().min_confidence, 65.0);
        assert_eq!(rules.get(CategoryKey::TenOdds).unwrap().limit, None);
        assert_eq!(rules.rollover_search().top_k, 3);
    }

    #[test]
    fn test_env_override_errors() {
        let err = CategoryRules::from_lookup(lookup_from(&[("SLIP_5_ODDS_MAX_ODDS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, CategorizerError::InvalidConfig { .. }));

        // Parses, but breaks min < max
        let err = CategoryRules::from_lookup(lookup_from(&[("SLIP_5_ODDS_MAX_ODDS", "2.0")]))
            .unwrap_err();
        assert!(matches!(err, CategorizerError::InvalidRule { .. }));
    }

    #[test]
    fn test_runtime_rule_replacement() {
        let rules = CategoryRules::default()
            .with_rule(CategoryKey::TwoOdds, OddsCategoryRule::singles(1.4, 2.2, 80.0, 3, 2.0))
            .unwrap()
            .without(CategoryKey::TenOdds);
        assert_eq!(rules.get(CategoryKey::TwoOdds).unwrap().limit, Some(3));
        assert!(rules.get(CategoryKey::TenOdds).is_none());
    }

    #[test]
    fn test_deserialized_rules_are_validated() {
        let json = serde_json::to_value(CategoryRules::default()).unwrap();
        let parsed: CategoryRules = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(parsed, CategoryRules::default());

        let mut inverted = json;
        inverted["rules"]["5_odds"]["min_odds"] = serde_json::json!(6.0);
        assert!(serde_json::from_value::<CategoryRules>(inverted).is_err());
    }

    #[test]
    fn test_category_key_names() {
        assert_eq!("10_odds".parse::<CategoryKey>().unwrap(), CategoryKey::TenOdds);
        assert!("20_odds".parse::<CategoryKey>().is_err());
        assert_eq!(serde_json::to_string(&CategoryKey::TwoOdds).unwrap(), "\"2_odds\"");
    }
}
