//! Heuristic Fallback Predictor
//!
//! Produces a plausible home/draw/away split from a fixed home-advantage prior
//! nudged by league positions, plus fixed over/under and BTTS picks. Used when
//! the classifier ensemble cannot produce a prediction for a fixture.

pub mod odds;

pub use odds::{calculate_odds, calculate_odds_with_margin};

use prediction_core::{
    FixtureContext, Market, PredictionError, PredictionOrigin, PredictionRecord, PredictionResult,
};
use serde::{Deserialize, Serialize};

use odds::round_to;

/// Heuristic constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Home win prior (home advantage)
    pub home_prior: f64,
    pub draw_prior: f64,
    pub away_prior: f64,
    /// Probability shifted per league place of difference
    pub rank_step: f64,
    /// Cap on the probability shifted by league positions
    pub max_rank_shift: f64,
    /// Fixed confidence of the Over 2.5 pick
    pub over_confidence: f64,
    /// Fixed confidence of the BTTS Yes pick
    pub btts_confidence: f64,
    /// Margin subtracted before converting confidence to odds
    pub bookmaker_margin: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            home_prior: 0.45,
            draw_prior: 0.25,
            away_prior: 0.30,
            rank_step: 0.01,
            max_rank_shift: 0.15,
            over_confidence: 0.55,
            btts_confidence: 0.60,
            bookmaker_margin: odds::BOOKMAKER_MARGIN,
        }
    }
}

/// Heuristic prediction for one fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackPrediction {
    pub fixture_id: i64,
    pub home: f64,
    pub draw: f64,
    pub away: f64,
    pub over_2_5: f64,
    pub btts_yes: f64,
    /// Match result pick followed by the fixed Over 2.5 and BTTS Yes picks
    pub records: Vec<PredictionRecord>,
}

impl FallbackPrediction {
    pub fn match_result(&self) -> Option<&PredictionRecord> {
        self.records.iter().find(|r| r.market == Market::MatchResult)
    }
}

/// Team-ranking heuristic predictor
#[derive(Debug, Clone)]
pub struct FallbackPredictor {
    config: FallbackConfig,
}

impl Default for FallbackPredictor {
    fn default() -> Self {
        Self {
            config: FallbackConfig::default(),
        }
    }
}

impl FallbackPredictor {
    pub fn new(config: FallbackConfig) -> PredictionResult<Self> {
        let priors = [config.home_prior, config.draw_prior, config.away_prior];
        if priors.iter().any(|p| !p.is_finite() || *p < 0.0) || priors.iter().sum::<f64>() <= 0.0 {
            return Err(PredictionError::InvalidProbabilities(
                "fallback priors must be non-negative and not all zero".to_string(),
            ));
        }
        if config.rank_step < 0.0 || config.max_rank_shift < 0.0 {
            return Err(PredictionError::InvalidProbabilities(
                "rank adjustment must be non-negative".to_string(),
            ));
        }
        for fixed in [config.over_confidence, config.btts_confidence] {
            if !(0.0..=1.0).contains(&fixed) {
                return Err(PredictionError::InvalidProbabilities(format!(
                    "fixed pick confidence {fixed} is outside [0, 1]"
                )));
            }
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.config
    }

    /// Build heuristic picks for a fixture
    pub fn predict(&self, fixture: &FixtureContext) -> PredictionResult<FallbackPrediction> {
        let (home, draw, away) = self.outcome_probabilities(fixture)?;
        let cfg = &self.config;

        let (label, confidence) = if home >= draw && home >= away {
            (Market::MatchResult.label_for(0), home)
        } else if draw >= away {
            (Market::MatchResult.label_for(1), draw)
        } else {
            (Market::MatchResult.label_for(2), away)
        };

        let ranking_note = match (fixture.home.league_position, fixture.away.league_position) {
            (Some(h), Some(a)) if h > 0 && a > 0 => format!("league positions {h} vs {a}"),
            _ => "no league positions".to_string(),
        };

        let records = vec![
            self.record(
                fixture.fixture_id,
                Market::MatchResult,
                label,
                confidence,
                format!(
                    "Fallback: home advantage prior with {} ({} {:.0}% / draw {:.0}% / {} {:.0}%)",
                    ranking_note,
                    fixture.home.name,
                    home * 100.0,
                    draw * 100.0,
                    fixture.away.name,
                    away * 100.0
                ),
            ),
            self.record(
                fixture.fixture_id,
                Market::OverUnder,
                Market::OverUnder.label_for(1),
                cfg.over_confidence,
                "Fallback: fixed Over 2.5 estimate".to_string(),
            ),
            self.record(
                fixture.fixture_id,
                Market::Btts,
                Market::Btts.label_for(1),
                cfg.btts_confidence,
                "Fallback: fixed BTTS estimate".to_string(),
            ),
        ];

        if records.iter().any(|r| !r.odds.is_finite() || !r.confidence.is_finite()) {
            return Err(PredictionError::FallbackFailed(format!(
                "fixture {}: non-finite odds or confidence",
                fixture.fixture_id
            )));
        }

        tracing::debug!(
            "Fallback for fixture {}: {} at {:.0}%",
            fixture.fixture_id,
            label,
            confidence * 100.0
        );

        Ok(FallbackPrediction {
            fixture_id: fixture.fixture_id,
            home,
            draw,
            away,
            over_2_5: cfg.over_confidence,
            btts_yes: cfg.btts_confidence,
            records,
        })
    }

    /// Home/draw/away probabilities after rank adjustment and renormalisation
    pub fn outcome_probabilities(&self, fixture: &FixtureContext) -> PredictionResult<(f64, f64, f64)> {
        let cfg = &self.config;
        let mut home = cfg.home_prior;
        let draw = cfg.draw_prior;
        let mut away = cfg.away_prior;

        // Position 0 means unranked, same as a missing position
        let ranked = |pos: Option<u32>| pos.filter(|p| *p > 0);
        if let (Some(home_pos), Some(away_pos)) =
            (ranked(fixture.home.league_position), ranked(fixture.away.league_position))
        {
            let rank_diff = home_pos.abs_diff(away_pos) as f64;
            let shift = (rank_diff * cfg.rank_step).min(cfg.max_rank_shift);
            // Lower position number is the stronger side
            if home_pos < away_pos {
                let moved = shift.min(away);
                home += moved;
                away -= moved;
            } else if away_pos < home_pos {
                let moved = shift.min(home);
                away += moved;
                home -= moved;
            }
        }

        let total = home + draw + away;
        if !total.is_finite() || total <= 0.0 {
            return Err(PredictionError::FallbackFailed(format!(
                "fixture {}: degenerate outcome probabilities",
                fixture.fixture_id
            )));
        }
        Ok((home / total, draw / total, away / total))
    }

    fn record(
        &self,
        fixture_id: i64,
        market: Market,
        label: &str,
        confidence: f64,
        explanation: String,
    ) -> PredictionRecord {
        PredictionRecord {
            fixture_id,
            market,
            label: label.to_string(),
            odds: calculate_odds_with_margin(confidence, self.config.bookmaker_margin),
            confidence: round_to(confidence * 100.0, 1),
            explanation,
            origin: PredictionOrigin::Heuristic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prediction_core::TeamInfo;

    fn fixture(home_pos: Option<u32>, away_pos: Option<u32>) -> FixtureContext {
        FixtureContext {
            fixture_id: 42,
            home: TeamInfo {
                name: "Leeds".to_string(),
                league_position: home_pos,
            },
            away: TeamInfo {
                name: "Burnley".to_string(),
                league_position: away_pos,
            },
            kickoff: None,
            league: None,
        }
    }

    #[test]
    fn test_prior_without_rankings() {
        let predictor = FallbackPredictor::default();
        let prediction = predictor.predict(&fixture(None, None)).unwrap();

        assert!((prediction.home - 0.45).abs() < 1e-12);
        assert!((prediction.draw - 0.25).abs() < 1e-12);
        assert!((prediction.away - 0.30).abs() < 1e-12);

        let pick = prediction.match_result().unwrap();
        assert_eq!(pick.label, "Home Win");
        assert_eq!(pick.confidence, 45.0);
        assert_eq!(pick.odds, calculate_odds(0.45));
        assert_eq!(pick.origin, PredictionOrigin::Heuristic);
    }

    #[test]
    fn test_rank_adjustment_favours_higher_ranked_team() {
        let predictor = FallbackPredictor::default();

        // Home 2nd vs away 7th: 5 places -> 0.05 shifted to home
        let (home, draw, away) = predictor.outcome_probabilities(&fixture(Some(2), Some(7))).unwrap();
        assert!((home - 0.50).abs() < 1e-12);
        assert!((draw - 0.25).abs() < 1e-12);
        assert!((away - 0.25).abs() < 1e-12);

        // Away top, home bottom: shift is capped at 0.15
        let (home, draw, away) = predictor.outcome_probabilities(&fixture(Some(20), Some(1))).unwrap();
        assert!((home - 0.30).abs() < 1e-12);
        assert!((draw - 0.25).abs() < 1e-12);
        assert!((away - 0.45).abs() < 1e-12);
        assert!((home + draw + away - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_away_pick_when_away_is_much_stronger() {
        let predictor = FallbackPredictor::default();
        let prediction = predictor.predict(&fixture(Some(18), Some(2))).unwrap();
        let pick = prediction.match_result().unwrap();
        assert_eq!(pick.label, "Away Win");
        assert!(pick.explanation.contains("18 vs 2"));
    }

    #[test]
    fn test_fixed_auxiliary_picks() {
        let predictor = FallbackPredictor::default();
        let prediction = predictor.predict(&fixture(Some(3), Some(9))).unwrap();
        assert_eq!(prediction.records.len(), 3);

        let over = &prediction.records[1];
        assert_eq!(over.market, Market::OverUnder);
        assert_eq!(over.label, "Over 2.5");
        assert_eq!(over.confidence, 55.0);
        assert_eq!(over.odds, 2.22);

        let btts = &prediction.records[2];
        assert_eq!(btts.label, "BTTS Yes");
        assert_eq!(btts.confidence, 60.0);
        assert_eq!(btts.odds, 2.0);
    }

    #[test]
    fn test_position_zero_is_treated_as_unranked() {
        let predictor = FallbackPredictor::default();
        let prediction = predictor.predict(&fixture(Some(0), Some(5))).unwrap();

        assert!((prediction.home - 0.45).abs() < 1e-12);
        assert!((prediction.away - 0.30).abs() < 1e-12);
        let pick = prediction.match_result().unwrap();
        assert_eq!(pick.label, "Home Win");
        assert!(pick.explanation.contains("no league positions"));
    }

    #[test]
    fn test_non_finite_odds_fail() {
        let predictor = FallbackPredictor::new(FallbackConfig {
            bookmaker_margin: f64::NAN,
            ..FallbackConfig::default()
        })
        .unwrap();
        let err = predictor.predict(&fixture(None, None)).unwrap_err();
        assert!(matches!(err, PredictionError::FallbackFailed(_)));
    }

    #[test]
    fn test_config_validation() {
        let bad = FallbackConfig {
            btts_confidence: 1.3,
            ..FallbackConfig::default()
        };
        assert!(FallbackPredictor::new(bad).is_err());
        assert!(FallbackPredictor::new(FallbackConfig::default()).is_ok());
    }
}
