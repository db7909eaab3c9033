use std::sync::Arc;

use confidence_calibrator::ScoreModelType;
use fallback_predictor::{calculate_odds, FallbackPredictor};
use prediction_core::{
    FixtureContext, FixturePrediction, PredictionError, PredictionOrigin, PredictionRecord,
    PredictionResult, PredictionSource, ProbabilityBatch, RawPrediction,
};
use serde::{Deserialize, Serialize};

use crate::calibrators::CalibratorSet;

/// What the pipeline produced for one fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PredictionOutcome {
    /// Calibrated classifier output
    Primary(FixturePrediction),
    /// Heuristic picks, with the reason the primary path was skipped
    Fallback {
        prediction: FixturePrediction,
        reason: String,
    },
    /// Neither path produced picks; a normal outcome, not a fault
    Unavailable { fixture_id: i64, reason: String },
}

impl PredictionOutcome {
    pub fn prediction(&self) -> Option<&FixturePrediction> {
        match self {
            PredictionOutcome::Primary(p) => Some(p),
            PredictionOutcome::Fallback { prediction, .. } => Some(prediction),
            PredictionOutcome::Unavailable { .. } => None,
        }
    }

    pub fn into_prediction(self) -> Option<FixturePrediction> {
        match self {
            PredictionOutcome::Primary(p) => Some(p),
            PredictionOutcome::Fallback { prediction, .. } => Some(prediction),
            PredictionOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, PredictionOutcome::Fallback { .. })
    }
}

/// Primary source -> calibration -> records, with heuristic fallback
pub struct PredictionService {
    source: Option<Arc<dyn PredictionSource>>,
    calibrators: CalibratorSet,
    fallback: FallbackPredictor,
}

impl PredictionService {
    pub fn new(calibrators: CalibratorSet, fallback: FallbackPredictor) -> Self {
        Self {
            source: None,
            calibrators,
            fallback,
        }
    }

    /// Attach the primary classifier ensemble
    pub fn with_source(mut self, source: Arc<dyn PredictionSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn calibrators(&self) -> &CalibratorSet {
        &self.calibrators
    }

    pub fn calibrators_mut(&mut self) -> &mut CalibratorSet {
        &mut self.calibrators
    }

    pub async fn predict_fixture(&self, fixture: &FixtureContext) -> PredictionOutcome {
        let reason = match &self.source {
            Some(source) => match source.predict(fixture).await {
                Ok(raw) => match self.primary_records(fixture, &raw) {
                    Ok(records) => {
                        return PredictionOutcome::Primary(FixturePrediction::new(fixture, records))
                    }
                    Err(e) => e.to_string(),
                },
                Err(e) => format!("{}: {}", source.source_name(), e),
            },
            None => "no primary prediction source configured".to_string(),
        };

        tracing::warn!(
            "Using fallback for fixture {} ({} vs {}): {}",
            fixture.fixture_id,
            fixture.home.name,
            fixture.away.name,
            reason
        );

        match self.fallback.predict(fixture) {
            Ok(heuristic) => PredictionOutcome::Fallback {
                prediction: FixturePrediction::new(fixture, heuristic.records),
                reason,
            },
            Err(e) => {
                tracing::warn!("Fallback failed for fixture {}: {}", fixture.fixture_id, e);
                PredictionOutcome::Unavailable {
                    fixture_id: fixture.fixture_id,
                    reason: format!("{reason}; {e}"),
                }
            }
        }
    }

    pub async fn predict_all(&self, fixtures: &[FixtureContext]) -> Vec<PredictionOutcome> {
        let mut outcomes = Vec::with_capacity(fixtures.len());
        for fixture in fixtures {
            outcomes.push(self.predict_fixture(fixture).await);
        }

        let fallbacks = outcomes.iter().filter(|o| o.is_fallback()).count();
        let unavailable = outcomes.iter().filter(|o| o.prediction().is_none()).count();
        tracing::info!(
            "Predicted {} fixtures ({} fallback, {} unavailable)",
            fixtures.len(),
            fallbacks,
            unavailable
        );
        outcomes
    }

    fn primary_records(
        &self,
        fixture: &FixtureContext,
        raw: &[RawPrediction],
    ) -> PredictionResult<Vec<PredictionRecord>> {
        if raw.is_empty() {
            return Err(PredictionError::SourceUnavailable(format!(
                "no markets returned for fixture {}",
                fixture.fixture_id
            )));
        }
        raw.iter().map(|r| self.record_for(fixture, r)).collect()
    }

    fn record_for(&self, fixture: &FixtureContext, raw: &RawPrediction) -> PredictionResult<PredictionRecord> {
        if raw.fixture_id != fixture.fixture_id {
            return Err(PredictionError::InvalidFixture(format!(
                "prediction for fixture {} returned for fixture {}",
                raw.fixture_id, fixture.fixture_id
            )));
        }
        raw.validate()?;

        let calibrator = self
            .calibrators
            .get(raw.market)
            .ok_or_else(|| PredictionError::UnknownMarket(raw.market.to_string()))?;

        let (class, raw_top) = raw.top_class();
        let batch = ProbabilityBatch::MultiClass(vec![raw.probabilities.clone()]);
        let estimate = calibrator
            .get_confidence_with_uncertainty(&batch)
            .into_iter()
            .next()
            .ok_or_else(|| {
                PredictionError::InvalidProbabilities(format!(
                    "fixture {}: calibrator returned no estimate",
                    fixture.fixture_id
                ))
            })?;

        let (confidence, how) = if calibrator.is_trained() {
            (estimate.confidence, calibrator.method().as_str())
        } else {
            let score = ScoreModelType::from(raw.market).recalibrate(raw_top * 100.0);
            (f64::from(score) / 100.0, "fixed score correction")
        };

        let label = raw.market.label_for(class);
        Ok(PredictionRecord {
            fixture_id: fixture.fixture_id,
            market: raw.market,
            label: label.to_string(),
            odds: calculate_odds(confidence),
            confidence: (confidence * 1000.0).round() / 10.0,
            explanation: format!(
                "{} for {} vs {}: {}, raw {:.0}% -> {:.0}% via {}, {} uncertainty",
                raw.market.display_name(),
                fixture.home.name,
                fixture.away.name,
                label,
                raw_top * 100.0,
                confidence * 100.0,
                how,
                estimate.level.as_str()
            ),
            origin: PredictionOrigin::Ensemble,
        })
    }
}
