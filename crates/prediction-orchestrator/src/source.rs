use std::collections::HashMap;

use async_trait::async_trait;
use prediction_core::{
    FixtureContext, PredictionError, PredictionResult, PredictionSource, RawPrediction,
};

/// Prediction source backed by precomputed classifier output, keyed by fixture
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    predictions: HashMap<i64, Vec<RawPrediction>>,
}

impl StaticSource {
    pub fn new(predictions: impl IntoIterator<Item = RawPrediction>) -> Self {
        let mut by_fixture: HashMap<i64, Vec<RawPrediction>> = HashMap::new();
        for prediction in predictions {
            by_fixture
                .entry(prediction.fixture_id)
                .or_default()
                .push(prediction);
        }
        Self {
            predictions: by_fixture,
        }
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }
}

#[async_trait]
impl PredictionSource for StaticSource {
    async fn predict(&self, fixture: &FixtureContext) -> PredictionResult<Vec<RawPrediction>> {
        self.predictions
            .get(&fixture.fixture_id)
            .cloned()
            .ok_or_else(|| {
                PredictionError::SourceUnavailable(format!(
                    "no classifier output for fixture {}",
                    fixture.fixture_id
                ))
            })
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}
