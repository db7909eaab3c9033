use async_trait::async_trait;
use crate::{FixtureContext, PredictionResult, RawPrediction};

/// Primary classifier ensemble boundary.
///
/// Implementations hand back one `RawPrediction` per market they evaluated for the
/// fixture. Any error is treated by callers as "primary unavailable" and triggers the
/// heuristic fallback.
#[async_trait]
pub trait PredictionSource: Send + Sync {
    async fn predict(&self, fixture: &FixtureContext) -> PredictionResult<Vec<RawPrediction>>;

    fn source_name(&self) -> &'static str;
}
