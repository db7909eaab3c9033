use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Invalid probabilities: {0}")]
    InvalidProbabilities(String),

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Invalid fixture data: {0}")]
    InvalidFixture(String),

    #[error("Prediction source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Fallback prediction failed: {0}")]
    FallbackFailed(String),
}

pub type PredictionResult<T> = Result<T, PredictionError>;
