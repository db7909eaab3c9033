use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("Empty training set")]
    EmptyInput,

    #[error("Dimension mismatch: {labels} labels for {samples} probability samples")]
    DimensionMismatch { labels: usize, samples: usize },

    #[error("Invalid probability at sample {index}: {reason}")]
    InvalidProbability { index: usize, reason: String },

    #[error("Invalid binary label at sample {index}: {label}")]
    InvalidLabel { index: usize, label: usize },

    #[error("Fit failed: {0}")]
    FitFailed(String),

    #[error("Calibrator is not trained")]
    NotTrained,

    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error("Corrupt calibrator artifact: {0}")]
    CorruptArtifact(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type CalibrationResult<T> = Result<T, CalibrationError>;
