//! Confidence Calibrator Module
//!
//! Turns raw classifier probabilities into calibrated confidence scores with an
//! uncertainty estimate drawn from historical accuracy. Implements isotonic
//! regression and Platt scaling, a ten-bin accuracy table, and SQLite persistence
//! of fitted calibrators.

pub mod calibrator;
pub mod error;
pub mod history;
pub mod scores;
pub mod store;
pub mod uncertainty;

pub use calibrator::{Calibrated, CalibrationMap, CalibrationMethod, Calibrator, TrainingResult};
pub use error::{CalibrationError, CalibrationResult};
pub use history::{AccuracyTable, HistoricalAccuracyBin, ReliabilityStats, BIN_COUNT};
pub use scores::{calibrate_confidence_scores, ScoreModelType};
pub use store::{CalibratorArtifact, CalibratorStore};
pub use uncertainty::{ConfidenceEstimate, UncertaintyLevel};
