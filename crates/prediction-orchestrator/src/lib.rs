//! Prediction Orchestrator
//!
//! Runs each fixture through the primary classifier source and the per-market
//! calibrators, falling back to the team-ranking heuristic when the primary path
//! yields nothing usable.

pub mod calibrators;
pub mod service;
pub mod source;

pub use calibrators::CalibratorSet;
pub use service::{PredictionOutcome, PredictionService};
pub use source::StaticSource;
