//! Uncertainty Estimation Module
//!
//! Uncertainty attached to a calibrated confidence comes from the calibrator's
//! historical accuracy table. These are the fallbacks and the output type.

use serde::{Deserialize, Serialize};

/// Uncertainty assigned when the matching accuracy bin never saw a sample
pub const DEFAULT_UNSEEN_UNCERTAINTY: f64 = 0.2;

/// Uncertainty used when no accuracy table exists.
///
/// Peaks at p = 0.5 and vanishes at p = 0 or p = 1.
pub fn heuristic_uncertainty(p: f64) -> f64 {
    let p = p.clamp(0.0, 1.0);
    0.5 - 0.5 * (2.0 * p - 1.0).abs()
}

/// Level of uncertainty classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UncertaintyLevel {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl UncertaintyLevel {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s < 0.05 => UncertaintyLevel::VeryLow,
            s if s < 0.1 => UncertaintyLevel::Low,
            s if s < 0.2 => UncertaintyLevel::Moderate,
            s if s < 0.35 => UncertaintyLevel::High,
            _ => UncertaintyLevel::VeryHigh,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UncertaintyLevel::VeryLow => "Very Low",
            UncertaintyLevel::Low => "Low",
            UncertaintyLevel::Moderate => "Moderate",
            UncertaintyLevel::High => "High",
            UncertaintyLevel::VeryHigh => "Very High",
        }
    }
}

/// Calibrated confidence for one sample together with its uncertainty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEstimate {
    /// Top-pick probability before calibration
    pub raw_confidence: f64,
    /// Calibrated confidence in [0, 1]
    pub confidence: f64,
    /// Uncertainty in [0, 1]
    pub uncertainty: f64,
    pub level: UncertaintyLevel,
}

impl ConfidenceEstimate {
    pub fn new(raw_confidence: f64, confidence: f64, uncertainty: f64) -> Self {
        let uncertainty = uncertainty.clamp(0.0, 1.0);
        Self {
            raw_confidence,
            confidence,
            uncertainty,
            level: UncertaintyLevel::from_score(uncertainty),
        }
    }

    /// Lower edge of the confidence band
    pub fn lower_bound(&self) -> f64 {
        (self.confidence - self.uncertainty).max(0.0)
    }

    /// Upper edge of the confidence band
    pub fn upper_bound(&self) -> f64 {
        (self.confidence + self.uncertainty).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_shape() {
        assert!((heuristic_uncertainty(0.5) - 0.5).abs() < 1e-12);
        assert!(heuristic_uncertainty(0.0).abs() < 1e-12);
        assert!(heuristic_uncertainty(1.0).abs() < 1e-12);
        assert!((heuristic_uncertainty(0.75) - 0.25).abs() < 1e-12);
        assert!((heuristic_uncertainty(0.25) - heuristic_uncertainty(0.75)).abs() < 1e-12);
    }

    #[test]
    fn test_uncertainty_level_classification() {
        assert_eq!(UncertaintyLevel::from_score(0.01), UncertaintyLevel::VeryLow);
        assert_eq!(UncertaintyLevel::from_score(0.07), UncertaintyLevel::Low);
        assert_eq!(UncertaintyLevel::from_score(0.15), UncertaintyLevel::Moderate);
        assert_eq!(UncertaintyLevel::from_score(0.3), UncertaintyLevel::High);
        assert_eq!(UncertaintyLevel::from_score(0.5), UncertaintyLevel::VeryHigh);
    }

    #[test]
    fn test_estimate_bounds() {
        let estimate = ConfidenceEstimate::new(0.9, 0.85, 0.2);
        assert!((estimate.lower_bound() - 0.65).abs() < 1e-12);
        assert_eq!(estimate.upper_bound(), 1.0);
        assert_eq!(estimate.level, UncertaintyLevel::High);
    }
}
