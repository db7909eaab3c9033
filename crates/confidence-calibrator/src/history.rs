//! Historical Accuracy Module
//!
//! Buckets training samples into ten fixed-width confidence bins and tracks how
//! often the top pick was actually correct in each one.

use serde::{Deserialize, Serialize};

use crate::uncertainty::{heuristic_uncertainty, DEFAULT_UNSEEN_UNCERTAINTY};

/// Number of fixed-width bins partitioning [0, 1]
pub const BIN_COUNT: usize = 10;

/// Empirical accuracy for one confidence bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalAccuracyBin {
    pub index: usize,
    pub lower: f64,
    pub upper: f64,
    /// Representative confidence (bin midpoint)
    pub midpoint: f64,
    /// Fraction of correct predictions whose confidence fell in this bin
    pub accuracy: f64,
    pub count: usize,
}

impl HistoricalAccuracyBin {
    fn empty(index: usize) -> Self {
        Self {
            index,
            lower: index as f64 / BIN_COUNT as f64,
            upper: (index + 1) as f64 / BIN_COUNT as f64,
            midpoint: (index as f64 + 0.5) / BIN_COUNT as f64,
            accuracy: 0.0,
            count: 0,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.count > 0
    }
}

/// Ten-bin accuracy table. Empty until a calibrator has been trained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTable {
    bins: Vec<HistoricalAccuracyBin>,
}

impl AccuracyTable {
    /// Build the table from (raw confidence, was correct) samples
    pub fn from_samples(samples: &[(f64, bool)]) -> Self {
        let mut counts = [0usize; BIN_COUNT];
        let mut correct = [0usize; BIN_COUNT];

        for &(confidence, outcome) in samples {
            let idx = Self::bin_index(confidence);
            counts[idx] += 1;
            if outcome {
                correct[idx] += 1;
            }
        }

        let bins = (0..BIN_COUNT)
            .map(|i| {
                let mut bin = HistoricalAccuracyBin::empty(i);
                if counts[i] > 0 {
                    bin.count = counts[i];
                    bin.accuracy = correct[i] as f64 / counts[i] as f64;
                }
                bin
            })
            .collect();

        Self { bins }
    }

    /// Bin index for a probability; values outside [0, 1] are clamped
    pub fn bin_index(confidence: f64) -> usize {
        let clamped = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        ((clamped * BIN_COUNT as f64).floor() as usize).min(BIN_COUNT - 1)
    }

    /// The eleven edges 0.0, 0.1, ..., 1.0
    pub fn bin_edges() -> Vec<f64> {
        (0..=BIN_COUNT).map(|i| i as f64 / BIN_COUNT as f64).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn bins(&self) -> &[HistoricalAccuracyBin] {
        &self.bins
    }

    pub fn populated(&self) -> impl Iterator<Item = &HistoricalAccuracyBin> {
        self.bins.iter().filter(|b| b.is_populated())
    }

    pub fn bin_for(&self, confidence: f64) -> Option<&HistoricalAccuracyBin> {
        self.bins.get(Self::bin_index(confidence))
    }

    /// Uncertainty for a calibrated confidence, looked up by the raw (pre-calibration)
    /// confidence's bin.
    pub fn uncertainty_for(&self, raw_confidence: f64, calibrated_confidence: f64) -> f64 {
        if self.bins.is_empty() {
            return heuristic_uncertainty(calibrated_confidence);
        }
        match self.bin_for(raw_confidence) {
            Some(bin) if bin.is_populated() => {
                (calibrated_confidence - bin.accuracy).abs().clamp(0.0, 1.0)
            }
            _ => DEFAULT_UNSEEN_UNCERTAINTY,
        }
    }

    /// Structural check used when restoring a persisted table
    pub fn is_well_formed(&self) -> bool {
        self.bins.is_empty()
            || (self.bins.len() == BIN_COUNT
                && self.bins.iter().enumerate().all(|(i, b)| {
                    b.index == i && (0.0..=1.0).contains(&b.accuracy)
                }))
    }
}

/// Summary reliability metrics over the training samples
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityStats {
    /// Expected Calibration Error (lower is better, 0 is perfect)
    pub ece: f64,
    /// Maximum Calibration Error
    pub mce: f64,
    /// Brier score of raw confidence against correctness
    pub brier_score: f64,
    pub sample_size: usize,
}

impl ReliabilityStats {
    pub fn from_samples(samples: &[(f64, bool)], table: &AccuracyTable) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;

        let mut pred_sum = [0.0_f64; BIN_COUNT];
        for &(confidence, _) in samples {
            pred_sum[AccuracyTable::bin_index(confidence)] += confidence;
        }

        let mut ece = 0.0;
        let mut mce: f64 = 0.0;
        for bin in table.populated() {
            let avg_predicted = pred_sum[bin.index] / bin.count as f64;
            let gap = (avg_predicted - bin.accuracy).abs();
            ece += gap * bin.count as f64 / n;
            mce = mce.max(gap);
        }

        let brier_score = samples
            .iter()
            .map(|(confidence, outcome)| {
                let y = if *outcome { 1.0 } else { 0.0 };
                (confidence - y).powi(2)
            })
            .sum::<f64>()
            / n;

        Self {
            ece,
            mce,
            brier_score,
            sample_size: samples.len(),
        }
    }

    pub fn assessment(&self) -> &'static str {
        if self.sample_size < 30 {
            "Insufficient data for reliable calibration assessment"
        } else if self.ece < 0.05 {
            "Excellent calibration"
        } else if self.ece < 0.1 {
            "Good calibration"
        } else if self.ece < 0.2 {
            "Moderate calibration"
        } else {
            "Poor calibration"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_index_edges() {
        assert_eq!(AccuracyTable::bin_index(0.0), 0);
        assert_eq!(AccuracyTable::bin_index(0.09), 0);
        assert_eq!(AccuracyTable::bin_index(0.1), 1);
        assert_eq!(AccuracyTable::bin_index(0.7), 7);
        assert_eq!(AccuracyTable::bin_index(1.0), 9);
        assert_eq!(AccuracyTable::bin_index(1.5), 9);
        assert_eq!(AccuracyTable::bin_index(f64::NAN), 0);
        assert_eq!(AccuracyTable::bin_edges().len(), BIN_COUNT + 1);
    }

    #[test]
    fn test_table_from_samples() {
        let samples = vec![
            (0.72, true),
            (0.75, true),
            (0.71, false),
            (0.78, true),
            (0.35, false),
        ];
        let table = AccuracyTable::from_samples(&samples);

        assert_eq!(table.bins().len(), BIN_COUNT);
        let bin = table.bin_for(0.7).unwrap();
        assert_eq!(bin.count, 4);
        assert!((bin.accuracy - 0.75).abs() < 1e-12);
        assert!((bin.midpoint - 0.75).abs() < 1e-12);
        assert_eq!(table.populated().count(), 2);
        assert!(table.is_well_formed());

        for bin in table.populated() {
            assert!(bin.count > 0);
            assert!((0.0..=1.0).contains(&bin.accuracy));
        }
    }

    #[test]
    fn test_uncertainty_lookup() {
        let table = AccuracyTable::from_samples(&[(0.75, true), (0.76, false)]);
        // Populated bin: distance from empirical accuracy
        assert!((table.uncertainty_for(0.75, 0.8) - 0.3).abs() < 1e-12);
        // Unseen range
        assert_eq!(table.uncertainty_for(0.25, 0.25), DEFAULT_UNSEEN_UNCERTAINTY);

        // No table at all: heuristic peaks at 0.5
        let empty = AccuracyTable::default();
        assert!((empty.uncertainty_for(0.5, 0.5) - 0.5).abs() < 1e-12);
        assert!(empty.uncertainty_for(1.0, 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reliability_stats() {
        let samples: Vec<(f64, bool)> = vec![
            (0.15, false), (0.15, false), (0.15, true), (0.15, false), (0.15, false),
            (0.55, true), (0.55, false), (0.55, true), (0.55, false), (0.55, true),
            (0.95, true), (0.95, true), (0.95, true), (0.95, true), (0.95, false),
        ];
        let table = AccuracyTable::from_samples(&samples);
        let stats = ReliabilityStats::from_samples(&samples, &table);

        assert_eq!(stats.sample_size, 15);
        assert!(stats.ece < 0.2);
        assert!(stats.mce >= stats.ece);
        assert!(stats.brier_score < 0.5);
        assert!(stats.assessment().contains("Insufficient"));
    }
}
