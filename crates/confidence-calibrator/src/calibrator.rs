//! Confidence Calibration
//!
//! Fits a mapping from raw top-pick probability to empirical correctness and
//! applies it to new classifier output.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use prediction_core::{row_max, Market, ProbabilityBatch};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, CalibrationResult};
use crate::history::{AccuracyTable, HistoricalAccuracyBin, ReliabilityStats};
use crate::uncertainty::ConfidenceEstimate;

const PLATT_MAX_ITERATIONS: usize = 100;
const PLATT_TOLERANCE: f64 = 1e-10;

/// Method used for calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationMethod {
    /// Isotonic regression - non-parametric monotonic fit
    Isotonic,
    /// Platt scaling - fits a sigmoid to the scores
    Platt,
}

impl CalibrationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationMethod::Isotonic => "isotonic",
            CalibrationMethod::Platt => "platt",
        }
    }
}

impl fmt::Display for CalibrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalibrationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "isotonic" => Ok(CalibrationMethod::Isotonic),
            "platt" | "sigmoid" | "logistic" => Ok(CalibrationMethod::Platt),
            other => Err(format!("unknown calibration method '{other}'")),
        }
    }
}

/// A fitted raw-confidence → calibrated-confidence mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum CalibrationMap {
    /// Non-decreasing piecewise-linear curve through the pooled blocks.
    /// Inputs outside the fitted range are clipped to the end values.
    Isotonic { thresholds: Vec<f64>, values: Vec<f64> },
    /// P(correct | x) = 1 / (1 + exp(-(a·x + b)))
    Platt { a: f64, b: f64 },
}

impl CalibrationMap {
    pub fn method(&self) -> CalibrationMethod {
        match self {
            CalibrationMap::Isotonic { .. } => CalibrationMethod::Isotonic,
            CalibrationMap::Platt { .. } => CalibrationMethod::Platt,
        }
    }

    pub fn fit(method: CalibrationMethod, samples: &[(f64, bool)]) -> CalibrationResult<Self> {
        if samples.is_empty() {
            return Err(CalibrationError::EmptyInput);
        }
        match method {
            CalibrationMethod::Isotonic => Ok(fit_isotonic(samples)),
            CalibrationMethod::Platt => fit_platt(samples),
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        match self {
            CalibrationMap::Isotonic { thresholds, values } => {
                isotonic_lookup(thresholds, values, raw)
            }
            CalibrationMap::Platt { a, b } => sigmoid(a * raw + b),
        }
    }

    fn is_well_formed(&self) -> bool {
        match self {
            CalibrationMap::Isotonic { thresholds, values } => {
                !thresholds.is_empty()
                    && thresholds.len() == values.len()
                    && thresholds.windows(2).all(|w| w[0] <= w[1])
                    && values.windows(2).all(|w| w[0] <= w[1])
            }
            CalibrationMap::Platt { a, b } => a.is_finite() && b.is_finite(),
        }
    }
}

/// Outcome of a training call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingResult {
    Trained {
        samples: usize,
        method: CalibrationMethod,
        accuracy_table: Vec<HistoricalAccuracyBin>,
        reliability: ReliabilityStats,
    },
    Failed {
        message: String,
    },
}

impl TrainingResult {
    pub fn is_success(&self) -> bool {
        matches!(self, TrainingResult::Trained { .. })
    }
}

/// Calibrated probabilities plus the degraded-mode signal
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrated {
    pub probabilities: ProbabilityBatch,
    /// Set when the calibrator was untrained and the input passed through unchanged
    pub degraded: bool,
}

/// Calibrator for one (model, market) pair
#[derive(Debug, Clone)]
pub struct Calibrator {
    model_name: String,
    market: Market,
    method: CalibrationMethod,
    /// `None` until training or loading succeeds
    fitted: Option<CalibrationMap>,
    accuracy: AccuracyTable,
    reliability: Option<ReliabilityStats>,
    trained_at: Option<DateTime<Utc>>,
}

impl Calibrator {
    /// Create a new untrained calibrator
    pub fn new(model_name: impl Into<String>, market: Market, method: CalibrationMethod) -> Self {
        Self {
            model_name: model_name.into(),
            market,
            method,
            fitted: None,
            accuracy: AccuracyTable::default(),
            reliability: None,
            trained_at: None,
        }
    }

    /// Train on true labels and raw classifier output.
    ///
    /// Multi-class rows are reduced to (max probability, argmax == label). Binary
    /// entries are used directly against a 0/1 label. Failures leave the
    /// calibrator's previous state untouched.
    pub fn train(&mut self, labels: &[usize], probabilities: &ProbabilityBatch) -> TrainingResult {
        match self.try_train(labels, probabilities) {
            Ok(samples) => {
                let reliability = self.reliability.clone().unwrap_or_default();
                tracing::info!(
                    "Trained {} calibrator '{}' ({}) on {} samples, ECE {:.3}",
                    self.method,
                    self.model_name,
                    self.market,
                    samples,
                    reliability.ece
                );
                TrainingResult::Trained {
                    samples,
                    method: self.method,
                    accuracy_table: self.accuracy.bins().to_vec(),
                    reliability,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Calibrator '{}' ({}) training failed: {}",
                    self.model_name,
                    self.market,
                    e
                );
                TrainingResult::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    fn try_train(
        &mut self,
        labels: &[usize],
        probabilities: &ProbabilityBatch,
    ) -> CalibrationResult<usize> {
        let samples = correctness_samples(labels, probabilities)?;
        let fitted = CalibrationMap::fit(self.method, &samples)?;
        let accuracy = AccuracyTable::from_samples(&samples);
        let reliability = ReliabilityStats::from_samples(&samples, &accuracy);

        self.fitted = Some(fitted);
        self.accuracy = accuracy;
        self.reliability = Some(reliability);
        self.trained_at = Some(Utc::now());
        Ok(samples.len())
    }

    /// Calibrate classifier output.
    ///
    /// Untrained calibrators pass the input through and flag `degraded`.
    pub fn calibrate(&self, probabilities: &ProbabilityBatch) -> Calibrated {
        let Some(map) = &self.fitted else {
            tracing::debug!(
                "Calibrator '{}' ({}) is untrained; passing probabilities through",
                self.model_name,
                self.market
            );
            return Calibrated {
                probabilities: probabilities.clone(),
                degraded: true,
            };
        };

        let calibrated = match probabilities {
            ProbabilityBatch::MultiClass(rows) => ProbabilityBatch::MultiClass(
                rows.iter().map(|row| calibrate_row(map, row)).collect(),
            ),
            ProbabilityBatch::Binary(values) => ProbabilityBatch::Binary(
                values.iter().map(|p| map.apply(*p)).collect(),
            ),
        };

        Calibrated {
            probabilities: calibrated,
            degraded: false,
        }
    }

    /// Calibrated top-pick confidence and its uncertainty for every sample
    pub fn get_confidence_with_uncertainty(
        &self,
        probabilities: &ProbabilityBatch,
    ) -> Vec<ConfidenceEstimate> {
        let calibrated = self.calibrate(probabilities);

        match (probabilities, &calibrated.probabilities) {
            (ProbabilityBatch::MultiClass(raw_rows), ProbabilityBatch::MultiClass(cal_rows)) => {
                raw_rows
                    .iter()
                    .zip(cal_rows)
                    .map(|(raw_row, cal_row)| {
                        let (idx, raw_top) = row_max(raw_row);
                        let confidence = cal_row.get(idx).copied().unwrap_or(raw_top);
                        self.estimate(raw_top, confidence)
                    })
                    .collect()
            }
            (ProbabilityBatch::Binary(raw), ProbabilityBatch::Binary(cal)) => raw
                .iter()
                .zip(cal)
                .map(|(r, c)| self.estimate(*r, *c))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn estimate(&self, raw: f64, confidence: f64) -> ConfidenceEstimate {
        let uncertainty = self.accuracy.uncertainty_for(raw, confidence);
        ConfidenceEstimate::new(raw, confidence, uncertainty)
    }

    /// Replace the fitted state with a restored one after structural checks
    pub(crate) fn restore(
        &mut self,
        map: CalibrationMap,
        accuracy: AccuracyTable,
        reliability: Option<ReliabilityStats>,
        trained_at: DateTime<Utc>,
    ) -> CalibrationResult<()> {
        if !map.is_well_formed() {
            return Err(CalibrationError::ArtifactMismatch(
                "fitted mapping is malformed".to_string(),
            ));
        }
        if !accuracy.is_well_formed() {
            return Err(CalibrationError::ArtifactMismatch(
                "accuracy table is malformed".to_string(),
            ));
        }
        self.method = map.method();
        self.fitted = Some(map);
        self.accuracy = accuracy;
        self.reliability = reliability;
        self.trained_at = Some(trained_at);
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.fitted = None;
        self.accuracy = AccuracyTable::default();
        self.reliability = None;
        self.trained_at = None;
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn market(&self) -> Market {
        self.market
    }

    pub fn method(&self) -> CalibrationMethod {
        self.method
    }

    pub fn is_trained(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn mapping(&self) -> Option<&CalibrationMap> {
        self.fitted.as_ref()
    }

    pub fn accuracy_table(&self) -> &AccuracyTable {
        &self.accuracy
    }

    pub fn reliability(&self) -> Option<&ReliabilityStats> {
        self.reliability.as_ref()
    }

    pub fn trained_at(&self) -> Option<DateTime<Utc>> {
        self.trained_at
    }
}

/// Reduce training input to (raw confidence, top pick was correct) pairs
fn correctness_samples(
    labels: &[usize],
    probabilities: &ProbabilityBatch,
) -> CalibrationResult<Vec<(f64, bool)>> {
    if labels.is_empty() || probabilities.is_empty() {
        return Err(CalibrationError::EmptyInput);
    }
    if labels.len() != probabilities.len() {
        return Err(CalibrationError::DimensionMismatch {
            labels: labels.len(),
            samples: probabilities.len(),
        });
    }

    let mut samples = Vec::with_capacity(labels.len());
    match probabilities {
        ProbabilityBatch::MultiClass(rows) => {
            for (index, (row, label)) in rows.iter().zip(labels).enumerate() {
                if row.is_empty() {
                    return Err(CalibrationError::InvalidProbability {
                        index,
                        reason: "empty probability vector".to_string(),
                    });
                }
                let (top_class, top) = row_max(row);
                check_probability(index, top)?;
                samples.push((top, top_class == *label));
            }
        }
        ProbabilityBatch::Binary(values) => {
            for (index, (p, label)) in values.iter().zip(labels).enumerate() {
                check_probability(index, *p)?;
                if *label > 1 {
                    return Err(CalibrationError::InvalidLabel {
                        index,
                        label: *label,
                    });
                }
                samples.push((*p, *label == 1));
            }
        }
    }
    Ok(samples)
}

fn check_probability(index: usize, p: f64) -> CalibrationResult<()> {
    if !p.is_finite() || !(0.0..=1.0).contains(&p) {
        return Err(CalibrationError::InvalidProbability {
            index,
            reason: format!("{p} is outside [0, 1]"),
        });
    }
    Ok(())
}

/// Replace the top pick's probability with its calibrated value and spread the
/// remaining mass over the other classes in their original proportions.
fn calibrate_row(map: &CalibrationMap, row: &[f64]) -> Vec<f64> {
    if row.is_empty() {
        return Vec::new();
    }
    let (top_idx, top) = row_max(row);
    if top <= 0.0 {
        return row.to_vec();
    }

    let calibrated_top = map.apply(top).clamp(0.0, 1.0);
    let rest: f64 = row
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != top_idx)
        .map(|(_, p)| p)
        .sum();
    let others = row.len() - 1;
    let remaining = 1.0 - calibrated_top;

    let mut out: Vec<f64> = row
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == top_idx {
                calibrated_top
            } else if rest > 0.0 {
                p * remaining / rest
            } else {
                remaining / others as f64
            }
        })
        .collect();

    let sum: f64 = out.iter().sum();
    if sum > 0.0 {
        for p in out.iter_mut() {
            *p /= sum;
        }
    }
    out
}

/// Pool adjacent violators over samples sorted by raw confidence
fn fit_isotonic(samples: &[(f64, bool)]) -> CalibrationMap {
    struct Block {
        lo: f64,
        hi: f64,
        sum: f64,
        weight: f64,
    }

    impl Block {
        fn value(&self) -> f64 {
            self.sum / self.weight
        }
    }

    let mut sorted: Vec<(f64, f64)> = samples
        .iter()
        .map(|(p, o)| (*p, if *o { 1.0 } else { 0.0 }))
        .collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut blocks: Vec<Block> = Vec::new();
    for (x, y) in sorted {
        // Equal inputs always share a block
        match blocks.last_mut() {
            Some(last) if last.hi == x => {
                last.sum += y;
                last.weight += 1.0;
            }
            _ => blocks.push(Block {
                lo: x,
                hi: x,
                sum: y,
                weight: 1.0,
            }),
        }

        while blocks.len() >= 2 {
            let n = blocks.len();
            if blocks[n - 2].value() <= blocks[n - 1].value() {
                break;
            }
            if let Some(last) = blocks.pop() {
                if let Some(prev) = blocks.last_mut() {
                    prev.hi = last.hi;
                    prev.sum += last.sum;
                    prev.weight += last.weight;
                }
            }
        }
    }

    let mut thresholds = Vec::with_capacity(blocks.len() * 2);
    let mut values = Vec::with_capacity(blocks.len() * 2);
    for block in &blocks {
        let value = block.value();
        thresholds.push(block.lo);
        values.push(value);
        if block.hi > block.lo {
            thresholds.push(block.hi);
            values.push(value);
        }
    }

    CalibrationMap::Isotonic { thresholds, values }
}

fn isotonic_lookup(thresholds: &[f64], values: &[f64], raw: f64) -> f64 {
    let (Some(&first_x), Some(&last_x)) = (thresholds.first(), thresholds.last()) else {
        return raw;
    };
    if raw <= first_x {
        return values[0];
    }
    if raw >= last_x {
        return values[values.len() - 1];
    }

    let idx = thresholds.partition_point(|x| *x <= raw);
    let (x0, y0) = (thresholds[idx - 1], values[idx - 1]);
    let (x1, y1) = (thresholds[idx], values[idx]);
    if x1 <= x0 {
        return y1;
    }
    let t = (raw - x0) / (x1 - x0);
    y0 + t * (y1 - y0)
}

/// Newton-Raphson logistic fit with Platt's smoothed targets
fn fit_platt(samples: &[(f64, bool)]) -> CalibrationResult<CalibrationMap> {
    let n_pos = samples.iter().filter(|(_, o)| *o).count() as f64;
    let n_neg = samples.len() as f64 - n_pos;
    let target_pos = (n_pos + 1.0) / (n_pos + 2.0);
    let target_neg = 1.0 / (n_neg + 2.0);

    let mut a = 0.0_f64;
    let mut b = ((n_pos + 1.0) / (n_neg + 1.0)).ln();

    for _ in 0..PLATT_MAX_ITERATIONS {
        let (mut g_a, mut g_b) = (0.0, 0.0);
        let (mut h_aa, mut h_ab, mut h_bb) = (1e-9, 0.0, 1e-9);

        for &(x, outcome) in samples {
            let t = if outcome { target_pos } else { target_neg };
            let p = sigmoid(a * x + b);
            let w = p * (1.0 - p);
            g_a += (p - t) * x;
            g_b += p - t;
            h_aa += w * x * x;
            h_ab += w * x;
            h_bb += w;
        }

        let det = h_aa * h_bb - h_ab * h_ab;
        if det.abs() < 1e-18 {
            break;
        }
        let d_a = (h_bb * g_a - h_ab * g_b) / det;
        let d_b = (h_aa * g_b - h_ab * g_a) / det;
        a -= d_a;
        b -= d_b;

        if !a.is_finite() || !b.is_finite() {
            return Err(CalibrationError::FitFailed(
                "logistic fit diverged".to_string(),
            ));
        }
        if d_a.abs() + d_b.abs() < PLATT_TOLERANCE {
            break;
        }
    }

    Ok(CalibrationMap::Platt { a, b })
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rand_like(seed: usize) -> f64 {
        ((seed * 1103515245 + 12345) % 100) as f64 / 100.0
    }

    /// Multi-class rows whose top pick is correct roughly `p` of the time
    fn synthetic_history(n: usize) -> (Vec<usize>, ProbabilityBatch) {
        let mut labels = Vec::with_capacity(n);
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let p = 0.35 + (i % 60) as f64 / 100.0;
            let rest = (1.0 - p) / 2.0;
            rows.push(vec![p, rest, rest]);
            // Overconfident model: hit rate lags raw confidence
            labels.push(if rand_like(i) < p - 0.1 { 0 } else { 1 });
        }
        (labels, ProbabilityBatch::MultiClass(rows))
    }

    fn scenario_calibrator() -> Calibrator {
        let mut calibrator =
            Calibrator::new("rf", Market::MatchResult, CalibrationMethod::Isotonic);
        let rows = vec![vec![0.7, 0.2, 0.1]; 10];
        let labels = vec![0, 0, 0, 0, 0, 0, 1, 1, 2, 1];
        let result = calibrator.train(&labels, &ProbabilityBatch::MultiClass(rows));
        assert!(result.is_success());
        calibrator
    }

    #[test]
    fn test_untrained_is_identity() {
        let calibrator = Calibrator::new("rf", Market::MatchResult, CalibrationMethod::Isotonic);
        let input = ProbabilityBatch::MultiClass(vec![vec![0.5, 0.3, 0.2], vec![0.1, 0.1, 0.8]]);
        let out = calibrator.calibrate(&input);
        assert!(out.degraded);
        assert_eq!(out.probabilities, input);

        let binary = ProbabilityBatch::Binary(vec![0.42, 0.9]);
        assert_eq!(calibrator.calibrate(&binary).probabilities, binary);
        assert!(!calibrator.is_trained());
    }

    #[test]
    fn test_training_failures_are_reported() {
        let mut calibrator = Calibrator::new("rf", Market::Btts, CalibrationMethod::Platt);

        let result = calibrator.train(&[], &ProbabilityBatch::Binary(vec![]));
        assert!(matches!(result, TrainingResult::Failed { .. }));

        let result = calibrator.train(&[1, 0], &ProbabilityBatch::Binary(vec![0.4]));
        match result {
            TrainingResult::Failed { message } => assert!(message.contains("mismatch")),
            other => panic!("expected failure, got {other:?}"),
        }

        let result = calibrator.train(&[2], &ProbabilityBatch::Binary(vec![0.4]));
        assert!(!result.is_success());

        let result = calibrator.train(&[1], &ProbabilityBatch::Binary(vec![1.4]));
        assert!(!result.is_success());

        assert!(!calibrator.is_trained());
    }

    #[test]
    fn test_populated_bins_are_valid() {
        let (labels, batch) = synthetic_history(300);
        let mut calibrator = Calibrator::new("gb", Market::MatchResult, CalibrationMethod::Isotonic);
        let result = calibrator.train(&labels, &batch);

        let TrainingResult::Trained { accuracy_table, samples, .. } = result else {
            panic!("training should succeed");
        };
        assert_eq!(samples, 300);
        assert_eq!(accuracy_table.len(), crate::BIN_COUNT);
        let populated: Vec<_> = accuracy_table.iter().filter(|b| b.count > 0).collect();
        assert!(!populated.is_empty());
        for bin in populated {
            assert!((0.0..=1.0).contains(&bin.accuracy));
        }
    }

    #[test]
    fn test_multiclass_output_stays_normalized() {
        let (labels, batch) = synthetic_history(300);
        for method in [CalibrationMethod::Isotonic, CalibrationMethod::Platt] {
            let mut calibrator = Calibrator::new("gb", Market::MatchResult, method);
            assert!(calibrator.train(&labels, &batch).is_success());

            let sample = ProbabilityBatch::MultiClass(vec![
                vec![0.7, 0.2, 0.1],
                vec![0.34, 0.33, 0.33],
                vec![0.05, 0.9, 0.05],
                vec![0.5, 0.5, 0.0],
                vec![1.0, 0.0, 0.0],
            ]);
            let ProbabilityBatch::MultiClass(rows) = calibrator.calibrate(&sample).probabilities
            else {
                panic!("shape must be preserved");
            };
            for row in rows {
                let sum: f64 = row.iter().sum();
                assert!((sum - 1.0).abs() < 1e-6, "{method}: row {row:?} sums to {sum}");
            }
        }
    }

    #[test]
    fn test_isotonic_is_monotonic() {
        let (labels, batch) = synthetic_history(600);
        let mut calibrator = Calibrator::new("lr", Market::MatchResult, CalibrationMethod::Isotonic);
        assert!(calibrator.train(&labels, &batch).is_success());

        let grid: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();
        let ProbabilityBatch::Binary(out) = calibrator
            .calibrate(&ProbabilityBatch::Binary(grid))
            .probabilities
        else {
            panic!("shape must be preserved");
        };
        for pair in out.windows(2) {
            assert!(pair[0] <= pair[1] + 1e-12);
        }
    }

    #[test]
    fn test_scenario_seventy_percent_means_sixty() {
        let calibrator = scenario_calibrator();
        let out = calibrator.calibrate(&ProbabilityBatch::MultiClass(vec![vec![0.7, 0.2, 0.1]]));

        let ProbabilityBatch::MultiClass(rows) = out.probabilities else {
            panic!("shape must be preserved");
        };
        let row = &rows[0];
        assert!((row[0] - 0.6).abs() < 1e-9);
        // Non-top classes keep their 2:1 ratio
        assert!((row[1] / row[2] - 2.0).abs() < 1e-9);
        assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);

        let estimates = calibrator
            .get_confidence_with_uncertainty(&ProbabilityBatch::MultiClass(vec![vec![0.7, 0.2, 0.1]]));
        assert!((estimates[0].confidence - 0.6).abs() < 1e-9);
        assert!(estimates[0].uncertainty < 1e-9);
    }

    #[test]
    fn test_zero_max_row_passes_through() {
        let calibrator = scenario_calibrator();
        let zero = ProbabilityBatch::MultiClass(vec![vec![0.0, 0.0, 0.0]]);
        assert_eq!(calibrator.calibrate(&zero).probabilities, zero);
    }

    #[test]
    fn test_uncertainty_paths() {
        let calibrator = scenario_calibrator();
        // Raw 0.35 falls into bin 3, which never saw a sample
        let estimates = calibrator
            .get_confidence_with_uncertainty(&ProbabilityBatch::Binary(vec![0.35]));
        assert_eq!(estimates[0].uncertainty, crate::uncertainty::DEFAULT_UNSEEN_UNCERTAINTY);

        let untrained = Calibrator::new("rf", Market::Btts, CalibrationMethod::Isotonic);
        let estimates =
            untrained.get_confidence_with_uncertainty(&ProbabilityBatch::Binary(vec![0.5, 1.0]));
        assert!((estimates[0].uncertainty - 0.5).abs() < 1e-12);
        assert!(estimates[1].uncertainty.abs() < 1e-12);
        assert_eq!(estimates[0].confidence, 0.5);
    }

    #[test]
    fn test_platt_corrects_overconfidence() {
        let (labels, batch) = synthetic_history(600);
        let mut calibrator = Calibrator::new("xgb", Market::MatchResult, CalibrationMethod::Platt);
        assert!(calibrator.train(&labels, &batch).is_success());
        assert!(matches!(calibrator.mapping(), Some(CalibrationMap::Platt { .. })));

        let ProbabilityBatch::Binary(out) = calibrator
            .calibrate(&ProbabilityBatch::Binary(vec![0.9]))
            .probabilities
        else {
            panic!("shape must be preserved");
        };
        assert!(out[0].is_finite());
        assert!(out[0] < 0.9);
    }

    #[test]
    fn test_binary_training_uses_raw_probability() {
        let mut calibrator = Calibrator::new("rf", Market::OverUnder, CalibrationMethod::Isotonic);
        let probs: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let labels: Vec<usize> = (0..100).map(|i| usize::from(i >= 50)).collect();
        assert!(calibrator
            .train(&labels, &ProbabilityBatch::Binary(probs))
            .is_success());

        let ProbabilityBatch::Binary(out) = calibrator
            .calibrate(&ProbabilityBatch::Binary(vec![0.2, 0.8]))
            .probabilities
        else {
            panic!("shape must be preserved");
        };
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("Isotonic".parse::<CalibrationMethod>(), Ok(CalibrationMethod::Isotonic));
        assert_eq!("sigmoid".parse::<CalibrationMethod>(), Ok(CalibrationMethod::Platt));
        assert!("beta".parse::<CalibrationMethod>().is_err());
    }
}
