use std::collections::BTreeMap;

use confidence_calibrator::{CalibrationMethod, Calibrator, CalibratorStore, TrainingResult};
use prediction_core::{Market, ProbabilityBatch};

/// One calibrator per market for a single model, owned by the caller
#[derive(Debug, Clone)]
pub struct CalibratorSet {
    model_name: String,
    calibrators: BTreeMap<Market, Calibrator>,
}

impl CalibratorSet {
    /// Untrained calibrators named `{model_name}_{market}`
    pub fn new(model_name: impl Into<String>, method: CalibrationMethod) -> Self {
        let model_name = model_name.into();
        let calibrators = Market::ALL
            .into_iter()
            .map(|market| {
                let name = format!("{}_{}", model_name, market.as_str());
                (market, Calibrator::new(name, market, method))
            })
            .collect();
        Self {
            model_name,
            calibrators,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn get(&self, market: Market) -> Option<&Calibrator> {
        self.calibrators.get(&market)
    }

    pub fn get_mut(&mut self, market: Market) -> Option<&mut Calibrator> {
        self.calibrators.get_mut(&market)
    }

    pub fn train(
        &mut self,
        market: Market,
        labels: &[usize],
        probabilities: &ProbabilityBatch,
    ) -> TrainingResult {
        match self.calibrators.get_mut(&market) {
            Some(calibrator) => calibrator.train(labels, probabilities),
            None => TrainingResult::Failed {
                message: format!("no calibrator registered for {market}"),
            },
        }
    }

    pub fn trained_markets(&self) -> Vec<Market> {
        self.calibrators
            .iter()
            .filter(|(_, c)| c.is_trained())
            .map(|(m, _)| *m)
            .collect()
    }

    /// Load every market's calibrator. Returns how many loaded.
    ///
    /// Markets with no usable artifact are reported once here; their
    /// calibrators stay untrained.
    pub async fn load_all(&mut self, store: &CalibratorStore) -> usize {
        let mut loaded = 0;
        for (market, calibrator) in self.calibrators.iter_mut() {
            if calibrator.load(store).await {
                loaded += 1;
            } else {
                tracing::warn!(
                    "No trained calibrator '{}' for {}; predictions use the fixed score correction",
                    calibrator.model_name(),
                    market
                );
            }
        }
        tracing::info!(
            "Loaded {}/{} calibrators for '{}'",
            loaded,
            self.calibrators.len(),
            self.model_name
        );
        loaded
    }

    /// Save every trained calibrator. Returns how many were written.
    pub async fn save_all(&self, store: &CalibratorStore) -> usize {
        let mut saved = 0;
        for calibrator in self.calibrators.values().filter(|c| c.is_trained()) {
            if calibrator.save(store).await {
                saved += 1;
            }
        }
        saved
    }
}
