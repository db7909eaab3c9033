//! Calibrator Persistence
//!
//! Stores one fitted calibrator per model name as a JSON artifact in SQLite.

use chrono::{DateTime, Utc};
use prediction_core::Market;
use serde::{Deserialize, Serialize};

use crate::calibrator::{CalibrationMap, CalibrationMethod, Calibrator};
use crate::error::{CalibrationError, CalibrationResult};
use crate::history::{AccuracyTable, ReliabilityStats, BIN_COUNT};

/// Everything needed to reproduce a trained calibrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibratorArtifact {
    pub model_name: String,
    pub market: Market,
    pub method: CalibrationMethod,
    pub mapping: CalibrationMap,
    pub accuracy: AccuracyTable,
    pub bin_edges: Vec<f64>,
    #[serde(default)]
    pub reliability: Option<ReliabilityStats>,
    pub trained_at: DateTime<Utc>,
}

impl CalibratorArtifact {
    pub fn from_calibrator(calibrator: &Calibrator) -> CalibrationResult<Self> {
        let mapping = calibrator
            .mapping()
            .cloned()
            .ok_or(CalibrationError::NotTrained)?;
        Ok(Self {
            model_name: calibrator.model_name().to_string(),
            market: calibrator.market(),
            method: calibrator.method(),
            mapping,
            accuracy: calibrator.accuracy_table().clone(),
            bin_edges: AccuracyTable::bin_edges(),
            reliability: calibrator.reliability().cloned(),
            trained_at: calibrator.trained_at().unwrap_or_else(Utc::now),
        })
    }

    fn apply_to(self, calibrator: &mut Calibrator) -> CalibrationResult<()> {
        if self.market != calibrator.market() {
            return Err(CalibrationError::ArtifactMismatch(format!(
                "artifact is for {} but calibrator is for {}",
                self.market,
                calibrator.market()
            )));
        }
        if self.method != self.mapping.method() {
            return Err(CalibrationError::ArtifactMismatch(format!(
                "method tag {} does not match fitted {} mapping",
                self.method,
                self.mapping.method()
            )));
        }
        if self.bin_edges.len() != BIN_COUNT + 1 {
            return Err(CalibrationError::ArtifactMismatch(format!(
                "expected {} bin edges, found {}",
                BIN_COUNT + 1,
                self.bin_edges.len()
            )));
        }
        calibrator.restore(self.mapping, self.accuracy, self.reliability, self.trained_at)
    }
}

/// SQLite-backed store for calibrator artifacts
pub struct CalibratorStore {
    pool: sqlx::AnyPool,
}

impl CalibratorStore {
    /// Create a new store
    pub fn new(pool: sqlx::AnyPool) -> Self {
        Self { pool }
    }

    /// Create the artifact table if it does not exist yet
    pub async fn init_schema(&self) -> CalibrationResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS calibrator_models (
                model_name TEXT PRIMARY KEY,
                market TEXT NOT NULL,
                method TEXT NOT NULL,
                artifact TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace the artifact stored under its model name
    pub async fn save_artifact(&self, artifact: &CalibratorArtifact) -> CalibrationResult<()> {
        let payload = serde_json::to_string(artifact)?;

        sqlx::query(
            r#"
            INSERT INTO calibrator_models (model_name, market, method, artifact, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(model_name) DO UPDATE SET
                market = excluded.market,
                method = excluded.method,
                artifact = excluded.artifact,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&artifact.model_name)
        .bind(artifact.market.as_str())
        .bind(artifact.method.as_str())
        .bind(payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the artifact for a model name, if one was saved
    pub async fn load_artifact(&self, model_name: &str) -> CalibrationResult<Option<CalibratorArtifact>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT artifact FROM calibrator_models WHERE model_name = ?")
                .bind(model_name)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    /// Model names with a stored artifact
    pub async fn list_models(&self) -> CalibrationResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT model_name FROM calibrator_models ORDER BY model_name")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }
}

impl Calibrator {
    /// Persist this calibrator under its model name. Returns false on any failure.
    pub async fn save(&self, store: &CalibratorStore) -> bool {
        let result = match CalibratorArtifact::from_calibrator(self) {
            Ok(artifact) => store.save_artifact(&artifact).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                tracing::info!("Saved calibrator '{}' ({})", self.model_name(), self.market());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to save calibrator '{}': {}", self.model_name(), e);
                false
            }
        }
    }

    /// Restore this calibrator from the store.
    ///
    /// A missing, corrupt or mismatched artifact returns false and leaves the
    /// calibrator untrained.
    pub async fn load(&mut self, store: &CalibratorStore) -> bool {
        let result = match store.load_artifact(self.model_name()).await {
            Ok(Some(artifact)) => artifact.apply_to(self).map(|_| true),
            Ok(None) => Ok(false),
            Err(e) => Err(e),
        };
        match result {
            Ok(true) => {
                tracing::info!("Loaded calibrator '{}' ({})", self.model_name(), self.market());
                true
            }
            Ok(false) => {
                tracing::debug!("No stored calibrator named '{}'", self.model_name());
                self.reset();
                false
            }
            Err(e) => {
                tracing::warn!("Failed to load calibrator '{}': {}", self.model_name(), e);
                self.reset();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prediction_core::ProbabilityBatch;

    async fn setup_store() -> CalibratorStore {
        sqlx::any::install_default_drivers();
        let pool = sqlx::any::AnyPoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory SQLite");
        let store = CalibratorStore::new(pool);
        store.init_schema().await.unwrap();
        store
    }

    fn trained(name: &str, method: CalibrationMethod) -> Calibrator {
        let mut calibrator = Calibrator::new(name, Market::MatchResult, method);
        let rows: Vec<Vec<f64>> = (0..120)
            .map(|i| {
                let p = 0.4 + (i % 50) as f64 / 100.0;
                vec![p, (1.0 - p) * 0.6, (1.0 - p) * 0.4]
            })
            .collect();
        let labels: Vec<usize> = (0..120).map(|i| if i % 3 == 0 { 1 } else { 0 }).collect();
        assert!(calibrator
            .train(&labels, &ProbabilityBatch::MultiClass(rows))
            .is_success());
        calibrator
    }

    #[tokio::test]
    async fn test_round_trip_reproduces_calibration() {
        let store = setup_store().await;
        let sample = ProbabilityBatch::MultiClass(vec![
            vec![0.7, 0.2, 0.1],
            vec![0.45, 0.35, 0.2],
            vec![0.91, 0.05, 0.04],
        ]);

        for (name, method) in [
            ("rf_match_result", CalibrationMethod::Isotonic),
            ("xgb_match_result", CalibrationMethod::Platt),
        ] {
            let original = trained(name, method);
            assert!(original.save(&store).await);

            let mut restored = Calibrator::new(name, Market::MatchResult, CalibrationMethod::Isotonic);
            assert!(restored.load(&store).await);
            assert!(restored.is_trained());
            assert_eq!(restored.method(), method);
            assert_eq!(restored.calibrate(&sample), original.calibrate(&sample));
            assert_eq!(
                restored.get_confidence_with_uncertainty(&sample),
                original.get_confidence_with_uncertainty(&sample)
            );
        }

        assert_eq!(
            store.list_models().await.unwrap(),
            vec!["rf_match_result".to_string(), "xgb_match_result".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_artifact_fails_softly() {
        let store = setup_store().await;
        let mut calibrator = trained("missing", CalibrationMethod::Isotonic);
        assert!(!calibrator.load(&store).await);
        assert!(!calibrator.is_trained());
    }

    #[tokio::test]
    async fn test_corrupt_artifact_fails_softly() {
        let store = setup_store().await;
        sqlx::query(
            "INSERT INTO calibrator_models (model_name, market, method, artifact, updated_at)
             VALUES ('broken', 'match_result', 'isotonic', '{not json', '2024-01-01T00:00:00Z')",
        )
        .execute(&store.pool)
        .await
        .unwrap();

        let mut calibrator = Calibrator::new("broken", Market::MatchResult, CalibrationMethod::Isotonic);
        assert!(!calibrator.load(&store).await);
        assert!(!calibrator.is_trained());
    }

    #[tokio::test]
    async fn test_market_mismatch_is_rejected() {
        let store = setup_store().await;
        assert!(trained("shared", CalibrationMethod::Platt).save(&store).await);

        let mut calibrator = Calibrator::new("shared", Market::Btts, CalibrationMethod::Platt);
        assert!(!calibrator.load(&store).await);
        assert!(!calibrator.is_trained());
    }

    #[tokio::test]
    async fn test_untrained_save_is_refused() {
        let store = setup_store().await;
        let calibrator = Calibrator::new("fresh", Market::OverUnder, CalibrationMethod::Isotonic);
        assert!(!calibrator.save(&store).await);
        assert!(store.load_artifact("fresh").await.unwrap().is_none());
    }
}
