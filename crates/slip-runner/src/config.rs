use anyhow::{Context, Result};
use confidence_calibrator::CalibrationMethod;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// SQLite database holding calibrator artifacts
    pub database_url: String,
    pub calibration_method: CalibrationMethod,
    /// Prefix for per-market calibrator names (`{model}_{market}`)
    pub model_name: String,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://slips.db?mode=rwc".to_string()),
            calibration_method: lookup("CALIBRATION_METHOD")
                .unwrap_or_else(|| "isotonic".to_string())
                .parse::<CalibrationMethod>()
                .map_err(anyhow::Error::msg)
                .context("CALIBRATION_METHOD must be isotonic or platt")?,
            model_name: lookup("MODEL_NAME").unwrap_or_else(|| "ensemble".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            anyhow::bail!("DATABASE_URL must not be empty");
        }
        if self.model_name.trim().is_empty() {
            anyhow::bail!("MODEL_NAME must not be empty");
        }
        Ok(())
    }
}
