//! Engine Configuration
//!
//! Loaded from a TOML file (`PROPEDGE_CONFIG_PATH`, default `propedge.toml`),
//! then overridden per field from the environment. Missing file => defaults.

use serde::{Deserialize, Serialize};
use std::{env, path::Path, time::Duration};

use crate::calibration::CalibrationParams;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-request deadline enforced at the HTTP boundary (ms)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default)]
    pub valuation: ValuationConfig,

    #[serde(default)]
    pub calibration: CalibrationConfig,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}
fn default_request_timeout_ms() -> u64 {
    5_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_ms: default_request_timeout_ms(),
            valuation: ValuationConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// Largest bankroll fraction ever recommended, in (0, 1]
    #[serde(default = "default_kelly_cap")]
    pub kelly_cap: f64,

    /// Reject malformed correlation matrices instead of assuming independence
    #[serde(default)]
    pub strict_correlation: bool,
}

fn default_kelly_cap() -> f64 {
    1.0
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            kelly_cap: default_kelly_cap(),
            strict_correlation: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Equal-width probability buckets over [0, 1]
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,

    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// SQLite file of graded predictions; unset keeps the table empty
    #[serde(default)]
    pub outcomes_db_path: Option<String>,

    #[serde(flatten)]
    pub params: CalibrationParams,
}

fn default_bucket_count() -> usize {
    10
}
fn default_refresh_secs() -> u64 {
    900
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            bucket_count: default_bucket_count(),
            refresh_secs: default_refresh_secs(),
            outcomes_db_path: None,
            params: CalibrationParams::default(),
        }
    }
}

impl CalibrationConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs.max(1))
    }
}

impl EngineConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    /// Config file (or defaults) with environment overrides applied
    pub fn from_env() -> Self {
        let path =
            env::var("PROPEDGE_CONFIG_PATH").unwrap_or_else(|_| "propedge.toml".to_string());

        let mut config = Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default engine config ({}): {}", path, e);
            Self::default()
        });
        config.apply_env_overrides(|key| env::var(key).ok());
        config
    }

    /// Apply overrides from any key -> value lookup (the process env in production).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("BIND_ADDR").filter(|v| !v.trim().is_empty()) {
            self.bind_addr = v;
        }
        if let Some(v) = lookup("REQUEST_TIMEOUT_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
        {
            self.request_timeout_ms = v;
        }
        if let Some(v) = lookup("KELLY_CAP")
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|&v| v > 0.0 && v <= 1.0)
        {
            self.valuation.kelly_cap = v;
        }
        if let Some(v) = lookup("STRICT_CORRELATION") {
            self.valuation.strict_correlation =
                matches!(v.as_str(), "1" | "true" | "TRUE" | "on" | "ON");
        }
        if let Some(v) = lookup("OUTCOMES_DB_PATH").filter(|v| !v.trim().is_empty()) {
            self.calibration.outcomes_db_path = Some(v);
        }
        if let Some(v) = lookup("CALIBRATION_REFRESH_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&v| v > 0)
        {
            self.calibration.refresh_secs = v;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.valuation.kelly_cap, 1.0);
        assert!(!config.valuation.strict_correlation);
        assert_eq!(config.calibration.bucket_count, 10);
        assert_eq!(config.calibration.params.min_sample_size, 30);
        assert!(config.calibration.outcomes_db_path.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            bind_addr = "127.0.0.1:8080"

            [valuation]
            kelly_cap = 0.25

            [calibration]
            outcomes_db_path = "data/outcomes.db"
            prior_strength = 120.0
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.request_timeout_ms, 5_000);
        assert_eq!(config.valuation.kelly_cap, 0.25);
        assert_eq!(
            config.calibration.outcomes_db_path.as_deref(),
            Some("data/outcomes.db")
        );
        assert_eq!(config.calibration.params.prior_strength, 120.0);
        assert_eq!(config.calibration.params.min_sample_size, 30);
        assert_eq!(config.calibration.refresh_secs, 900);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("KELLY_CAP", "0.1"),
            ("STRICT_CORRELATION", "true"),
            ("CALIBRATION_REFRESH_SECS", "60"),
            ("REQUEST_TIMEOUT_MS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.valuation.kelly_cap, 0.1);
        assert!(config.valuation.strict_correlation);
        assert_eq!(config.calibration.refresh_secs, 60);
        assert_eq!(config.request_timeout_ms, 5_000);
    }

    #[test]
    fn test_env_rejects_out_of_range_cap() {
        let mut config = EngineConfig::default();
        config.apply_env_overrides(|k| (k == "KELLY_CAP").then(|| "1.5".to_string()));
        assert_eq!(config.valuation.kelly_cap, 1.0);
    }
}
