//! Configuration management
//!
//! Loads an optional JSON configuration file, then applies `.env` and
//! environment overrides for the deployment-specific values.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::chart::ChartOptions;
use crate::error::InsightsError;
use crate::oscillators::{DEFAULT_RSI_PERIOD, DEFAULT_RSI_SCALE};
use crate::prediction::PredictionClient;
use crate::store::ParquetStore;

pub const ENV_BIND_ADDR: &str = "BAKERY_BIND_ADDR";
pub const ENV_SALES_PARQUET: &str = "BAKERY_SALES_PARQUET";
pub const ENV_PREDICT_URL: &str = "BAKERY_PREDICT_URL";
pub const ENV_PREDICT_TIMEOUT_SECS: &str = "BAKERY_PREDICT_TIMEOUT_SECS";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub prediction: PredictionConfig,
    pub chart: ChartSettings,
}

impl AppConfig {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config JSON")
    }

    /// File (when given) plus `.env` and process environment, validated
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override values from an environment lookup
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.server.bind_addr = addr;
        }
        if let Some(path) = lookup(ENV_SALES_PARQUET) {
            self.store.parquet_path = Some(PathBuf::from(path));
        }
        if let Some(url) = lookup(ENV_PREDICT_URL) {
            self.prediction.endpoint = url;
        }
        if let Some(secs) = lookup(ENV_PREDICT_TIMEOUT_SECS) {
            self.prediction.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a whole number of seconds", ENV_PREDICT_TIMEOUT_SECS))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.chart.to_options().validate()?;
        if !self.chart.rsi_max_scale.is_finite() || self.chart.rsi_max_scale <= 0.0 {
            return Err(InsightsError::Configuration(
                "chart.rsi_max_scale must be positive".to_string(),
            ));
        }
        if self.prediction.timeout_secs == 0 {
            return Err(InsightsError::Configuration(
                "prediction.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:3030".to_string() }
    }
}

/// Where sales rows come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub parquet_path: Option<PathBuf>,
    /// Calendar days added to every stored date when it is read
    pub day_offset: i64,
}

impl StoreConfig {
    pub fn open(&self) -> Option<ParquetStore> {
        self.parquet_path
            .as_ref()
            .map(|path| ParquetStore::new(path).with_day_offset(self.day_offset))
    }
}

/// Prediction service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oversold_level: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overbought_level: Option<f64>,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/api/predict".to_string(),
            timeout_secs: 30,
            oversold_level: None,
            overbought_level: None,
        }
    }
}

impl PredictionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn client(&self) -> crate::Result<PredictionClient> {
        PredictionClient::new(self.endpoint.clone(), self.timeout())
    }
}

/// Indicator periods and scales used by the chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub rsi_max_scale: f64,
    pub revenue_divisor: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            sma_period: 7,
            ema_period: 14,
            rsi_period: DEFAULT_RSI_PERIOD,
            rsi_max_scale: DEFAULT_RSI_SCALE,
            revenue_divisor: 1000.0,
        }
    }
}

impl ChartSettings {
    /// Chart options with these settings and every toggle at its default
    pub fn to_options(&self) -> ChartOptions {
        ChartOptions {
            sma_period: self.sma_period,
            ema_period: self.ema_period,
            rsi_period: self.rsi_period,
            rsi_max_scale: self.rsi_max_scale,
            revenue_divisor: self.revenue_divisor,
            ..ChartOptions::default()
        }
    }
}
