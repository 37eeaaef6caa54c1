//! # Bakery Insights
//!
//! Sales-series indicators and chart configuration for a bakery dashboard.
//!
//! ## Features
//! - Gap-filling normalization of daily sales rows
//! - SMA, EMA, scaled Wilder RSI and least-squares trend lines
//! - Serializable chart configuration with stable dataset and axis ids
//! - Client for an external next-day sales prediction service
//! - Compiles to native and WASM
//!
//! ## Example
//! ```
//! use bakery_insights::{normalize, sma, scaled_rsi, linear_trend, Metric, SalesObservation};
//! use chrono::NaiveDate;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
//! let rows = vec![
//!     SalesObservation::new(day(1), 24, 192_000.0),
//!     SalesObservation::new(day(3), 30, 240_000.0),
//! ];
//! let series = normalize(&rows);
//! let bread = series.values(Metric::Bread);
//!
//! let sma_values = sma(&bread, 2).unwrap();
//! let rsi_values = scaled_rsi(&bread, 14, 50.0).unwrap();
//! let trend = linear_trend(&bread);
//! assert_eq!(bread, vec![24.0, 0.0, 30.0]);
//! ```

pub mod chart;
pub mod common;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod moving_averages;
pub mod oscillators;
pub mod prediction;
pub mod series;
pub mod store;
pub mod trend;

// Re-export commonly used items at crate root
pub use chart::{AxisTickContext, ChartBuilder, ChartConfig, ChartOptions, OscillatorPanel, PanelStatus};
pub use config::AppConfig;
pub use dashboard::{snapshot, DashboardSnapshot};
pub use error::{InsightsError, Result};
pub use moving_averages::{ema, sma};
pub use oscillators::{rsi, scaled_rsi, RsiLevels, RsiZone};
pub use prediction::{
    parse_forecast_value, ForecastKey, ForecastResult, ForecastSlot, PredictionClient, PredictionRequest, RequestTicket,
    TrendDirection,
};
pub use series::{
    normalize, CumulativeSeries, DateRange, DisplayMode, Metric, MonthSelector, NormalizedSeries,
    SalesObservation, SalesStats, TimeRange,
};
pub use store::{MemoryStore, ParquetStore, SalesStore};
pub use trend::{linear_trend, overall_trend, percent_changes, TrendLine};

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

/// WASM bindings for browser/Node.js use
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct Indicators;

#[cfg(feature = "wasm")]
fn to_js(err: InsightsError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl Indicators {
    // Moving Averages
    #[wasm_bindgen]
    pub fn sma(values: &[f64], period: usize) -> std::result::Result<Vec<f64>, JsValue> {
        moving_averages::sma(values, period).map_err(to_js)
    }

    #[wasm_bindgen]
    pub fn ema(values: &[f64], period: usize) -> std::result::Result<Vec<f64>, JsValue> {
        moving_averages::ema(values, period).map_err(to_js)
    }

    // Oscillators
    #[wasm_bindgen]
    pub fn rsi(values: &[f64], period: usize, max_scale: f64) -> std::result::Result<Vec<f64>, JsValue> {
        oscillators::scaled_rsi(values, period, max_scale).map_err(to_js)
    }

    // Trend
    #[wasm_bindgen]
    pub fn trend_line(values: &[f64]) -> Vec<f64> {
        trend::linear_trend(values).values
    }

    #[wasm_bindgen]
    pub fn percent_changes(values: &[f64]) -> Vec<f64> {
        trend::percent_changes(values)
    }
}
