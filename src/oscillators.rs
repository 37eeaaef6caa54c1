//! Oscillator Indicators
//!
//! This module provides the RSI panel shown under the sales chart:
//! - RSI: Relative Strength Index (Wilder's smoothing)
//! - Scaled RSI: the same value mapped onto a configurable ceiling
//! - Reference levels, zones and the labels drawn next to them

use serde::{Deserialize, Serialize};

use crate::common::{diff, gains_losses, nan_vec};
use crate::error::{validate_period, InsightsError, Result};

/// Default ceiling of the RSI axis
pub const DEFAULT_RSI_SCALE: f64 = 50.0;

/// Default RSI lookback
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Relative Strength Index (Wilder's RSI)
///
/// Measures momentum by comparing magnitude of recent gains vs losses.
///
/// # Formula
/// RS = Average Gain / Average Loss (using Wilder's smoothing)
/// RSI = 100 - (100 / (1 + RS))
///
/// # Arguments
/// * `values` - Daily sales values
/// * `period` - Lookback period (typically 14)
///
/// # Returns
/// RSI values between 0 and 100; the first `period` entries are NaN
pub fn rsi(values: &[f64], period: usize) -> Result<Vec<f64>> {
    validate_period("rsi", period)?;

    let n = values.len();
    if n < period + 1 {
        return Ok(nan_vec(n));
    }

    let mut result = nan_vec(n);

    // Calculate day-over-day changes
    let changes = diff(values);
    let (gains, losses) = gains_losses(&changes);

    // First average using SMA
    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / period as f64;

    result[period] = rsi_from_averages(avg_gain, avg_loss);

    // Subsequent RSI using Wilder's smoothing
    for i in period..changes.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
        result[i + 1] = rsi_from_averages(avg_gain, avg_loss);
    }

    Ok(result)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss != 0.0 {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    } else if avg_gain != 0.0 {
        100.0
    } else {
        50.0 // No movement
    }
}

/// RSI rescaled onto `[0, max_scale]`
///
/// Formula: RSI × max_scale / 100
///
/// A flat series sits at `max_scale / 2`.
pub fn scaled_rsi(values: &[f64], period: usize, max_scale: f64) -> Result<Vec<f64>> {
    validate_scale(max_scale)?;
    let factor = max_scale / 100.0;
    Ok(rsi(values, period)?.into_iter().map(|v| v * factor).collect())
}

fn validate_scale(max_scale: f64) -> Result<()> {
    if !max_scale.is_finite() || max_scale <= 0.0 {
        return Err(InsightsError::Configuration(format!(
            "rsi scale must be a positive number, got {}",
            max_scale
        )));
    }
    Ok(())
}

/// Reference lines of the RSI axis, derived from its ceiling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RsiLevels {
    pub max_scale: f64,
    pub overbought: f64,
    pub upper_neutral: f64,
    pub neutral: f64,
    pub lower_neutral: f64,
    pub oversold: f64,
}

impl RsiLevels {
    pub fn for_scale(max_scale: f64) -> Result<Self> {
        validate_scale(max_scale)?;
        Ok(Self {
            max_scale,
            overbought: (0.7 * max_scale).round(),
            upper_neutral: (0.6 * max_scale).round(),
            neutral: (0.5 * max_scale).round(),
            lower_neutral: (0.4 * max_scale).round(),
            oversold: (0.3 * max_scale).round(),
        })
    }

    /// Classify a scaled RSI value
    pub fn zone(&self, value: f64) -> RsiZone {
        if value >= self.overbought {
            RsiZone::Overbought
        } else if value <= self.oversold {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }

    /// Hover text, e.g. `RSI: 37.2 (Overbought)`
    pub fn tooltip_label(&self, value: f64) -> String {
        let mut label = format!("RSI: {:.1}", value);
        match self.zone(value) {
            RsiZone::Overbought => label.push_str(" (Overbought)"),
            RsiZone::Oversold => label.push_str(" (Oversold)"),
            RsiZone::Neutral => {}
        }
        label
    }

    /// Axis tick text: named levels get a word, other ticks their number
    pub fn tick_label(&self, value: f64) -> String {
        if value == self.overbought {
            "Overbought".to_string()
        } else if value == self.oversold {
            "Oversold".to_string()
        } else if value == self.neutral {
            "Neutral".to_string()
        } else {
            format_tick(value)
        }
    }

    /// Distance between axis ticks
    pub fn step_size(&self) -> f64 {
        (self.max_scale / 10.0).round().max(5.0)
    }

    /// Legend entries, top to bottom
    pub fn legend(&self) -> Vec<(String, f64)> {
        vec![
            (format!("Overbought ({})", format_tick(self.overbought)), self.overbought),
            (format!("Upper Neutral ({})", format_tick(self.upper_neutral)), self.upper_neutral),
            (format!("Neutral ({})", format_tick(self.neutral)), self.neutral),
            (format!("Lower Neutral ({})", format_tick(self.lower_neutral)), self.lower_neutral),
            (format!("Oversold ({})", format_tick(self.oversold)), self.oversold),
        ]
    }
}

impl Default for RsiLevels {
    fn default() -> Self {
        Self {
            max_scale: DEFAULT_RSI_SCALE,
            overbought: 35.0,
            upper_neutral: 30.0,
            neutral: 25.0,
            lower_neutral: 20.0,
            oversold: 15.0,
        }
    }
}

/// Where an RSI reading sits relative to the reference lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RsiZone {
    Overbought,
    Neutral,
    Oversold,
}

/// Whole numbers without a trailing `.0`
pub(crate) fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
