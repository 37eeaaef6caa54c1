//! Moving Average Indicators
//!
//! This module provides the two smoothing transforms drawn over sales:
//! - SMA: Simple Moving Average
//! - EMA: Exponential Moving Average
//!
//! Both return a vector aligned with the input where positions before the
//! warm-up period hold NaN.

use crate::common::{has_enough_data, nan_vec};
use crate::error::{validate_period, Result};

/// Simple Moving Average (SMA)
///
/// The arithmetic mean of the last `period` values.
///
/// # Formula
/// SMA = (P1 + P2 + ... + Pn) / n
///
/// # Arguments
/// * `values` - Daily sales or indicator values
/// * `period` - Number of days to average (must be at least 1)
///
/// # Returns
/// Vector of same length as input, with NaN for first `period - 1` values
///
/// # Example
/// ```
/// use bakery_insights::sma;
/// let sales = vec![2.0, 4.0, 6.0, 8.0, 10.0];
/// let result = sma(&sales, 3).unwrap();
/// assert_eq!(result[2], 4.0);  // (2+4+6)/3
/// assert_eq!(result[4], 8.0);  // (6+8+10)/3
/// ```
pub fn sma(values: &[f64], period: usize) -> Result<Vec<f64>> {
    validate_period("sma", period)?;

    let n = values.len();
    if !has_enough_data(n, period) {
        return Ok(nan_vec(n));
    }

    let mut result = nan_vec(n);

    // Calculate first SMA
    let mut sum: f64 = values[..period].iter().sum();
    result[period - 1] = sum / period as f64;

    // Rolling calculation - add new, subtract old
    for i in period..n {
        sum = sum - values[i - period] + values[i];
        result[i] = sum / period as f64;
    }

    Ok(result)
}

/// Exponential Moving Average (EMA)
///
/// Gives more weight to recent days using exponential decay.
///
/// # Formula
/// Multiplier = 2 / (period + 1)
/// EMA = (Value - Previous EMA) × Multiplier + Previous EMA
///
/// The first defined value (index `period - 1`) is seeded with the SMA of the
/// first `period` values, so SMA and EMA agree exactly there.
pub fn ema(values: &[f64], period: usize) -> Result<Vec<f64>> {
    validate_period("ema", period)?;

    let n = values.len();
    if !has_enough_data(n, period) {
        return Ok(nan_vec(n));
    }

    let mut result = nan_vec(n);
    let multiplier = 2.0 / (period as f64 + 1.0);

    let start_idx = period - 1;
    result[start_idx] = values[..period].iter().sum::<f64>() / period as f64;

    for i in (start_idx + 1)..n {
        result[i] = (values[i] - result[i - 1]) * multiplier + result[i - 1];
    }

    Ok(result)
}
