//! Trend Indicators
//!
//! Least-squares trend line over a whole series plus the day-over-day and
//! first-to-last percentage changes drawn next to it.

use serde::{Deserialize, Serialize};

use crate::common::{mean, pct_change};

/// A fitted line `y = slope * x + intercept` evaluated at every index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub values: Vec<f64>,
}

impl TrendLine {
    /// Value of the line at an arbitrary index, including past the end
    pub fn value_at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Linear Regression Trend Line
///
/// Ordinary least squares with x = 0, 1, ..., n-1.
///
/// # Formula
/// slope = Σ((x - x̄)(y - ȳ)) / Σ((x - x̄)²)
/// intercept = ȳ - slope × x̄
///
/// # Returns
/// A line with one value per input point. A single point or a zero x-variance
/// gives a flat line through the mean; empty input gives slope 0, intercept 0
/// and no values.
pub fn linear_trend(values: &[f64]) -> TrendLine {
    let n = values.len();
    if n == 0 {
        return TrendLine::default();
    }

    let mean_x = (n - 1) as f64 / 2.0;
    let mean_y = mean(values);

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (x, &y) in values.iter().enumerate() {
        let dx = x as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }

    let slope = if n <= 1 || denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    };
    let intercept = mean_y - slope * mean_x;

    let values = (0..n).map(|x| slope * x as f64 + intercept).collect();

    TrendLine { slope, intercept, values }
}

/// Per-point Percentage Change
///
/// Index 0 is always 0. A zero previous value counts as a 100% rise when the
/// current value is positive, and as no change otherwise.
///
/// Formula: ((V[i] - V[i-1]) / V[i-1]) * 100
pub fn percent_changes(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }

    let mut result = Vec::with_capacity(values.len());
    result.push(0.0);
    result.extend(values.windows(2).map(|w| pct_change(w[0], w[1])));
    result
}

/// Overall Trend
///
/// Percentage change from the first to the last value of the series.
///
/// Formula: ((Last - First) / First) * 100, 0 when First is 0 or empty input
pub fn overall_trend(values: &[f64]) -> f64 {
    match (values.first(), values.last()) {
        (Some(&first), Some(&last)) if first != 0.0 => (last - first) / first * 100.0,
        _ => 0.0,
    }
}
