//! Common utilities shared across indicator modules

/// Initialize a result vector with NaN values
#[inline]
pub fn nan_vec(len: usize) -> Vec<f64> {
    vec![f64::NAN; len]
}

/// Check if we have enough data for the given period
#[inline]
pub fn has_enough_data(len: usize, period: usize) -> bool {
    len >= period && period > 0
}

/// Calculate the sum of a slice
#[inline]
pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

/// Calculate the mean of a slice
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    sum(values) / values.len() as f64
}

/// Percentage change from `previous` to `current`.
///
/// A zero base counts as a full 100% rise when the new value is positive,
/// and as no change otherwise.
#[inline]
pub fn pct_change(previous: f64, current: f64) -> f64 {
    if previous != 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Compute pairwise differences (like np.diff)
pub fn diff(values: &[f64]) -> Vec<f64> {
    if values.len() < 2 {
        return vec![];
    }
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Separate gains and losses from value changes
pub fn gains_losses(changes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let gains: Vec<f64> = changes.iter().map(|&c| if c > 0.0 { c } else { 0.0 }).collect();
    let losses: Vec<f64> = changes.iter().map(|&c| if c < 0.0 { -c } else { 0.0 }).collect();
    (gains, losses)
}

/// Running sum, same length as the input
pub fn running_sum(values: &[f64]) -> Vec<f64> {
    values
        .iter()
        .scan(0.0, |acc, &v| {
            *acc += v;
            Some(*acc)
        })
        .collect()
}

/// Last value that is not NaN
pub fn last_valid(values: &[f64]) -> Option<f64> {
    values.iter().rev().find(|v| !v.is_nan()).copied()
}

/// Serialize NaN sentinels as JSON `null`
pub mod nan_as_null {
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for v in values {
            if v.is_finite() {
                seq.serialize_element(&Some(*v))?;
            } else {
                seq.serialize_element(&None::<f64>)?;
            }
        }
        seq.end()
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}
