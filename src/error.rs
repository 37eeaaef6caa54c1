//! Error types shared across the crate

use thiserror::Error;

/// Errors surfaced by the insights library.
///
/// Indicator engines never return `InsufficientData`; they encode missing
/// history as NaN so partial series can still be charted.
#[derive(Debug, Error)]
pub enum InsightsError {
    #[error("insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("prediction service error{}: {body}", .status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    PredictionService { status: Option<u16>, body: String },

    #[error("prediction response has no numeric forecast: {raw}")]
    PredictionParse { raw: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("sales store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InsightsError {
    /// Upstream HTTP status, when the error came from the prediction service
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::PredictionService { status, .. } => *status,
            _ => None,
        }
    }

    /// Prediction failures are advisory; callers keep rendering without them
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::PredictionService { .. } | Self::PredictionParse { .. })
    }
}

impl From<reqwest::Error> for InsightsError {
    fn from(err: reqwest::Error) -> Self {
        Self::PredictionService {
            status: err.status().map(|s| s.as_u16()),
            body: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightsError>;

/// Reject a zero period before any computation starts
pub fn validate_period(name: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(InsightsError::Configuration(format!(
            "{} period must be at least 1",
            name
        )));
    }
    Ok(())
}

/// Check that a series carries enough points for an indicator's warm-up
pub fn require_history(available: usize, required: usize) -> Result<()> {
    if available < required {
        return Err(InsightsError::InsufficientData { required, available });
    }
    Ok(())
}
