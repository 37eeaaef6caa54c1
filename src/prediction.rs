//! Client for the external sales prediction service
//!
//! The service receives the recent daily values and answers either with a
//! structured forecast or with free model output that has to be scanned for
//! a number. Failures here are advisory: callers keep rendering the dashboard
//! without a forecast.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{require_history, InsightsError, Result};
use crate::oscillators::RsiLevels;
use crate::series::{Metric, NormalizedSeries};

/// Confidence reported when the service does not provide one
pub const DEFAULT_CONFIDENCE: f64 = 0.9;

/// Fewest daily values worth sending to the service
pub const MIN_HISTORY: usize = 3;

/// Body of the POST sent to the prediction service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<NaiveDate>,
    #[serde(rename = "lastDateStr", default, skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oversold_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overbought_level: Option<f64>,
}

impl PredictionRequest {
    pub fn new(values: Vec<f64>, last_date: NaiveDate) -> Self {
        Self {
            values,
            dates: Vec::new(),
            last_date: Some(last_date),
            oversold_level: None,
            overbought_level: None,
        }
    }

    /// Daily values of one metric with their dates; `None` for an empty series
    pub fn from_series(series: &NormalizedSeries, metric: Metric, divisor: f64) -> Option<Self> {
        let last_date = series.last_date()?;
        Some(Self {
            values: series.values(metric).into_iter().map(|v| v / divisor).collect(),
            dates: series.dates(),
            last_date: Some(last_date),
            oversold_level: None,
            overbought_level: None,
        })
    }

    pub fn with_levels(mut self, levels: &RsiLevels) -> Self {
        self.oversold_level = Some(levels.oversold);
        self.overbought_level = Some(levels.overbought);
        self
    }

    /// Date the forecast is anchored on
    pub fn anchor_date(&self) -> Option<NaiveDate> {
        self.last_date.or_else(|| self.dates.last().copied())
    }
}

/// Structured answer of the prediction service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction_value: f64,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub trend_direction: Option<TrendDirection>,
    #[serde(default)]
    pub reasoning: Vec<String>,
    #[serde(default)]
    pub percent_change: Option<f64>,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Sideways,
}

impl TrendDirection {
    pub fn between(last: f64, predicted: f64) -> Self {
        if predicted > last {
            TrendDirection::Up
        } else if predicted < last {
            TrendDirection::Down
        } else {
            TrendDirection::Sideways
        }
    }
}

/// Forecast for the day after the last observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub predicted_value: f64,
    pub confidence: f64,
    pub trend_direction: TrendDirection,
    pub reasoning: Vec<String>,
    pub target_date: NaiveDate,
    pub percent_change: f64,
}

impl ForecastResult {
    /// Derive direction, change and target date from the last known value
    pub fn derive(
        predicted_value: f64,
        last_value: f64,
        last_date: NaiveDate,
        confidence: f64,
        reasoning: Vec<String>,
    ) -> Self {
        let percent_change = if last_value != 0.0 {
            (predicted_value - last_value) / last_value * 100.0
        } else {
            0.0
        };

        Self {
            predicted_value,
            confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { DEFAULT_CONFIDENCE },
            trend_direction: TrendDirection::between(last_value, predicted_value),
            reasoning,
            target_date: last_date.succ_opt().unwrap_or(last_date),
            percent_change,
        }
    }
}

/// Pulls the forecast number out of free model output
#[derive(Debug, Clone)]
pub struct ForecastParser {
    dated: Regex,
    number: Regex,
}

impl ForecastParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| InsightsError::Configuration(e.to_string()))
        };
        Ok(Self {
            dated: compile(r"\d{4}-\d{2}-\d{2}:?\s*([-+]?[0-9]*\.?[0-9]+)")?,
            number: compile(r"([-+]?[0-9]*\.?[0-9]+)")?,
        })
    }

    /// First `YYYY-MM-DD: <number>` pair, else the first number anywhere
    pub fn parse(&self, text: &str) -> Option<f64> {
        self.dated
            .captures(text)
            .or_else(|| self.number.captures(text))
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Turn a response body into `(value, confidence, reasoning)`
    fn interpret(&self, body: &str) -> Result<(f64, Option<f64>, Vec<String>)> {
        let json: Option<Value> = serde_json::from_str(body).ok();

        if let Some(json) = &json {
            if let Ok(structured) = serde_json::from_value::<PredictionResponse>(json.clone()) {
                return Ok((
                    structured.prediction_value,
                    Some(structured.confidence),
                    structured.reasoning,
                ));
            }
        }

        let text = match &json {
            Some(json) => extract_generated_text(json),
            None => body.to_string(),
        };

        let value = self
            .parse(&text)
            .ok_or_else(|| InsightsError::PredictionParse { raw: text.clone() })?;

        let reasoning = vec![
            "Model output processed".to_string(),
            format!("Raw output: {}", text),
        ];
        Ok((value, None, reasoning))
    }
}

/// Parse a forecast value from free text
pub fn parse_forecast_value(text: &str) -> Result<f64> {
    ForecastParser::new()?
        .parse(text)
        .ok_or_else(|| InsightsError::PredictionParse { raw: text.to_string() })
}

/// Text generated by an inference endpoint, in the shapes such endpoints use
pub fn extract_generated_text(value: &Value) -> String {
    let generated = |v: &Value| v.get("generated_text").and_then(Value::as_str).map(str::to_string);

    match value {
        Value::String(text) => text.clone(),
        _ => generated(value)
            .or_else(|| value.get(0).and_then(generated))
            .or_else(|| value.get("prediction_value").and_then(generated))
            .unwrap_or_else(|| value.to_string()),
    }
}

/// HTTP client for the prediction endpoint
#[derive(Debug, Clone)]
pub struct PredictionClient {
    client: Client,
    endpoint: String,
    parser: ForecastParser,
}

impl PredictionClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            parser: ForecastParser::new()?,
        })
    }

    /// Point the client at another endpoint, e.g. a local mock
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service for the next day's value
    pub async fn predict(&self, request: &PredictionRequest) -> Result<ForecastResult> {
        require_history(request.values.len(), MIN_HISTORY)?;
        let last_date = request.anchor_date().ok_or_else(|| {
            InsightsError::Configuration("prediction request needs a last date".to_string())
        })?;
        let last_value = request.values.last().copied().unwrap_or(0.0);

        tracing::debug!(
            endpoint = %self.endpoint,
            points = request.values.len(),
            %last_date,
            "requesting forecast"
        );

        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "prediction service returned an error");
            return Err(InsightsError::PredictionService {
                status: Some(status.as_u16()),
                body,
            });
        }

        let (value, confidence, reasoning) = self.parser.interpret(&body)?;
        Ok(ForecastResult::derive(
            value,
            last_value,
            last_date,
            confidence.unwrap_or(DEFAULT_CONFIDENCE),
            reasoning,
        ))
    }
}

/// Identity of a forecast: the anchor day and the exact request payload.
///
/// Two series ending on the same day (bread and revenue, say) get separate
/// cache entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForecastKey {
    last_date: NaiveDate,
    values: Vec<u64>,
    levels: (Option<u64>, Option<u64>),
}

impl ForecastKey {
    /// `None` when the request carries no anchor date
    pub fn for_request(request: &PredictionRequest) -> Option<Self> {
        Some(Self {
            last_date: request.anchor_date()?,
            values: request.values.iter().map(|v| v.to_bits()).collect(),
            levels: (
                request.oversold_level.map(f64::to_bits),
                request.overbought_level.map(f64::to_bits),
            ),
        })
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last_date
    }
}

/// Handle for one forecast request issued through a [`ForecastSlot`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    seq: u64,
    key: ForecastKey,
}

impl RequestTicket {
    pub fn key(&self) -> &ForecastKey {
        &self.key
    }
}

#[derive(Debug, Default)]
struct SlotState {
    latest: u64,
    current: Option<ForecastResult>,
    cache: HashMap<ForecastKey, ForecastResult>,
}

/// Holds the forecast on screen; only the latest request may fill it
#[derive(Debug, Default)]
pub struct ForecastSlot {
    state: Mutex<SlotState>,
}

impl ForecastSlot {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Issue a ticket; every earlier ticket becomes stale
    pub fn begin(&self, key: ForecastKey) -> RequestTicket {
        let mut state = self.lock();
        state.latest += 1;
        RequestTicket { seq: state.latest, key }
    }

    pub fn is_latest(&self, ticket: &RequestTicket) -> bool {
        self.lock().latest == ticket.seq
    }

    /// Store a completed forecast. Returns `false` when the ticket was superseded.
    pub fn complete(&self, ticket: RequestTicket, forecast: ForecastResult) -> bool {
        let mut state = self.lock();
        if state.latest != ticket.seq {
            tracing::debug!(
                ticket = ticket.seq,
                latest = state.latest,
                "discarding stale forecast"
            );
            return false;
        }
        state.cache.insert(ticket.key, forecast.clone());
        state.current = Some(forecast);
        true
    }

    pub fn current(&self) -> Option<ForecastResult> {
        self.lock().current.clone()
    }

    pub fn cached(&self, key: &ForecastKey) -> Option<ForecastResult> {
        self.lock().cache.get(key).cloned()
    }

    /// Show a cached forecast. It counts as the newest request, so anything
    /// still in flight is superseded.
    fn show_cached(&self, key: &ForecastKey) -> Option<ForecastResult> {
        let mut state = self.lock();
        let hit = state.cache.get(key).cloned()?;
        state.latest += 1;
        state.current = Some(hit.clone());
        Some(hit)
    }

    /// Data changed: drop cached forecasts and supersede in-flight requests
    pub fn invalidate(&self) {
        let mut state = self.lock();
        state.latest += 1;
        state.current = None;
        state.cache.clear();
    }

    /// Serve from cache or ask the service. `Ok(None)` means a newer request won.
    pub async fn fetch(
        &self,
        client: &PredictionClient,
        request: &PredictionRequest,
    ) -> Result<Option<ForecastResult>> {
        let key = ForecastKey::for_request(request).ok_or_else(|| {
            InsightsError::Configuration("prediction request needs a last date".to_string())
        })?;

        if let Some(hit) = self.show_cached(&key) {
            return Ok(Some(hit));
        }

        let ticket = self.begin(key);
        let forecast = client.predict(request).await?;
        if self.complete(ticket, forecast.clone()) {
            Ok(Some(forecast))
        } else {
            Ok(None)
        }
    }
}
