//! Bakery insights server - indicators, chart configs and forecasts over HTTP
//!
//! Run: cargo run --release --bin server -- --config insights.json
//! Test: curl -X POST http://localhost:3030/rsi -H "Content-Type: application/json" -d '{"values":[20,24,19,27,25,30,28,22,26,31,29,24,27,33,30,28],"period":14}'

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};

use bakery_insights::common::nan_as_null;
use bakery_insights::config::AppConfig;
use bakery_insights::dashboard::{parse_range, snapshot, DashboardSnapshot};
use bakery_insights::logging::setup_logging;
use bakery_insights::oscillators::{DEFAULT_RSI_PERIOD, DEFAULT_RSI_SCALE};
use bakery_insights::{
    ema, linear_trend, normalize, overall_trend, percent_changes, scaled_rsi, sma, ChartBuilder, ChartConfig,
    ChartOptions, CumulativeSeries, ForecastResult, ForecastSlot, InsightsError, NormalizedSeries,
    PredictionClient, PredictionRequest, SalesObservation, SalesStats, SalesStore, TrendLine,
};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "HTTP API for bakery sales indicators and forecasts", long_about = None)]
struct Args {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

struct AppState {
    config: AppConfig,
    store: Option<Arc<dyn SalesStore>>,
    predictor: PredictionClient,
    forecasts: ForecastSlot,
}

type ApiResult<T> = std::result::Result<Json<T>, (StatusCode, String)>;

fn status_for(err: &InsightsError) -> StatusCode {
    match err {
        InsightsError::Configuration(_) | InsightsError::InsufficientData { .. } => StatusCode::BAD_REQUEST,
        InsightsError::PredictionService { .. } | InsightsError::PredictionParse { .. } => StatusCode::BAD_GATEWAY,
        InsightsError::Store(_) | InsightsError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reject(err: InsightsError) -> (StatusCode, String) {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::warn!(error = %err, "request failed");
    }
    (status, err.to_string())
}

#[derive(Deserialize)]
struct SingleSeriesRequest {
    values: Vec<f64>,
    period: usize,
}

#[derive(Deserialize)]
struct RsiRequest {
    values: Vec<f64>,
    #[serde(default = "default_rsi_period")]
    period: usize,
    #[serde(default = "default_rsi_scale")]
    max_scale: f64,
}

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_rsi_scale() -> f64 {
    DEFAULT_RSI_SCALE
}

#[derive(Serialize)]
struct Response {
    #[serde(serialize_with = "nan_as_null::serialize")]
    result: Vec<f64>,
}

// Moving averages
async fn sma_handler(Json(req): Json<SingleSeriesRequest>) -> ApiResult<Response> {
    let result = sma(&req.values, req.period).map_err(reject)?;
    Ok(Json(Response { result }))
}

async fn ema_handler(Json(req): Json<SingleSeriesRequest>) -> ApiResult<Response> {
    let result = ema(&req.values, req.period).map_err(reject)?;
    Ok(Json(Response { result }))
}

// Oscillators
async fn rsi_handler(Json(req): Json<RsiRequest>) -> ApiResult<Response> {
    let result = scaled_rsi(&req.values, req.period, req.max_scale).map_err(reject)?;
    Ok(Json(Response { result }))
}

// Trend
#[derive(Deserialize)]
struct ValuesRequest {
    values: Vec<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TrendResponse {
    trend: TrendLine,
    percent_changes: Vec<f64>,
    overall_trend: f64,
}

async fn trend_handler(Json(req): Json<ValuesRequest>) -> Json<TrendResponse> {
    Json(TrendResponse {
        trend: linear_trend(&req.values),
        percent_changes: percent_changes(&req.values),
        overall_trend: overall_trend(&req.values),
    })
}

// Series
#[derive(Deserialize)]
struct RowsRequest {
    rows: Vec<SalesObservation>,
}

#[derive(Serialize)]
struct NormalizeResponse {
    series: NormalizedSeries,
    cumulative: CumulativeSeries,
    stats: SalesStats,
}

async fn normalize_handler(Json(req): Json<RowsRequest>) -> Json<NormalizeResponse> {
    let series = normalize(&req.rows);
    Json(NormalizeResponse {
        cumulative: series.cumulative(),
        stats: series.stats(),
        series,
    })
}

#[derive(Deserialize)]
struct ChartRequest {
    rows: Vec<SalesObservation>,
    #[serde(default)]
    options: Option<ChartOptions>,
}

async fn chart_handler(State(state): State<Arc<AppState>>, Json(req): Json<ChartRequest>) -> ApiResult<ChartConfig> {
    let options = req.options.unwrap_or_else(|| state.config.chart.to_options());
    let series = normalize(&req.rows);
    let config = ChartBuilder::new(&series, &options).build().map_err(reject)?;
    Ok(Json(config))
}

#[derive(Deserialize)]
struct DashboardQuery {
    #[serde(default = "default_range")]
    range: String,
}

fn default_range() -> String {
    "30d".to_string()
}

async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<DashboardSnapshot> {
    let Some(store) = state.store.clone() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "no sales store configured".to_string(),
        ));
    };

    let today = chrono::Local::now().date_naive();
    let range = parse_range(&query.range, today).map_err(reject)?;
    let mut options = state.config.chart.to_options();
    options.forecast = state.forecasts.current();

    let snap = tokio::task::spawn_blocking(move || snapshot(store.as_ref(), range, &options))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(reject)?;
    Ok(Json(snap))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    forecast: Option<ForecastResult>,
    superseded: bool,
}

async fn forecast_handler(
    State(state): State<Arc<AppState>>,
    Json(mut req): Json<PredictionRequest>,
) -> ApiResult<ForecastResponse> {
    if req.oversold_level.is_none() {
        req.oversold_level = state.config.prediction.oversold_level;
    }
    if req.overbought_level.is_none() {
        req.overbought_level = state.config.prediction.overbought_level;
    }

    let forecast = state
        .forecasts
        .fetch(&state.predictor, &req)
        .await
        .map_err(reject)?;

    Ok(Json(ForecastResponse {
        superseded: forecast.is_none(),
        forecast,
    }))
}

async fn refresh_handler(State(state): State<Arc<AppState>>) -> StatusCode {
    state.forecasts.invalidate();
    tracing::info!("sales data refreshed, cached forecasts dropped");
    StatusCode::NO_CONTENT
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose)?;

    let config = AppConfig::load(args.config.as_deref())?;
    let store: Option<Arc<dyn SalesStore>> = config
        .store
        .open()
        .map(|store| Arc::new(store) as Arc<dyn SalesStore>);
    if store.is_none() {
        tracing::warn!("no parquet store configured, /dashboard is disabled");
    }
    let predictor = config.prediction.client()?;
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", config.server.bind_addr))?;

    let state = Arc::new(AppState {
        config,
        store,
        predictor,
        forecasts: ForecastSlot::new(),
    });

    let app = Router::new()
        // Moving averages
        .route("/sma", post(sma_handler))
        .route("/ema", post(ema_handler))
        // Oscillators
        .route("/rsi", post(rsi_handler))
        // Trend
        .route("/trend", post(trend_handler))
        // Series and charts
        .route("/normalize", post(normalize_handler))
        .route("/chart", post(chart_handler))
        .route("/dashboard", get(dashboard_handler))
        // Forecasts
        .route("/forecast", post(forecast_handler))
        .route("/refresh", post(refresh_handler))
        .with_state(state);

    tracing::info!(%addr, "bakery insights server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
