//! Chart configuration for the sales dashboard
//!
//! Builds a renderer-agnostic description of the sales chart: labels,
//! datasets, axes and the RSI sub-chart. Every build yields the same dataset
//! ids in the same order and the same axis ids, so a renderer can keep its
//! toggle state across rebuilds. Toggles only flip `hidden`.

use serde::{Deserialize, Serialize};

use crate::common::{last_valid, nan_as_null, nan_vec};
use crate::error::{require_history, validate_period, InsightsError, Result};
use crate::moving_averages::{ema, sma};
use crate::oscillators::{format_tick, scaled_rsi, RsiLevels, DEFAULT_RSI_PERIOD, DEFAULT_RSI_SCALE};
use crate::prediction::{ForecastResult, TrendDirection};
use crate::series::{DisplayMode, Metric, NormalizedSeries};
use crate::trend::{linear_trend, percent_changes};

pub const AXIS_X: &str = "x";
pub const AXIS_BREAD: &str = "y-bread";
pub const AXIS_REVENUE: &str = "y-revenue";
pub const AXIS_PERCENT: &str = "y-percent";
pub const AXIS_RSI: &str = "y-rsi";

pub const DATASET_SMA: &str = "sma";
pub const DATASET_EMA: &str = "ema";
pub const DATASET_PREDICTION: &str = "prediction";
pub const DATASET_RSI: &str = "rsi";

const BREAD_COLOR: &str = "rgb(59, 130, 246)";
const REVENUE_COLOR: &str = "rgb(34, 197, 94)";
const SMA_COLOR: &str = "rgb(249, 115, 22)";
const EMA_COLOR: &str = "rgb(168, 85, 247)";
const RSI_COLOR: &str = "rgb(236, 72, 153)";
const FORECAST_UP_COLOR: &str = "#22c55e";
const FORECAST_DOWN_COLOR: &str = "#ef4444";

/// What the user has switched on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartOptions {
    pub display_mode: DisplayMode,
    pub active_metrics: Vec<Metric>,
    pub show_percent_change: bool,
    pub show_sma: bool,
    pub show_ema: bool,
    pub show_rsi: bool,
    pub sma_period: usize,
    pub ema_period: usize,
    pub rsi_period: usize,
    pub rsi_max_scale: f64,
    /// Revenue is charted in units of this size (thousands by default)
    pub revenue_divisor: f64,
    pub viewport_width: u32,
    pub forecast: Option<ForecastResult>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            display_mode: DisplayMode::Daily,
            active_metrics: vec![Metric::Bread],
            show_percent_change: false,
            show_sma: false,
            show_ema: false,
            show_rsi: false,
            sma_period: 7,
            ema_period: 14,
            rsi_period: DEFAULT_RSI_PERIOD,
            rsi_max_scale: DEFAULT_RSI_SCALE,
            revenue_divisor: 1000.0,
            viewport_width: 1024,
            forecast: None,
        }
    }
}

impl ChartOptions {
    pub fn validate(&self) -> Result<()> {
        validate_period("sma", self.sma_period)?;
        validate_period("ema", self.ema_period)?;
        validate_period("rsi", self.rsi_period)?;
        if !self.revenue_divisor.is_finite() || self.revenue_divisor <= 0.0 {
            return Err(InsightsError::Configuration(format!(
                "revenue divisor must be a positive number, got {}",
                self.revenue_divisor
            )));
        }
        Ok(())
    }

    pub fn is_active(&self, metric: Metric) -> bool {
        self.active_metrics.contains(&metric)
    }

    /// Metric the overlays follow: bread when active or when nothing is
    pub fn primary_metric(&self) -> Metric {
        Metric::ALL
            .into_iter()
            .find(|m| self.is_active(*m))
            .unwrap_or(Metric::Bread)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisKind {
    Category,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AxisPosition {
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Axis {
    pub id: String,
    pub kind: AxisKind,
    pub position: AxisPosition,
    pub display: bool,
    pub begin_at_zero: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ticks_limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_size: Option<f64>,
}

impl Axis {
    fn linear(id: &str, position: AxisPosition) -> Self {
        Self {
            id: id.to_string(),
            kind: AxisKind::Linear,
            position,
            display: true,
            begin_at_zero: false,
            min: None,
            max: None,
            suggested_max: None,
            title: None,
            color: None,
            max_ticks_limit: None,
            step_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    pub label: String,
    #[serde(with = "nan_as_null")]
    pub data: Vec<f64>,
    pub y_axis_id: String,
    pub hidden: bool,
    pub border_color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub border_dash: Vec<u32>,
    pub point_radius: f64,
    pub tension: f64,
    pub fill: bool,
    /// Non-interactive datasets never produce tooltips
    pub interactive: bool,
}

impl Dataset {
    fn line(id: impl Into<String>, label: impl Into<String>, data: Vec<f64>, axis: &str, color: &str) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data,
            y_axis_id: axis.to_string(),
            hidden: false,
            border_color: color.to_string(),
            background_color: None,
            border_dash: Vec::new(),
            point_radius: 0.0,
            tension: 0.4,
            fill: false,
            interactive: true,
        }
    }

    fn dashed(mut self) -> Self {
        self.border_dash = vec![5, 5];
        self
    }

    fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }
}

/// Whether the RSI panel has anything to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum PanelStatus {
    Available,
    InsufficientData { required: usize, available: usize },
}

/// RSI sub-chart under the main chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OscillatorPanel {
    pub label: String,
    #[serde(with = "nan_as_null")]
    pub values: Vec<f64>,
    pub levels: RsiLevels,
    pub status: PanelStatus,
    pub visible: bool,
}

impl OscillatorPanel {
    /// Text shown in place of the chart when there is not enough history
    pub fn message(&self) -> Option<String> {
        match self.status {
            PanelStatus::Available => None,
            PanelStatus::InsufficientData { required, available } => Some(format!(
                "insufficient data to show RSI: need {} days, have {}",
                required, available
            )),
        }
    }
}

/// Context a renderer hands to a tick callback
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum AxisTickContext {
    Category { index: usize },
    Value { value: f64 },
}

/// Complete chart description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartConfig {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub axes: Vec<Axis>,
    pub oscillator: OscillatorPanel,
    pub display_mode: DisplayMode,
    pub primary_metric: Metric,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastResult>,
}

impl ChartConfig {
    pub fn dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.id == id)
    }

    pub fn axis(&self, id: &str) -> Option<&Axis> {
        self.axes.iter().find(|a| a.id == id)
    }

    /// Text for one tick of an axis; `None` for an unknown axis or index
    pub fn tick_label(&self, axis_id: &str, ctx: AxisTickContext) -> Option<String> {
        match (axis_id, ctx) {
            (AXIS_X, AxisTickContext::Category { index }) => self.labels.get(index).cloned(),
            (AXIS_RSI, AxisTickContext::Value { value }) => Some(self.oscillator.levels.tick_label(value)),
            (AXIS_PERCENT, AxisTickContext::Value { value }) => Some(format!("{}%", format_tick(value))),
            (AXIS_BREAD | AXIS_REVENUE, AxisTickContext::Value { value }) => Some(format_tick(value)),
            _ => None,
        }
    }

    /// Hover text for one point of a dataset
    pub fn tooltip_label(&self, dataset_id: &str, index: usize) -> Option<String> {
        if dataset_id == DATASET_RSI {
            let value = *self.oscillator.values.get(index)?;
            return (!value.is_nan()).then(|| self.oscillator.levels.tooltip_label(value));
        }

        let dataset = self.dataset(dataset_id)?;
        if !dataset.interactive {
            return None;
        }
        let value = *dataset.data.get(index)?;
        if value.is_nan() {
            return None;
        }

        if dataset.y_axis_id == AXIS_PERCENT {
            return Some(format!("{}: {:+.1}%", dataset.label, value));
        }

        if dataset_id == DATASET_PREDICTION {
            let forecast = self.forecast.as_ref()?;
            if index + 1 != dataset.data.len() {
                return None;
            }
            return Some(format!(
                "{}: {:.1} ({:+.1}%)",
                dataset.label, value, forecast.percent_change
            ));
        }

        if dataset_id == Metric::Bread.id() {
            Some(format!("{}: {}", dataset.label, value.round()))
        } else {
            Some(format!("{}: {:.1}", dataset.label, value))
        }
    }
}

/// Category label for a date, e.g. `15-Apr '24`
pub fn format_label(date: chrono::NaiveDate) -> String {
    date.format("%-d-%b '%y").to_string()
}

/// Tick budget for the x axis at a given viewport width
pub fn max_ticks_limit(viewport_width: u32, label_count: usize) -> usize {
    let limit = if viewport_width <= 480 {
        6
    } else if viewport_width <= 768 {
        10
    } else {
        15
    };
    limit.min(label_count)
}

/// Assembles a [`ChartConfig`] from a normalized series
pub struct ChartBuilder<'a> {
    series: &'a NormalizedSeries,
    options: &'a ChartOptions,
}

impl<'a> ChartBuilder<'a> {
    pub fn new(series: &'a NormalizedSeries, options: &'a ChartOptions) -> Self {
        Self { series, options }
    }

    pub fn build(&self) -> Result<ChartConfig> {
        self.options.validate()?;
        let levels = RsiLevels::for_scale(self.options.rsi_max_scale)?;

        let primary = self.options.primary_metric();
        let mut labels: Vec<String> = self.series.dates().into_iter().map(format_label).collect();

        let mut datasets = Vec::with_capacity(9);
        for metric in Metric::ALL {
            datasets.push(self.metric_dataset(metric));
        }
        for metric in Metric::ALL {
            datasets.push(self.trend_dataset(metric));
        }
        for metric in Metric::ALL {
            datasets.push(self.change_dataset(metric));
        }

        let primary_values = self.displayed(primary);
        let primary_axis = axis_for(primary);

        datasets.push(
            Dataset::line(
                DATASET_SMA,
                format!("SMA-{}", self.options.sma_period),
                sma(&primary_values, self.options.sma_period)?,
                primary_axis,
                SMA_COLOR,
            )
            .dashed()
            .hidden(!self.options.show_sma),
        );
        datasets.push(
            Dataset::line(
                DATASET_EMA,
                format!("EMA-{}", self.options.ema_period),
                ema(&primary_values, self.options.ema_period)?,
                primary_axis,
                EMA_COLOR,
            )
            .dashed()
            .hidden(!self.options.show_ema),
        );

        // A forecast belongs on the chart only when it continues the charted series
        let next_day = self.series.last_date().and_then(|d| d.succ_opt());
        let forecast = self
            .options
            .forecast
            .clone()
            .filter(|f| Some(f.target_date) == next_day);
        datasets.push(self.prediction_dataset(&primary_values, primary_axis, forecast.as_ref()));
        if let Some(forecast) = &forecast {
            labels.push(format_label(forecast.target_date));
        }

        let axes = self.axes(&levels, labels.len());
        let oscillator = self.oscillator(primary, levels)?;

        tracing::debug!(
            points = self.series.len(),
            primary = primary.id(),
            mode = ?self.options.display_mode,
            "built chart config"
        );

        Ok(ChartConfig {
            labels,
            datasets,
            axes,
            oscillator,
            display_mode: self.options.display_mode,
            primary_metric: primary,
            forecast,
        })
    }

    /// Values of a metric as charted: mode applied, revenue scaled
    fn displayed(&self, metric: Metric) -> Vec<f64> {
        let values = self.series.display_values(metric, self.options.display_mode);
        match metric {
            Metric::Bread => values,
            Metric::Revenue => values.into_iter().map(|v| v / self.options.revenue_divisor).collect(),
        }
    }

    fn metric_dataset(&self, metric: Metric) -> Dataset {
        let (color, fill) = metric_colors(metric);
        let mut dataset = Dataset::line(metric.id(), metric_label(metric, self.options.revenue_divisor), self.displayed(metric), axis_for(metric), color)
            .hidden(!self.options.is_active(metric));
        dataset.background_color = Some(fill.to_string());
        dataset.point_radius = 4.0;
        dataset.tension = 0.3;
        dataset.fill = true;
        dataset
    }

    fn trend_dataset(&self, metric: Metric) -> Dataset {
        let (color, _) = metric_colors(metric);
        let trend = linear_trend(&self.displayed(metric));
        let mut dataset = Dataset::line(
            format!("{}-trend", metric.id()),
            format!("{} Trend", metric.label()),
            trend.values,
            axis_for(metric),
            color,
        )
        .dashed()
        .hidden(!self.options.is_active(metric));
        dataset.tension = 0.0;
        dataset.interactive = false;
        dataset
    }

    fn change_dataset(&self, metric: Metric) -> Dataset {
        let (color, _) = metric_colors(metric);
        let visible = self.options.show_percent_change && self.options.is_active(metric);
        let mut dataset = Dataset::line(
            format!("{}-change", metric.id()),
            format!("{} Change", metric.label()),
            percent_changes(&self.displayed(metric)),
            AXIS_PERCENT,
            color,
        )
        .hidden(!visible);
        dataset.border_dash = vec![2, 3];
        dataset.point_radius = 2.0;
        dataset
    }

    fn prediction_dataset(&self, primary_values: &[f64], axis: &str, forecast: Option<&ForecastResult>) -> Dataset {
        let n = primary_values.len();
        let mut data = nan_vec(n);

        let color = match forecast {
            Some(f) if f.trend_direction == TrendDirection::Up => FORECAST_UP_COLOR,
            _ => FORECAST_DOWN_COLOR,
        };

        if let Some(forecast) = forecast {
            if let Some(last) = last_valid(primary_values) {
                data[n - 1] = last;
            }
            data.push(forecast.predicted_value);
        }

        let mut dataset = Dataset::line(DATASET_PREDICTION, "Forecast", data, axis, color).hidden(forecast.is_none());
        dataset.background_color = Some(
            if color == FORECAST_UP_COLOR {
                "rgba(34, 197, 94, 0.2)"
            } else {
                "rgba(239, 68, 68, 0.2)"
            }
            .to_string(),
        );
        dataset.point_radius = 5.0;
        dataset.tension = 0.0;
        dataset
    }

    fn axes(&self, levels: &RsiLevels, label_count: usize) -> Vec<Axis> {
        let daily = self.options.display_mode == DisplayMode::Daily;

        let mut x = Axis::linear(AXIS_X, AxisPosition::Bottom);
        x.kind = AxisKind::Category;
        x.max_ticks_limit = Some(max_ticks_limit(self.options.viewport_width, label_count));

        let mut bread = Axis::linear(AXIS_BREAD, AxisPosition::Left);
        bread.display = self.options.is_active(Metric::Bread);
        bread.begin_at_zero = daily;
        bread.title = Some(metric_label(Metric::Bread, self.options.revenue_divisor));
        bread.color = Some(BREAD_COLOR.to_string());
        if daily {
            bread.suggested_max = Some(self.series.stats().bread_axis_max as f64);
        }

        let mut revenue = Axis::linear(AXIS_REVENUE, AxisPosition::Right);
        revenue.display = self.options.is_active(Metric::Revenue);
        revenue.begin_at_zero = daily;
        revenue.title = Some(metric_label(Metric::Revenue, self.options.revenue_divisor));
        revenue.color = Some(REVENUE_COLOR.to_string());

        let mut percent = Axis::linear(AXIS_PERCENT, AxisPosition::Right);
        percent.display = self.options.show_percent_change;
        percent.title = Some("Change (%)".to_string());

        let mut rsi = Axis::linear(AXIS_RSI, AxisPosition::Right);
        rsi.display = self.options.show_rsi;
        rsi.begin_at_zero = true;
        rsi.min = Some(0.0);
        rsi.max = Some(levels.max_scale);
        rsi.step_size = Some(levels.step_size());
        rsi.title = Some(format!("RSI-{}", self.options.rsi_period));
        rsi.color = Some(RSI_COLOR.to_string());

        vec![x, bread, revenue, percent, rsi]
    }

    fn oscillator(&self, primary: Metric, levels: RsiLevels) -> Result<OscillatorPanel> {
        let period = self.options.rsi_period;
        // RSI follows daily momentum regardless of display mode
        let daily: Vec<f64> = match primary {
            Metric::Bread => self.series.values(primary),
            Metric::Revenue => self
                .series
                .values(primary)
                .into_iter()
                .map(|v| v / self.options.revenue_divisor)
                .collect(),
        };

        let status = match require_history(daily.len(), period + 1) {
            Ok(()) => PanelStatus::Available,
            Err(InsightsError::InsufficientData { required, available }) => {
                PanelStatus::InsufficientData { required, available }
            }
            Err(e) => return Err(e),
        };

        Ok(OscillatorPanel {
            label: format!("RSI-{}", period),
            values: scaled_rsi(&daily, period, levels.max_scale)?,
            levels,
            status,
            visible: self.options.show_rsi,
        })
    }
}

fn axis_for(metric: Metric) -> &'static str {
    match metric {
        Metric::Bread => AXIS_BREAD,
        Metric::Revenue => AXIS_REVENUE,
    }
}

fn metric_colors(metric: Metric) -> (&'static str, &'static str) {
    match metric {
        Metric::Bread => (BREAD_COLOR, "rgba(59, 130, 246, 0.15)"),
        Metric::Revenue => (REVENUE_COLOR, "rgba(34, 197, 94, 0.15)"),
    }
}

/// Series and axis title; revenue names the unit it is divided into
fn metric_label(metric: Metric, revenue_divisor: f64) -> String {
    match metric {
        Metric::Bread => metric.label().to_string(),
        Metric::Revenue if revenue_divisor == 1.0 => metric.label().to_string(),
        Metric::Revenue if revenue_divisor == 1_000.0 => format!("{} (thousands)", metric.label()),
        Metric::Revenue if revenue_divisor == 1_000_000.0 => format!("{} (millions)", metric.label()),
        Metric::Revenue => format!("{} (per {})", metric.label(), format_tick(revenue_divisor)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{normalize, SalesObservation};
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn sample_series(days: u32) -> NormalizedSeries {
        let rows: Vec<SalesObservation> = (1..=days)
            .map(|d| SalesObservation::new(day(d), 20 + (d * 7) % 13, 8_000.0 * (20 + (d * 7) % 13) as f64))
            .collect();
        normalize(&rows)
    }

    fn ids(config: &ChartConfig) -> Vec<&str> {
        config.datasets.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_dataset_and_axis_ids_are_stable() {
        let series = sample_series(20);
        let plain = ChartBuilder::new(&series, &ChartOptions::default()).build().unwrap();

        let options = ChartOptions {
            active_metrics: vec![Metric::Revenue],
            show_sma: true,
            show_ema: true,
            show_rsi: true,
            show_percent_change: true,
            display_mode: DisplayMode::Cumulative,
            ..ChartOptions::default()
        };
        let toggled = ChartBuilder::new(&series, &options).build().unwrap();

        let expected = vec![
            "bread",
            "revenue",
            "bread-trend",
            "revenue-trend",
            "bread-change",
            "revenue-change",
            "sma",
            "ema",
            "prediction",
        ];
        assert_eq!(ids(&plain), expected);
        assert_eq!(ids(&toggled), expected);

        let axis_ids = |c: &ChartConfig| c.axes.iter().map(|a| a.id.clone()).collect::<Vec<_>>();
        assert_eq!(axis_ids(&plain), axis_ids(&toggled));
        assert_eq!(axis_ids(&plain), vec!["x", "y-bread", "y-revenue", "y-percent", "y-rsi"]);
    }

    #[test]
    fn test_toggles_flip_hidden() {
        let series = sample_series(10);
        let config = ChartBuilder::new(&series, &ChartOptions::default()).build().unwrap();

        assert!(!config.dataset("bread").unwrap().hidden);
        assert!(config.dataset("revenue").unwrap().hidden);
        assert!(!config.dataset("bread-trend").unwrap().hidden);
        assert!(config.dataset("revenue-trend").unwrap().hidden);
        // Change overlays need their own toggle
        assert!(config.dataset("bread-change").unwrap().hidden);
        assert!(config.dataset("sma").unwrap().hidden);
        assert!(config.dataset("prediction").unwrap().hidden);

        let options = ChartOptions { show_percent_change: true, ..ChartOptions::default() };
        let config = ChartBuilder::new(&series, &options).build().unwrap();
        assert!(!config.dataset("bread-change").unwrap().hidden);
        assert!(config.dataset("revenue-change").unwrap().hidden);
    }

    #[test]
    fn test_revenue_scaled_and_primary_axis() {
        let series = sample_series(3);
        let options = ChartOptions {
            active_metrics: vec![Metric::Revenue],
            ..ChartOptions::default()
        };
        let config = ChartBuilder::new(&series, &options).build().unwrap();

        let raw = series.values(Metric::Revenue);
        let charted = &config.dataset("revenue").unwrap().data;
        assert_eq!(charted[0], raw[0] / 1000.0);

        assert_eq!(config.primary_metric, Metric::Revenue);
        assert_eq!(config.dataset("sma").unwrap().y_axis_id, AXIS_REVENUE);
        assert_eq!(config.dataset("bread-change").unwrap().y_axis_id, AXIS_PERCENT);
    }

    #[test]
    fn test_primary_defaults_to_bread() {
        let options = ChartOptions { active_metrics: vec![], ..ChartOptions::default() };
        assert_eq!(options.primary_metric(), Metric::Bread);
        let both = ChartOptions {
            active_metrics: vec![Metric::Revenue, Metric::Bread],
            ..ChartOptions::default()
        };
        assert_eq!(both.primary_metric(), Metric::Bread);
    }

    #[test]
    fn test_axis_rules() {
        let series = sample_series(10);
        let daily = ChartBuilder::new(&series, &ChartOptions::default()).build().unwrap();
        assert!(daily.axis(AXIS_BREAD).unwrap().begin_at_zero);
        assert!(!daily.axis(AXIS_PERCENT).unwrap().begin_at_zero);
        assert_eq!(daily.axis(AXIS_RSI).unwrap().max, Some(50.0));
        assert_eq!(daily.axis(AXIS_BREAD).unwrap().suggested_max, Some(40.0));

        let options = ChartOptions { display_mode: DisplayMode::Cumulative, ..ChartOptions::default() };
        let cumulative = ChartBuilder::new(&series, &options).build().unwrap();
        assert!(!cumulative.axis(AXIS_BREAD).unwrap().begin_at_zero);
        assert!(!cumulative.axis(AXIS_REVENUE).unwrap().begin_at_zero);
        assert!(!cumulative.axis(AXIS_PERCENT).unwrap().begin_at_zero);
    }

    #[test]
    fn test_max_ticks_limit() {
        assert_eq!(max_ticks_limit(375, 30), 6);
        assert_eq!(max_ticks_limit(480, 30), 6);
        assert_eq!(max_ticks_limit(768, 30), 10);
        assert_eq!(max_ticks_limit(1440, 30), 15);
        assert_eq!(max_ticks_limit(1440, 4), 4);
        assert_eq!(max_ticks_limit(1440, 0), 0);
    }

    #[test]
    fn test_labels() {
        assert_eq!(format_label(day(15)), "15-Apr '24");
        assert_eq!(format_label(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap()), "3-Jan '25");

        let series = sample_series(2);
        let config = ChartBuilder::new(&series, &ChartOptions::default()).build().unwrap();
        assert_eq!(config.labels, vec!["1-Apr '24", "2-Apr '24"]);
    }

    #[test]
    fn test_prediction_overlay() {
        let series = sample_series(5);
        let last = series.values(Metric::Bread)[4];
        let forecast = ForecastResult::derive(last + 10.0, last, day(5), 0.9, vec![]);
        let options = ChartOptions { forecast: Some(forecast), ..ChartOptions::default() };
        let config = ChartBuilder::new(&series, &options).build().unwrap();

        let prediction = config.dataset(DATASET_PREDICTION).unwrap();
        assert!(!prediction.hidden);
        assert_eq!(prediction.data.len(), 6);
        assert!(prediction.data[..4].iter().all(|v| v.is_nan()));
        assert_eq!(prediction.data[4], last);
        assert_eq!(prediction.data[5], last + 10.0);
        assert_eq!(prediction.border_color, FORECAST_UP_COLOR);

        assert_eq!(config.labels.len(), 6);
        assert_eq!(config.labels[5], "6-Apr '24");
        assert!(config.tooltip_label(DATASET_PREDICTION, 5).unwrap().starts_with("Forecast: "));
        assert_eq!(config.tooltip_label(DATASET_PREDICTION, 4), None);
    }

    #[test]
    fn test_revenue_title_follows_divisor() {
        let series = sample_series(3);
        let title = |divisor: f64| {
            let options = ChartOptions {
                active_metrics: vec![Metric::Revenue],
                revenue_divisor: divisor,
                ..ChartOptions::default()
            };
            let config = ChartBuilder::new(&series, &options).build().unwrap();
            let axis_title = config.axis(AXIS_REVENUE).unwrap().title.clone().unwrap();
            assert_eq!(config.dataset("revenue").unwrap().label, axis_title);
            axis_title
        };

        assert_eq!(title(1_000.0), "Revenue (thousands)");
        assert_eq!(title(1_000_000.0), "Revenue (millions)");
        assert_eq!(title(1.0), "Revenue");
        assert_eq!(title(500.0), "Revenue (per 500)");
    }

    #[test]
    fn test_prediction_for_other_range_is_dropped() {
        let series = sample_series(5);
        // Anchored on a later day than the charted series ends
        let forecast = ForecastResult::derive(40.0, 30.0, day(20), 0.9, vec![]);
        let options = ChartOptions { forecast: Some(forecast), ..ChartOptions::default() };
        let config = ChartBuilder::new(&series, &options).build().unwrap();

        assert!(config.forecast.is_none());
        assert_eq!(config.labels.len(), 5);
        assert_eq!(config.labels.last().map(String::as_str), Some("5-Apr '24"));

        let prediction = config.dataset(DATASET_PREDICTION).unwrap();
        assert!(prediction.hidden);
        assert_eq!(prediction.data.len(), 5);
        assert!(prediction.data.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_oscillator_status() {
        let short = sample_series(5);
        let options = ChartOptions { show_rsi: true, ..ChartOptions::default() };
        let config = ChartBuilder::new(&short, &options).build().unwrap();
        assert_eq!(
            config.oscillator.status,
            PanelStatus::InsufficientData { required: 15, available: 5 }
        );
        assert!(config.oscillator.message().is_some());

        let long = sample_series(30);
        let config = ChartBuilder::new(&long, &options).build().unwrap();
        assert_eq!(config.oscillator.status, PanelStatus::Available);
        assert!(config.oscillator.values[..14].iter().all(|v| v.is_nan()));
        assert!(config.oscillator.values[14..].iter().all(|v| (0.0..=50.0).contains(v)));
    }

    #[test]
    fn test_tick_and_tooltip_callbacks() {
        let series = sample_series(20);
        let options = ChartOptions { show_rsi: true, ..ChartOptions::default() };
        let config = ChartBuilder::new(&series, &options).build().unwrap();

        assert_eq!(
            config.tick_label(AXIS_X, AxisTickContext::Category { index: 0 }),
            Some("1-Apr '24".to_string())
        );
        assert_eq!(config.tick_label(AXIS_X, AxisTickContext::Category { index: 99 }), None);
        assert_eq!(
            config.tick_label(AXIS_RSI, AxisTickContext::Value { value: 35.0 }),
            Some("Overbought".to_string())
        );
        assert_eq!(
            config.tick_label(AXIS_PERCENT, AxisTickContext::Value { value: -20.0 }),
            Some("-20%".to_string())
        );
        assert_eq!(config.tick_label("y-unknown", AxisTickContext::Value { value: 1.0 }), None);

        let bread = config.dataset("bread").unwrap().data[0];
        assert_eq!(
            config.tooltip_label("bread", 0),
            Some(format!("Bread Sold: {}", bread))
        );
        assert_eq!(config.tooltip_label("bread-trend", 0), None);
        assert_eq!(config.tooltip_label("bread-change", 0), Some("Bread Sold Change: +0.0%".to_string()));
        assert_eq!(config.tooltip_label("sma", 0), None);
        assert!(config.tooltip_label("sma", 6).unwrap().starts_with("SMA-7: "));
        assert!(config.tooltip_label(DATASET_RSI, 15).unwrap().starts_with("RSI: "));
        assert_eq!(config.tooltip_label(DATASET_RSI, 0), None);
    }

    #[test]
    fn test_empty_series() {
        let series = normalize(&[]);
        let options = ChartOptions {
            forecast: Some(ForecastResult::derive(1.0, 1.0, day(1), 0.9, vec![])),
            ..ChartOptions::default()
        };
        let config = ChartBuilder::new(&series, &options).build().unwrap();
        assert!(config.labels.is_empty());
        assert_eq!(config.datasets.len(), 9);
        assert!(config.datasets.iter().all(|d| d.data.is_empty()));
        assert!(config.forecast.is_none());
        assert_eq!(config.axis(AXIS_X).unwrap().max_ticks_limit, Some(0));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let series = sample_series(3);
        let zero_sma = ChartOptions { sma_period: 0, ..ChartOptions::default() };
        assert!(matches!(
            ChartBuilder::new(&series, &zero_sma).build(),
            Err(InsightsError::Configuration(_))
        ));

        let bad_scale = ChartOptions { rsi_max_scale: -1.0, ..ChartOptions::default() };
        assert!(ChartBuilder::new(&series, &bad_scale).build().is_err());
    }

    #[test]
    fn test_serializes_camel_case_with_nulls() {
        let series = sample_series(3);
        let config = ChartBuilder::new(&series, &ChartOptions::default()).build().unwrap();
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["datasets"][0]["yAxisId"], "y-bread");
        assert_eq!(json["datasets"][6]["data"][0], serde_json::Value::Null);
        assert_eq!(json["oscillator"]["status"]["state"], "insufficientData");
        assert_eq!(json["primaryMetric"], "bread");
    }

    #[test]
    fn test_rebuild_is_identical() {
        let series = sample_series(25);
        let options = ChartOptions { show_sma: true, show_ema: true, ..ChartOptions::default() };
        let a = serde_json::to_string(&ChartBuilder::new(&series, &options).build().unwrap()).unwrap();
        let b = serde_json::to_string(&ChartBuilder::new(&series, &options).build().unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
