//! Dashboard snapshot: load, normalize, summarize and chart in one call

use chrono::NaiveDate;
use serde::Serialize;

use crate::chart::{ChartBuilder, ChartConfig, ChartOptions};
use crate::error::{InsightsError, Result};
use crate::series::{normalize, DateRange, Metric, MonthSelector, NormalizedSeries, SalesStats, TimeRange};
use crate::store::SalesStore;
use crate::trend::overall_trend;

/// Everything the sales dashboard shows for one date range
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub range: DateRange,
    pub stats: SalesStats,
    pub bread_trend_pct: f64,
    pub revenue_trend_pct: f64,
    pub series: NormalizedSeries,
    pub chart: ChartConfig,
}

/// Build a snapshot from explicit inputs
pub fn snapshot(store: &dyn SalesStore, range: DateRange, options: &ChartOptions) -> Result<DashboardSnapshot> {
    let rows = store.list_observations(Some(range))?;
    let series = normalize(&rows);
    let chart = ChartBuilder::new(&series, options).build()?;

    tracing::info!(
        start = %range.start(),
        end = %range.end(),
        rows = rows.len(),
        days = series.len(),
        "dashboard snapshot"
    );

    Ok(DashboardSnapshot {
        range,
        stats: series.stats(),
        bread_trend_pct: overall_trend(&series.values(Metric::Bread)),
        revenue_trend_pct: overall_trend(&series.values(Metric::Revenue)),
        series,
        chart,
    })
}

/// Resolve a range selector: `30d`, `60d`, `month` (the month of `today`)
/// or an explicit `YYYY-MM`.
pub fn parse_range(selector: &str, today: NaiveDate) -> Result<DateRange> {
    match selector.trim() {
        "30d" => TimeRange::Last30Days.resolve(today),
        "60d" => TimeRange::Last60Days.resolve(today),
        "month" => MonthSelector::containing(today).range(),
        other => {
            let parsed = other
                .split_once('-')
                .and_then(|(y, m)| Some((y.parse::<i32>().ok()?, m.parse::<u32>().ok()?)));
            match parsed {
                Some((year, month)) => MonthSelector::new(year, month).range(),
                None => Err(InsightsError::Configuration(format!(
                    "unknown range `{}`: expected 30d, 60d, month or YYYY-MM",
                    other
                ))),
            }
        }
    }
}
