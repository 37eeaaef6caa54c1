//! Sales series normalization
//!
//! Turns the sparse, unordered rows coming out of a sales store into a
//! contiguous day-by-day series:
//! - every calendar day between the first and last observation is present
//! - days without a persisted row are synthesized with zero values
//! - parallel cumulative series for bread units and revenue
//!
//! Also holds the date-range selectors (rolling presets, calendar months)
//! the dashboard passes explicitly to the store.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::common::running_sum;
use crate::error::{InsightsError, Result};

/// One day of bakery sales as persisted by the store
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesObservation {
    pub date: NaiveDate,
    #[serde(alias = "total_bread")]
    pub bread_units: u32,
    #[serde(alias = "total_sales", deserialize_with = "deserialize_revenue")]
    pub revenue: f64,
}

impl SalesObservation {
    pub fn new(date: NaiveDate, bread_units: u32, revenue: f64) -> Self {
        Self { date, bread_units, revenue }
    }

    /// Like [`SalesObservation::new`], refusing negative or non-finite revenue
    pub fn try_new(date: NaiveDate, bread_units: u32, revenue: f64) -> Result<Self> {
        Ok(Self::new(date, bread_units, check_revenue(revenue)?))
    }

    /// Placeholder for a day with no persisted row
    pub fn zero(date: NaiveDate) -> Self {
        Self { date, bread_units: 0, revenue: 0.0 }
    }

    /// Same observation moved by `days` calendar days
    pub fn shifted(&self, days: i64) -> Option<Self> {
        let date = self.date.checked_add_signed(Duration::days(days))?;
        Some(Self { date, ..*self })
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Bread => self.bread_units as f64,
            Metric::Revenue => self.revenue,
        }
    }
}

/// Revenue must be a finite, non-negative amount
pub fn check_revenue(revenue: f64) -> Result<f64> {
    if revenue.is_finite() && revenue >= 0.0 {
        Ok(revenue)
    } else {
        Err(InsightsError::Configuration(format!(
            "revenue must be a non-negative amount, got {}",
            revenue
        )))
    }
}

fn deserialize_revenue<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let revenue = f64::deserialize(deserializer)?;
    check_revenue(revenue).map_err(serde::de::Error::custom)
}

/// Which quantity of an observation a series tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Bread,
    Revenue,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Bread, Metric::Revenue];

    pub fn id(&self) -> &'static str {
        match self {
            Metric::Bread => "bread",
            Metric::Revenue => "revenue",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Bread => "Bread Sold",
            Metric::Revenue => "Revenue",
        }
    }
}

/// Daily values or their running total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    #[default]
    Daily,
    Cumulative,
}

/// Contiguous, chronologically ordered sales series
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedSeries {
    observations: Vec<SalesObservation>,
}

/// Running sums of a [`NormalizedSeries`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CumulativeSeries {
    pub bread_units: Vec<f64>,
    pub revenue: Vec<f64>,
}

impl CumulativeSeries {
    pub fn values(&self, metric: Metric) -> &[f64] {
        match metric {
            Metric::Bread => &self.bread_units,
            Metric::Revenue => &self.revenue,
        }
    }
}

/// Fill calendar gaps with zero-valued days and sort ascending.
///
/// Rows sharing a date collapse to the last one seen. Empty input yields an
/// empty series.
pub fn normalize(rows: &[SalesObservation]) -> NormalizedSeries {
    let by_date: BTreeMap<NaiveDate, SalesObservation> =
        rows.iter().map(|row| (row.date, *row)).collect();

    let (first, last) = match (by_date.keys().next(), by_date.keys().next_back()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return NormalizedSeries::default(),
    };

    let observations = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| by_date.get(&day).copied().unwrap_or_else(|| SalesObservation::zero(day)))
        .collect();

    NormalizedSeries { observations }
}

impl NormalizedSeries {
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn observations(&self) -> &[SalesObservation] {
        &self.observations
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    /// Daily values of one metric
    pub fn values(&self, metric: Metric) -> Vec<f64> {
        self.observations.iter().map(|o| o.value(metric)).collect()
    }

    /// Values of one metric in the requested display mode
    pub fn display_values(&self, metric: Metric, mode: DisplayMode) -> Vec<f64> {
        let daily = self.values(metric);
        match mode {
            DisplayMode::Daily => daily,
            DisplayMode::Cumulative => running_sum(&daily),
        }
    }

    pub fn cumulative(&self) -> CumulativeSeries {
        CumulativeSeries {
            bread_units: running_sum(&self.values(Metric::Bread)),
            revenue: running_sum(&self.values(Metric::Revenue)),
        }
    }

    pub fn stats(&self) -> SalesStats {
        SalesStats::from_series(self)
    }
}

/// Totals shown above the chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStats {
    pub total_bread: u64,
    pub total_revenue: f64,
    /// Bread axis ceiling: the busiest day rounded up to a multiple of ten
    pub bread_axis_max: u64,
}

impl SalesStats {
    pub fn from_series(series: &NormalizedSeries) -> Self {
        let total_bread = series.observations.iter().map(|o| o.bread_units as u64).sum();
        let total_revenue = series.observations.iter().map(|o| o.revenue).sum();
        let busiest = series.observations.iter().map(|o| o.bread_units as u64).max().unwrap_or(0).max(1);

        Self {
            total_bread,
            total_revenue,
            bread_axis_max: busiest.div_ceil(10) * 10,
        }
    }
}

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(InsightsError::Configuration(format!(
                "date range starts after it ends: {} > {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Rolling window presets offered by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum TimeRange {
    #[default]
    Last30Days,
    Last60Days,
    Custom { start: NaiveDate, end: NaiveDate },
}

impl TimeRange {
    /// Resolve the preset against `today`
    pub fn resolve(&self, today: NaiveDate) -> Result<DateRange> {
        match *self {
            TimeRange::Last30Days => DateRange::new(today - Duration::days(30), today),
            TimeRange::Last60Days => DateRange::new(today - Duration::days(60), today),
            TimeRange::Custom { start, end } => DateRange::new(start, end),
        }
    }
}

/// A calendar month, e.g. the month picker on the sales page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthSelector {
    pub year: i32,
    pub month: u32,
}

impl MonthSelector {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// First through last day of the month
    pub fn range(&self) -> Result<DateRange> {
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            InsightsError::Configuration(format!("invalid month {}-{:02}", self.year, self.month))
        })?;
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .ok_or_else(|| {
                InsightsError::Configuration(format!("invalid month {}-{:02}", self.year, self.month))
            })?;
        DateRange::new(start, end)
    }
}
