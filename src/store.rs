//! Sales stores feeding the normalizer
//!
//! A store hands back raw daily rows, optionally limited to a date range.
//! Rows may be sparse and unordered; `series::normalize` takes care of that.

use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{InsightsError, Result};
use crate::series::{check_revenue, DateRange, SalesObservation};

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Source of persisted daily sales
pub trait SalesStore: Send + Sync {
    /// Rows inside `range` (all rows when `None`), in no particular order
    fn list_observations(&self, range: Option<DateRange>) -> Result<Vec<SalesObservation>>;
}

fn in_range(range: Option<DateRange>, date: NaiveDate) -> bool {
    range.map_or(true, |r| r.contains(date))
}

/// In-memory store, used by tests and the CLI
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Vec<SalesObservation>,
}

impl MemoryStore {
    pub fn new(rows: Vec<SalesObservation>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: SalesObservation) {
        self.rows.push(row);
    }
}

impl SalesStore for MemoryStore {
    fn list_observations(&self, range: Option<DateRange>) -> Result<Vec<SalesObservation>> {
        Ok(self
            .rows
            .iter()
            .filter(|row| in_range(range, row.date))
            .copied()
            .collect())
    }
}

/// Parquet file with `date`, `total_bread` and `total_sales` columns
///
/// `date` may be Utf8 (`YYYY-MM-DD`) or Date32. `total_bread` may be Int64 or
/// Int32, `total_sales` Float64 or Int64. Every row is moved by `day_offset`
/// days as it is read, before range filtering.
#[derive(Debug, Clone)]
pub struct ParquetStore {
    path: PathBuf,
    day_offset: i64,
}

impl ParquetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), day_offset: 0 }
    }

    pub fn with_day_offset(mut self, days: i64) -> Self {
        self.day_offset = days;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<SalesObservation>> {
        let file = File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file).map_err(store_err)?;
        let reader = builder.build().map_err(store_err)?;

        let mut rows = Vec::new();
        for batch_result in reader {
            let batch = batch_result.map_err(store_err)?;
            read_batch(&batch, &mut rows)?;
        }
        Ok(rows)
    }
}

impl SalesStore for ParquetStore {
    fn list_observations(&self, range: Option<DateRange>) -> Result<Vec<SalesObservation>> {
        let raw = self.read_rows()?;
        let total = raw.len();

        let mut rows = Vec::with_capacity(total);
        for row in raw {
            let shifted = row.shifted(self.day_offset).ok_or_else(|| {
                InsightsError::Store(format!("date {} out of range after offset", row.date))
            })?;
            if in_range(range, shifted.date) {
                rows.push(shifted);
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            total,
            kept = rows.len(),
            day_offset = self.day_offset,
            "loaded sales rows"
        );
        Ok(rows)
    }
}

fn store_err(err: impl std::fmt::Display) -> InsightsError {
    InsightsError::Store(err.to_string())
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| InsightsError::Store(format!("missing column `{}`", name)))
}

fn read_batch(batch: &RecordBatch, rows: &mut Vec<SalesObservation>) -> Result<()> {
    let dates = column(batch, "date")?;
    let bread = column(batch, "total_bread")?;
    let sales = column(batch, "total_sales")?;

    for i in 0..batch.num_rows() {
        let Some(date) = date_at(dates, i)? else {
            tracing::warn!(row = i, "skipping sales row without a date");
            continue;
        };
        rows.push(SalesObservation::new(date, bread_at(bread, i)?, sales_at(sales, i)?));
    }
    Ok(())
}

fn date_at(col: &ArrayRef, i: usize) -> Result<Option<NaiveDate>> {
    if col.is_null(i) {
        return Ok(None);
    }
    if let Some(strings) = col.as_any().downcast_ref::<StringArray>() {
        let raw = strings.value(i);
        let date = NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d")
            .map_err(|e| InsightsError::Store(format!("bad date `{}`: {}", raw, e)))?;
        return Ok(Some(date));
    }
    if let Some(days) = col.as_any().downcast_ref::<Date32Array>() {
        let value = days.value(i);
        let date = NaiveDate::from_num_days_from_ce_opt(value + UNIX_EPOCH_DAYS_FROM_CE)
            .ok_or_else(|| InsightsError::Store(format!("date32 value {} out of range", value)))?;
        return Ok(Some(date));
    }
    Err(InsightsError::Store(format!(
        "unsupported type for `date`: {}",
        col.data_type()
    )))
}

fn bread_at(col: &ArrayRef, i: usize) -> Result<u32> {
    if col.is_null(i) {
        return Ok(0);
    }
    let value = if let Some(ints) = col.as_any().downcast_ref::<Int64Array>() {
        ints.value(i)
    } else if let Some(ints) = col.as_any().downcast_ref::<Int32Array>() {
        ints.value(i) as i64
    } else {
        return Err(InsightsError::Store(format!(
            "unsupported type for `total_bread`: {}",
            col.data_type()
        )));
    };
    u32::try_from(value).map_err(|_| InsightsError::Store(format!("invalid bread count {}", value)))
}

fn sales_at(col: &ArrayRef, i: usize) -> Result<f64> {
    if col.is_null(i) {
        return Ok(0.0);
    }
    let value = if let Some(floats) = col.as_any().downcast_ref::<Float64Array>() {
        floats.value(i)
    } else if let Some(ints) = col.as_any().downcast_ref::<Int64Array>() {
        ints.value(i) as f64
    } else {
        return Err(InsightsError::Store(format!(
            "unsupported type for `total_sales`: {}",
            col.data_type()
        )));
    };
    check_revenue(value).map_err(|_| InsightsError::Store(format!("invalid sales amount {}", value)))
}
