//! Historical price data
//!
//! Loads minute-bar price series from CSV or Parquet and aligns the index
//! and future series onto a common timeline for the backtester.

mod csv;
mod parquet;

pub use self::csv::read_price_series as read_csv_series;
pub use self::parquet::{price_series_schema, ParquetReader, ParquetWriter};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One observed closing price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    /// Bar timestamp
    pub timestamp: DateTime<Utc>,
    /// Closing price
    pub price: Decimal,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// Index and future prices observed at the same timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedBar {
    pub timestamp: DateTime<Utc>,
    pub index_price: Decimal,
    pub future_price: Decimal,
}

/// Column names used when reading CSV series
#[derive(Debug, Clone)]
pub struct CsvColumns {
    pub timestamp: String,
    pub price: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            timestamp: "Datetime".to_string(),
            price: "Close".to_string(),
        }
    }
}

/// Load a price series, picking the reader from the file extension
pub fn load_price_series(path: &Path, columns: &CsvColumns) -> anyhow::Result<Vec<PricePoint>> {
    let is_parquet = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("parquet"));

    let series = if is_parquet {
        ParquetReader::new(path.to_path_buf()).read_price_series()?
    } else {
        read_csv_series(path, &columns.timestamp, &columns.price)?
    };

    tracing::debug!(path = ?path, rows = series.len(), "Loaded price series");
    Ok(series)
}

/// Keep only the timestamps present in both series, in ascending order.
///
/// Duplicate timestamps within one series keep the last observation.
pub fn align(index: &[PricePoint], future: &[PricePoint]) -> Vec<AlignedBar> {
    let index: BTreeMap<DateTime<Utc>, Decimal> =
        index.iter().map(|p| (p.timestamp, p.price)).collect();
    let future: BTreeMap<DateTime<Utc>, Decimal> =
        future.iter().map(|p| (p.timestamp, p.price)).collect();

    index
        .iter()
        .filter_map(|(timestamp, index_price)| {
            future.get(timestamp).map(|future_price| AlignedBar {
                timestamp: *timestamp,
                index_price: *index_price,
                future_price: *future_price,
            })
        })
        .collect()
}
