//! Minute-bar CSV reader

use super::PricePoint;
use anyhow::Context;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

/// Naive layouts accepted for the timestamp column, interpreted as UTC
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Read a `(timestamp, price)` series from a CSV file with a header row.
///
/// Rows are returned in ascending timestamp order. Rows with an empty price
/// cell are skipped; any other malformed row is an error.
pub fn read_price_series(
    path: &Path,
    timestamp_column: &str,
    price_column: &str,
) -> anyhow::Result<Vec<PricePoint>> {
    let mut reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let ts_idx = column_index(&headers, timestamp_column)?;
    let price_idx = column_index(&headers, price_column)?;

    let mut series = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV row {}", row + 1))?;

        let raw_price = record.get(price_idx).unwrap_or_default();
        if raw_price.is_empty() {
            continue;
        }

        let raw_ts = record.get(ts_idx).unwrap_or_default();
        let timestamp = parse_timestamp(raw_ts)
            .with_context(|| format!("Bad timestamp {:?} in row {}", raw_ts, row + 1))?;
        let price = parse_price(raw_price)
            .with_context(|| format!("Bad price {:?} in row {}", raw_price, row + 1))?;

        series.push(PricePoint { timestamp, price });
    }

    series.sort_by_key(|p| p.timestamp);
    Ok(series)
}

fn column_index(headers: &::csv::StringRecord, name: &str) -> anyhow::Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| anyhow::anyhow!("Missing column {:?}", name))
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS±HH:MM`, or a naive UTC timestamp
pub(crate) fn parse_timestamp(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts.and_utc());
        }
    }
    anyhow::bail!("Unrecognized timestamp format")
}

/// Parse a price, accepting scientific notation
fn parse_price(raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|e| anyhow::anyhow!(e))
}
