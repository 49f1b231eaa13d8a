//! Parquet storage for price series

use super::PricePoint;
use arrow::array::{Array, ArrayRef, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Price series schema
pub fn price_series_schema() -> Schema {
    Schema::new(vec![
        Field::new(
            "timestamp",
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
        Field::new("symbol", DataType::Utf8, false),
        Field::new("price", DataType::Utf8, false), // Decimal as text, no float rounding
    ])
}

/// Writes price series to Parquet files
pub struct ParquetWriter {
    output_dir: PathBuf,
}

impl ParquetWriter {
    /// Writer rooted at `output_dir`
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    /// Create the output directory if missing
    pub fn ensure_dir(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    /// File path for a symbol's series starting at `start`
    pub fn file_path(&self, symbol: &str, start: DateTime<Utc>) -> PathBuf {
        let filename = format!("{}_{}.parquet", symbol, start.format("%Y%m%d_%H%M%S"));
        self.output_dir.join(filename)
    }

    /// Write a price series to `path`. An empty series writes nothing.
    pub fn write_price_series(
        &self,
        path: &Path,
        symbol: &str,
        series: &[PricePoint],
    ) -> anyhow::Result<()> {
        if series.is_empty() {
            return Ok(());
        }

        self.ensure_dir()?;

        let schema = Arc::new(price_series_schema());
        let file = File::create(path)?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        let timestamps: Vec<i64> = series
            .iter()
            .map(|p| p.timestamp.timestamp_micros())
            .collect();
        let symbols: Vec<&str> = vec![symbol; series.len()];
        let prices: Vec<String> = series.iter().map(|p| p.price.to_string()).collect();

        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC"))
                    as ArrayRef,
                Arc::new(StringArray::from(symbols)) as ArrayRef,
                Arc::new(StringArray::from(
                    prices.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                )) as ArrayRef,
            ],
        )?;

        writer.write(&batch)?;
        writer.close()?;

        tracing::debug!(path = ?path, symbol, count = series.len(), "Wrote price series to Parquet");

        Ok(())
    }
}

/// Reader for Parquet price series
pub struct ParquetReader {
    path: PathBuf,
}

impl ParquetReader {
    /// Reader over one price series file
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the series, sorted by timestamp
    pub fn read_price_series(&self) -> anyhow::Result<Vec<PricePoint>> {
        let file = File::open(&self.path)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let reader = builder.build()?;

        let mut series = Vec::new();

        for batch_result in reader {
            let batch = batch_result?;

            let timestamps = batch
                .column_by_name("timestamp")
                .and_then(|c| c.as_any().downcast_ref::<TimestampMicrosecondArray>())
                .ok_or_else(|| anyhow::anyhow!("Invalid timestamp column"))?;

            let prices = batch
                .column_by_name("price")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Invalid price column"))?;

            for i in 0..batch.num_rows() {
                if prices.is_null(i) {
                    continue;
                }
                let timestamp = DateTime::from_timestamp_micros(timestamps.value(i))
                    .ok_or_else(|| anyhow::anyhow!("Invalid timestamp"))?;

                series.push(PricePoint {
                    timestamp,
                    price: Decimal::from_str(prices.value(i))?,
                });
            }
        }

        series.sort_by_key(|p| p.timestamp);
        Ok(series)
    }

    /// Path being read
    pub fn path(&self) -> &Path {
        &self.path
    }
}
