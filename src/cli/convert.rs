//! Convert command implementation

use crate::config::Config;
use crate::data::{self, ParquetWriter};
use anyhow::Context;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// CSV price series to convert
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output Parquet file; defaults to `<output-dir>/<symbol>_<start>.parquet`
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output directory used when `--output` is not given
    #[arg(long, default_value = "./data")]
    pub output_dir: PathBuf,

    /// Symbol stored with each row; defaults to the input file stem
    #[arg(short, long)]
    pub symbol: Option<String>,
}

impl ConvertArgs {
    /// Convert and return the written path, or `None` for an empty series
    pub fn execute(&self, config: &Config) -> anyhow::Result<Option<PathBuf>> {
        let series = data::read_csv_series(
            &self.input,
            &config.data.timestamp_column,
            &config.data.price_column,
        )?;

        let Some(first) = series.first() else {
            tracing::warn!(input = ?self.input, "No rows to convert");
            return Ok(None);
        };

        let symbol = self.symbol.clone().unwrap_or_else(|| stem(&self.input));
        let (writer, path) = match &self.output {
            Some(path) => {
                let dir = path.parent().unwrap_or_else(|| Path::new("."));
                (ParquetWriter::new(dir.to_path_buf()), path.clone())
            }
            None => {
                let writer = ParquetWriter::new(self.output_dir.clone());
                let path = writer.file_path(&symbol, first.timestamp);
                (writer, path)
            }
        };

        writer
            .write_price_series(&path, &symbol, &series)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        tracing::info!(input = ?self.input, output = ?path, rows = series.len(), %symbol, "Converted");
        Ok(Some(path))
    }
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "series".to_string())
}
