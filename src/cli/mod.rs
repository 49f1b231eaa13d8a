//! CLI interface for intraday-backtest
//!
//! Provides subcommands for:
//! - `backtest`: Replay index and future series through the strategy
//! - `convert`: Convert a CSV price series to Parquet
//! - `config`: Show the effective configuration

mod backtest;
mod convert;

pub use backtest::{BacktestArgs, OutputFormat};
pub use convert::ConvertArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "intraday-backtest")]
#[command(about = "Minute-bar momentum backtester for index and future series")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a backtest over the configured series
    Backtest(BacktestArgs),
    /// Convert a CSV price series to Parquet
    Convert(ConvertArgs),
    /// Show configuration
    Config,
}
