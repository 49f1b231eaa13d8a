//! Backtest command implementation

use crate::backtest::{BacktestResult, Backtester};
use crate::config::Config;
use crate::data;
use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

/// How the run is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Day summaries and the performance table
    Table,
    /// The whole result as JSON
    Json,
}

#[derive(Args, Debug)]
pub struct BacktestArgs {
    /// Index series (CSV or Parquet); overrides `data.index_path`
    #[arg(long)]
    pub index: Option<PathBuf>,

    /// Future series (CSV or Parquet); overrides `data.future_path`
    #[arg(long)]
    pub future: Option<PathBuf>,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Commission per open and per close
    #[arg(long)]
    pub commission: Option<Decimal>,

    /// Momentum threshold
    #[arg(long)]
    pub threshold: Option<Decimal>,

    /// Minutes before a position is force-closed
    #[arg(long)]
    pub holding_minutes: Option<i64>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl BacktestArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &Config) -> anyhow::Result<Config> {
        let mut config = config.clone();
        if let Some(path) = &self.index {
            config.data.index_path = path.clone();
        }
        if let Some(path) = &self.future {
            config.data.future_path = path.clone();
        }
        if let Some(capital) = self.capital {
            config.backtest.initial_cash = capital;
        }
        if let Some(commission) = self.commission {
            config.backtest.commission = commission;
        }
        if let Some(threshold) = self.threshold {
            config.strategy.threshold = threshold;
        }
        if let Some(minutes) = self.holding_minutes {
            config.backtest.holding_period_minutes = minutes;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let config = self.apply(config)?;
        let result = run(&config)?;

        match self.format {
            OutputFormat::Table => {
                for day in &result.days {
                    println!("{}", day.format_table());
                }
                println!("{}", result.report.format_table());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Ok(())
    }
}

/// Load both series and run the configured strategy over them
pub fn run(config: &Config) -> anyhow::Result<BacktestResult> {
    let columns = config.data.columns();
    let index = data::load_price_series(&config.data.index_path, &columns)?;
    let future = data::load_price_series(&config.data.future_path, &columns)?;

    let strategy = config.strategy.build();
    tracing::info!(
        strategy = strategy.name(),
        threshold = %config.strategy.threshold,
        index = ?config.data.index_path,
        future = ?config.data.future_path,
        "Running backtest"
    );

    let mut backtester = Backtester::new(strategy, config.to_backtest_config()?);
    backtester.load_data(&index, &future);
    Ok(backtester.run())
}
