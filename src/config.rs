//! Configuration types for intraday-backtest

use crate::backtest::BacktestConfig;
use crate::data::CsvColumns;
use crate::strategy::{MomentumStrategy, Strategy, DEFAULT_THRESHOLD};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backtest: BacktestSection,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Account and position rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestSection {
    /// Starting cash
    #[serde(default = "default_initial_cash")]
    pub initial_cash: Decimal,

    /// Charged on every open and every close
    #[serde(default = "default_commission")]
    pub commission: Decimal,

    /// Share of notional reserved while short
    #[serde(default = "default_margin_fraction")]
    pub margin_fraction: Decimal,

    /// Minutes until an open position is force-closed
    #[serde(default = "default_holding_period_minutes")]
    pub holding_period_minutes: i64,

    /// Units per trade
    #[serde(default = "default_position_size")]
    pub position_size: Decimal,
}

fn default_initial_cash() -> Decimal {
    Decimal::new(100_000, 0)
}
fn default_commission() -> Decimal {
    Decimal::new(2, 0)
}
fn default_margin_fraction() -> Decimal {
    Decimal::new(5, 1) // 0.5
}
fn default_holding_period_minutes() -> i64 {
    10
}
fn default_position_size() -> Decimal {
    Decimal::ONE
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            initial_cash: default_initial_cash(),
            commission: default_commission(),
            margin_fraction: default_margin_fraction(),
            holding_period_minutes: default_holding_period_minutes(),
            position_size: default_position_size(),
        }
    }
}

/// Available strategies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    #[default]
    Momentum,
}

/// Strategy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub kind: StrategyKind,

    /// Momentum threshold, applied symmetrically
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,
}

fn default_threshold() -> Decimal {
    DEFAULT_THRESHOLD
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::Momentum,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl StrategyConfig {
    /// Instantiate the configured strategy
    pub fn build(&self) -> Box<dyn Strategy> {
        match self.kind {
            StrategyKind::Momentum => Box::new(MomentumStrategy::new(self.threshold)),
        }
    }
}

/// Input series locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Index series; trades fill at these prices
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Future series; feeds the strategy
    #[serde(default = "default_future_path")]
    pub future_path: PathBuf,

    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,

    #[serde(default = "default_price_column")]
    pub price_column: String,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("data/spx_index.csv")
}
fn default_future_path() -> PathBuf {
    PathBuf::from("data/spx_future.csv")
}
fn default_timestamp_column() -> String {
    "Datetime".to_string()
}
fn default_price_column() -> String {
    "Close".to_string()
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            future_path: default_future_path(),
            timestamp_column: default_timestamp_column(),
            price_column: default_price_column(),
        }
    }
}

impl DataConfig {
    /// CSV column names to read
    pub fn columns(&self) -> CsvColumns {
        CsvColumns {
            timestamp: self.timestamp_column.clone(),
            price: self.price_column.clone(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

/// Telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot honor
    pub fn validate(&self) -> anyhow::Result<()> {
        self.to_backtest_config().map(|_| ())
    }

    /// Engine settings from the `[backtest]` section
    pub fn to_backtest_config(&self) -> anyhow::Result<BacktestConfig> {
        let section = &self.backtest;
        let minutes = section.holding_period_minutes;
        if minutes < 1 {
            anyhow::bail!("holding_period_minutes must be at least 1, got {}", minutes);
        }
        let holding_period = chrono::Duration::try_minutes(minutes)
            .ok_or_else(|| anyhow::anyhow!("holding_period_minutes out of range: {}", minutes))?;

        Ok(BacktestConfig {
            initial_cash: section.initial_cash,
            commission: section.commission,
            margin_fraction: section.margin_fraction,
            holding_period,
            position_size: section.position_size,
        })
    }
}
