//! Backtesting module
//!
//! Replays aligned index/future minute bars through a strategy with
//! single-position accounting and a forced holding-period exit

mod analytics;
mod portfolio;
mod simulator;
mod trade;

pub use analytics::{describe_closed, DailyStats, DaySummary, PerformanceReport, TradeEvent};
pub use portfolio::Portfolio;
pub use simulator::{BacktestResult, BacktestState, Backtester};
pub use trade::{Direction, Trade, TradeError};

use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Backtest configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Starting cash balance, also the capital base for per-trade returns
    pub initial_cash: Decimal,
    /// Commission charged on each open and each close
    pub commission: Decimal,
    /// Fraction of notional reserved from cash while a short is open
    pub margin_fraction: Decimal,
    /// Time after which an open position is force-closed
    pub holding_period: Duration,
    /// Contracts per position
    pub position_size: Decimal,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_cash: dec!(100000),
            commission: dec!(2),
            margin_fraction: dec!(0.5),
            holding_period: Duration::minutes(10),
            position_size: dec!(1),
        }
    }
}
