//! intraday-backtest: event-driven minute-bar backtester
//!
//! This library provides:
//! - Trade and portfolio bookkeeping with commissions and short margin
//! - A momentum strategy over a rolling price window
//! - A backtester that replays aligned index and future series, with
//!   forced expiry and per-day summaries
//! - Performance reporting (win/loss counts, geometric mean, Sharpe)
//! - CSV and Parquet price series loading
//! - Structured logging

pub mod backtest;
pub mod cli;
pub mod config;
pub mod data;
pub mod strategy;
pub mod telemetry;
