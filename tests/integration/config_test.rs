//! Configuration integration tests

use intraday_backtest::backtest::BacktestConfig;
use intraday_backtest::config::{Config, LogFormat};
use rust_decimal_macros::dec;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_config_example_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example");
    let config = Config::load(path).unwrap();

    assert_eq!(config.to_backtest_config().unwrap(), BacktestConfig::default());
    assert_eq!(config.strategy.threshold, dec!(0.0005));
    assert_eq!(config.data.price_column, "Close");
    assert_eq!(config.telemetry.log_format, LogFormat::Pretty);
}

#[test]
fn test_config_from_file_overrides_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
        [backtest]
        initial_cash = 25000
        holding_period_minutes = 30

        [telemetry]
        log_format = "json"
        "#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    let engine = config.to_backtest_config().unwrap();

    assert_eq!(engine.initial_cash, dec!(25000));
    assert_eq!(engine.commission, dec!(2));
    assert_eq!(engine.holding_period, chrono::Duration::minutes(30));
    assert_eq!(config.telemetry.log_format, LogFormat::Json);
}

#[test]
fn test_malformed_config_is_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[backtest\ninitial_cash = ").unwrap();

    assert!(Config::load(&path).is_err());
}
