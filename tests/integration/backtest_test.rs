//! End-to-end backtest runs over files on disk

use chrono::{DateTime, Duration, TimeZone, Utc};
use intraday_backtest::backtest::{BacktestConfig, BacktestState, Backtester, Direction};
use intraday_backtest::data::{self, CsvColumns, ParquetWriter, PricePoint};
use intraday_backtest::strategy::MomentumStrategy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Ten future prices whose window signals BUY on the last one
fn rising() -> Vec<Decimal> {
    vec![
        dec!(100.0),
        dec!(100.1),
        dec!(100.2),
        dec!(100.3),
        dec!(100.4),
        dec!(100.6),
        dec!(100.7),
        dec!(100.8),
        dec!(100.9),
        dec!(101.0),
    ]
}

/// Ten future prices whose window signals SELL on the last one
fn falling() -> Vec<Decimal> {
    vec![
        dec!(100.4),
        dec!(100.3),
        dec!(100.2),
        dec!(100.1),
        dec!(100.0),
        dec!(99.8),
        dec!(99.7),
        dec!(99.6),
        dec!(99.5),
        dec!(99.4),
    ]
}

fn session_open() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 12, 3, 14, 30, 0).unwrap()
}

fn write_csv(dir: &Path, name: &str, series: &[PricePoint]) -> PathBuf {
    let mut content = String::from("Datetime,Open,High,Low,Close,Volume\n");
    for point in series {
        let _ = writeln!(
            content,
            "{},0,0,0,{},0",
            point.timestamp.format("%Y-%m-%d %H:%M:%S"),
            point.price
        );
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Future series: `head`, then flat at its last value for `total` minutes
fn future_series(start: DateTime<Utc>, head: &[Decimal], total: i64) -> Vec<PricePoint> {
    let last = *head.last().unwrap();
    (0..total)
        .map(|i| {
            let price = head.get(i as usize).copied().unwrap_or(last);
            PricePoint::new(start + Duration::minutes(i), price)
        })
        .collect()
}

fn backtester() -> Backtester {
    Backtester::new(
        Box::new(MomentumStrategy::with_defaults()),
        BacktestConfig::default(),
    )
}

#[test]
fn test_long_round_trip_from_csv() {
    let dir = TempDir::new().unwrap();
    let start = session_open();

    let index: Vec<PricePoint> = (0..31)
        .map(|i| PricePoint::new(start + Duration::minutes(i), dec!(6000) + Decimal::from(i)))
        .collect();
    let future = future_series(start, &rising(), 30);

    let columns = CsvColumns::default();
    let index_path = write_csv(dir.path(), "spx_index.csv", &index);
    let future_path = write_csv(dir.path(), "spx_future.csv", &future);
    let index = data::load_price_series(&index_path, &columns).unwrap();
    let future = data::load_price_series(&future_path, &columns).unwrap();

    let mut bt = backtester();
    // Index has one extra trailing minute the future lacks
    assert_eq!(bt.load_data(&index, &future), 30);

    let result = bt.run();
    assert_eq!(bt.state(), BacktestState::Finished);

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.direction, Direction::Long);
    assert_eq!(trade.open_time, start + Duration::minutes(9));
    assert_eq!(trade.open_price, dec!(6009));
    assert_eq!(trade.close_time, Some(start + Duration::minutes(19)));
    assert_eq!(trade.close_price, Some(dec!(6019)));
    assert_eq!(trade.realized_pnl, Some(dec!(10)));

    assert_eq!(bt.portfolio().cash(), dec!(100006));
    assert_eq!(result.report.trades, 1);
    assert_eq!(result.report.winners, 1);
    assert_eq!(result.report.losers, 0);
    assert_eq!(result.report.average_pnl, dec!(10));
    assert_eq!(result.report.final_equity, dec!(100006));
    assert!(!result.report.open_position);
    assert!(result.open_trade.is_none());

    assert_eq!(result.days.len(), 1);
    assert_eq!(result.days[0].closed_trades, 1);
    assert_eq!(result.days[0].pnl, dec!(10));
}

#[test]
fn test_short_round_trip_returns_margin() {
    let dir = TempDir::new().unwrap();
    let start = session_open();

    let index: Vec<PricePoint> = (0..25)
        .map(|i| {
            let price = if i >= 19 { dec!(4900) } else { dec!(5000) };
            PricePoint::new(start + Duration::minutes(i), price)
        })
        .collect();
    let future = future_series(start, &falling(), 25);

    let writer = ParquetWriter::new(dir.path().to_path_buf());
    let index_path = writer.file_path("^GSPC", start);
    writer.write_price_series(&index_path, "^GSPC", &index).unwrap();
    let future_path = write_csv(dir.path(), "es.csv", &future);

    let columns = CsvColumns::default();
    let index = data::load_price_series(&index_path, &columns).unwrap();
    let future = data::load_price_series(&future_path, &columns).unwrap();

    let mut bt = backtester();
    bt.load_data(&index, &future);
    let result = bt.run();

    assert_eq!(result.trades.len(), 1);
    let trade = &result.trades[0];
    assert_eq!(trade.direction, Direction::Short);
    assert_eq!(trade.open_price, dec!(5000));
    assert_eq!(trade.close_price, Some(dec!(4900)));
    assert_eq!(trade.realized_pnl, Some(dec!(100)));
    assert_eq!(trade.commissions, dec!(4));

    // 100000 - 2 - 2 - 2500 + 2500 + 100
    assert_eq!(bt.portfolio().cash(), dec!(100096));
    assert_eq!(result.report.final_equity, dec!(100096));
}

#[test]
fn test_expiry_on_first_bar_of_next_day() {
    let day_one = Utc.with_ymd_and_hms(2024, 12, 3, 23, 46, 0).unwrap();
    let day_two = Utc.with_ymd_and_hms(2024, 12, 4, 0, 5, 0).unwrap();

    let mut future = future_series(day_one, &rising(), 14);
    future.extend((0..5).map(|i| PricePoint::new(day_two + Duration::minutes(i), dec!(101.0))));

    let mut index: Vec<PricePoint> = (0..14)
        .map(|i| PricePoint::new(day_one + Duration::minutes(i), dec!(6000)))
        .collect();
    index.extend((0..5).map(|i| PricePoint::new(day_two + Duration::minutes(i), dec!(6020))));

    let mut bt = backtester();
    bt.load_data(&index, &future);
    let result = bt.run();

    // Opened 23:55, force-closed on the first bar of the next day
    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.trades[0].open_time, day_one + Duration::minutes(9));
    assert_eq!(result.trades[0].close_time, Some(day_two));
    assert_eq!(result.trades[0].realized_pnl, Some(dec!(20)));

    assert_eq!(result.days.len(), 2);
    assert_eq!(result.days[0].date, day_one.date_naive());
    assert_eq!(result.days[0].closed_trades, 1);
    assert_eq!(result.days[0].pnl, dec!(20));
    assert_eq!(result.days[1].date, day_two.date_naive());
    assert_eq!(result.days[1].closed_trades, 0);

    // Momentum is still positive at 00:05, so a new long opens there and
    // its 00:15 expiry lies beyond the data
    let open = result.open_trade.as_ref().unwrap();
    assert_eq!(open.open_time, day_two);
    assert!(result.report.open_position);
    assert_eq!(result.report.final_equity, dec!(100014));

    let stats = bt.daily_stats(day_two.date_naive()).unwrap();
    assert_eq!(stats.events.len(), 1);
}

#[test]
fn test_disjoint_series_run_without_trades() {
    let start = session_open();
    let index: Vec<PricePoint> = (0..20)
        .map(|i| PricePoint::new(start + Duration::minutes(i), dec!(6000)))
        .collect();
    let future = future_series(start + Duration::hours(1), &rising(), 20);

    let mut bt = backtester();
    assert_eq!(bt.load_data(&index, &future), 0);

    let result = bt.run();
    assert_eq!(result.report.trades, 0);
    assert_eq!(result.report.final_equity, dec!(100000));
    assert!(result.days.is_empty());
    assert!(result.report.format_table().contains("No trades executed."));
}

#[test]
fn test_result_serializes_to_json() {
    let start = session_open();
    let index: Vec<PricePoint> = (0..25)
        .map(|i| PricePoint::new(start + Duration::minutes(i), dec!(6000)))
        .collect();
    let future = future_series(start, &rising(), 25);

    let mut bt = backtester();
    bt.load_data(&index, &future);
    let result = bt.run();

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["report"]["trades"], 1);
    assert_eq!(json["trades"][0]["direction"], "long");
    assert!(json["open_trade"].is_null());
}
