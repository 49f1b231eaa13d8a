//! Backtest analytics and reporting

use super::trade::Trade;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// A position event recorded in a day's stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TradeEvent {
    /// Position opened; snapshot taken right after the open
    Open { trade: Trade, cash: Decimal },
    /// Position closed; snapshot includes the realized PnL
    Close { trade: Trade, cash: Decimal },
}

impl TradeEvent {
    /// Trade snapshot carried by the event
    pub fn trade(&self) -> &Trade {
        match self {
            TradeEvent::Open { trade, .. } | TradeEvent::Close { trade, .. } => trade,
        }
    }

    /// Whether the event closed a position
    pub fn is_close(&self) -> bool {
        matches!(self, TradeEvent::Close { .. })
    }
}

/// Events and realized PnL accumulated for one calendar date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    /// Open and close events in the order they happened
    pub events: Vec<TradeEvent>,
    /// Sum of realized PnL of the day's closes
    pub pnl: Decimal,
}

impl DailyStats {
    /// Append an event, accumulating PnL for closes
    pub fn record(&mut self, event: TradeEvent) {
        if event.is_close() {
            self.pnl += event.trade().pnl();
        }
        self.events.push(event);
    }
}

/// End-of-day summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    /// Number of positions closed on this date
    pub closed_trades: usize,
    /// Realized PnL of those closes
    pub pnl: Decimal,
    /// The closed trades, in close order
    pub trades: Vec<Trade>,
}

impl DaySummary {
    /// Summarize the stats recorded for `date`
    pub fn from_stats(date: NaiveDate, stats: &DailyStats) -> Self {
        let trades: Vec<Trade> = stats
            .events
            .iter()
            .filter(|e| e.is_close())
            .map(|e| e.trade().clone())
            .collect();

        Self {
            date,
            closed_trades: trades.len(),
            pnl: stats.pnl,
            trades,
        }
    }

    /// Format as text block for CLI output
    pub fn format_table(&self) -> String {
        let mut out = format!(
            "=== End of day {} Summary ===\nTrades closed this day: {}\nDaily PnL: {:.2}\nDetails:\n",
            self.date, self.closed_trades, self.pnl
        );
        for trade in &self.trades {
            let _ = writeln!(out, " - {}", describe_closed(trade));
        }
        out
    }
}

/// One-line description of a closed trade
pub fn describe_closed(trade: &Trade) -> String {
    let close_time = trade
        .close_time
        .map(|t| t.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} from {} at {:.2}, closed {} at {:.2}, PnL: {:.2}",
        trade.direction,
        trade.open_time,
        trade.open_price,
        close_time,
        trade.close_price.unwrap_or_default(),
        trade.pnl(),
    )
}

/// Realized performance over all completed trades
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    /// Number of completed trades
    pub trades: usize,
    /// Trades with PnL > 0
    pub winners: usize,
    /// Trades with PnL < 0
    pub losers: usize,
    /// Arithmetic mean PnL per trade
    pub average_pnl: Decimal,
    /// Geometric mean per-trade return on initial capital
    pub geometric_mean_return: f64,
    /// Mean per-trade return over its sample standard deviation
    pub sharpe_ratio: f64,
    /// Cash plus unrealized PnL at the last observed index price
    pub final_equity: Decimal,
    /// Whether a position was still open when the stream ended
    pub open_position: bool,
}

impl PerformanceReport {
    /// Compute the report from completed trades.
    ///
    /// Per-trade returns are `pnl / initial_capital`. The geometric mean is 0
    /// without trades; the Sharpe ratio is 0 with fewer than two trades or a
    /// zero standard deviation. Return statistics stay 0 for a zero capital.
    pub fn compute(
        trades: &[Trade],
        initial_capital: Decimal,
        final_equity: Decimal,
        open_position: bool,
    ) -> Self {
        let pnls: Vec<Decimal> = trades.iter().filter_map(|t| t.realized_pnl).collect();
        let n = pnls.len();

        let mut report = Self {
            trades: n,
            winners: pnls.iter().filter(|p| **p > Decimal::ZERO).count(),
            losers: pnls.iter().filter(|p| **p < Decimal::ZERO).count(),
            final_equity,
            open_position,
            ..Self::default()
        };

        if n == 0 {
            return report;
        }

        let mean_pnl = decimal_mean(&pnls);
        report.average_pnl = mean_pnl.unwrap_or_default();

        if initial_capital.is_zero() {
            return report;
        }

        let capital = to_f64(initial_capital);
        let returns: Vec<f64> = pnls
            .iter()
            .map(|p| {
                p.checked_div(initial_capital)
                    .map(to_f64)
                    .unwrap_or_else(|| to_f64(*p) / capital)
            })
            .collect();

        report.geometric_mean_return = geometric_mean(&returns);

        if n > 1 {
            // Exact in Decimal when it fits, so offsetting PnLs give a zero mean
            let mean = mean_pnl
                .and_then(|m| m.checked_div(initial_capital))
                .map(to_f64)
                .unwrap_or_else(|| returns.iter().sum::<f64>() / n as f64);
            let sum_sq: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum();
            let std_dev = (sum_sq / (n - 1) as f64).sqrt();
            if std_dev > 0.0 {
                report.sharpe_ratio = mean / std_dev;
            }
        }

        report
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        if self.trades == 0 {
            return format!(
                "No trades executed.\nFinal Portfolio Value: {:.2}\n",
                self.final_equity
            );
        }

        format!(
            r#"
══════════════════════════════════════════════════════
               PERFORMANCE SUMMARY
══════════════════════════════════════════════════════
Number of Trades:             {}
Winners:                      {}
Losers:                       {}
Average PnL:                  {:.2}
Geometric Mean PnL per Trade: {:.2e}
Sharpe Ratio:                 {:.4}
Final Portfolio Value:        {:.2}{}
══════════════════════════════════════════════════════
"#,
            self.trades,
            self.winners,
            self.losers,
            self.average_pnl,
            self.geometric_mean_return,
            self.sharpe_ratio,
            self.final_equity,
            if self.open_position {
                " (position still open)"
            } else {
                ""
            },
        )
    }
}

/// Nth root of the compounded growth factor, minus one.
///
/// Taken as the mean of `ln(1 + r)` so long trade lists cannot overflow. A
/// growth factor at or below zero means capital was wiped out; reported as -1.
fn geometric_mean(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    if returns.iter().any(|r| 1.0 + r <= 0.0) {
        return -1.0;
    }
    let mean_log = returns.iter().map(|r| r.ln_1p()).sum::<f64>() / returns.len() as f64;
    mean_log.exp_m1()
}

/// Arithmetic mean, `None` if the sum overflows
fn decimal_mean(values: &[Decimal]) -> Option<Decimal> {
    let sum = values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))?;
    sum.checked_div(Decimal::from(values.len() as u64))
}

fn to_f64(value: Decimal) -> f64 {
    f64::try_from(value).unwrap_or(0.0)
}
