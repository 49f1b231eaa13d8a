//! Backtest simulator engine

use super::analytics::{describe_closed, DailyStats, DaySummary, PerformanceReport, TradeEvent};
use super::portfolio::Portfolio;
use super::trade::{Direction, Trade};
use super::BacktestConfig;
use crate::data::{self, AlignedBar, PricePoint};
use crate::strategy::Strategy;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktestState {
    /// Data may be loaded; no step taken yet
    AwaitingFirstStep,
    /// At least one step taken and the timeline is not exhausted
    Streaming,
    /// Timeline exhausted; further steps are no-ops
    Finished,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct BacktestResult {
    /// Performance over completed trades
    pub report: PerformanceReport,
    /// Finalized day summaries in date order
    pub days: Vec<DaySummary>,
    /// Completed trades in close order
    pub trades: Vec<Trade>,
    /// Position still open when the timeline ended
    pub open_trade: Option<Trade>,
}

/// Runs backtest simulation.
///
/// Each step applies, in order: clock update, forced expiry, day boundary
/// detection, then strategy evaluation. Only one position is ever open, and
/// each open schedules exactly one forced close `holding_period` later.
pub struct Backtester {
    config: BacktestConfig,
    strategy: Box<dyn Strategy>,
    portfolio: Portfolio,
    timeline: Vec<AlignedBar>,
    cursor: Option<usize>,
    state: BacktestState,
    current: Option<AlignedBar>,
    /// Pending forced closes; an entry is consumed when it fires
    close_schedule: HashMap<DateTime<Utc>, bool>,
    current_day: Option<NaiveDate>,
    daily_stats: BTreeMap<NaiveDate, DailyStats>,
    day_summaries: Vec<DaySummary>,
}

impl Backtester {
    /// Create a new simulator
    pub fn new(strategy: Box<dyn Strategy>, config: BacktestConfig) -> Self {
        let portfolio = Portfolio::from_config(&config);
        Self {
            config,
            strategy,
            portfolio,
            timeline: vec![],
            cursor: None,
            state: BacktestState::AwaitingFirstStep,
            current: None,
            close_schedule: HashMap::new(),
            current_day: None,
            daily_stats: BTreeMap::new(),
            day_summaries: vec![],
        }
    }

    /// Align the two series on their common timestamps and use the result as
    /// the timeline. Returns the number of aligned steps.
    pub fn load_data(&mut self, index: &[PricePoint], future: &[PricePoint]) -> usize {
        let timeline = data::align(index, future);
        tracing::info!(
            index_rows = index.len(),
            future_rows = future.len(),
            common = timeline.len(),
            "Data aligned"
        );
        self.load_timeline(timeline)
    }

    /// Use an already aligned, ascending timeline.
    ///
    /// Starts a fresh run: the portfolio, strategy history, pending expiries
    /// and day records of any previous run are discarded.
    pub fn load_timeline(&mut self, timeline: Vec<AlignedBar>) -> usize {
        self.timeline = timeline;
        self.cursor = None;
        self.current = None;
        self.state = BacktestState::AwaitingFirstStep;
        self.portfolio = Portfolio::from_config(&self.config);
        self.strategy.reset();
        self.close_schedule.clear();
        self.current_day = None;
        self.daily_stats.clear();
        self.day_summaries.clear();
        self.timeline.len()
    }

    /// Run to the end of the timeline and report
    pub fn run(&mut self) -> BacktestResult {
        while self.advance() {
            self.evaluate_strategy();
        }

        let report = self.report_performance();
        if let Some(trade) = self.portfolio.open_trade() {
            tracing::warn!(
                trade_id = %trade.id,
                direction = %trade.direction,
                open_time = %trade.open_time,
                "Timeline ended before the scheduled expiry; position left open"
            );
        }

        BacktestResult {
            report,
            days: self.day_summaries.clone(),
            trades: self.portfolio.completed_trades().to_vec(),
            open_trade: self.portfolio.open_trade().cloned(),
        }
    }

    /// Step to the next aligned timestamp.
    ///
    /// Returns false once the timeline is exhausted; the last day is finalized
    /// on that transition only.
    pub fn advance(&mut self) -> bool {
        if self.state == BacktestState::Finished {
            return false;
        }

        let next = self.cursor.map_or(0, |c| c + 1);
        let Some(bar) = self.timeline.get(next).copied() else {
            if let Some(day) = self.current_day {
                self.finalize_day(day);
            }
            self.state = BacktestState::Finished;
            tracing::debug!(steps = self.timeline.len(), "Timeline exhausted");
            return false;
        };

        self.cursor = Some(next);
        self.current = Some(bar);
        self.state = BacktestState::Streaming;

        self.portfolio.set_current_time(bar.timestamp);
        self.expire_if_due();

        let date = bar.timestamp.date_naive();
        match self.current_day {
            Some(day) if day == date => {}
            Some(day) => {
                self.finalize_day(day);
                self.start_day(date);
            }
            None => self.start_day(date),
        }

        true
    }

    /// Force-close the open position if its expiry is due at the current step
    pub fn expire_if_due(&mut self) {
        let Some(bar) = self.current else {
            return;
        };

        if let Some(pending) = self.close_schedule.get_mut(&bar.timestamp) {
            if *pending {
                *pending = false;
                self.close_position(bar.index_price);
            }
        }
    }

    /// Feed the current future price to the strategy and act on its signal.
    ///
    /// Opens only when flat, at the current index price, and schedules the
    /// forced close.
    pub fn evaluate_strategy(&mut self) {
        if self.state != BacktestState::Streaming {
            return;
        }
        let Some(bar) = self.current else {
            return;
        };

        self.strategy.update_price(bar.future_price);
        let signal = self.strategy.generate_signal();

        let Some(direction) = signal.direction() else {
            return;
        };
        if !self.portfolio.is_flat() {
            tracing::debug!(%signal, time = %bar.timestamp, "Signal ignored while in position");
            return;
        }

        // Never open a position whose expiry cannot fire
        let close_time = match bar.timestamp.checked_add_signed(self.config.holding_period) {
            Some(close_time) if close_time > bar.timestamp => close_time,
            _ => {
                tracing::warn!(
                    %signal,
                    holding_period = %self.config.holding_period,
                    "Holding period yields no future expiry; signal skipped"
                );
                return;
            }
        };

        if self.open_position(direction, bar.index_price) {
            self.close_schedule.insert(close_time, true);
        }
    }

    /// Summary of the stats recorded for `date`, if any
    pub fn summarize_day(&self, date: NaiveDate) -> Option<DaySummary> {
        self.daily_stats
            .get(&date)
            .map(|stats| DaySummary::from_stats(date, stats))
    }

    /// Performance over completed trades, with equity at the last index price
    pub fn report_performance(&self) -> PerformanceReport {
        let last_price = self.current.map_or(Decimal::ZERO, |bar| bar.index_price);
        let report = PerformanceReport::compute(
            self.portfolio.completed_trades(),
            self.config.initial_cash,
            self.portfolio.total_equity(last_price),
            self.portfolio.open_trade().is_some(),
        );

        if report.trades == 0 {
            tracing::info!("No trades executed.");
        } else {
            tracing::info!(
                trades = report.trades,
                winners = report.winners,
                losers = report.losers,
                average_pnl = %report.average_pnl,
                geometric_mean = report.geometric_mean_return,
                sharpe = report.sharpe_ratio,
                final_equity = %report.final_equity,
                "Performance summary"
            );
        }
        report
    }

    /// Current lifecycle state
    pub fn state(&self) -> BacktestState {
        self.state
    }

    /// The portfolio being simulated
    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    /// The bar at the current step
    pub fn current_bar(&self) -> Option<AlignedBar> {
        self.current
    }

    /// Timestamp of the current step
    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.current.map(|bar| bar.timestamp)
    }

    /// Aligned timeline being replayed
    pub fn timeline(&self) -> &[AlignedBar] {
        &self.timeline
    }

    /// Stats recorded so far for `date`
    pub fn daily_stats(&self, date: NaiveDate) -> Option<&DailyStats> {
        self.daily_stats.get(&date)
    }

    /// Day summaries finalized so far
    pub fn day_summaries(&self) -> &[DaySummary] {
        &self.day_summaries
    }

    /// Whether a forced close is still pending at `timestamp`
    pub fn is_expiry_pending(&self, timestamp: DateTime<Utc>) -> bool {
        self.close_schedule.get(&timestamp).copied().unwrap_or(false)
    }

    fn open_position(&mut self, direction: Direction, price: Decimal) -> bool {
        if !self.portfolio.open_position(direction, price) {
            return false;
        }
        let Some(trade) = self.portfolio.open_trade().cloned() else {
            return false;
        };

        let cash = self.portfolio.cash();
        tracing::info!(
            trade_id = %trade.id,
            time = %trade.open_time,
            %direction,
            price = %trade.open_price,
            commission = %trade.commissions,
            %cash,
            "OPEN"
        );
        self.record(TradeEvent::Open { trade, cash });
        true
    }

    fn close_position(&mut self, price: Decimal) {
        let Some(trade) = self.portfolio.close_position(price).cloned() else {
            return;
        };

        let cash = self.portfolio.cash();
        tracing::info!(
            trade_id = %trade.id,
            time = ?trade.close_time,
            direction = %trade.direction,
            price = %price,
            commission = %trade.commissions,
            pnl = %trade.pnl(),
            %cash,
            "CLOSE"
        );
        self.record(TradeEvent::Close { trade, cash });
    }

    fn record(&mut self, event: TradeEvent) {
        if let Some(day) = self.current_day {
            self.daily_stats.entry(day).or_default().record(event);
        }
    }

    fn start_day(&mut self, date: NaiveDate) {
        self.current_day = Some(date);
        self.daily_stats.entry(date).or_default();
    }

    fn finalize_day(&mut self, date: NaiveDate) {
        let Some(summary) = self.summarize_day(date) else {
            return;
        };

        tracing::info!(
            %date,
            closed_trades = summary.closed_trades,
            pnl = %summary.pnl,
            "End of day summary"
        );
        for trade in &summary.trades {
            tracing::info!(%date, "{}", describe_closed(trade));
        }
        self.day_summaries.push(summary);
    }
}
