//! Single-position account ledger

use super::trade::{Direction, Trade};
use super::BacktestConfig;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Cash ledger holding at most one open trade.
///
/// Cash moves only through [`Portfolio::open_position`] and
/// [`Portfolio::close_position`]: a fixed commission on each side, a margin
/// reserve of `margin_fraction * open_price * size` held while a short is open,
/// and the realized PnL credited on close.
#[derive(Debug, Clone)]
pub struct Portfolio {
    cash: Decimal,
    open_trade: Option<Trade>,
    completed_trades: Vec<Trade>,
    current_time: Option<DateTime<Utc>>,
    commission: Decimal,
    margin_fraction: Decimal,
    position_size: Decimal,
}

impl Portfolio {
    /// Create a portfolio with default commission, margin and size
    pub fn new(initial_cash: Decimal) -> Self {
        Self::from_config(&BacktestConfig {
            initial_cash,
            ..BacktestConfig::default()
        })
    }

    /// Create a portfolio from engine configuration
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            cash: config.initial_cash,
            open_trade: None,
            completed_trades: vec![],
            current_time: None,
            commission: config.commission,
            margin_fraction: config.margin_fraction,
            position_size: config.position_size,
        }
    }

    /// Advance the clock used to stamp subsequent opens and closes
    pub fn set_current_time(&mut self, current_time: DateTime<Utc>) {
        self.current_time = Some(current_time);
    }

    /// Open a position at `price` charging the default commission
    pub fn open_position(&mut self, direction: Direction, price: Decimal) -> bool {
        self.open_position_with_commission(direction, price, self.commission)
    }

    /// Open a position at `price`.
    ///
    /// Returns false, leaving every field untouched, when a trade is already
    /// open or the clock has not been set.
    pub fn open_position_with_commission(
        &mut self,
        direction: Direction,
        price: Decimal,
        commission: Decimal,
    ) -> bool {
        if self.open_trade.is_some() {
            return false;
        }
        let Some(now) = self.current_time else {
            tracing::warn!(%direction, %price, "Refusing to open a position before the clock is set");
            return false;
        };

        let mut trade = Trade::with_size(direction, now, price, self.position_size);
        self.cash -= commission;
        trade.commissions += commission;

        if direction == Direction::Short {
            self.cash -= self.margin_for(&trade);
        }

        self.open_trade = Some(trade);
        true
    }

    /// Close the open position at `price` charging the default commission
    pub fn close_position(&mut self, price: Decimal) -> Option<&Trade> {
        self.close_position_with_commission(price, self.commission)
    }

    /// Close the open position at `price`.
    ///
    /// No-op returning `None` when flat. Otherwise the closed trade is moved to
    /// the completed list and returned.
    pub fn close_position_with_commission(
        &mut self,
        price: Decimal,
        commission: Decimal,
    ) -> Option<&Trade> {
        let mut trade = self.open_trade.take()?;
        let close_time = self.current_time.unwrap_or(trade.open_time);

        self.cash -= commission;
        trade.commissions += commission;

        // Only trades opened by this portfolio land in `open_trade`, and they
        // are created unclosed.
        if let Err(err) = trade.close(close_time, price) {
            tracing::warn!(%err, "Open trade was already closed");
        }

        if trade.direction == Direction::Short {
            self.cash += self.margin_for(&trade);
        }
        self.cash += trade.pnl();

        self.completed_trades.push(trade);
        self.completed_trades.last()
    }

    /// Unrealized PnL of the open trade marked at `current_price`, zero when flat
    pub fn get_unrealized_pnl(&self, current_price: Decimal) -> Decimal {
        self.open_trade
            .as_ref()
            .map_or(Decimal::ZERO, |trade| trade.pnl_at(current_price))
    }

    /// Cash plus unrealized PnL
    pub fn total_equity(&self, current_price: Decimal) -> Decimal {
        self.cash + self.get_unrealized_pnl(current_price)
    }

    /// Current cash balance
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// The open trade, if any
    pub fn open_trade(&self) -> Option<&Trade> {
        self.open_trade.as_ref()
    }

    /// Closed trades in close order
    pub fn completed_trades(&self) -> &[Trade] {
        &self.completed_trades
    }

    /// Clock value last pushed by the backtester
    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.current_time
    }

    /// Whether no trade is open
    pub fn is_flat(&self) -> bool {
        self.open_trade.is_none()
    }

    fn margin_for(&self, trade: &Trade) -> Decimal {
        self.margin_fraction * trade.open_price * trade.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 3, hour, minute, 0).unwrap()
    }

    fn portfolio() -> Portfolio {
        let mut portfolio = Portfolio::new(dec!(100000));
        portfolio.set_current_time(at(9, 30));
        portfolio
    }

    #[test]
    fn test_open_long_position() {
        let mut portfolio = portfolio();

        assert!(portfolio.open_position(Direction::Long, dec!(5000)));
        assert_eq!(portfolio.cash(), dec!(99998));

        let trade = portfolio.open_trade().unwrap();
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.open_time, at(9, 30));
        assert_eq!(trade.commissions, dec!(2));
    }

    #[test]
    fn test_open_short_reserves_margin() {
        let mut portfolio = portfolio();

        assert!(portfolio.open_position(Direction::Short, dec!(5000)));
        // 100000 - 2 commission - 0.5 * 5000 margin
        assert_eq!(portfolio.cash(), dec!(97498));
    }

    #[test]
    fn test_double_open_is_rejected() {
        let mut portfolio = portfolio();
        portfolio.open_position(Direction::Long, dec!(5000));
        let cash = portfolio.cash();
        let trade_id = portfolio.open_trade().unwrap().id;

        assert!(!portfolio.open_position(Direction::Short, dec!(5100)));
        assert_eq!(portfolio.cash(), cash);
        assert_eq!(portfolio.open_trade().unwrap().id, trade_id);
        assert_eq!(portfolio.open_trade().unwrap().direction, Direction::Long);
    }

    #[test]
    fn test_open_before_clock_is_rejected() {
        let mut portfolio = Portfolio::new(dec!(100000));

        assert!(!portfolio.open_position(Direction::Long, dec!(5000)));
        assert_eq!(portfolio.cash(), dec!(100000));
        assert!(portfolio.is_flat());
    }

    #[test]
    fn test_close_long_position() {
        let mut portfolio = portfolio();
        portfolio.open_position(Direction::Long, dec!(5000));

        portfolio.set_current_time(at(10, 0));
        let closed = portfolio.close_position(dec!(5100)).unwrap();
        assert_eq!(closed.close_time, Some(at(10, 0)));
        assert_eq!(closed.commissions, dec!(4));

        assert!(portfolio.open_trade().is_none());
        assert_eq!(portfolio.completed_trades().len(), 1);
        assert_eq!(portfolio.cash(), dec!(100096));
    }

    #[test]
    fn test_close_short_returns_margin() {
        let mut portfolio = portfolio();
        portfolio.open_position(Direction::Short, dec!(5000));

        portfolio.set_current_time(at(10, 0));
        portfolio.close_position(dec!(4900));

        // 100000 - 2 - 2 - 2500 + 2500 + 100
        assert_eq!(portfolio.cash(), dec!(100096));
        assert!(portfolio.is_flat());
        assert_eq!(portfolio.completed_trades().len(), 1);
    }

    #[test]
    fn test_short_margin_refund_ignores_exit_price() {
        let mut portfolio = portfolio();
        portfolio.open_position(Direction::Short, dec!(5000));
        portfolio.close_position(dec!(5300));

        // 100000 - 4 commission - 300 loss, margin fully returned
        assert_eq!(portfolio.cash(), dec!(99696));
    }

    #[test]
    fn test_close_when_flat_is_noop() {
        let mut portfolio = portfolio();

        assert!(portfolio.close_position(dec!(5000)).is_none());
        assert_eq!(portfolio.cash(), dec!(100000));
        assert!(portfolio.completed_trades().is_empty());
    }

    #[test]
    fn test_unrealized_pnl() {
        let mut portfolio = portfolio();
        assert_eq!(portfolio.get_unrealized_pnl(dec!(5100)), dec!(0));

        portfolio.open_position(Direction::Long, dec!(5000));
        assert_eq!(portfolio.get_unrealized_pnl(dec!(5100)), dec!(100));

        portfolio.close_position(dec!(5100));
        portfolio.open_position(Direction::Short, dec!(5000));
        assert_eq!(portfolio.get_unrealized_pnl(dec!(4900)), dec!(100));
    }

    #[test]
    fn test_total_equity() {
        let mut portfolio = portfolio();
        portfolio.open_position(Direction::Long, dec!(5000));

        assert_eq!(portfolio.total_equity(dec!(5100)), dec!(100098));
    }

    #[test]
    fn test_explicit_commission() {
        let mut portfolio = portfolio();
        portfolio.open_position_with_commission(Direction::Long, dec!(5000), dec!(0.5));
        portfolio.close_position_with_commission(dec!(5001), dec!(0.75));

        assert_eq!(portfolio.cash(), dec!(100000) - dec!(1.25) + dec!(1));
        assert_eq!(portfolio.completed_trades()[0].commissions, dec!(1.25));
    }

    #[test]
    fn test_configured_size_and_margin() {
        let config = BacktestConfig {
            position_size: dec!(2),
            margin_fraction: dec!(0.25),
            ..BacktestConfig::default()
        };
        let mut portfolio = Portfolio::from_config(&config);
        portfolio.set_current_time(at(9, 30));

        portfolio.open_position(Direction::Short, dec!(4000));
        // 100000 - 2 - 0.25 * 4000 * 2
        assert_eq!(portfolio.cash(), dec!(97998));

        portfolio.close_position(dec!(3990));
        // margin back, 2 * 10 PnL, second commission
        assert_eq!(portfolio.cash(), dec!(100016));
    }
}
