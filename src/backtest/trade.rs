//! Trade lifecycle: one directional position from open to close

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Profit when price rises
    Long,
    /// Profit when price falls
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Trade errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TradeError {
    /// `close` was called on a trade that already has its exit recorded
    #[error("Trade {0} is already closed")]
    AlreadyClosed(Uuid),
}

/// A single position's lifecycle.
///
/// The exit fields (`close_time`, `close_price`, `realized_pnl`) are unset until
/// [`Trade::close`] succeeds, and are never rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Trade identifier
    pub id: Uuid,
    /// Long or short
    pub direction: Direction,
    /// Entry timestamp
    pub open_time: DateTime<Utc>,
    /// Entry price
    pub open_price: Decimal,
    /// Position size in contracts
    pub size: Decimal,
    /// Exit timestamp
    pub close_time: Option<DateTime<Utc>>,
    /// Exit price
    pub close_price: Option<Decimal>,
    /// Directional PnL, excluding commission
    pub realized_pnl: Option<Decimal>,
    /// Commission charged on open and close
    pub commissions: Decimal,
}

impl Trade {
    /// Create an open trade of size 1
    pub fn new(direction: Direction, open_time: DateTime<Utc>, open_price: Decimal) -> Self {
        Self::with_size(direction, open_time, open_price, Decimal::ONE)
    }

    /// Create an open trade with an explicit size
    pub fn with_size(
        direction: Direction,
        open_time: DateTime<Utc>,
        open_price: Decimal,
        size: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            open_time,
            open_price,
            size,
            close_time: None,
            close_price: None,
            realized_pnl: None,
            commissions: Decimal::ZERO,
        }
    }

    /// Record the exit and compute realized PnL.
    ///
    /// Returns the realized PnL. A second call leaves the trade untouched.
    pub fn close(
        &mut self,
        close_time: DateTime<Utc>,
        close_price: Decimal,
    ) -> Result<Decimal, TradeError> {
        if self.is_closed() {
            return Err(TradeError::AlreadyClosed(self.id));
        }

        let pnl = self.pnl_at(close_price);
        self.close_time = Some(close_time);
        self.close_price = Some(close_price);
        self.realized_pnl = Some(pnl);
        Ok(pnl)
    }

    /// PnL of this position if it were marked at `price`
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        match self.direction {
            Direction::Long => (price - self.open_price) * self.size,
            Direction::Short => (self.open_price - price) * self.size,
        }
    }

    /// Whether the exit has been recorded
    pub fn is_closed(&self) -> bool {
        self.realized_pnl.is_some()
    }

    /// Realized PnL, zero while the trade is open
    pub fn pnl(&self) -> Decimal {
        self.realized_pnl.unwrap_or(Decimal::ZERO)
    }
}
