//! Strategy module
//!
//! Turns a stream of observed prices into one trading signal per step

mod momentum;

pub use momentum::{MomentumStrategy, DEFAULT_THRESHOLD, WINDOW_SIZE};

use crate::backtest::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading signal produced once per step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    /// Open a long position
    Buy,
    /// Open a short position
    Sell,
    /// Do nothing
    Hold,
}

impl Signal {
    /// Direction of the position this signal asks for
    pub fn direction(self) -> Option<Direction> {
        match self {
            Signal::Buy => Some(Direction::Long),
            Signal::Sell => Some(Direction::Short),
            Signal::Hold => None,
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
            Signal::Hold => write!(f, "hold"),
        }
    }
}

/// Trait for strategy implementations
pub trait Strategy: Send {
    /// Absorb one new price observation
    fn update_price(&mut self, price: Decimal);
    /// Signal for the state accumulated so far
    fn generate_signal(&self) -> Signal;
    /// Forget all observed prices
    fn reset(&mut self);
    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}
