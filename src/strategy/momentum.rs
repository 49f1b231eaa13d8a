//! Moving-average momentum over a fixed window of prices
//!
//! The window is split into its older and newer halves. Momentum is the
//! relative change between the two halves' means:
//! `(mean(newer) - mean(older)) / mean(newer)`.

use super::{Signal, Strategy};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::VecDeque;

/// Number of prices the strategy needs before it signals
pub const WINDOW_SIZE: usize = 10;

/// Default momentum threshold (0.05%)
pub const DEFAULT_THRESHOLD: Decimal = dec!(0.0005);

/// Momentum strategy over the last [`WINDOW_SIZE`] prices
#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    /// Rolling price window, oldest first
    prices: VecDeque<Decimal>,
    /// Signal threshold, applied symmetrically
    threshold: Decimal,
}

impl MomentumStrategy {
    /// Create a strategy with the given threshold
    pub fn new(threshold: Decimal) -> Self {
        Self {
            prices: VecDeque::with_capacity(WINDOW_SIZE),
            threshold,
        }
    }

    /// Create a strategy with [`DEFAULT_THRESHOLD`]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }

    /// Whether the window is full
    pub fn can_compute_momentum(&self) -> bool {
        self.prices.len() == WINDOW_SIZE
    }

    /// Momentum of the current window.
    ///
    /// `None` until the window is full, or when the newer half averages to
    /// zero.
    pub fn compute_momentum(&self) -> Option<Decimal> {
        if !self.can_compute_momentum() {
            return None;
        }

        let half = WINDOW_SIZE / 2;
        let previous = mean(self.prices.iter().take(half));
        let current = mean(self.prices.iter().skip(half));

        if current.is_zero() {
            tracing::debug!("Momentum undefined for a zero-mean window");
            return None;
        }
        Some((current - previous) / current)
    }

    /// Number of buffered prices
    pub fn sample_count(&self) -> usize {
        self.prices.len()
    }

    /// Configured threshold
    pub fn threshold(&self) -> Decimal {
        self.threshold
    }
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Strategy for MomentumStrategy {
    fn update_price(&mut self, price: Decimal) {
        if self.prices.len() == WINDOW_SIZE {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    fn generate_signal(&self) -> Signal {
        let Some(momentum) = self.compute_momentum() else {
            return Signal::Hold;
        };

        if momentum > self.threshold {
            Signal::Buy
        } else if momentum < -self.threshold {
            Signal::Sell
        } else {
            Signal::Hold
        }
    }

    fn reset(&mut self) {
        self.prices.clear();
    }

    fn name(&self) -> &'static str {
        "momentum"
    }
}

fn mean<'a>(values: impl Iterator<Item = &'a Decimal>) -> Decimal {
    let (sum, count) = values.fold((Decimal::ZERO, 0u32), |(sum, n), v| (sum + *v, n + 1));
    if count == 0 {
        return Decimal::ZERO;
    }
    sum / Decimal::from(count)
}
