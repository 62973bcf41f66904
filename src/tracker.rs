//! Best-price change detection for a single instrument.

use rust_decimal::Decimal;

use crate::{messages::Side, orderbook::Orderbook};

/// Remembers the last best price emitted downstream for each side of one instrument.
///
/// Owned by exactly one ingestor; never shared between threads.
#[derive(Debug, Default)]
pub struct BestPriceTracker {
    last_bid: Option<Decimal>,
    last_ask: Option<Decimal>,
}

impl BestPriceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare the current top of `side` against the last emitted value.
    ///
    /// Returns the new best price if the side is non-empty and the price differs from the
    /// last one emitted, recording it as emitted. An empty side never produces a price and
    /// leaves the remembered value untouched.
    pub fn check(&mut self, orderbook: &Orderbook, side: Side) -> Option<Decimal> {
        let best = orderbook.best(side)?;
        let last = self.slot(side);
        if *last == Some(best) {
            return None;
        }
        *last = Some(best);
        Some(best)
    }

    pub fn last(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Bid => self.last_bid,
            Side::Ask => self.last_ask,
        }
    }

    /// Forget the last emitted value so the next [check](Self::check) emits the current top.
    pub fn rearm(&mut self, side: Side) {
        *self.slot(side) = None;
    }

    fn slot(&mut self, side: Side) -> &mut Option<Decimal> {
        match side {
            Side::Bid => &mut self.last_bid,
            Side::Ask => &mut self.last_ask,
        }
    }
}
