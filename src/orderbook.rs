//! Module for defining types which are used to internally maintain orderbook state.
use std::collections::BTreeSet;

use rust_decimal::Decimal;

use crate::messages::{LevelUpdate, Side};

/// One half of an [Orderbook]: the set of prices with non-zero resting size.
///
/// Sizes are not kept, only presence, since only the top of book is consumed downstream.
/// [BTreeSet] gives O(log(n)) insert and remove and can be iterated from either end, so the
/// best price is the last element for bids and the first for asks.
#[derive(Debug, Eq, PartialEq)]
pub struct BookSide {
    side: Side,
    levels: BTreeSet<Decimal>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeSet::new(),
        }
    }

    /// Remove the level on a zero size, otherwise insert it. Both are no-ops when the level is
    /// already absent/present.
    pub fn apply(&mut self, price: Decimal, size: Decimal) {
        if size.is_zero() {
            self.levels.remove(&price);
        } else {
            self.levels.insert(price);
        }
    }

    /// The best price on this side: highest bid or lowest ask.
    pub fn best(&self) -> Option<Decimal> {
        match self.side {
            Side::Bid => self.levels.iter().next_back().copied(),
            Side::Ask => self.levels.iter().next().copied(),
        }
    }

    pub fn contains(&self, price: &Decimal) -> bool {
        self.levels.contains(price)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// A representation of an orderbook for a single instrument, designed for updating using
/// diffs/deltas.
/// There is no initial snapshot, so the book only knows about levels touched by a diff since
/// the connection opened and may be missing levels far away from the spread.
#[derive(Debug, Eq, PartialEq)]
pub struct Orderbook {
    bids: BookSide,
    asks: BookSide,
}

impl Default for Orderbook {
    fn default() -> Self {
        Self::new()
    }
}

impl Orderbook {
    pub fn new() -> Self {
        Self {
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
        }
    }

    /// Construct an instance from (price, size) pairs as they arrive off the wire.
    #[cfg(test)]
    pub fn from_asks_bids(asks: Vec<(Decimal, Decimal)>, bids: Vec<(Decimal, Decimal)>) -> Self {
        let mut orderbook = Self::new();
        for (price, size) in asks {
            orderbook.asks.apply(price, size);
        }
        for (price, size) in bids {
            orderbook.bids.apply(price, size);
        }
        orderbook
    }

    pub fn side(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    /// Apply a single level operation.
    pub fn apply(&mut self, update: LevelUpdate) {
        self.side_mut(update.side).apply(update.price, update.size);
    }

    /// Update the orderbook with the operations of one diff message, in message order.
    pub fn apply_updates(&mut self, updates: impl IntoIterator<Item = LevelUpdate>) {
        for update in updates {
            self.apply(update);
        }
    }

    pub fn best(&self, side: Side) -> Option<Decimal> {
        self.side(side).best()
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn level(side: Side, price: Decimal, size: Decimal) -> LevelUpdate {
        LevelUpdate { side, price, size }
    }

    #[test]
    fn apply_orderbook_updates() {
        #[rustfmt::skip]
        let mut ob = Orderbook::from_asks_bids(
            vec![
                (dec!(3), dec!(1)),
                (dec!(5), dec!(1)),
                (dec!(4), dec!(1)),
                (dec!(2), dec!(2)),
                (dec!(1), dec!(3)),
            ],
            vec![
                (dec!(1), dec!(2)),
                (dec!(5), dec!(1)),
                (dec!(3), dec!(1)),
                (dec!(4), dec!(2)),
                (dec!(2), dec!(3)),
            ],
        );

        #[rustfmt::skip]
        let updates = vec![
            level(Side::Ask, dec!(1), dec!(21)),
            level(Side::Ask, dec!(2), dec!(22)),
            level(Side::Ask, dec!(3), dec!(0)),
            level(Side::Ask, dec!(14), dec!(24)),
            level(Side::Ask, dec!(15), dec!(0)),
            level(Side::Bid, dec!(1), dec!(2)),
            level(Side::Bid, dec!(2), dec!(0)),
            level(Side::Bid, dec!(3), dec!(2)),
            level(Side::Bid, dec!(6), dec!(2)),
        ];
        ob.apply_updates(updates);

        #[rustfmt::skip]
        let target = Orderbook::from_asks_bids(
            vec![
                (dec!(14), dec!(24)),
                (dec!(5), dec!(1)),
                (dec!(4), dec!(1)),
                (dec!(2), dec!(22)),
                (dec!(1), dec!(21)),
            ],
            vec![
                (dec!(1), dec!(2)),
                (dec!(5), dec!(1)),
                (dec!(3), dec!(2)),
                (dec!(4), dec!(2)),
                (dec!(6), dec!(2)),
            ]
        );
        assert_eq!(ob, target);
        assert_eq!(ob.best(Side::Ask), Some(dec!(1)));
        assert_eq!(ob.best(Side::Bid), Some(dec!(6)));
    }

    #[test]
    fn best_of_orderbook_after_removing_the_top() {
        #[rustfmt::skip]
        let mut ob = Orderbook::from_asks_bids(
            vec![
                (dec!(14), dec!(24)),
                (dec!(5), dec!(1)),
                (dec!(4), dec!(1)),
                (dec!(2), dec!(22)),
                (dec!(1), dec!(21)),
            ],
            vec![
                (dec!(1), dec!(2)),
                (dec!(5), dec!(1)),
                (dec!(3), dec!(2)),
                (dec!(4), dec!(2)),
                (dec!(6), dec!(2)),
            ]
        );
        assert_eq!(ob.best(Side::Ask), Some(dec!(1)));
        assert_eq!(ob.best(Side::Bid), Some(dec!(6)));

        ob.apply(level(Side::Ask, dec!(1), dec!(0)));
        ob.apply(level(Side::Bid, dec!(6), dec!(0)));
        assert_eq!(ob.best(Side::Ask), Some(dec!(2)));
        assert_eq!(ob.best(Side::Bid), Some(dec!(5)));
    }

    #[test]
    fn zero_size_removes_only_when_present() {
        let mut side = BookSide::new(Side::Bid);
        side.apply(dec!(1.0000), dec!(0));
        assert!(side.is_empty());

        side.apply(dec!(1.0000), dec!(5));
        side.apply(dec!(1.0000), dec!(0));
        side.apply(dec!(1.0000), dec!(0));
        assert!(side.is_empty());
        assert_eq!(side.best(), None);
    }

    #[test]
    fn insert_is_idempotent() {
        let mut side = BookSide::new(Side::Ask);
        side.apply(dec!(1.0010), dec!(3));
        side.apply(dec!(1.0010), dec!(7));
        assert_eq!(side.len(), 1);
        assert!(side.contains(&dec!(1.0010)));
    }

    #[test]
    fn equal_decimals_with_different_scale_are_one_level() {
        let mut side = BookSide::new(Side::Bid);
        side.apply(dec!(1.0000), dec!(5));
        side.apply(dec!(1.00), dec!(2));
        assert_eq!(side.len(), 1);
        side.apply(dec!(1), dec!(0));
        assert!(side.is_empty());
    }
}
