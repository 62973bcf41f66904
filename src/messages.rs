//! Internal message protocol from the per-instrument ingestors to the dispatcher (one-way).

use std::fmt;

use rust_decimal::Decimal;

/// Side of the book a price level or quote belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Bid, Side::Ask];
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => f.write_str("BID"),
            Side::Ask => f.write_str("ASK"),
        }
    }
}

/// Index of an instrument in the configured instrument table.
///
/// The set of instruments is closed once the config is loaded, so a small copyable
/// index is all a [QuoteEvent] needs to carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(pub u8);

impl InstrumentId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single (side, price, size) operation decoded from a depth diff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelUpdate {
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
}

/// A best-price change, pushed by an ingestor and popped by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuoteEvent {
    pub price: Decimal,
    pub side: Side,
    pub instrument: InstrumentId,
}
