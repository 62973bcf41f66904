//! Types for decoding the Binance "diff depth" websocket channel.
//!
//! Binance streams update events with associated first- and last- update IDs. A client that
//! wants an exact book has to fetch a rest snapshot and stitch the stream onto it. We don't:
//! the book is built from diffs alone, so the IDs are only used to notice (and report) gaps.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::{
    error::IngestError,
    messages::{LevelUpdate, Side},
};

const DEPTH_UPDATE_EVENT: &str = "depthUpdate";

/// The structure of an orderbook diff/delta websocket message received by our client.
///
/// Only the bid and ask changes are required; the envelope fields are checked when present.
#[derive(Debug, Deserialize)]
pub struct DepthUpdate {
    #[serde(rename = "e")]
    pub event: Option<String>,
    #[serde(rename = "s")]
    pub symbol: Option<String>,
    #[serde(rename = "U")]
    pub first_update_id: Option<u64>,
    #[serde(rename = "u")]
    pub last_update_id: Option<u64>,
    #[serde(rename = "b")]
    pub bids: Vec<(Decimal, Decimal)>,
    #[serde(rename = "a")]
    pub asks: Vec<(Decimal, Decimal)>,
}

impl DepthUpdate {
    /// Decode one text frame and check the event type and symbol against `expected_symbol`.
    pub fn parse(data: &[u8], expected_symbol: &str) -> Result<Self, IngestError> {
        let update: DepthUpdate = serde_json::from_slice(data)?;
        if let Some(event) = &update.event {
            if event != DEPTH_UPDATE_EVENT {
                return Err(IngestError::UnexpectedEvent(event.clone()));
            }
        }
        if let Some(symbol) = &update.symbol {
            if symbol != expected_symbol {
                return Err(IngestError::UnexpectedSymbol {
                    expected: expected_symbol.to_owned(),
                    got: symbol.clone(),
                });
            }
        }
        Ok(update)
    }

    /// The level operations in this message: bids in message order, then asks in message order.
    pub fn level_updates(&self) -> impl Iterator<Item = LevelUpdate> + '_ {
        let bids = self.bids.iter().map(|&(price, size)| LevelUpdate {
            side: Side::Bid,
            price,
            size,
        });
        let asks = self.asks.iter().map(|&(price, size)| LevelUpdate {
            side: Side::Ask,
            price,
            size,
        });
        bids.chain(asks)
    }
}

/// A break in the update ID sequence between two consecutive messages.
#[derive(Debug, PartialEq, Eq)]
pub struct SequenceGap {
    /// `None` when the previous message already ended at `u64::MAX`.
    pub expected_first_update_id: Option<u64>,
    pub first_update_id: u64,
}

/// Follows `U`/`u` across messages. Detection only: nothing is resynchronised.
#[derive(Debug, Default)]
pub struct SequenceWatch {
    prev_last_update_id: Option<u64>,
}

impl SequenceWatch {
    pub fn observe(&mut self, update: &DepthUpdate) -> Option<SequenceGap> {
        let (Some(first), Some(last)) = (update.first_update_id, update.last_update_id) else {
            return None;
        };
        let gap = match self.prev_last_update_id.map(|prev| prev.checked_add(1)) {
            Some(expected) if expected != Some(first) => Some(SequenceGap {
                expected_first_update_id: expected,
                first_update_id: first,
            }),
            _ => None,
        };
        self.prev_last_update_id = Some(last);
        gap
    }
}
