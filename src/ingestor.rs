//! Per-instrument ingestor: owns one websocket connection, one [Orderbook] and one
//! [BestPriceTracker], and publishes best-price changes into the shared [QuoteChannel].
//!
//! Each ingestor runs on its own thread and shares nothing with the others except the
//! channel. It goes `Connecting -> Streaming -> Terminated` and never comes back: a failed
//! connection or a bad message freezes that instrument's book for the life of the process
//! while every other thread carries on.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use serde::Deserialize;
use tungstenite::Message;
use url::Url;

use crate::{
    channel::QuoteChannel,
    config::{Config, CurrencyPair},
    error::IngestError,
    messages::{InstrumentId, QuoteEvent, Side},
    orderbook::Orderbook,
    tracker::BestPriceTracker,
    websocket::{
        self,
        binance::{DepthUpdate, SequenceWatch},
    },
};

/// What an ingestor does with a quote the channel refused.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all(deserialize = "lowercase"))]
pub enum OverflowPolicy {
    /// Lose the quote and keep the tracker as is: the same price won't be emitted again
    /// even though the dispatcher never saw it.
    #[default]
    Drop,
    /// Lose the quote but forget it was emitted, so the next message re-emits the
    /// current top of book.
    Rearm,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestorState {
    Connecting,
    Streaming,
    Terminated,
}

/// State and resources for a single instrument's ingestion thread.
pub struct Ingestor {
    instrument: InstrumentId,
    pair: CurrencyPair,
    endpoint: Url,
    channel: Arc<QuoteChannel>,
    policy: OverflowPolicy,
    state: IngestorState,
    orderbook: Orderbook,
    tracker: BestPriceTracker,
    sequence: SequenceWatch,
    // symbol as it appears in event payloads
    expected_symbol: String,
    dropped: u64,
}

impl Ingestor {
    pub fn new(
        instrument: InstrumentId,
        pair: CurrencyPair,
        endpoint: Url,
        channel: Arc<QuoteChannel>,
        policy: OverflowPolicy,
    ) -> Self {
        Self {
            instrument,
            expected_symbol: pair.symbol_upper(),
            pair,
            endpoint,
            channel,
            policy,
            state: IngestorState::Connecting,
            orderbook: Orderbook::new(),
            tracker: BestPriceTracker::new(),
            sequence: SequenceWatch::default(),
            dropped: 0,
        }
    }

    /// Build an ingestor for one configured instrument.
    pub fn from_config(
        config: &Config,
        instrument: InstrumentId,
        pair: &CurrencyPair,
        channel: Arc<QuoteChannel>,
    ) -> Result<Self, IngestError> {
        let endpoint = config.endpoint(pair)?;
        Ok(Self::new(
            instrument,
            pair.clone(),
            endpoint,
            channel,
            config.on_channel_full,
        ))
    }

    /// Run the ingestor on a dedicated, named thread. Termination is logged there and
    /// reported to nobody else.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("ingest-{}", self.pair.symbol()))
            .spawn(move || {
                let mut ingestor = self;
                let span = tracing::info_span!("ingestor", instrument = %ingestor.pair);
                let _enter = span.enter();
                if let Err(e) = ingestor.run() {
                    tracing::error!(
                        error = %e,
                        best_bid = ?ingestor.orderbook.best(Side::Bid),
                        best_ask = ?ingestor.orderbook.best(Side::Ask),
                        dropped = ingestor.dropped,
                        "ingestor terminated, book frozen"
                    );
                }
            })
    }

    /// Connect and stream until the connection fails or a message can't be parsed.
    /// There is no reconnection; this only ever returns an error.
    pub fn run(&mut self) -> Result<(), IngestError> {
        self.state = IngestorState::Connecting;
        let socket = match websocket::connect(self.endpoint.clone()) {
            Ok(socket) => socket,
            Err(e) => {
                self.state = IngestorState::Terminated;
                return Err(e);
            }
        };
        tracing::info!(endpoint = %self.endpoint, "connected");
        self.stream(websocket::frames(socket))
    }

    /// Process websocket frames in order until one of them fails.
    pub fn stream<I>(&mut self, frames: I) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = Result<Message, tungstenite::Error>>,
    {
        self.state = IngestorState::Streaming;
        let result = self.process_frames(frames);
        self.state = IngestorState::Terminated;
        result
    }

    fn process_frames<I>(&mut self, frames: I) -> Result<(), IngestError>
    where
        I: IntoIterator<Item = Result<Message, tungstenite::Error>>,
    {
        for frame in frames {
            match frame.map_err(IngestError::Transport)? {
                Message::Text(text) => self.process(text.as_bytes())?,
                Message::Binary(data) => self.process(&data)?,
                Message::Close(_) => break,
                // tungstenite answers pings itself
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
        Err(IngestError::ConnectionClosed)
    }

    /// Apply one depth diff and publish whatever it changed at the top of the book.
    pub fn process(&mut self, data: &[u8]) -> Result<(), IngestError> {
        let update = DepthUpdate::parse(data, &self.expected_symbol)?;
        if let Some(gap) = self.sequence.observe(&update) {
            tracing::warn!(
                expected = ?gap.expected_first_update_id,
                got = gap.first_update_id,
                "gap in depth update sequence, book may have diverged"
            );
        }
        self.orderbook.apply_updates(update.level_updates());
        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        for side in Side::BOTH {
            let Some(price) = self.tracker.check(&self.orderbook, side) else {
                continue;
            };
            let quote = QuoteEvent {
                price,
                side,
                instrument: self.instrument,
            };
            if let Err(quote) = self.channel.push(quote) {
                self.dropped += 1;
                if self.policy == OverflowPolicy::Rearm {
                    self.tracker.rearm(side);
                }
                tracing::debug!(
                    ?quote,
                    dropped = self.dropped,
                    policy = ?self.policy,
                    "quote channel full, quote dropped"
                );
            }
        }
    }

    pub fn state(&self) -> IngestorState {
        self.state
    }

    pub fn orderbook(&self) -> &Orderbook {
        &self.orderbook
    }

    pub fn tracker(&self) -> &BestPriceTracker {
        &self.tracker
    }

    /// Number of quotes lost to a full channel so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
