//! Dispatcher which is the sole consumer of the [QuoteChannel]. Quotes popped from the
//! channel are handed to a [QuoteAction], standing in for order routing.
//!
//! The dispatcher never blocks: when the channel is empty it applies its [Backoff] and
//! polls again.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail};

use crate::{channel::QuoteChannel, config::CurrencyPair, messages::QuoteEvent};

/// What the dispatcher does between polls of an empty channel.
///
/// Parsed from `spin`, `yield` or a sleep in microseconds such as `1us`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backoff {
    /// Busy-spin with a CPU pause hint.
    Spin,
    /// Give the rest of the time slice back to the OS scheduler.
    Yield,
    /// Sleep for a fixed duration.
    Sleep(Duration),
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Sleep(Duration::from_micros(1))
    }
}

impl Backoff {
    pub fn idle(&self) {
        match self {
            Backoff::Spin => std::hint::spin_loop(),
            Backoff::Yield => std::thread::yield_now(),
            Backoff::Sleep(d) => std::thread::sleep(*d),
        }
    }
}

impl FromStr for Backoff {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spin" => Ok(Backoff::Spin),
            "yield" => Ok(Backoff::Yield),
            other => {
                let Some(micros) = other.strip_suffix("us") else {
                    bail!("invalid backoff: {s}, expected spin, yield or <n>us")
                };
                let micros: u64 = micros
                    .trim()
                    .parse()
                    .map_err(|e| anyhow!("invalid backoff sleep {s}: {e}"))?;
                Ok(Backoff::Sleep(Duration::from_micros(micros)))
            }
        }
    }
}

/// Downstream action performed for every dispatched quote. Failures are the action's own
/// business; the dispatcher doesn't look at them.
pub trait QuoteAction {
    fn execute(&mut self, instrument: &CurrencyPair, quote: &QuoteEvent);
}

impl<F> QuoteAction for F
where
    F: FnMut(&CurrencyPair, &QuoteEvent),
{
    fn execute(&mut self, instrument: &CurrencyPair, quote: &QuoteEvent) {
        self(instrument, quote)
    }
}

/// Placeholder for order routing: logs the order that would be sent.
#[derive(Debug, Default)]
pub struct LogOrder;

impl QuoteAction for LogOrder {
    fn execute(&mut self, instrument: &CurrencyPair, quote: &QuoteEvent) {
        tracing::info!(
            side = %quote.side,
            price = %quote.price,
            target = %instrument.symbol(),
            "sending order"
        );
    }
}

/// State and resources for the dispatcher.
pub struct Dispatcher<A> {
    channel: Arc<QuoteChannel>,
    // resolves QuoteEvent::instrument back to its symbol
    instruments: Vec<CurrencyPair>,
    backoff: Backoff,
    action: A,
}

impl<A: QuoteAction> Dispatcher<A> {
    pub fn new(
        channel: Arc<QuoteChannel>,
        instruments: Vec<CurrencyPair>,
        backoff: Backoff,
        action: A,
    ) -> Self {
        Self {
            channel,
            instruments,
            backoff,
            action,
        }
    }

    /// Pop at most one quote and run the action on it.
    /// Returns false if the channel was empty.
    pub fn poll(&mut self) -> bool {
        let Some(quote) = self.channel.pop() else {
            return false;
        };
        match self.instruments.get(quote.instrument.index()) {
            Some(instrument) => self.action.execute(instrument, &quote),
            None => tracing::warn!(?quote, "quote for unknown instrument, skipped"),
        }
        true
    }

    /// Dispatch forever. There is no shutdown path other than killing the process.
    pub fn run(&mut self) -> ! {
        tracing::info!(backoff = ?self.backoff, "dispatcher started");
        loop {
            if !self.poll() {
                self.backoff.idle();
            }
        }
    }
}
