//! Bounded lock-free hand-off of [QuoteEvent]s from the ingestors to the dispatcher.
//!
//! Any number of producers may push concurrently; exactly one consumer pops. Neither side
//! ever blocks: a full channel rejects the push and an empty channel returns nothing.

use crossbeam_queue::ArrayQueue;
use thiserror::Error;

use crate::messages::QuoteEvent;

/// Capacity used when the config doesn't override it.
pub const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("channel capacity must be a non-zero power of two, got {0}")]
pub struct InvalidCapacity(pub usize);

/// Fixed-capacity multi-producer single-consumer queue of quotes.
///
/// All storage is allocated up front, pushing and popping never allocate. Share it between
/// threads behind an [Arc](std::sync::Arc).
#[derive(Debug)]
pub struct QuoteChannel {
    queue: ArrayQueue<QuoteEvent>,
}

impl Default for QuoteChannel {
    fn default() -> Self {
        Self {
            queue: ArrayQueue::new(DEFAULT_CAPACITY),
        }
    }
}

impl QuoteChannel {
    pub fn with_capacity(capacity: usize) -> Result<Self, InvalidCapacity> {
        if !capacity.is_power_of_two() {
            return Err(InvalidCapacity(capacity));
        }
        Ok(Self {
            queue: ArrayQueue::new(capacity),
        })
    }

    /// Enqueue a quote without blocking.
    ///
    /// Returns the quote back if the channel is at capacity; it has not been enqueued and the
    /// caller decides what, if anything, to do about it.
    #[inline]
    pub fn push(&self, quote: QuoteEvent) -> Result<(), QuoteEvent> {
        self.queue.push(quote)
    }

    /// Dequeue the oldest accepted quote, or `None` if there is nothing to take.
    #[inline]
    pub fn pop(&self) -> Option<QuoteEvent> {
        self.queue.pop()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}
