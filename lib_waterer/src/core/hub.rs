//! Multicast distribution point: one upstream producer per channel, any
//! number of replay-free subscribers.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::core::history::ChannelSeries;

/// Emissions queued per subscriber before the slowest one starts lagging.
pub const HUB_CAPACITY: usize = 64;

/// What the status hub emits after every merge: a read-only snapshot of the
/// channel's merged buffers. Shared across subscribers behind an `Arc`, so a
/// consumer can never mutate another consumer's view.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub channel: usize,
    pub series: ChannelSeries,
}

/// A pure distribution point. Performs no merge logic; the producer hands it
/// finished values and every current subscriber sees each of them exactly
/// once, in publish order. Late subscribers receive only future emissions.
pub struct Hub<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T> Hub<T> {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    /// Publishes one emission to all current subscribers. With no subscribers
    /// the emission is simply dropped; that is not an error.
    pub fn publish(&self, value: T) {
        let _ = self.tx.send(Arc::new(value));
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T> Default for Hub<T> {
    fn default() -> Self {
        Self::new()
    }
}
