//! # Fetch Scheduler
//!
//! Per-channel polling loops driving the whole pipeline:
//! tick → await fetch → synchronous merge → synchronous broadcast → next tick.
//!
//! One request is in flight per channel at any time, so batches merge in
//! request order and the merger is never reentered for a channel. A failed
//! poll is logged and retried on the next tick, forever: a flaky backend
//! costs ticks, never the stream.
//!
//! The watermark advances to the client-clock time captured just before each
//! successful fetch, not to the newest timestamp in the batch. Always
//! re-requesting from the last request time tolerates backend/client clock
//! skew; the few milliseconds of already-seen data this can re-fetch are
//! bounded by request latency.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::history::ChannelSeries;
use crate::core::hub::{Hub, StatusSnapshot};
use crate::core::merger::merge_batch;
use crate::core::registry::ChannelRegistry;
use crate::error::{Error, Result};
use crate::model::SampleBatch;
use crate::retrieve::Transport;

#[derive(Debug, Clone, Copy)]
pub struct StatusServiceConfig {
    /// Fixed period between polls of one channel.
    pub poll_interval: Duration,
    /// Received-batch count at which a channel's history is cleared.
    pub reset_batch_limit: u32,
}

impl Default for StatusServiceConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            reset_batch_limit: 1000,
        }
    }
}

/// State and hub for one channel, owned exclusively by its poller.
struct ChannelSlot {
    channel: usize,
    series: Mutex<ChannelSeries>,
    hub: Hub<StatusSnapshot>,
}

impl ChannelSlot {
    fn new(channel: usize) -> Self {
        Self {
            channel,
            series: Mutex::new(ChannelSeries::new()),
            hub: Hub::new(),
        }
    }

    fn watermark(&self) -> Option<f64> {
        self.series.lock().expect("series lock poisoned").watermark
    }

    /// Merge, broadcast, then apply the reset policy.
    ///
    /// The snapshot is taken after the merge but before a potential reset, so
    /// subscribers always see the batch that tripped the threshold; the next
    /// emission starts from the cleared state.
    fn ingest(&self, batch: &SampleBatch, request_epoch_s: f64, reset_limit: u32) {
        let snapshot = {
            let mut series = self.series.lock().expect("series lock poisoned");
            merge_batch(&mut series, batch);
            series.watermark = Some(request_epoch_s);
            let snapshot = StatusSnapshot {
                channel: self.channel,
                series: series.clone(),
            };
            series.apply_reset_policy(reset_limit);
            snapshot
        };
        self.hub.publish(snapshot);
    }

    /// Out-of-band reset: empties the local state and tells subscribers.
    fn clear(&self) {
        let snapshot = {
            let mut series = self.series.lock().expect("series lock poisoned");
            series.clear();
            StatusSnapshot {
                channel: self.channel,
                series: series.clone(),
            }
        };
        self.hub.publish(snapshot);
    }
}

/// One upstream poller per channel fanned out to any number of views.
pub struct StatusService {
    transport: Arc<dyn Transport>,
    slots: Vec<Arc<ChannelSlot>>,
    config: StatusServiceConfig,
    /// Token covering all running pollers; `None` while stopped.
    poller: Mutex<Option<CancellationToken>>,
}

impl StatusService {
    pub fn new(
        transport: Arc<dyn Transport>,
        registry: &ChannelRegistry,
        config: StatusServiceConfig,
    ) -> Self {
        let slots = registry
            .channels()
            .map(|channel| Arc::new(ChannelSlot::new(channel)))
            .collect();
        Self {
            transport,
            slots,
            config,
            poller: Mutex::new(None),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.slots.len()
    }

    /// Subscribes a view to one channel's status emissions. Emissions before
    /// this call are not replayed.
    pub fn subscribe(&self, channel: usize) -> Result<broadcast::Receiver<Arc<StatusSnapshot>>> {
        Ok(self.slot(channel)?.hub.subscribe())
    }

    /// Starts one poller per channel. A no-op while already streaming: a
    /// second start never creates duplicate pollers.
    pub fn start_streaming(&self) {
        let mut poller = self.poller.lock().expect("poller lock poisoned");
        if poller.is_some() {
            log::debug!("start_streaming: already running");
            return;
        }

        let token = CancellationToken::new();
        for slot in &self.slots {
            tokio::spawn(poll_channel(
                Arc::clone(&self.transport),
                Arc::clone(slot),
                self.config,
                token.clone(),
            ));
        }
        log::info!(
            "status streaming started for {} channel(s) every {:?}",
            self.slots.len(),
            self.config.poll_interval
        );
        *poller = Some(token);
    }

    /// Stops all channel pollers atomically. Idempotent: stopping while
    /// already stopped does nothing.
    pub fn stop_streaming(&self) {
        let mut poller = self.poller.lock().expect("poller lock poisoned");
        if let Some(token) = poller.take() {
            token.cancel();
            log::info!("status streaming stopped");
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.poller.lock().expect("poller lock poisoned").is_some()
    }

    /// Explicit "clear history" command: resets the local channel state
    /// immediately, then asks the backend to drop its own log. The local
    /// reset holds even when the backend call fails; the error is handed back
    /// once for user-visible reporting.
    pub async fn clear_history(&self, channel: usize) -> Result<()> {
        let slot = self.slot(channel)?;
        slot.clear();
        self.transport.clear_history(channel).await
    }

    fn slot(&self, channel: usize) -> Result<&Arc<ChannelSlot>> {
        self.slots.get(channel).ok_or(Error::ChannelOutOfRange {
            channel,
            count: self.slots.len(),
        })
    }
}

fn epoch_now() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

async fn poll_channel(
    transport: Arc<dyn Transport>,
    slot: Arc<ChannelSlot>,
    config: StatusServiceConfig,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = token.cancelled() => {
                log::debug!("channel {}: poller stopped", slot.channel);
                break;
            }
            _ = ticker.tick() => {
                let request_epoch_s = epoch_now();
                let watermark = slot.watermark();

                match transport.fetch_since(slot.channel, watermark).await {
                    Ok(history) => {
                        let batch = history.into_batch(slot.channel);
                        slot.ingest(&batch, request_epoch_s, config.reset_batch_limit);
                    }
                    Err(err) => {
                        // Watermark untouched; the same window is re-requested
                        // on the next tick, indefinitely.
                        log::warn!("channel {}: poll failed, retrying next tick: {}", slot.channel, err);
                    }
                }
            }
        }
    }
}
