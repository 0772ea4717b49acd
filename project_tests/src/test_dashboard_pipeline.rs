//! # Dashboard Pipeline End-to-End Tests
//!
//! Drives the full reconciliation pipeline (`lib_waterer`) in-process against
//! a scripted backend: registry resolution, the per-channel fetch scheduler,
//! series merging with pump-track compression, the reset policy, and the
//! settings write/confirm cycle.
//!
//! No network is involved; the scripted transport stands in for the waterer
//! backend so the run is deterministic and fast.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use lib_waterer::{
    ChannelRegistry, PumpSettings, Result as WaterResult, SettingsService, StatusHistory,
    StatusService, StatusServiceConfig, Transport,
};

/// Scripted stand-in for the waterer backend.
///
/// Channel 0 serves queued `StatusHistory` payloads one per fetch; once the
/// queue is exhausted every fetch returns an empty payload, like a backend
/// with no new samples.
struct ScriptedBackend {
    channels: i64,
    batches: Mutex<VecDeque<StatusHistory>>,
    fetch_log: Mutex<Vec<(usize, Option<f64>)>>,
    settings: Mutex<PumpSettings>,
    cleared: Mutex<Vec<usize>>,
}

impl ScriptedBackend {
    fn new(channels: i64) -> Self {
        Self {
            channels,
            batches: Mutex::new(VecDeque::new()),
            fetch_log: Mutex::new(Vec::new()),
            settings: Mutex::new(PumpSettings {
                name: "test plant".to_string(),
                ..Default::default()
            }),
            cleared: Mutex::new(Vec::new()),
        }
    }

    fn push_batch(&self, history: StatusHistory) {
        self.batches.lock().unwrap().push_back(history);
    }

    fn fetch_log(&self) -> Vec<(usize, Option<f64>)> {
        self.fetch_log.lock().unwrap().clone()
    }
}

impl Transport for ScriptedBackend {
    fn fetch_since(
        &self,
        channel: usize,
        earliest_epoch_s: Option<f64>,
    ) -> BoxFuture<'_, WaterResult<StatusHistory>> {
        async move {
            self.fetch_log.lock().unwrap().push((channel, earliest_epoch_s));
            if channel == 0 {
                if let Some(history) = self.batches.lock().unwrap().pop_front() {
                    return Ok(history);
                }
            }
            Ok(StatusHistory::default())
        }
        .boxed()
    }

    fn fetch_settings(&self, _channel: usize) -> BoxFuture<'_, WaterResult<PumpSettings>> {
        async move { Ok(self.settings.lock().unwrap().clone()) }.boxed()
    }

    fn write_settings(
        &self,
        _channel: usize,
        settings: &PumpSettings,
    ) -> BoxFuture<'_, WaterResult<PumpSettings>> {
        // The real backend sanitizes what it stores; emulate that with a
        // setpoint clamp so the confirmed echo can differ from the request.
        let mut accepted = settings.clone();
        accepted.feedback_setpoint_pcnt = accepted.feedback_setpoint_pcnt.clamp(0.0, 100.0);
        async move {
            *self.settings.lock().unwrap() = accepted.clone();
            Ok(accepted)
        }
        .boxed()
    }

    fn clear_history(&self, channel: usize) -> BoxFuture<'_, WaterResult<()>> {
        async move {
            self.cleared.lock().unwrap().push(channel);
            Ok(())
        }
        .boxed()
    }

    fn num_channels(&self) -> BoxFuture<'_, WaterResult<i64>> {
        async move { Ok(self.channels) }.boxed()
    }

    fn connect_info(&self) -> BoxFuture<'_, WaterResult<String>> {
        async move { Ok("scripted backend".to_string()) }.boxed()
    }
}

/// Receives one hub emission, failing the run instead of hanging forever.
async fn recv<T: Clone>(rx: &mut broadcast::Receiver<T>) -> anyhow::Result<T> {
    Ok(tokio::time::timeout(Duration::from_secs(2), rx.recv()).await??)
}

fn pump_history(samples: &[(f64, bool)]) -> StatusHistory {
    StatusHistory {
        pump_running: samples.iter().map(|&(_, v)| v).collect(),
        pump_running_epoch_time: samples.iter().map(|&(t, _)| t).collect(),
        rel_humidity_pcnt: samples.iter().map(|_| 55.0).collect(),
        rel_humidity_pcnt_epoch_time: samples.iter().map(|&(t, _)| t).collect(),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("--- Starting Dashboard Pipeline Tests ---");

    let backend = Arc::new(ScriptedBackend::new(2));
    backend.push_batch(pump_history(&[(1.0, false), (2.0, false)]));
    backend.push_batch(pump_history(&[(3.0, true), (4.0, true)]));
    backend.push_batch(pump_history(&[(5.0, false)]));

    // --- TEST 1: Registry resolution ---
    println!("\n[Test 1] Resolving channel registry...");
    let registry = ChannelRegistry::resolve(backend.as_ref()).await?;
    assert_eq!(registry.count(), 2);
    println!("✅ Backend announced {} channels", registry.count());

    // --- TEST 2: Scheduler merges batches and compresses the pump track ---
    println!("\n[Test 2] Streaming three scripted batches through channel 0...");
    let status = StatusService::new(
        Arc::clone(&backend) as Arc<dyn Transport>,
        &registry,
        StatusServiceConfig {
            poll_interval: Duration::from_millis(20),
            reset_batch_limit: 3,
        },
    );
    let mut rx = status.subscribe(0)?;
    status.start_streaming();
    status.start_streaming(); // second start must not add pollers

    let first = recv(&mut rx).await?;
    assert_eq!(first.series.pump_track.len(), 1);
    let second = recv(&mut rx).await?;
    assert_eq!(second.series.pump_track.len(), 2);
    let third = recv(&mut rx).await?;

    // Equal-valued runs collapse to one entry carrying the latest timestamp.
    let track: Vec<(bool, f64)> = third
        .series
        .pump_track
        .iter()
        .map(|run| (run.running, run.epoch_s))
        .collect();
    assert_eq!(track, vec![(false, 2.0), (true, 4.0), (false, 5.0)]);
    assert_eq!(third.series.rel_humidity_pcnt.len(), 5);
    println!("✅ Pump track compressed to {:?}", track);

    // --- TEST 3: Reset policy cleared the channel after batch 3 ---
    println!("\n[Test 3] Checking history reset after the batch threshold...");
    let fourth = recv(&mut rx).await?;
    assert!(fourth.series.pump_track.is_empty());
    assert_eq!(fourth.series.batches_received, 1);
    println!("✅ Channel restarted from an empty series after the reset");

    // --- TEST 4: Watermark discipline ---
    println!("\n[Test 4] Inspecting the fetch log...");
    status.stop_streaming();
    status.stop_streaming(); // idempotent
    let log: Vec<_> = backend.fetch_log().into_iter().filter(|&(ch, _)| ch == 0).collect();
    assert_eq!(log[0].1, None, "first fetch requests full history");
    assert!(log[1].1.is_some() && log[2].1.is_some());
    assert!(log[1].1 <= log[2].1, "watermark never decreases");
    assert_eq!(log[3].1, None, "fetch after the reset requests full history");
    println!("✅ Watermarks: {:?}", log.iter().map(|&(_, w)| w).collect::<Vec<_>>());

    // --- TEST 5: Settings refresh and write/confirm cycle ---
    println!("\n[Test 5] Settings round through the hub...");
    let settings = SettingsService::new(Arc::clone(&backend) as Arc<dyn Transport>, &registry);
    let mut settings_rx = settings.subscribe(1)?;

    settings.refresh(1).await?;
    let fetched = recv(&mut settings_rx).await?;
    assert_eq!(fetched.name, "test plant");

    let mut wanted = (*fetched).clone();
    wanted.feedback_setpoint_pcnt = 142.0; // out of range on purpose
    settings.write(1, &wanted).await?;

    // The hub emits the server-confirmed echo, then the refetched state.
    let echoed = recv(&mut settings_rx).await?;
    assert_eq!(echoed.feedback_setpoint_pcnt, 100.0);
    let refetched = recv(&mut settings_rx).await?;
    assert_eq!(refetched.feedback_setpoint_pcnt, 100.0);
    println!("✅ Server clamped the setpoint to {}", echoed.feedback_setpoint_pcnt);

    // --- TEST 6: Explicit clear reaches both sides ---
    println!("\n[Test 6] Clearing channel 0 history...");
    let mut rx2 = status.subscribe(0)?;
    status.clear_history(0).await?;
    let cleared = recv(&mut rx2).await?;
    assert!(cleared.series.is_empty());
    assert_eq!(*backend.cleared.lock().unwrap(), vec![0]);
    println!("✅ Local state emptied and the backend was told");

    println!("\n--- All Tests Passed Successfully ---");
    Ok(())
}
