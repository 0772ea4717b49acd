//! Wire shapes exchanged with the waterer backend and their revalidated,
//! typed counterparts.
//!
//! The backend serializes every signal as two parallel arrays (values and
//! `_epoch_time` stamps). Payloads are dynamic enough that the boundary must
//! not be trusted: optional signals may be missing entirely and value/time
//! arrays can disagree in length. Everything is normalized into a
//! [`SampleBatch`] here so the merge logic downstream only ever sees aligned,
//! typed samples.

use serde::{Deserialize, Serialize};

/// Standard `{"data": ...}` envelope the backend wraps every response in.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// One timestamped reading of a signal. Timestamps are epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<T> {
    pub epoch_s: f64,
    pub value: T,
}

impl<T> Sample<T> {
    pub fn new(epoch_s: f64, value: T) -> Self {
        Self { epoch_s, value }
    }
}

/// Raw "samples since watermark" payload for one channel, exactly as the
/// backend's `get_status_since` endpoint serializes it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusHistory {
    #[serde(default, rename = "rel_humidity_V")]
    pub rel_humidity_v: Vec<f64>,
    #[serde(default, rename = "rel_humidity_V_epoch_time")]
    pub rel_humidity_v_epoch_time: Vec<f64>,

    #[serde(default)]
    pub rel_humidity_pcnt: Vec<f64>,
    #[serde(default)]
    pub rel_humidity_pcnt_epoch_time: Vec<f64>,

    // The smoothed track is only present on newer backends; absent means empty.
    #[serde(default)]
    pub smoothed_rel_humidity_pcnt: Vec<f64>,
    #[serde(default)]
    pub smoothed_rel_humidity_pcnt_epoch_time: Vec<f64>,

    #[serde(default)]
    pub pump_running: Vec<bool>,
    #[serde(default)]
    pub pump_running_epoch_time: Vec<f64>,
}

impl StatusHistory {
    /// Revalidates the raw payload into a typed batch.
    ///
    /// Misaligned value/time arrays are a local degradation, not a failure:
    /// the signal is truncated to the shorter length with a warning and the
    /// remaining signals merge normally.
    pub fn into_batch(self, channel: usize) -> SampleBatch {
        SampleBatch {
            rel_humidity_v: zip_signal(
                channel,
                "rel_humidity_V",
                self.rel_humidity_v_epoch_time,
                self.rel_humidity_v,
            ),
            rel_humidity_pcnt: zip_signal(
                channel,
                "rel_humidity_pcnt",
                self.rel_humidity_pcnt_epoch_time,
                self.rel_humidity_pcnt,
            ),
            smoothed_rel_humidity_pcnt: zip_signal(
                channel,
                "smoothed_rel_humidity_pcnt",
                self.smoothed_rel_humidity_pcnt_epoch_time,
                self.smoothed_rel_humidity_pcnt,
            ),
            pump_running: zip_signal(
                channel,
                "pump_running",
                self.pump_running_epoch_time,
                self.pump_running,
            ),
        }
    }
}

fn zip_signal<T>(channel: usize, name: &str, times: Vec<f64>, values: Vec<T>) -> Vec<Sample<T>> {
    if times.len() != values.len() {
        log::warn!(
            "channel {}: misaligned arrays for {} ({} times, {} values); truncating",
            channel,
            name,
            times.len(),
            values.len()
        );
    }
    times
        .into_iter()
        .zip(values)
        .map(|(epoch_s, value)| Sample { epoch_s, value })
        .collect()
}

/// A validated poll's worth of new telemetry for one channel.
///
/// Signals are independent: they share neither length nor timestamps.
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    pub rel_humidity_v: Vec<Sample<f64>>,
    pub rel_humidity_pcnt: Vec<Sample<f64>>,
    pub smoothed_rel_humidity_pcnt: Vec<Sample<f64>>,
    pub pump_running: Vec<Sample<bool>>,
}

impl SampleBatch {
    pub fn is_empty(&self) -> bool {
        self.rel_humidity_v.is_empty()
            && self.rel_humidity_pcnt.is_empty()
            && self.smoothed_rel_humidity_pcnt.is_empty()
            && self.pump_running.is_empty()
    }
}

/// Per-channel configuration, opaque pass-through beyond revalidation.
///
/// Mirrors the backend's `SmartPumpSettings`; the hub re-fetches after every
/// successful write so emissions always reflect server-confirmed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpSettings {
    pub name: String,
    #[serde(rename = "dry_humidity_V")]
    pub dry_humidity_v: f64,
    #[serde(rename = "wet_humidity_V")]
    pub wet_humidity_v: f64,
    pub pump_on_time_s: f64,
    pub pump_update_time_s: f64,
    pub feedback_active: bool,
    pub feedback_setpoint_pcnt: f64,
    pub num_smoothing_samples: u32,
}

impl Default for PumpSettings {
    fn default() -> Self {
        // Mirrors the backend's default_pump_config.json
        Self {
            name: String::new(),
            dry_humidity_v: 0.0,
            wet_humidity_v: 3.3,
            pump_on_time_s: 2.0,
            pump_update_time_s: 600.0,
            feedback_active: false,
            feedback_setpoint_pcnt: 50.0,
            num_smoothing_samples: 10,
        }
    }
}
