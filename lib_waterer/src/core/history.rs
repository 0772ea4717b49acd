//! Per-channel time-series state, watermark and reset policy.

use crate::model::Sample;

/// One entry of the run-length-compressed pump track.
///
/// `epoch_s` is the time of the *latest* sample seen with this value; it is
/// extended in place while consecutive samples repeat the value, so the track
/// grows with state changes, not with polls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpRun {
    pub running: bool,
    pub epoch_s: f64,
}

impl PumpRun {
    pub fn new(running: bool, epoch_s: f64) -> Self {
        Self { running, epoch_s }
    }
}

/// Display-ready buffers for one channel, owned exclusively by that channel's
/// merger/hub pair. Mutated only on scheduler deliveries or explicit clear.
#[derive(Debug, Clone, Default)]
pub struct ChannelSeries {
    pub rel_humidity_v: Vec<Sample<f64>>,
    pub rel_humidity_pcnt: Vec<Sample<f64>>,
    pub smoothed_rel_humidity_pcnt: Vec<Sample<f64>>,
    pub pump_track: Vec<PumpRun>,
    /// Successful merges since the last reset.
    pub batches_received: u32,
    /// Last request time handed to the backend; `None` requests full history.
    pub watermark: Option<f64>,
}

impl ChannelSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rel_humidity_v.is_empty()
            && self.rel_humidity_pcnt.is_empty()
            && self.smoothed_rel_humidity_pcnt.is_empty()
            && self.pump_track.is_empty()
    }

    /// Hard cutover: drops every buffer, zeroes the counter and sets the
    /// watermark back to "request full history". Idempotent.
    pub fn clear(&mut self) {
        self.rel_humidity_v.clear();
        self.rel_humidity_pcnt.clear();
        self.smoothed_rel_humidity_pcnt.clear();
        self.pump_track.clear();
        self.batches_received = 0;
        self.watermark = None;
    }

    /// Applies the history reset policy after a successful merge.
    ///
    /// Once `limit` batches have accumulated the whole channel state is
    /// cleared so the next fetch re-requests full history. A gap in the
    /// rendered series is acceptable; unbounded growth is not.
    pub fn apply_reset_policy(&mut self, limit: u32) -> bool {
        if self.batches_received >= limit {
            log::info!("history reset after {} batches", self.batches_received);
            self.clear();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_on_empty_state_is_a_noop() {
        let mut series = ChannelSeries::new();
        series.clear();

        assert!(series.is_empty());
        assert_eq!(series.batches_received, 0);
        assert_eq!(series.watermark, None);
    }

    #[test]
    fn reset_policy_fires_only_at_limit() {
        let mut series = ChannelSeries::new();
        series.rel_humidity_v.push(Sample::new(1.0, 0.5));
        series.watermark = Some(1.0);

        series.batches_received = 2;
        assert!(!series.apply_reset_policy(3));
        assert!(!series.is_empty());
        assert_eq!(series.watermark, Some(1.0));

        series.batches_received = 3;
        assert!(series.apply_reset_policy(3));
        assert!(series.is_empty());
        assert_eq!(series.batches_received, 0);
        assert_eq!(series.watermark, None);
    }
}
