//! # Series Merger
//!
//! Pure fold of one incoming [`SampleBatch`] into a channel's
//! [`ChannelSeries`]. No I/O, no locking, no awareness of hubs or timers:
//! the scheduler calls this synchronously while holding the channel's state,
//! which is what makes the one-in-flight-request-per-channel discipline
//! sufficient for reentrancy safety.
//!
//! Two merge policies exist, per signal kind:
//!
//! - **Continuous signals** (volts, percent, smoothed percent): plain
//!   concatenation in arrival order. No deduplication; the scheduler's
//!   watermark protocol is responsible for not re-requesting old data.
//!
//! - **Pump run-state**: run-length reduction. A raw sample either extends
//!   the timestamp of the last track entry (same value) or appends a new
//!   entry (value changed). Naively appending a point per raw sample would
//!   grow the track with every poll for a signal that rarely changes;
//!   reducing runs keeps memory and rendering cost proportional to the number
//!   of state changes while preserving transition timestamps.

use crate::core::history::{ChannelSeries, PumpRun};
use crate::model::{Sample, SampleBatch};

/// Folds `batch` into `series` and increments the received-batch counter.
///
/// Batches must be fed in watermark order per channel; that ordering is the
/// scheduler's contract, not checked here.
pub fn merge_batch(series: &mut ChannelSeries, batch: &SampleBatch) {
    series.rel_humidity_v.extend_from_slice(&batch.rel_humidity_v);
    series
        .rel_humidity_pcnt
        .extend_from_slice(&batch.rel_humidity_pcnt);
    series
        .smoothed_rel_humidity_pcnt
        .extend_from_slice(&batch.smoothed_rel_humidity_pcnt);

    merge_pump_samples(&mut series.pump_track, &batch.pump_running);

    series.batches_received += 1;
}

/// Run-length reduction of raw pump samples into the compressed track.
///
/// Invariant afterwards: no two adjacent entries share a value, and each
/// entry's timestamp is the latest raw sample time observed for its run.
/// An empty `samples` slice leaves the track untouched.
pub fn merge_pump_samples(track: &mut Vec<PumpRun>, samples: &[Sample<bool>]) {
    for sample in samples {
        match track.last_mut() {
            Some(last) if last.running == sample.value => {
                // Run continuation: extend the entry instead of appending.
                last.epoch_s = sample.epoch_s;
            }
            _ => track.push(PumpRun::new(sample.value, sample.epoch_s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bool_samples(raw: &[(f64, bool)]) -> Vec<Sample<bool>> {
        raw.iter().map(|&(t, v)| Sample::new(t, v)).collect()
    }

    fn f64_samples(raw: &[(f64, f64)]) -> Vec<Sample<f64>> {
        raw.iter().map(|&(t, v)| Sample::new(t, v)).collect()
    }

    /// The worked reconciliation scenario: two stable "off" batches collapse
    /// into one extending entry, then a multi-sample "on" run appends exactly
    /// one transition.
    #[test]
    fn pump_track_collapses_stable_runs_across_batches() {
        let mut series = ChannelSeries::new();

        let b1 = SampleBatch {
            pump_running: bool_samples(&[(1.0, false)]),
            ..Default::default()
        };
        merge_batch(&mut series, &b1);
        assert_eq!(series.pump_track, vec![PumpRun::new(false, 1.0)]);

        let b2 = SampleBatch {
            pump_running: bool_samples(&[(2.0, false)]),
            ..Default::default()
        };
        merge_batch(&mut series, &b2);
        assert_eq!(series.pump_track, vec![PumpRun::new(false, 2.0)]);

        let b3 = SampleBatch {
            pump_running: bool_samples(&[(3.0, true), (4.0, true)]),
            ..Default::default()
        };
        merge_batch(&mut series, &b3);
        assert_eq!(
            series.pump_track,
            vec![PumpRun::new(false, 2.0), PumpRun::new(true, 4.0)]
        );
        assert_eq!(series.batches_received, 3);
    }

    #[test]
    fn empty_pump_batch_leaves_track_unchanged() {
        let mut track = vec![PumpRun::new(true, 5.0)];
        merge_pump_samples(&mut track, &[]);
        assert_eq!(track, vec![PumpRun::new(true, 5.0)]);
    }

    /// Run-length invariant: however the raw samples are cut into batches,
    /// no two adjacent track entries carry the same value.
    #[test]
    fn track_never_holds_adjacent_equal_values() {
        let raw: Vec<(f64, bool)> = (0..50)
            .map(|i| (i as f64, matches!(i % 7, 0 | 1 | 4)))
            .collect();

        for chunk_size in [1, 3, 8, 50] {
            let mut track = Vec::new();
            for chunk in bool_samples(&raw).chunks(chunk_size) {
                merge_pump_samples(&mut track, chunk);
            }
            for pair in track.windows(2) {
                assert_ne!(pair[0].running, pair[1].running);
            }
        }
    }

    /// Batch boundaries must not matter: any split of the same raw sequence
    /// yields an identical final track.
    #[test]
    fn pump_track_is_independent_of_batch_boundaries() {
        let raw = bool_samples(&[
            (1.0, false),
            (2.0, false),
            (3.0, true),
            (4.0, true),
            (5.0, false),
            (6.0, true),
        ]);

        let mut whole = Vec::new();
        merge_pump_samples(&mut whole, &raw);

        for chunk_size in [1, 2, 3] {
            let mut split = Vec::new();
            for chunk in raw.chunks(chunk_size) {
                merge_pump_samples(&mut split, chunk);
            }
            assert_eq!(split, whole);
        }
    }

    /// Re-compressing an already compressed track is the identity, so the
    /// transitions it records are exactly reproducible.
    #[test]
    fn recompressing_a_track_is_identity() {
        let mut track = Vec::new();
        merge_pump_samples(
            &mut track,
            &bool_samples(&[(1.0, true), (2.0, true), (3.0, false), (9.0, true)]),
        );

        let as_samples: Vec<Sample<bool>> = track
            .iter()
            .map(|run| Sample::new(run.epoch_s, run.running))
            .collect();
        let mut recompressed = Vec::new();
        merge_pump_samples(&mut recompressed, &as_samples);

        assert_eq!(recompressed, track);
    }

    /// Concatenation invariant for the continuous signals: the merged buffer
    /// is the literal concatenation of the batches, whatever the boundaries.
    #[test]
    fn continuous_signals_concatenate_across_batch_splits() {
        let raw: Vec<(f64, f64)> = (0..20).map(|i| (i as f64, i as f64 * 0.1)).collect();
        let all = f64_samples(&raw);

        let mut reference = ChannelSeries::new();
        merge_batch(
            &mut reference,
            &SampleBatch {
                rel_humidity_v: all.clone(),
                rel_humidity_pcnt: all.clone(),
                smoothed_rel_humidity_pcnt: all.clone(),
                ..Default::default()
            },
        );

        for chunk_size in [1, 4, 7] {
            let mut series = ChannelSeries::new();
            for chunk in all.chunks(chunk_size) {
                merge_batch(
                    &mut series,
                    &SampleBatch {
                        rel_humidity_v: chunk.to_vec(),
                        rel_humidity_pcnt: chunk.to_vec(),
                        smoothed_rel_humidity_pcnt: chunk.to_vec(),
                        ..Default::default()
                    },
                );
            }
            assert_eq!(series.rel_humidity_v, reference.rel_humidity_v);
            assert_eq!(series.rel_humidity_pcnt, reference.rel_humidity_pcnt);
            assert_eq!(
                series.smoothed_rel_humidity_pcnt,
                reference.smoothed_rel_humidity_pcnt
            );
        }
    }

    /// Signals of different lengths in one batch merge independently.
    #[test]
    fn signals_merge_independently() {
        let mut series = ChannelSeries::new();
        merge_batch(
            &mut series,
            &SampleBatch {
                rel_humidity_v: f64_samples(&[(1.0, 0.5), (2.0, 0.6)]),
                pump_running: bool_samples(&[(1.5, true)]),
                ..Default::default()
            },
        );

        assert_eq!(series.rel_humidity_v.len(), 2);
        assert!(series.rel_humidity_pcnt.is_empty());
        assert!(series.smoothed_rel_humidity_pcnt.is_empty());
        assert_eq!(series.pump_track, vec![PumpRun::new(true, 1.5)]);
    }
}
