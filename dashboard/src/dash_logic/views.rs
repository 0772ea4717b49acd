//! Console views: the subscriber side of the hubs.
//!
//! Each view is an independent task holding its own receiver; it renders
//! whatever the hub emits and never mutates the shared snapshots. Stands in
//! for the chart/settings-form UI, which is out of scope.

use std::sync::Arc;

use lib_waterer::{PumpSettings, SettingsService, StatusService, StatusSnapshot};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub fn spawn_status_view(service: &StatusService, channel: usize) -> JoinHandle<()> {
    let mut rx = match service.subscribe(channel) {
        Ok(rx) => rx,
        Err(err) => {
            log::error!("status view for channel {} not started: {}", channel, err);
            return tokio::spawn(async {});
        }
    };

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(snapshot) => render_status(&snapshot),
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("channel {}: status view lagged, skipped {} snapshot(s)", channel, missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

pub fn spawn_settings_view(service: &SettingsService, channel: usize) -> JoinHandle<()> {
    let mut rx = match service.subscribe(channel) {
        Ok(rx) => rx,
        Err(err) => {
            log::error!("settings view for channel {} not started: {}", channel, err);
            return tokio::spawn(async {});
        }
    };

    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(settings) => render_settings(channel, &settings),
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("channel {}: settings view lagged, skipped {} update(s)", channel, missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn render_status(snapshot: &Arc<StatusSnapshot>) {
    let series = &snapshot.series;

    let humidity = series
        .rel_humidity_pcnt
        .last()
        .map(|s| format!("{:.1} %", s.value))
        .unwrap_or_else(|| "n/a".to_string());
    let pump = series
        .pump_track
        .last()
        .map(|run| if run.running { "on" } else { "off" })
        .unwrap_or("n/a");

    log::info!(
        "channel {}: humidity {} | pump {} | {} point(s), {} transition(s), batch #{}",
        snapshot.channel,
        humidity,
        pump,
        series.rel_humidity_pcnt.len(),
        series.pump_track.len(),
        series.batches_received
    );
}

fn render_settings(channel: usize, settings: &Arc<PumpSettings>) {
    log::info!(
        "channel {} settings: '{}' dry {:.2} V / wet {:.2} V, feedback {} @ {:.0} %",
        channel,
        settings.name,
        settings.dry_humidity_v,
        settings.wet_humidity_v,
        if settings.feedback_active { "on" } else { "off" },
        settings.feedback_setpoint_pcnt
    );
}
