//! Scripted in-memory transport for exercising the core without a backend.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::{Error, Result};
use crate::model::{PumpSettings, StatusHistory};
use crate::retrieve::Transport;

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    announced_channels: i64,
    /// Per-channel queue of canned poll outcomes; an exhausted queue answers
    /// with an empty batch so pollers keep ticking.
    batches: Mutex<HashMap<usize, VecDeque<Result<StatusHistory>>>>,
    /// Server-side settings store; writes clamp the setpoint like the real
    /// backend so the echo can differ from the submitted object.
    settings: Mutex<HashMap<usize, PumpSettings>>,
    fail_next_settings_fetch: Mutex<bool>,
    fail_clear: Mutex<bool>,
    /// Every `fetch_since` call as (channel, watermark), in arrival order.
    pub(crate) fetch_log: Mutex<Vec<(usize, Option<f64>)>>,
    pub(crate) cleared_channels: Mutex<Vec<usize>>,
}

impl ScriptedTransport {
    pub(crate) fn new(announced_channels: i64) -> Self {
        Self {
            announced_channels,
            ..Default::default()
        }
    }

    pub(crate) fn push_batch(&self, channel: usize, history: StatusHistory) {
        self.batches
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push_back(Ok(history));
    }

    pub(crate) fn push_failure(&self, channel: usize) {
        self.batches
            .lock()
            .unwrap()
            .entry(channel)
            .or_default()
            .push_back(Err(Error::Transport("scripted failure".into())));
    }

    pub(crate) fn set_settings(&self, channel: usize, settings: PumpSettings) {
        self.settings.lock().unwrap().insert(channel, settings);
    }

    pub(crate) fn fail_next_settings_fetch(&self) {
        *self.fail_next_settings_fetch.lock().unwrap() = true;
    }

    pub(crate) fn fail_clear(&self) {
        *self.fail_clear.lock().unwrap() = true;
    }

    pub(crate) fn fetch_count(&self) -> usize {
        self.fetch_log.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn fetch_since(
        &self,
        channel: usize,
        earliest_epoch_s: Option<f64>,
    ) -> BoxFuture<'_, Result<StatusHistory>> {
        self.fetch_log
            .lock()
            .unwrap()
            .push((channel, earliest_epoch_s));
        let scripted = self
            .batches
            .lock()
            .unwrap()
            .get_mut(&channel)
            .and_then(|queue| queue.pop_front());
        async move {
            match scripted {
                Some(outcome) => outcome,
                None => Ok(StatusHistory::default()),
            }
        }
        .boxed()
    }

    fn fetch_settings(&self, channel: usize) -> BoxFuture<'_, Result<PumpSettings>> {
        let mut fail = self.fail_next_settings_fetch.lock().unwrap();
        let outcome = if *fail {
            *fail = false;
            Err(Error::Transport("scripted settings failure".into()))
        } else {
            Ok(self
                .settings
                .lock()
                .unwrap()
                .get(&channel)
                .cloned()
                .unwrap_or_default())
        };
        async move { outcome }.boxed()
    }

    fn write_settings(
        &self,
        channel: usize,
        settings: &PumpSettings,
    ) -> BoxFuture<'_, Result<PumpSettings>> {
        let mut confirmed = settings.clone();
        confirmed.feedback_setpoint_pcnt = confirmed.feedback_setpoint_pcnt.clamp(0.0, 100.0);
        self.settings
            .lock()
            .unwrap()
            .insert(channel, confirmed.clone());
        async move { Ok(confirmed) }.boxed()
    }

    fn clear_history(&self, channel: usize) -> BoxFuture<'_, Result<()>> {
        let mut fail = self.fail_clear.lock().unwrap();
        let outcome = if *fail {
            *fail = false;
            Err(Error::Transport("scripted clear failure".into()))
        } else {
            self.cleared_channels.lock().unwrap().push(channel);
            Ok(())
        };
        async move { outcome }.boxed()
    }

    fn num_channels(&self) -> BoxFuture<'_, Result<i64>> {
        let announced = self.announced_channels;
        async move { Ok(announced) }.boxed()
    }

    fn connect_info(&self) -> BoxFuture<'_, Result<String>> {
        async move { Ok("scripted backend".to_string()) }.boxed()
    }
}
