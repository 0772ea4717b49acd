//! Settings flow: the request/response twin of the status path.
//!
//! Same hub shape as the status side, but driven by explicit calls instead of
//! a timer, and each emission replaces the previous value rather than
//! accumulating a series. After every successful write the server is
//! re-queried so subscribers always end on server-confirmed state, never on
//! an optimistic local object.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::core::hub::Hub;
use crate::core::registry::ChannelRegistry;
use crate::error::{Error, Result};
use crate::model::PumpSettings;
use crate::retrieve::Transport;

pub struct SettingsService {
    transport: Arc<dyn Transport>,
    hubs: Vec<Hub<PumpSettings>>,
}

impl SettingsService {
    pub fn new(transport: Arc<dyn Transport>, registry: &ChannelRegistry) -> Self {
        let hubs = registry.channels().map(|_| Hub::new()).collect();
        Self { transport, hubs }
    }

    pub fn subscribe(&self, channel: usize) -> Result<broadcast::Receiver<Arc<PumpSettings>>> {
        Ok(self.hub(channel)?.subscribe())
    }

    /// Fetches the channel's current settings and emits them. Errors are
    /// handed back once to the caller; nothing is emitted on failure.
    pub async fn refresh(&self, channel: usize) -> Result<()> {
        let hub = self.hub(channel)?;
        let settings = self.transport.fetch_settings(channel).await?;
        hub.publish(settings);
        Ok(())
    }

    /// Writes settings and emits the server-confirmed echo, then triggers a
    /// fresh fetch (which emits again) per the explicit-refresh contract.
    pub async fn write(&self, channel: usize, settings: &PumpSettings) -> Result<()> {
        let hub = self.hub(channel)?;
        let confirmed = self.transport.write_settings(channel, settings).await?;
        if confirmed != *settings {
            log::info!("channel {}: server adjusted the submitted settings", channel);
        }
        hub.publish(confirmed);
        self.refresh(channel).await
    }

    fn hub(&self, channel: usize) -> Result<&Hub<PumpSettings>> {
        self.hubs.get(channel).ok_or(Error::ChannelOutOfRange {
            channel,
            count: self.hubs.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedTransport;

    fn service(transport: Arc<ScriptedTransport>) -> SettingsService {
        let registry = ChannelRegistry::from_announced(2).unwrap();
        SettingsService::new(transport, &registry)
    }

    #[tokio::test]
    async fn refresh_emits_fetched_settings() {
        let transport = Arc::new(ScriptedTransport::new(2));
        transport.set_settings(
            1,
            PumpSettings {
                name: "mint".into(),
                ..Default::default()
            },
        );

        let svc = service(Arc::clone(&transport));
        let mut rx = svc.subscribe(1).unwrap();

        svc.refresh(1).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().name, "mint");
    }

    #[tokio::test]
    async fn write_emits_server_echo_then_refetches() {
        let transport = Arc::new(ScriptedTransport::new(2));
        let svc = service(Arc::clone(&transport));
        let mut rx = svc.subscribe(1).unwrap();

        // The scripted server clamps the setpoint, so the echo differs from
        // what was submitted.
        let submitted = PumpSettings {
            feedback_setpoint_pcnt: 142.0,
            ..Default::default()
        };
        svc.write(1, &submitted).await.unwrap();

        let echo = rx.recv().await.unwrap();
        assert_eq!(echo.feedback_setpoint_pcnt, 100.0);

        let refetched = rx.recv().await.unwrap();
        assert_eq!(*refetched, *echo);
    }

    #[tokio::test]
    async fn failed_refresh_emits_nothing() {
        let transport = Arc::new(ScriptedTransport::new(2));
        transport.fail_next_settings_fetch();

        let svc = service(Arc::clone(&transport));
        let mut rx = svc.subscribe(0).unwrap();

        assert!(svc.refresh(0).await.is_err());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn unknown_channel_is_rejected() {
        let transport = Arc::new(ScriptedTransport::new(2));
        let svc = service(transport);
        assert!(matches!(
            svc.refresh(7).await,
            Err(Error::ChannelOutOfRange { channel: 7, count: 2 })
        ));
    }
}
