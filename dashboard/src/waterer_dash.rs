use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;

use lib_waterer::{
    BackendClient, ChannelRegistry, SettingsService, StatusService, StatusServiceConfig, Transport,
};

mod dash_logic;
use dash_logic::{config, logger, views};

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    logger::setup_logging(
        config.log_dir.as_deref().unwrap_or(Path::new("./logs")),
        config.log_level.as_deref().unwrap_or("info"),
    )?;

    let backend_url = config
        .backend_url
        .clone()
        .unwrap_or_else(|| "http://127.0.0.1:5000/".to_string());
    let transport: Arc<dyn Transport> = Arc::new(BackendClient::new(&backend_url)?);

    match transport.connect_info().await {
        Ok(banner) => log::info!("Connected to {}: {}", backend_url, banner),
        Err(e) => log::warn!("Backend at {} not reachable yet: {}", backend_url, e),
    }

    let registry = resolve_registry(
        transport.as_ref(),
        Duration::from_secs(config.registry_retry_seconds.unwrap_or(5)),
    )
    .await;
    log::info!("Backend reports {} channel(s)", registry.count());

    let service_config = StatusServiceConfig {
        poll_interval: Duration::from_secs(config.poll_interval_seconds.unwrap_or(5)),
        reset_batch_limit: config.reset_batch_limit.unwrap_or(1000),
    };
    let status = Arc::new(StatusService::new(
        Arc::clone(&transport),
        &registry,
        service_config,
    ));
    let settings = Arc::new(SettingsService::new(Arc::clone(&transport), &registry));

    let mut view_handles = Vec::new();
    for channel in registry.channels() {
        view_handles.push(views::spawn_status_view(&status, channel));
        view_handles.push(views::spawn_settings_view(&settings, channel));
    }

    for channel in registry.channels() {
        if let Err(e) = settings.refresh(channel).await {
            log::warn!("Initial settings fetch for channel {} failed: {}", channel, e);
        }
    }

    status.start_streaming();

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut term_signal = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();
                term_signal.recv().await;
                log::info!("SIGTERM received, initiating shutdown.");
            }
            #[cfg(not(unix))]
            {
                // On non-unix platforms, just wait forever.
                std::future::pending::<()>().await;
            }
        } => {}
    }

    status.stop_streaming();
    for handle in view_handles {
        handle.abort();
    }

    log::info!("Shutdown complete.");
    Ok(())
}

// The dashboard is useless without a channel count, so keep asking until the
// backend answers with a usable one.
async fn resolve_registry(transport: &dyn Transport, retry_delay: Duration) -> ChannelRegistry {
    loop {
        match ChannelRegistry::resolve(transport).await {
            Ok(registry) => return registry,
            Err(e) => {
                log::warn!(
                    "Channel count unavailable ({}), retrying in {:?}",
                    e,
                    retry_delay
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}
