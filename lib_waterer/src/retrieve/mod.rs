//! Backend transport boundary.
//!
//! The core consumes the backend exclusively through the [`Transport`] trait;
//! the `reqwest`-based implementation lives in [`backend_http`]. Failures
//! cross this boundary only as an opaque [`Error::Transport`]: the core
//! retries or reports, it never interprets.
//!
//! [`Error::Transport`]: crate::error::Error::Transport

pub mod backend_http;

pub use backend_http::BackendClient;

use futures_util::future::BoxFuture;

use crate::error::Result;
use crate::model::{PumpSettings, StatusHistory};

/// The collaborator contract implemented outside the core.
///
/// Methods return boxed futures so the trait stays object-safe; the scheduler
/// and hubs hold an `Arc<dyn Transport>` and tests substitute a scripted one.
pub trait Transport: Send + Sync {
    /// Samples newer than `earliest_epoch_s` for one channel.
    /// `None` requests full history.
    fn fetch_since(
        &self,
        channel: usize,
        earliest_epoch_s: Option<f64>,
    ) -> BoxFuture<'_, Result<StatusHistory>>;

    /// Current server-side settings for one channel.
    fn fetch_settings(&self, channel: usize) -> BoxFuture<'_, Result<PumpSettings>>;

    /// Writes settings and returns the server-confirmed echo.
    fn write_settings(
        &self,
        channel: usize,
        settings: &PumpSettings,
    ) -> BoxFuture<'_, Result<PumpSettings>>;

    /// Drops the backend's own status log for one channel.
    fn clear_history(&self, channel: usize) -> BoxFuture<'_, Result<()>>;

    /// The channel count as announced by the backend, unvalidated.
    fn num_channels(&self) -> BoxFuture<'_, Result<i64>>;

    /// Human-readable connection banner from the backend root endpoint.
    fn connect_info(&self) -> BoxFuture<'_, Result<String>>;
}
