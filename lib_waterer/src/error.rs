use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure classes of the dashboard core.
///
/// Nothing here is fatal to the process: polling failures are retried on the
/// next tick, one-shot actions hand the error back to the caller exactly once.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend request did not complete. The core never interprets the
    /// detail; it is carried only for the log line.
    #[error("backend request failed: {0}")]
    Transport(String),

    /// The backend announced a channel count the core cannot build state for.
    #[error("backend announced an invalid channel count: {0}")]
    InvalidChannelCount(i64),

    /// A channel index outside the registry's `0..count` range.
    #[error("channel {channel} out of range (count: {count})")]
    ChannelOutOfRange { channel: usize, count: usize },
}

impl Error {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Error::Transport(err.to_string())
    }
}
