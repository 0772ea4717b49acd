//! Channel registry: resolves how many pump channels exist.
//!
//! Every other component is parameterized by this count, so an invalid
//! announcement (zero or negative) is a reportable anomaly. The caller must
//! not build per-channel state until a valid count arrives.

use crate::error::{Error, Result};
use crate::retrieve::Transport;

#[derive(Debug, Clone, Copy)]
pub struct ChannelRegistry {
    count: usize,
}

impl ChannelRegistry {
    /// Asks the backend for its channel count and validates it.
    pub async fn resolve(transport: &dyn Transport) -> Result<Self> {
        let announced = transport.num_channels().await?;
        Self::from_announced(announced)
    }

    /// Validates an announced count without touching the transport.
    pub fn from_announced(announced: i64) -> Result<Self> {
        if announced <= 0 {
            log::error!("backend announced invalid channel count: {}", announced);
            return Err(Error::InvalidChannelCount(announced));
        }
        log::info!("backend announced {} channel(s)", announced);
        Ok(Self {
            count: announced as usize,
        })
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Channel identifiers, fixed for process lifetime.
    pub fn channels(&self) -> std::ops::Range<usize> {
        0..self.count
    }

    pub fn check(&self, channel: usize) -> Result<()> {
        if channel >= self.count {
            return Err(Error::ChannelOutOfRange {
                channel,
                count: self.count,
            });
        }
        Ok(())
    }
}
