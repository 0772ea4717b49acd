// Declare the modules to re-export
pub mod core;
pub mod error;
pub mod model;
pub mod retrieve;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export the types most callers need
pub use crate::core::history::{ChannelSeries, PumpRun};
pub use crate::core::hub::{Hub, StatusSnapshot};
pub use crate::core::registry::ChannelRegistry;
pub use crate::core::scheduler::{StatusService, StatusServiceConfig};
pub use crate::core::settings::SettingsService;
pub use error::{Error, Result};
pub use model::{PumpSettings, Sample, SampleBatch, StatusHistory};
pub use retrieve::{BackendClient, Transport};
