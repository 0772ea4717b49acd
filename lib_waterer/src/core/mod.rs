//! # Reconciliation Core
//!
//! The heart of the dashboard: everything between the raw backend transport
//! and the subscribing views lives here.
//!
//! ## Components:
//!
//! - **`registry`**: resolves the channel count at startup and validates it;
//!   every other component is parameterized by this count.
//!
//! - **`merger`**: pure fold of an incoming sample batch into the per-channel
//!   buffers, including the run-length reduction of the pump track.
//!
//! - **`history`**: the per-channel series state itself (watermark,
//!   received-batch counter) and the hard-cutover reset policy that bounds
//!   memory for long-lived sessions.
//!
//! - **`hub`**: the multicast point. One upstream poller per channel, any
//!   number of downstream subscribers, each receiving every emission exactly
//!   once in arrival order.
//!
//! - **`scheduler`**: the per-channel polling loops driving the pipeline
//!   tick → fetch → merge → broadcast, with indefinite retry and atomic
//!   stop across channels.
//!
//! - **`settings`**: the request/response twin of the status path, driven by
//!   explicit refresh instead of a timer.

pub mod history;
pub mod hub;
pub mod merger;
pub mod registry;
pub mod scheduler;
pub mod settings;
