//! Runtime pipeline: gamepad polling and display grouping.
//!
//! Implements a two-task pipeline behind a single handle:
//!
//! 1. [`poller`] - fixed-rate gamepad polling, device registry and per-tick
//!    token composition
//! 2. [`grouper`] - the shared output buffer with its deferred-flush timer
//! 3. [`pipeline_handle`] - unified spawn API and lifecycle management
//!
//! # Architecture
//!
//! ```text
//! Gamepads ──► InputPoller ──► DeviceFrame ──► NotationGrouper ──► DisplayEvent
//!               (gilrs)         (mpsc)          (buffer+timer)       (mpsc)
//! ```

pub mod grouper;
pub mod pipeline_handle;
pub mod poller;

pub use grouper::{GrouperError, GrouperHandle};
pub use pipeline_handle::{PipelineError, PipelineHandle};
pub use poller::{PollerError, PollerHandle, PollerStatus};

/// One device's non-empty token set for one poll tick.
#[derive(Clone, Debug)]
pub struct DeviceFrame {
    /// Backend id of the originating device, for logging only; all devices
    /// share one output buffer.
    pub device: String,
    pub tokens: Vec<String>,
    pub tick: u64,
}
