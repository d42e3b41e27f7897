//! Device subsystem: controller mappings, polled snapshots and per-device
//! runtime state.
//!
//! 1. [`mapping`] - static controller-family descriptions and the
//!    connect-time selection heuristic
//! 2. [`snapshot`] - one non-blocking read of a device's buttons and axes
//! 3. [`runtime`] - previous/current state per device plus the registry
//!    with explicit connect/disconnect transitions

pub mod mapping;
pub mod runtime;
pub mod snapshot;

pub use mapping::{DeviceMapping, DpadLayout, MappingHint};
pub use runtime::{DeviceRegistry, DeviceRuntime, FramePolicy};
pub use snapshot::{ButtonSnapshot, DeviceSnapshot};
