//! Comboscope - live fighting-game input notation for gamepads.
//!
//! Polls connected controllers each frame, normalizes D-pad/stick state into
//! compass directions, detects dashes and special-move motions against a timed
//! history, and groups the resulting symbolic tokens into a scrolling display
//! history.
//!
//! # Architecture
//!
//! ```text
//! Gamepads ──► Poller ──► DeviceRuntime ──► Grouper ──► DisplayEvent ──► UI
//!             (gilrs)   (resolve/detect/     (buffer +
//!                         compose tokens)     flush timer)
//! ```

pub mod device;
pub mod notation;
pub mod persistence;
pub mod pipeline;
pub mod ui;
