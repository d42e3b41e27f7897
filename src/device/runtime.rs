//! Per-device runtime state and the device registry.
//!
//! Each connected controller owns a `DeviceRuntime`: its selected mapping,
//! the previous snapshot, and the pattern-detector history. One call to
//! [`DeviceRuntime::process`] handles one poll tick: resolve directions,
//! feed the detector on a change, derive press/release edges and compose the
//! frame's token set, then commit the snapshot as previous.
//!
//! The registry makes the connect/disconnect lifecycle explicit: runtimes
//! are created on connect, dropped on disconnect, and a reused device id is
//! rebuilt from scratch so no history leaks across sessions.

use crate::device::mapping::DeviceMapping;
use crate::device::snapshot::DeviceSnapshot;
use crate::notation::detector::PatternDetector;
use crate::notation::direction::DirectionResolver;
use crate::notation::frame::{compose_frame, FrameSignals};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::{debug, info};

/// Frame-level tunables applied uniformly to all devices.
#[derive(Clone, Debug)]
pub struct FramePolicy {
    pub trigger_threshold: f32,
    pub show_neutrals: bool,
}

impl Default for FramePolicy {
    fn default() -> Self {
        Self {
            trigger_threshold: 0.5,
            show_neutrals: true,
        }
    }
}

/// Press/release edges between two snapshots.
#[derive(Debug, Default)]
struct FrameEdges {
    any_new_press: bool,
    any_new_release: bool,
    pressed_buttons: Vec<String>,
}

/// Runtime state for one connected controller.
#[derive(Clone, Debug)]
pub struct DeviceRuntime {
    mapping: DeviceMapping,
    previous: DeviceSnapshot,
    detector: PatternDetector,
}

impl DeviceRuntime {
    pub fn new(mapping: DeviceMapping, detector: PatternDetector, shape: &DeviceSnapshot) -> Self {
        let previous = DeviceSnapshot::resting(shape.buttons.len(), shape.axes.len());
        Self {
            mapping,
            previous,
            detector,
        }
    }

    pub fn mapping(&self) -> &DeviceMapping {
        &self.mapping
    }

    pub fn detector_mut(&mut self) -> &mut PatternDetector {
        &mut self.detector
    }

    /// Processes one poll tick and returns the frame's token set (possibly
    /// empty when no qualifying edge occurred).
    pub fn process(
        &mut self,
        current: DeviceSnapshot,
        now: DateTime<Local>,
        resolver: &DirectionResolver,
        policy: &FramePolicy,
    ) -> Vec<String> {
        let current_direction = resolver.resolve(&self.mapping, &current);
        let previous_direction = resolver.resolve(&self.mapping, &self.previous);
        let direction_changed = current_direction.num != previous_direction.num;

        let pattern = if direction_changed {
            self.detector.on_direction_change(current_direction.num, now)
        } else {
            None
        };

        let edges = self.derive_edges(&current, policy.trigger_threshold);

        let signals = FrameSignals {
            current: current_direction,
            direction_changed,
            pattern,
            any_new_press: edges.any_new_press,
            // Releases only matter when nothing was pressed this tick, so
            // rolling between buttons does not produce a spurious neutral.
            qualifying_release: !edges.any_new_press && edges.any_new_release,
            pressed_buttons: edges.pressed_buttons,
            show_neutrals: policy.show_neutrals,
        };
        let tokens = compose_frame(&signals);

        self.previous = current;
        tokens
    }

    /// Pressed state of one button, with triggers judged by their analog
    /// value instead of the boolean flag.
    fn effective_pressed(&self, snapshot: &DeviceSnapshot, index: usize, threshold: f32) -> bool {
        if self.mapping.is_trigger_button(index) {
            snapshot.button_value(index) > threshold
        } else {
            snapshot.button_pressed(index)
        }
    }

    fn derive_edges(&self, current: &DeviceSnapshot, threshold: f32) -> FrameEdges {
        let mut edges = FrameEdges::default();

        for index in 0..self.mapping.button_count() {
            let was = self.effective_pressed(&self.previous, index, threshold);
            let is = self.effective_pressed(current, index, threshold);
            let directional = self.mapping.is_dpad_button(index);

            if is && !was && !directional {
                edges.any_new_press = true;
                if let Some(name) = self.mapping.button_name(index) {
                    edges.pressed_buttons.push(name.to_string());
                }
            } else if was && !is && !directional {
                edges.any_new_release = true;
            }
        }

        edges
    }
}

/// Owned runtime state per device id with explicit lifecycle transitions.
#[derive(Debug, Default)]
pub struct DeviceRegistry<K> {
    devices: HashMap<K, DeviceRuntime>,
}

impl<K: Eq + Hash + Copy + Debug> DeviceRegistry<K> {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
        }
    }

    /// Registers a device, replacing any previous runtime for the same id so
    /// a reconnect never inherits stale history or snapshots.
    pub fn connect(&mut self, id: K, runtime: DeviceRuntime) {
        if self.devices.insert(id, runtime).is_some() {
            info!("Device {:?} reconnected, runtime state reset", id);
        } else {
            info!("Device {:?} connected", id);
        }
    }

    pub fn disconnect(&mut self, id: K) {
        if self.devices.remove(&id).is_some() {
            info!("Device {:?} disconnected, runtime state discarded", id);
        } else {
            debug!("Disconnect for unknown device {:?} ignored", id);
        }
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut DeviceRuntime> {
        self.devices.get_mut(&id)
    }

    pub fn ids(&self) -> Vec<K> {
        self.devices.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn runtimes_mut(&mut self) -> impl Iterator<Item = &mut DeviceRuntime> {
        self.devices.values_mut()
    }
}
