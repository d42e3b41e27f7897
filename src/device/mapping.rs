//! Static controller-family descriptions and the connect-time heuristic.
//!
//! Two mappings cover the supported hardware: the standard layout (XInput and
//! modern DirectInput devices exposing the common button order) and a
//! fallback for older DirectInput controllers that report the D-pad as a
//! single hat-switch axis. The mapping is selected once when a device
//! connects and never changes afterwards.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Axis slots 0-5 hold the sticks and triggers; extras (hat axes) follow.
pub const STANDARD_AXIS_COUNT: usize = 6;

/// Where a device's D-pad shows up in the snapshot.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub enum DpadLayout {
    /// Four dedicated buttons.
    Buttons {
        up: usize,
        down: usize,
        left: usize,
        right: usize,
    },
    /// One multi-position axis with discrete levels per direction.
    HatAxis {
        axis: usize,
        positions: Vec<HatPosition>,
    },
}

/// One discrete hat-switch level and the direction vector it encodes.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct HatPosition {
    pub level: f32,
    pub dx: i8,
    pub dy: i8,
}

/// Mapping-type hint reported by the backend at connect time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MappingHint {
    /// The backend recognized the device and applies the standard layout.
    Standard,
    /// No known layout; heuristics decide.
    Unknown,
}

/// Immutable description of a controller family.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DeviceMapping {
    name: String,
    /// Display name per button index.
    buttons: Vec<String>,
    dpad: DpadLayout,
    /// Button indices whose pressed state comes from the analog value.
    trigger_buttons: Vec<usize>,
}

impl DeviceMapping {
    /// Standard layout: face buttons, bumpers, analog triggers, D-pad as
    /// four buttons at indices 12-15.
    pub fn standard() -> Self {
        Self {
            name: "standard".to_string(),
            buttons: [
                "A", "B", "X", "Y", "LB", "RB", "LT", "RT", "Back", "Start", "LS", "RS", "Up",
                "Down", "Left", "Right",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            dpad: DpadLayout::Buttons {
                up: 12,
                down: 13,
                left: 14,
                right: 15,
            },
            trigger_buttons: vec![6, 7],
        }
    }

    /// Older DirectInput pads: D-pad on a hat axis appended after the
    /// standard axis slots, with the usual ladder of discrete levels from
    /// -1.0 (up) clockwise in steps of 2/7.
    pub fn directinput_fallback() -> Self {
        let ladder = |step: i32, dx: i8, dy: i8| HatPosition {
            level: -1.0 + step as f32 * (2.0 / 7.0),
            dx,
            dy,
        };
        Self {
            name: "directinput-fallback".to_string(),
            buttons: [
                "A", "B", "X", "Y", "LB", "RB", "LT", "RT", "Back", "Start", "LS", "RS",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            dpad: DpadLayout::HatAxis {
                axis: STANDARD_AXIS_COUNT,
                positions: vec![
                    ladder(0, 0, -1),  // up
                    ladder(1, 1, -1),  // up-right
                    ladder(2, 1, 0),   // right
                    ladder(3, 1, 1),   // down-right
                    ladder(4, 0, 1),   // down
                    ladder(5, -1, 1),  // down-left
                    ladder(6, -1, 0),  // left
                    ladder(7, -1, -1), // up-left
                ],
            },
            trigger_buttons: vec![6, 7],
        }
    }

    /// Connect-time selection. Unrecognized devices only get the fallback
    /// when they actually expose an extra (hat) axis; everything else
    /// defaults to the standard mapping, which is never fatal.
    pub fn select(hint: MappingHint, axis_count: usize) -> Self {
        match hint {
            MappingHint::Standard => {
                info!("Device uses standard mapping");
                Self::standard()
            }
            MappingHint::Unknown if axis_count > STANDARD_AXIS_COUNT => {
                info!(
                    "Unrecognized device with {} axes, using DirectInput fallback",
                    axis_count
                );
                Self::directinput_fallback()
            }
            MappingHint::Unknown => {
                info!("Unrecognized device, defaulting to standard mapping");
                Self::standard()
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dpad(&self) -> &DpadLayout {
        &self.dpad
    }

    pub fn button_name(&self, index: usize) -> Option<&str> {
        self.buttons.get(index).map(|s| s.as_str())
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn is_dpad_button(&self, index: usize) -> bool {
        match &self.dpad {
            DpadLayout::Buttons {
                up,
                down,
                left,
                right,
            } => index == *up || index == *down || index == *left || index == *right,
            DpadLayout::HatAxis { .. } => false,
        }
    }

    pub fn is_trigger_button(&self, index: usize) -> bool {
        self.trigger_buttons.contains(&index)
    }

    pub fn hat_axis_index(&self) -> Option<usize> {
        match &self.dpad {
            DpadLayout::HatAxis { axis, .. } => Some(*axis),
            DpadLayout::Buttons { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_hint_always_selects_standard() {
        let mapping = DeviceMapping::select(MappingHint::Standard, 12);
        assert_eq!(mapping.name(), "standard");
    }

    #[test]
    fn unknown_with_extra_axes_selects_fallback() {
        let mapping = DeviceMapping::select(MappingHint::Unknown, STANDARD_AXIS_COUNT + 1);
        assert_eq!(mapping.name(), "directinput-fallback");
        assert_eq!(mapping.hat_axis_index(), Some(STANDARD_AXIS_COUNT));
    }

    #[test]
    fn unknown_without_extra_axes_defaults_to_standard() {
        let mapping = DeviceMapping::select(MappingHint::Unknown, STANDARD_AXIS_COUNT);
        assert_eq!(mapping.name(), "standard");
    }

    #[test]
    fn standard_dpad_indices_are_flagged() {
        let mapping = DeviceMapping::standard();
        for idx in 12..16 {
            assert!(mapping.is_dpad_button(idx));
        }
        assert!(!mapping.is_dpad_button(0));
        assert!(mapping.is_trigger_button(6));
        assert!(!mapping.is_trigger_button(4));
    }

    #[test]
    fn fallback_ladder_covers_eight_directions() {
        let mapping = DeviceMapping::directinput_fallback();
        let DpadLayout::HatAxis { positions, .. } = mapping.dpad() else {
            panic!("fallback must use a hat axis");
        };
        assert_eq!(positions.len(), 8);
        assert_eq!((positions[0].dx, positions[0].dy), (0, -1));
        assert!((positions[7].level - 1.0).abs() < 1e-6);
    }
}
