//! # Persistence Module
//!
//! ## Why This Module Exists
//! Defines the configuration data model for Comboscope and its on-disk
//! representation. All tunables the core pipeline consumes (deadzones, time
//! windows, history caps, display caps, feature toggles) live here together
//! with the notation tables (direction table, dash map, gesture templates)
//! and the display preferences (button labels and colors).
//!
//! ## Key Abstractions
//! - **Type-Safe Serialization**: strongly-typed structs with serde, stored
//!   as one TOML file under the user's config directory
//! - **Fail-Safe Defaults**: every type carries defaults matching the
//!   original overlay behavior, so a missing or damaged config file never
//!   prevents startup
//! - **Read-Only Core**: the pipeline receives resolved values (detector
//!   settings, grouping settings, frame policy) derived from [`Tunables`];
//!   it never performs persistence itself

pub mod config_portal;

pub use config_portal::{ConfigPortal, ConfigResult, PortalAction};

use crate::device::runtime::FramePolicy;
use crate::notation::buffer::GroupingSettings;
use crate::notation::detector::{default_gestures, DashTable, DetectorSettings, GestureTemplate};
use crate::notation::direction::{DirectionResolver, DirectionTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Core pipeline tunables, hot-reloadable through the settings UI.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Tunables {
    /// Minimum stick deflection before an axis counts as directional input.
    pub axis_deadzone: f32,
    /// Half-width of the band around each discrete hat-switch level.
    pub hat_tolerance: f32,
    /// Analog value above which a trigger counts as pressed.
    pub trigger_threshold: f32,
    /// Max time between the two taps of a dash.
    pub dash_window_ms: u64,
    /// How long to wait for follow-up inputs before closing a display line.
    pub conjunction_window_ms: u64,
    /// Direction history length kept for motion matching.
    pub direction_history_cap: usize,
    /// Recognize quarter-circles and other configured gestures.
    pub enable_motion_inputs: bool,
    /// Show the neutral marker for releases and returns to center.
    pub show_neutrals: bool,
    /// Reopen a just-closed line when input arrives right after its flush.
    pub enable_retraction: bool,
    /// Poll rate in Hz; 0 polls uncapped.
    pub target_poll_hz: u32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            axis_deadzone: 0.7,
            hat_tolerance: 0.1,
            trigger_threshold: 0.5,
            dash_window_ms: 300,
            conjunction_window_ms: 50,
            direction_history_cap: 8,
            enable_motion_inputs: false,
            show_neutrals: true,
            enable_retraction: false,
            target_poll_hz: 60,
        }
    }
}

impl Tunables {
    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            dash_window: chrono::Duration::milliseconds(self.dash_window_ms as i64),
            history_cap: self.direction_history_cap,
            motions_enabled: self.enable_motion_inputs,
        }
    }

    pub fn grouping_settings(&self) -> GroupingSettings {
        GroupingSettings {
            conjunction_window: chrono::Duration::milliseconds(self.conjunction_window_ms as i64),
            retraction: self.enable_retraction,
        }
    }

    pub fn conjunction_window_std(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.conjunction_window_ms)
    }

    pub fn frame_policy(&self) -> FramePolicy {
        FramePolicy {
            trigger_threshold: self.trigger_threshold,
            show_neutrals: self.show_neutrals,
        }
    }

    pub fn direction_resolver(&self, tables: &NotationTables) -> DirectionResolver {
        DirectionResolver::new(
            tables.directions.clone(),
            self.axis_deadzone,
            self.hat_tolerance,
        )
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        if self.target_poll_hz == 0 {
            // Uncapped still needs a yield point; 1 kHz is far above any
            // display rate.
            std::time::Duration::from_millis(1)
        } else {
            std::time::Duration::from_secs_f64(1.0 / self.target_poll_hz as f64)
        }
    }
}

/// The symbol tables the pipeline matches and emits against.
///
/// Fixed for the process lifetime; editing these means editing the config
/// file, not the settings UI.
#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct NotationTables {
    pub directions: DirectionTable,
    pub dashes: DashTable,
    pub gestures: Vec<GestureTemplate>,
}

impl Default for NotationTables {
    fn default() -> Self {
        Self {
            directions: DirectionTable::default(),
            dashes: DashTable::default(),
            gestures: default_gestures(),
        }
    }
}

/// Rendering style for one button token.
///
/// Colors are RGB tuples rather than a color-library type so the config file
/// stays plain and maps directly onto egui's Color32.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ButtonStyle {
    pub label: String,
    pub color: (u8, u8, u8),
}

/// Display preferences consumed by the renderer only.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Maximum number of history lines kept on screen.
    pub max_lines: usize,
    /// Separator between simultaneous inputs.
    pub separator: String,
    /// Show the age (in poll ticks) of the newest line.
    pub show_frame_age: bool,
    /// Per-button label and color overrides.
    pub button_styles: HashMap<String, ButtonStyle>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let style = |label: &str, color: (u8, u8, u8)| ButtonStyle {
            label: label.to_string(),
            color,
        };
        let mut button_styles = HashMap::new();
        button_styles.insert("A".to_string(), style("A", (50, 205, 50)));
        button_styles.insert("B".to_string(), style("B", (220, 20, 60)));
        button_styles.insert("X".to_string(), style("X", (65, 105, 225)));
        button_styles.insert("Y".to_string(), style("Y", (255, 215, 0)));
        button_styles.insert("LB".to_string(), style("LB", (128, 128, 128)));
        button_styles.insert("RB".to_string(), style("RB", (128, 128, 128)));
        button_styles.insert("LT".to_string(), style("LT", (105, 105, 105)));
        button_styles.insert("RT".to_string(), style("RT", (105, 105, 105)));

        Self {
            max_lines: 20,
            separator: "+".to_string(),
            show_frame_age: true,
            button_styles,
        }
    }
}

/// Complete application configuration as stored on disk.
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct AppConfig {
    pub tunables: Tunables,
    pub display: DisplayConfig,
    pub notation: NotationTables,
}
