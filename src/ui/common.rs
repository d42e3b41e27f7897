//! # UI Common Components and Utilities
//!
//! Shared styling for the Comboscope overlay: the dark theme palette and the
//! glyph rendering helpers used by both the history view and the settings
//! menu previews. Colors are compile-time constants so the immediate-mode
//! redraw never allocates for theming.

use crate::notation::{TokenClasses, NEUTRAL_MARKER};
use crate::persistence::DisplayConfig;
use eframe::egui::{self, Color32, RichText, Ui};

/// Centralized dark theme palette.
pub struct UiColors;

impl UiColors {
    /// Primary background for main UI areas
    pub const MAIN_BG: Color32 = Color32::from_rgb(30, 30, 30);

    /// Background for nested elements
    pub const INNER_BG: Color32 = Color32::from_rgb(25, 25, 25);

    /// Border color for frames and separators
    pub const BORDER: Color32 = Color32::from_rgb(60, 60, 60);

    /// Directional glyphs (arrows, dashes, motions)
    pub const DIRECTIONAL: Color32 = Color32::from_rgb(240, 240, 240);

    /// Neutral marker
    pub const NEUTRAL: Color32 = Color32::from_rgb(170, 170, 170);

    /// Separator glyph between simultaneous inputs
    pub const SEPARATOR: Color32 = Color32::from_rgb(120, 120, 120);

    /// Frame-age counter on the newest line
    pub const FRAME_AGE: Color32 = Color32::from_rgb(110, 160, 110);

    /// Fallback for button tokens without a configured style
    pub const BUTTON_FALLBACK: Color32 = Color32::from_rgb(128, 128, 128);
}

pub fn rgb(color: (u8, u8, u8)) -> Color32 {
    Color32::from_rgb(color.0, color.1, color.2)
}

/// Text color with enough contrast against the given background, the same
/// luma split the original overlay used for its button icons.
pub fn contrast_text(background: Color32) -> Color32 {
    let luma = 0.299 * background.r() as f32
        + 0.587 * background.g() as f32
        + 0.114 * background.b() as f32;
    if luma >= 128.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

/// Renders one token as a styled glyph.
///
/// Directional tokens render as plain bright symbols; button tokens render
/// as label badges with their configured color. A token with no style falls
/// back to a plain badge rather than failing.
pub fn token_glyph(ui: &mut Ui, token: &str, classes: &TokenClasses, display: &DisplayConfig) {
    if classes.is_directional(token) {
        ui.label(
            RichText::new(token)
                .size(22.0)
                .strong()
                .color(UiColors::DIRECTIONAL),
        );
    } else if token == NEUTRAL_MARKER {
        ui.label(
            RichText::new(token)
                .size(20.0)
                .strong()
                .color(UiColors::NEUTRAL),
        );
    } else {
        let (label, color) = display
            .button_styles
            .get(token)
            .map(|style| (style.label.clone(), rgb(style.color)))
            .unwrap_or_else(|| (token.to_string(), UiColors::BUTTON_FALLBACK));
        badge(ui, &label, color);
    }
}

/// Small filled badge with a contrast-picked label color.
pub fn badge(ui: &mut Ui, label: &str, color: Color32) {
    egui::Frame::new()
        .fill(color)
        .corner_radius(egui::CornerRadius::same(10))
        .inner_margin(egui::Margin::symmetric(7, 3))
        .show(ui, |ui| {
            ui.label(
                RichText::new(label)
                    .size(16.0)
                    .strong()
                    .color(contrast_text(color)),
            );
        });
}
