//! Settings menu for tunables and button styling.
//!
//! Edits work on local copies; the Apply button writes them through the
//! configuration portal, persists to disk and broadcasts the tunables to
//! the pipeline over the watch channel.

use crate::persistence::config_portal::{ConfigPortal, ConfigResult, PortalAction};
use crate::persistence::{DisplayConfig, Tunables};
use eframe::egui::{self, Color32, DragValue, Frame, Slider, Stroke, TextEdit, Ui};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use super::common::{self, UiColors};

pub struct SettingsMenuData {
    config_portal: Arc<ConfigPortal>,
    settings_sender: watch::Sender<Tunables>,
    tunables: Tunables,
    display: DisplayConfig,
    status_line: Option<String>,
}

impl SettingsMenuData {
    pub fn new(config_portal: Arc<ConfigPortal>, settings_sender: watch::Sender<Tunables>) -> Self {
        let tunables = match config_portal.execute_portal_action(PortalAction::GetTunables) {
            ConfigResult::Tunables(tunables) => tunables,
            _ => Tunables::default(),
        };
        let display = match config_portal.execute_portal_action(PortalAction::GetDisplay) {
            ConfigResult::Display(display) => display,
            _ => DisplayConfig::default(),
        };

        Self {
            config_portal,
            settings_sender,
            tunables,
            display,
            status_line: None,
        }
    }

    pub fn display_config(&self) -> DisplayConfig {
        self.display.clone()
    }

    /// Renders the menu; returns true when the user applied changes.
    pub fn render(&mut self, ui: &mut Ui) -> bool {
        let mut applied = false;

        ui.vertical(|ui| {
            let section_spacing = 5.0;

            self.render_general_section(ui);
            ui.add_space(section_spacing);
            self.render_timing_section(ui);
            ui.add_space(section_spacing);
            self.render_button_section(ui);
            ui.add_space(section_spacing);

            ui.horizontal(|ui| {
                if ui.button("Apply").clicked() {
                    applied = self.apply();
                }
                if ui.button("Reset to defaults").clicked() {
                    self.tunables = Tunables::default();
                    self.display = DisplayConfig::default();
                    applied = self.apply();
                }
                if let Some(status) = &self.status_line {
                    ui.label(status);
                }
            });
        });

        applied
    }

    fn apply(&mut self) -> bool {
        self.config_portal
            .execute_portal_action(PortalAction::WriteTunables(self.tunables.clone()));
        self.config_portal
            .execute_portal_action(PortalAction::WriteDisplay(self.display.clone()));

        if let Err(e) = self.settings_sender.send(self.tunables.clone()) {
            error!("Failed to broadcast tunables to pipeline: {}", e);
        }

        match self.config_portal.save_to_disk() {
            Ok(_) => {
                info!("Settings applied and saved");
                self.status_line = Some("Saved".to_string());
            }
            Err(e) => {
                error!("Failed to save settings: {}", e);
                self.status_line = Some(format!("Save failed: {}", e));
            }
        }
        true
    }

    fn render_general_section(&mut self, ui: &mut Ui) {
        Frame::new()
            .stroke(Stroke::new(1.0, UiColors::BORDER))
            .fill(UiColors::MAIN_BG)
            .inner_margin(8.0)
            .outer_margin(2.0)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.heading("General");

                    ui.checkbox(&mut self.tunables.show_neutrals, "Show neutrals");
                    ui.checkbox(
                        &mut self.tunables.enable_motion_inputs,
                        "Recognize motion inputs (quarter-circles)",
                    );
                    ui.checkbox(
                        &mut self.tunables.enable_retraction,
                        "Merge into just-closed lines (retraction)",
                    );

                    ui.horizontal(|ui| {
                        ui.label("History lines:");
                        ui.add(
                            DragValue::new(&mut self.display.max_lines)
                                .speed(1)
                                .range(1..=100),
                        );
                    });
                });
            });
    }

    fn render_timing_section(&mut self, ui: &mut Ui) {
        Frame::new()
            .stroke(Stroke::new(1.0, UiColors::BORDER))
            .fill(UiColors::MAIN_BG)
            .inner_margin(8.0)
            .outer_margin(2.0)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.heading("Timing");

                    ui.horizontal(|ui| {
                        ui.label("Stick deadzone:");
                        ui.add(Slider::new(&mut self.tunables.axis_deadzone, 0.0..=0.95));
                    });

                    ui.horizontal(|ui| {
                        ui.label("Trigger threshold:");
                        ui.add(Slider::new(&mut self.tunables.trigger_threshold, 0.05..=0.95));
                    });

                    ui.horizontal(|ui| {
                        ui.label("Dash window (ms):");
                        ui.add(
                            DragValue::new(&mut self.tunables.dash_window_ms)
                                .speed(5)
                                .range(50..=1000),
                        );
                    });

                    ui.horizontal(|ui| {
                        ui.label("Conjunction window (ms):");
                        ui.add(
                            DragValue::new(&mut self.tunables.conjunction_window_ms)
                                .speed(5)
                                .range(10..=500),
                        );
                    });

                    ui.horizontal(|ui| {
                        ui.label("Poll rate (Hz, 0 = uncapped):");
                        ui.add(
                            DragValue::new(&mut self.tunables.target_poll_hz)
                                .speed(1)
                                .range(0..=1000),
                        );
                    });
                });
            });
    }

    fn render_button_section(&mut self, ui: &mut Ui) {
        Frame::new()
            .stroke(Stroke::new(1.0, UiColors::BORDER))
            .fill(UiColors::MAIN_BG)
            .inner_margin(8.0)
            .outer_margin(2.0)
            .show(ui, |ui| {
                ui.vertical(|ui| {
                    ui.heading("Buttons");

                    let mut names: Vec<String> =
                        self.display.button_styles.keys().cloned().collect();
                    names.sort();

                    egui::Grid::new("button_style_grid")
                        .num_columns(4)
                        .spacing([8.0, 4.0])
                        .show(ui, |ui| {
                            ui.label("Preview");
                            ui.label("Btn");
                            ui.label("Label");
                            ui.label("Color");
                            ui.end_row();

                            for name in names {
                                let Some(style) = self.display.button_styles.get_mut(&name) else {
                                    continue;
                                };

                                common::badge(ui, &style.label, common::rgb(style.color));
                                ui.label(&name);
                                ui.add(
                                    TextEdit::singleline(&mut style.label).desired_width(60.0),
                                );

                                let mut rgb = [style.color.0, style.color.1, style.color.2];
                                if ui.color_edit_button_srgb(&mut rgb).changed() {
                                    style.color = (rgb[0], rgb[1], rgb[2]);
                                }
                                ui.end_row();
                            }
                        });

                    ui.label(
                        egui::RichText::new(
                            "Direction and dash glyphs are fixed in the config file",
                        )
                        .size(11.0)
                        .color(Color32::from_rgb(120, 120, 120)),
                    );
                });
            });
    }
}
