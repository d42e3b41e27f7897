//! # Comboscope User Interface Module
//!
//! The egui overlay rendering the scrolling notation history. The UI is a
//! pure consumer of the pipeline: it drains display events from the grouper,
//! keeps the capped line history, and shows connection status from the
//! poller. All interpretation happens upstream; this module only draws.
//!
//! ## Layout
//! - **Top panel**: connection status and the current poll tick
//! - **Central panel**: notation history, newest line first, with the age
//!   (in poll ticks) of the newest line
//! - **Settings window**: toggled with Tab, edits the shared configuration
//!   and broadcasts tunables to the pipeline
//!
//! ## Display contract
//! The grouper emits `Line` events to prepend and `Retract` events that take
//! back the most recent line (the retraction variant of the grouping
//! policy). Lines beyond the configured cap are evicted here, not upstream.

pub mod common;
pub mod settings_menu;

use crate::notation::buffer::{DisplayEvent, DisplayLine};
use crate::notation::TokenClasses;
use crate::persistence::config_portal::{ConfigPortal, ConfigResult, PortalAction};
use crate::persistence::{DisplayConfig, NotationTables, Tunables};
use crate::pipeline::PollerStatus;
use eframe::egui::{self, RichText};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use self::common::UiColors;
use self::settings_menu::SettingsMenuData;

/// Main overlay application state.
pub struct ComboscopeUI {
    /// Display events from the grouper
    display_receiver: mpsc::Receiver<DisplayEvent>,

    /// Poll tick broadcast, for the age counter on the newest line
    tick_receiver: watch::Receiver<u64>,

    /// Connection status from the poller
    status_receiver: watch::Receiver<PollerStatus>,

    /// Displayed history, newest line first
    history: VecDeque<DisplayLine>,

    /// Token classification for glyph styling
    classes: TokenClasses,

    /// Local copy of the display preferences
    display: DisplayConfig,

    settings_menu_data: SettingsMenuData,
    show_settings: bool,
}

impl ComboscopeUI {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        display_receiver: mpsc::Receiver<DisplayEvent>,
        tick_receiver: watch::Receiver<u64>,
        status_receiver: watch::Receiver<PollerStatus>,
        config_portal: Arc<ConfigPortal>,
        settings_sender: watch::Sender<Tunables>,
    ) -> Self {
        cc.egui_ctx.set_theme(egui::Theme::Dark);

        let display = match config_portal.execute_portal_action(PortalAction::GetDisplay) {
            ConfigResult::Display(display) => display,
            _ => DisplayConfig::default(),
        };
        let tables = match config_portal.execute_portal_action(PortalAction::GetNotation) {
            ConfigResult::Notation(tables) => tables,
            _ => NotationTables::default(),
        };
        let classes =
            TokenClasses::from_tables(&tables.directions, &tables.dashes, &tables.gestures);

        ComboscopeUI {
            display_receiver,
            tick_receiver,
            status_receiver,
            history: VecDeque::new(),
            classes,
            display,
            settings_menu_data: SettingsMenuData::new(config_portal, settings_sender),
            show_settings: false,
        }
    }

    /// Drains pending display events into the capped history.
    fn drain_display_events(&mut self) {
        while let Ok(event) = self.display_receiver.try_recv() {
            match event {
                DisplayEvent::Line(line) => {
                    debug!("Displaying line with {} group(s)", line.groups.len());
                    self.history.push_front(line);
                    while self.history.len() > self.display.max_lines {
                        self.history.pop_back();
                    }
                }
                DisplayEvent::Retract => {
                    debug!("Retracting most recent line");
                    self.history.pop_front();
                }
            }
        }
    }

    fn render_history(&mut self, ui: &mut egui::Ui) {
        let current_tick = *self.tick_receiver.borrow();

        egui::ScrollArea::vertical().show(ui, |ui| {
            for (index, line) in self.history.iter().enumerate() {
                ui.horizontal(|ui| {
                    if self.display.show_frame_age && index == 0 {
                        let age = current_tick.saturating_sub(line.tick);
                        ui.label(
                            RichText::new(format!("{}", age))
                                .size(14.0)
                                .monospace()
                                .color(UiColors::FRAME_AGE),
                        );
                    }

                    let mut first = true;
                    for group in &line.groups {
                        for token in group.tokens() {
                            if !first {
                                ui.label(
                                    RichText::new(&self.display.separator)
                                        .size(16.0)
                                        .color(UiColors::SEPARATOR),
                                );
                            }
                            first = false;
                            common::token_glyph(ui, token, &self.classes, &self.display);
                        }
                    }
                });
                ui.add_space(2.0);
            }
        });
    }
}

impl eframe::App for ComboscopeUI {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_display_events();

        if ctx.input(|i| i.key_pressed(egui::Key::Tab)) {
            self.show_settings = !self.show_settings;
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.ctx().request_repaint_after(Duration::from_millis(33));

            // Top status panel
            egui::TopBottomPanel::top("top_panel")
                .show_separator_line(false)
                .show_inside(ui, |ui| {
                    ui.horizontal_centered(|ui| {
                        let status = self.status_receiver.borrow().clone();
                        let connection_status = if status.connected > 0 { "🟢" } else { "🔴" };
                        ui.label(format!(
                            "{} {} controller(s)",
                            connection_status, status.connected
                        ));
                        if status.connected == 0 {
                            ui.label("Connect a controller and press any button");
                        }
                        ui.with_layout(
                            egui::Layout::right_to_left(egui::Align::Center),
                            |ui| {
                                ui.label(
                                    RichText::new("Tab: settings")
                                        .size(12.0)
                                        .color(UiColors::SEPARATOR),
                                );
                            },
                        );
                    });
                });

            // Central history panel
            egui::CentralPanel::default().show_inside(ui, |ui| {
                self.render_history(ui);
            });
        });

        if self.show_settings {
            let mut open = self.show_settings;
            egui::Window::new("Settings")
                .open(&mut open)
                .default_width(420.0)
                .show(ctx, |ui| {
                    if self.settings_menu_data.render(ui) {
                        // Applied: pick up the new display preferences.
                        self.display = self.settings_menu_data.display_config();
                        while self.history.len() > self.display.max_lines {
                            self.history.pop_back();
                        }
                    }
                });
            self.show_settings = open;
        }
    }
}
