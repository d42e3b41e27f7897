use color_eyre::{eyre::eyre, Result};
use comboscope::persistence::config_portal::{ConfigPortal, ConfigResult, PortalAction};
use comboscope::persistence::{NotationTables, Tunables};
use comboscope::pipeline::PipelineHandle;
use comboscope::ui::ComboscopeUI;
use eframe::egui;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    info!("Loading configuration");
    let config_portal = Arc::new(
        ConfigPortal::load().map_err(|e| eyre!("Failed to load configuration: {}", e))?,
    );

    let tunables = match config_portal.execute_portal_action(PortalAction::GetTunables) {
        ConfigResult::Tunables(tunables) => tunables,
        _ => Tunables::default(),
    };
    let tables = match config_portal.execute_portal_action(PortalAction::GetNotation) {
        ConfigResult::Notation(tables) => tables,
        _ => NotationTables::default(),
    };

    // Settings edits in the UI are broadcast to both pipeline tasks.
    let (settings_sender, settings_receiver) = watch::channel(tunables);

    let cancel = CancellationToken::new();

    info!("Starting notation pipeline");
    let (pipeline, display_receiver) =
        PipelineHandle::spawn(tables, settings_receiver, cancel.clone())
            .map_err(|e| eyre!("Failed to spawn pipeline: {}", e))?;

    let tick_receiver = pipeline.subscribe_tick();
    let status_receiver = pipeline.subscribe_status();

    info!("Starting UI");
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = egui::ViewportBuilder::default()
        .with_title("Comboscope")
        .with_inner_size(egui::vec2(480.0, 720.0))
        .with_always_on_top();

    let ui_result = eframe::run_native(
        "Comboscope",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(ComboscopeUI::new(
                cc,
                display_receiver,
                tick_receiver,
                status_receiver,
                config_portal,
                settings_sender,
            )))
        }),
    );

    info!("UI closed, shutting down pipeline");
    cancel.cancel();

    ui_result.map_err(|e| eyre!("UI error: {}", e))?;
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
