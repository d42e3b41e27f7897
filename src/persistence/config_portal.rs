//! # Configuration Portal - Central Configuration Management Hub
//!
//! Thread-safe access point for all application configuration. Each
//! configuration section is wrapped in its own `Arc<RwLock<T>>` so the UI,
//! the poller and the grouper can read concurrently while settings edits
//! stay atomic per section.
//!
//! ## Action/Result Pattern
//! Instead of direct method access, operations go through a single dispatch
//! method taking a [`PortalAction`] and returning a [`ConfigResult`]:
//! - **Uniform error handling**: every operation uses the same retry logic
//! - **Centralized locking**: one implementation handles lock contention
//! - **Extensibility**: new operations are new enum variants
//!
//! ## Lock Contention Handling
//! The `try_lock!` macro retries a contended lock 5 times with 10ms delays
//! and then fails with a timeout error instead of blocking indefinitely.
//! Contention is logged so it shows up during debugging.
//!
//! ## Persistence
//! The portal also owns the TOML file under the user's config directory:
//! [`ConfigPortal::ensure_default_config`] writes the defaults on first run,
//! [`ConfigPortal::load`] reads it back (degrading to defaults on damage),
//! and [`ConfigPortal::save_to_disk`] serializes the current sections.

use crate::persistence::{AppConfig, DisplayConfig, NotationTables, Tunables};
use crate::try_lock;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Central hub for all application configuration data.
#[derive(Default, Debug)]
pub struct ConfigPortal {
    /// Core pipeline tunables (deadzones, windows, toggles)
    pub tunables: Arc<RwLock<Tunables>>,

    /// Display preferences (line cap, separator, button styles)
    pub display: Arc<RwLock<DisplayConfig>>,

    /// Notation tables (directions, dashes, gesture templates)
    pub notation: Arc<RwLock<NotationTables>>,
}

impl ConfigPortal {
    pub fn new(config: AppConfig) -> Self {
        Self {
            tunables: Arc::new(RwLock::new(config.tunables)),
            display: Arc::new(RwLock::new(config.display)),
            notation: Arc::new(RwLock::new(config.notation)),
        }
    }

    /// Path of the configuration file, `<config dir>/comboscope/config.toml`.
    pub fn config_path() -> Result<PathBuf, Error> {
        let base = dirs::config_dir().ok_or(Error::NoConfigDir)?;
        Ok(base.join("comboscope").join("config.toml"))
    }

    /// Writes a default configuration file if none exists yet.
    pub fn ensure_default_config() -> Result<PathBuf, Error> {
        let path = Self::config_path()?;
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(&AppConfig::default())?;
        std::fs::write(&path, text)?;
        info!("Wrote default configuration to {}", path.display());
        Ok(path)
    }

    /// Loads the configuration file into a new portal.
    ///
    /// A missing file yields the defaults; a file that fails to parse is
    /// kept on disk but also yields the defaults, so a damaged config never
    /// prevents startup.
    pub fn load() -> Result<Self, Error> {
        let path = Self::ensure_default_config()?;
        let text = std::fs::read_to_string(&path)?;
        let config = match toml::from_str::<AppConfig>(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Configuration at {} is damaged ({}), using defaults",
                    path.display(),
                    e
                );
                AppConfig::default()
            }
        };
        Ok(Self::new(config))
    }

    /// Current configuration as one serializable value.
    pub fn snapshot(&self) -> AppConfig {
        let tunables = match self.execute_portal_action(PortalAction::GetTunables) {
            ConfigResult::Tunables(t) => t,
            _ => Tunables::default(),
        };
        let display = match self.execute_portal_action(PortalAction::GetDisplay) {
            ConfigResult::Display(d) => d,
            _ => DisplayConfig::default(),
        };
        let notation = match self.execute_portal_action(PortalAction::GetNotation) {
            ConfigResult::Notation(n) => n,
            _ => NotationTables::default(),
        };
        AppConfig {
            tunables,
            display,
            notation,
        }
    }

    /// Serializes the current sections back to the config file.
    pub fn save_to_disk(&self) -> Result<(), Error> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(&self.snapshot())?;
        std::fs::write(&path, text)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Executes configuration operations through the unified action
    /// dispatch, with retry-based locking behind the `try_lock!` macro.
    pub fn execute_portal_action(&self, action: PortalAction) -> ConfigResult {
        let result = match action {
            PortalAction::GetTunables => {
                try_lock!(@read_lock_retry, self.tunables.clone(), |guard: &Tunables| {
                    ConfigResult::Tunables(guard.clone())
                })
            }
            PortalAction::WriteTunables(tunables) => {
                try_lock!(@write_lock_retry, self.tunables.clone(), |guard: &mut Tunables| {
                    *guard = tunables;
                })
            }
            PortalAction::GetDisplay => {
                try_lock!(@read_lock_retry, self.display.clone(), |guard: &DisplayConfig| {
                    ConfigResult::Display(guard.clone())
                })
            }
            PortalAction::WriteDisplay(display) => {
                try_lock!(@write_lock_retry, self.display.clone(), |guard: &mut DisplayConfig| {
                    *guard = display;
                })
            }
            PortalAction::GetNotation => {
                try_lock!(@read_lock_retry, self.notation.clone(), |guard: &NotationTables| {
                    ConfigResult::Notation(guard.clone())
                })
            }
            PortalAction::WriteNotation(notation) => {
                try_lock!(@write_lock_retry, self.notation.clone(), |guard: &mut NotationTables| {
                    *guard = notation;
                })
            }
        };

        match result {
            Ok(res) => res,
            Err(e) => ConfigResult::Failed(e),
        }
    }
}

/// Enumeration of all configuration operations.
///
/// Read operations carry no data and return it through [`ConfigResult`];
/// write operations take owned data for thread safety.
#[derive(Debug)]
pub enum PortalAction {
    GetTunables,
    WriteTunables(Tunables),
    GetDisplay,
    WriteDisplay(DisplayConfig),
    GetNotation,
    WriteNotation(NotationTables),
}

/// Type-safe return values for configuration operations.
#[derive(Debug)]
pub enum ConfigResult {
    Success,
    Tunables(Tunables),
    Display(DisplayConfig),
    Notation(NotationTables),
    Failed(Error),
}

/// Lock retry macro with timeout and logging.
///
/// Retries a contended section lock up to 5 times with 10ms delays, then
/// fails with [`Error::LockTimeout`] rather than blocking or panicking.
/// Read operations return their closure's result; write operations mutate
/// in place and report [`ConfigResult::Success`].
#[macro_export]
macro_rules! try_lock {
    // Write lock retry with timeout and error handling
    (@write_lock_retry, $accessor:expr, $operation:expr) => {{
        let mut attempts = 0;
        const MAX_ATTEMPTS: usize = 5;

        loop {
            match $accessor.try_write() {
                Ok(mut guard) => {
                    $operation(&mut *guard);
                    break Ok($crate::persistence::config_portal::ConfigResult::Success);
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        "Write lock blocked: {} (attempt {}/{})",
                        e,
                        attempts,
                        MAX_ATTEMPTS
                    );

                    if attempts >= MAX_ATTEMPTS {
                        break Err($crate::persistence::config_portal::Error::LockTimeout);
                    }

                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }
    }};

    // Read lock retry with timeout and error handling
    (@read_lock_retry, $accessor:expr, $operation:expr) => {{
        let mut attempts = 0;
        const MAX_ATTEMPTS: usize = 5;

        loop {
            match $accessor.try_read() {
                Ok(guard) => {
                    let result = $operation(&*guard);
                    break Ok(result);
                }
                Err(e) => {
                    attempts += 1;
                    tracing::warn!(
                        "Read lock blocked: {} (attempt {}/{})",
                        e,
                        attempts,
                        MAX_ATTEMPTS
                    );

                    if attempts >= MAX_ATTEMPTS {
                        break Err($crate::persistence::config_portal::Error::LockTimeout);
                    }

                    std::thread::sleep(std::time::Duration::from_millis(10));
                }
            }
        }
    }};
}

/// Error types for configuration portal operations.
///
/// Lock timeouts indicate contention and are recoverable; filesystem and
/// serialization errors surface the underlying cause. None of these are
/// treated as fatal by callers - the portal degrades to defaults instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not acquire lock after maximum retry attempts")]
    LockTimeout,

    #[error("No user configuration directory available")]
    NoConfigDir,

    #[error("Configuration file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_read_back_written_sections() {
        let portal = ConfigPortal::new(AppConfig::default());

        let mut tunables = Tunables::default();
        tunables.show_neutrals = false;
        tunables.dash_window_ms = 200;
        let result = portal.execute_portal_action(PortalAction::WriteTunables(tunables.clone()));
        assert!(matches!(result, ConfigResult::Success));

        match portal.execute_portal_action(PortalAction::GetTunables) {
            ConfigResult::Tunables(read) => assert_eq!(read, tunables),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn snapshot_reflects_section_state() {
        let portal = ConfigPortal::new(AppConfig::default());

        let mut display = DisplayConfig::default();
        display.max_lines = 5;
        portal.execute_portal_action(PortalAction::WriteDisplay(display));

        let snapshot = portal.snapshot();
        assert_eq!(snapshot.display.max_lines, 5);
        assert_eq!(snapshot.notation.directions.entries().len(), 9);
    }
}
