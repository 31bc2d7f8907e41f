//! Application coordinator for a foreground run.
//!
//! Acquires the instance lock, loads the configuration, detects the display
//! backend, wires up signals and the config watcher, then hands everything to
//! [`Core`] until shutdown.
//!
//! ```no_run
//! use eyeshade::Eyeshade;
//!
//! # fn main() -> anyhow::Result<()> {
//! Eyeshade::new(false).with_log_file(Some("eyeshade.log".into())).run()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::{self, Config};
use crate::core::{Core, CoreParams};
use crate::io::{lock, signals::setup_signal_handler};
use crate::logger::Log;
use crate::platform;
use crate::time_source::RealTimeSource;

pub struct Eyeshade {
    debug_enabled: bool,
    log_file: Option<String>,
}

impl Eyeshade {
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            log_file: None,
        }
    }

    /// Mirror log output into `path`
    pub fn with_log_file(mut self, path: Option<String>) -> Self {
        self.log_file = path;
        self
    }

    pub fn run(self) -> Result<()> {
        Log::set_debug(self.debug_enabled);
        let _log_guard = match self.log_file.clone() {
            Some(path) => Some(
                Log::start_file_logging(path.clone())
                    .with_context(|| format!("Failed to open log file {path}"))?,
            ),
            None => None,
        };

        log_version!();
        if self.debug_enabled {
            log_pipe!();
            log_debug!("Debug mode enabled");
        }

        let lock = match lock::acquire_lock() {
            Ok(guard) => guard,
            Err(e) => {
                log_pipe!();
                log_error!("{e:#}");
                log_end!();
                return Err(e);
            }
        };

        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                log_error_exit!("Configuration failed");
                eprintln!("{e:?}");
                return Err(e);
            }
        };

        let platform = platform::detect().context("No usable display backend")?;

        let signal_state = setup_signal_handler()?;

        if let Err(e) = config::start_config_watcher(signal_state.signal_sender.clone()) {
            log_pipe!();
            log_warning!("Config file watching unavailable: {e}");
            log_indented!("Hot reload disabled, send SIGUSR2 to reload manually");
        }

        log_block_start!("Lock acquired, starting eyeshade...");

        let core = Core::new(CoreParams {
            platform,
            config,
            signal_state,
            time_source: Arc::new(RealTimeSource),
            lock: Some(lock),
        });
        core.run()
    }
}
