//! Configuration for eyeshade, read from TOML and hot-reloaded on change.
//!
//! ## Location
//!
//! `$XDG_CONFIG_HOME/eyeshade/eyeshade.toml`, or `eyeshade.toml` inside the
//! directory passed with `--config`. A commented default file is written on
//! first start.
//!
//! ## Structure
//!
//! ```toml
//! #[Blue light filter]
//! filter_enabled = false      # Apply the color temperature filter on start
//! temperature = 4500          # Filter color temperature (1000-6500) Kelvin
//!
//! #[Screen dimming]
//! dim_enabled = false         # Darken every display on start
//! dim_level = 0               # Overlay opacity (0-200)
//!
//! #[Focus mode]
//! focus_enabled = false       # Dim everything except the active window
//! focus_dim_level = 150       # Overlay opacity (0-255)
//!
//! #[Break reminders]
//! break_enabled = false       # Start the work/break cycle on start
//! break_mode = "pomodoro"     # "pomodoro", "20-20-20" (or "twenty-twenty-twenty"), "custom"
//! work_duration = 2700        # Work phase for custom mode (seconds)
//! break_duration = 180        # Break phase for custom mode (seconds)
//! force_break = true          # Break screen cannot be skipped
//!
//! #[Sunset schedule]
//! schedule_enabled = false    # Filter between sunset and sunrise
//! latitude = 40.712800        # Geographic latitude (-90 to 90)
//! longitude = -74.006000      # Geographic longitude (-180 to 180)
//!
//! #[Displays]
//! topology_poll_interval = 3  # Seconds between display hot-plug checks (1-300)
//! ```
//!
//! Every field is optional. Missing values take the defaults in
//! [`crate::common::constants`]; out-of-range values are rejected by
//! [`validation::validate_config`] with a message naming the field.

pub mod builder;
pub mod loading;
pub mod presets;
pub mod validation;
pub mod watcher;


use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::constants::*;
use crate::session::BreakMode;

pub use builder::{create_default_config, update_config_values};
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};
pub use presets::{DisplayPreset, apply_preset, find_preset};
pub use watcher::start_config_watcher;

#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub filter_enabled: Option<bool>,
    pub temperature: Option<i32>,

    pub dim_enabled: Option<bool>,
    pub dim_level: Option<i32>,

    pub focus_enabled: Option<bool>,
    pub focus_dim_level: Option<i32>,

    pub break_enabled: Option<bool>,
    pub break_mode: Option<String>,
    /// Seconds. Only used when `break_mode = "custom"`.
    pub work_duration: Option<u32>,
    /// Seconds. Only used when `break_mode = "custom"`.
    pub break_duration: Option<u32>,
    pub force_break: Option<bool>,

    pub schedule_enabled: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub topology_poll_interval: Option<u64>, // seconds
}

impl Config {
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        load_from_path(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled.unwrap_or(false)
    }

    pub fn temperature(&self) -> i32 {
        self.temperature.unwrap_or(DEFAULT_FILTER_TEMP)
    }

    pub fn dim_enabled(&self) -> bool {
        self.dim_enabled.unwrap_or(false)
    }

    pub fn dim_level(&self) -> i32 {
        self.dim_level.unwrap_or(DEFAULT_DIM)
    }

    pub fn focus_enabled(&self) -> bool {
        self.focus_enabled.unwrap_or(false)
    }

    pub fn focus_dim_level(&self) -> i32 {
        self.focus_dim_level.unwrap_or(DEFAULT_FOCUS_DIM)
    }

    pub fn break_enabled(&self) -> bool {
        self.break_enabled.unwrap_or(false)
    }

    /// Parsed break mode. Validation has already rejected unknown names.
    pub fn break_mode(&self) -> BreakMode {
        self.break_mode
            .as_deref()
            .unwrap_or(DEFAULT_BREAK_MODE)
            .parse()
            .unwrap_or(BreakMode::Pomodoro)
    }

    pub fn work_duration(&self) -> u32 {
        self.work_duration.unwrap_or(DEFAULT_WORK_DURATION)
    }

    pub fn break_duration(&self) -> u32 {
        self.break_duration.unwrap_or(DEFAULT_BREAK_DURATION)
    }

    pub fn force_break(&self) -> bool {
        self.force_break.unwrap_or(DEFAULT_FORCE_BREAK)
    }

    pub fn schedule_enabled(&self) -> bool {
        self.schedule_enabled.unwrap_or(false)
    }

    /// Coordinates, falling back to the defaults for whichever half is missing.
    pub fn coordinates(&self) -> (f64, f64) {
        (
            self.latitude.unwrap_or(DEFAULT_LATITUDE),
            self.longitude.unwrap_or(DEFAULT_LONGITUDE),
        )
    }

    pub fn topology_poll_interval(&self) -> u64 {
        self.topology_poll_interval
            .unwrap_or(DEFAULT_TOPOLOGY_POLL_SECS)
    }

    fn on_off(value: bool) -> &'static str {
        if value { "on" } else { "off" }
    }

    /// Print the effective settings as a log block.
    pub fn log_config(&self) {
        let source = match get_custom_config_dir() {
            Some(dir) => format!("configuration from {}", crate::common::utils::private_path(&dir)),
            None => "default configuration".to_string(),
        };
        log_block_start!("Loaded {}", source);
        log_indented!(
            "Blue light filter: {} ({}K)",
            Self::on_off(self.filter_enabled()),
            self.temperature()
        );
        log_indented!(
            "Screen dimming: {} (level {})",
            Self::on_off(self.dim_enabled()),
            self.dim_level()
        );
        log_indented!(
            "Focus mode: {} (level {})",
            Self::on_off(self.focus_enabled()),
            self.focus_dim_level()
        );
        let mode = self.break_mode();
        let (work, rest) = mode
            .durations()
            .unwrap_or((self.work_duration(), self.break_duration()));
        log_indented!(
            "Break reminders: {} ({mode}, {}s work / {}s break{})",
            Self::on_off(self.break_enabled()),
            work,
            rest,
            if self.force_break() { ", forced" } else { "" }
        );
        if self.schedule_enabled() {
            let (lat, lon) = self.coordinates();
            log_indented!("Sunset schedule: on ({lat:.4}°, {lon:.4}°)");
        } else {
            log_indented!("Sunset schedule: off");
        }
        log_indented!(
            "Display poll interval: {}s",
            self.topology_poll_interval()
        );
    }
}
