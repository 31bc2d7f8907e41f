//! `eyeshade preset NAME`: write a display preset into the config file.
//!
//! Only `temperature` and `dim_level` are rewritten; every other line and
//! comment stays as it was. A running instance picks the change up through
//! its config watcher, and is also sent a reload signal in case watching is
//! unavailable.

use anyhow::{Context, Result};

use crate::common::utils::private_path;
use crate::config::{self, Config, DisplayPreset};
use crate::io::lock;

pub fn handle_preset_command(preset_name: &str) -> Result<()> {
    log_version!();

    let Some(preset) = config::find_preset(preset_name) else {
        log_pipe!();
        log_error!("Unknown preset '{preset_name}'");
        log_indented!("Available presets: {}", config::presets::preset_names());
        log_end!();
        anyhow::bail!("Unknown preset '{preset_name}'");
    };

    let config_path = Config::get_config_path()?;
    if !config_path.exists() {
        config::create_default_config(&config_path)
            .context("Failed to create the configuration file")?;
    }

    config::apply_preset(&config_path, preset)?;
    log_preset(preset);
    log_decorated!("Updated {}", private_path(&config_path));

    // Validate what we wrote so a broken file is reported here, not by the engine
    if let Err(e) = Config::load_from_path(&config_path) {
        log_pipe!();
        log_warning!("The updated configuration does not load: {e:#}");
    }

    notify_running_instance();
    log_end!();
    Ok(())
}

fn log_preset(preset: &DisplayPreset) {
    log_block_start!("Applied preset '{}'", preset.name);
    log_indented!("Temperature: {}K", preset.temperature);
    log_indented!("Dim level: {}", preset.dim_level);
}

fn notify_running_instance() {
    let Some(instance) = lock::running_instance() else {
        log_decorated!("eyeshade is not running, the preset applies on next start");
        return;
    };

    match lock::send_reload_signal(instance.pid) {
        Ok(()) => log_decorated!("Reloading running instance (PID: {})", instance.pid),
        Err(e) => log_debug!("Reload signal not sent, relying on the config watcher: {e}"),
    }
}

pub fn display_help() {
    log_version!();
    log_block_start!("preset - Apply a display preset");
    log_block_start!("Usage: eyeshade preset <name>");
    log_block_start!("Presets:");
    for preset in config::presets::PRESETS {
        log_indented!(
            "{:<8} {}K, dim level {}",
            preset.name,
            preset.temperature,
            preset.dim_level
        );
    }
    log_block_start!("Examples:");
    log_indented!("eyeshade preset night");
    log_indented!("eyeshade --config ~/.config/eyeshade-work preset office");
    log_end!();
}
