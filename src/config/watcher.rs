//! Hot reload: watch the config directory and ask the core to reload.
//!
//! The parent directory is watched instead of the file itself so editors that
//! save by writing a temp file and renaming it over the original still trigger
//! a reload.

use anyhow::{Context, Result};
use notify::{
    Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use super::get_config_path;
use crate::common::constants::CONFIG_DEBOUNCE_MS;
use crate::common::utils::private_path;
use crate::io::signals::SignalMessage;

/// Whether a filesystem event touched the watched config file.
fn touches_config(event: &Event, config_path: &Path) -> bool {
    let Some(config_name) = config_path.file_name() else {
        return false;
    };
    event.paths.iter().any(|path| {
        path == config_path
            || (path.parent() == config_path.parent()
                && path.file_name().is_some_and(|name| {
                    name == config_name
                        || name
                            .to_str()
                            .zip(config_name.to_str())
                            .is_some_and(|(name, config)| name.starts_with(config))
                }))
    })
}

fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Spawn the watcher thread for the active config file.
///
/// Each burst of change events produces at most one
/// [`SignalMessage::Reload`] per debounce window. The thread exits when the
/// receiving side of `signal_sender` is gone.
pub fn start_config_watcher(signal_sender: Sender<SignalMessage>) -> Result<()> {
    let config_path = get_config_path()?;
    watch_path(config_path, signal_sender)
}

pub(crate) fn watch_path(config_path: PathBuf, signal_sender: Sender<SignalMessage>) -> Result<()> {
    let watch_dir = config_path
        .parent()
        .context("Config path has no parent directory")?
        .to_path_buf();

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res
                && is_relevant(&event)
            {
                let _ = tx.send(event);
            }
        },
        NotifyConfig::default(),
    )
    .context("Failed to create file watcher")?;

    watcher
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch directory: {}", private_path(&watch_dir)))?;

    log_debug!("Watching {} for changes", private_path(&config_path));

    thread::spawn(move || {
        // Dropping the watcher stops event delivery.
        let _watcher = watcher;
        let debounce = Duration::from_millis(CONFIG_DEBOUNCE_MS);
        let mut last_reload: Option<Instant> = None;

        for event in rx {
            if !touches_config(&event, &config_path) {
                continue;
            }
            if last_reload.is_some_and(|at| at.elapsed() < debounce) {
                continue;
            }

            log_debug!("Configuration file change detected");
            if signal_sender.send(SignalMessage::Reload).is_err() {
                break;
            }
            last_reload = Some(Instant::now());
        }
    });

    Ok(())
}
