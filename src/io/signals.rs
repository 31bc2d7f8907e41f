//! Process signal handling.
//!
//! Signals are turned into [`SignalMessage`]s on the same channel the config
//! watcher and [`crate::core::CoreHandle`] use, so the event loop has a single
//! place to receive work from other threads.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};

use crate::core::CoreCommand;

/// Everything another thread can ask of the event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalMessage {
    /// Re-read the configuration file (SIGUSR2 or a file change).
    Reload,
    /// Leave the loop and tear everything down (SIGINT, SIGTERM, SIGHUP).
    Shutdown,
    /// A request from a UI or tray collaborator.
    Command(CoreCommand),
}

/// Channel and run flag shared between the signal thread and the loop.
pub struct SignalState {
    /// Cleared once a shutdown signal arrives.
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    pub signal_sender: Sender<SignalMessage>,
}

impl SignalState {
    /// A channel with no OS signal wiring, for tests and embedding.
    pub fn detached() -> Self {
        let (signal_sender, signal_receiver) = std::sync::mpsc::channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal_receiver,
            signal_sender,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Map a raw signal number to the message it should produce.
#[cfg(unix)]
pub(crate) fn message_for_signal(sig: i32) -> Option<SignalMessage> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2};

    match sig {
        SIGUSR2 => Some(SignalMessage::Reload),
        SIGINT | SIGTERM | SIGHUP => Some(SignalMessage::Shutdown),
        _ => None,
    }
}

/// Install the handlers and start the signal thread.
#[cfg(unix)]
pub fn setup_signal_handler() -> Result<SignalState> {
    use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR2};
    use signal_hook::iterator::Signals;

    let state = SignalState::detached();
    let running = state.running.clone();
    let sender = state.signal_sender.clone();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR2])
        .context("failed to register signal handlers")?;

    std::thread::spawn(move || {
        for sig in signals.forever() {
            let Some(message) = message_for_signal(sig) else {
                continue;
            };

            match message {
                SignalMessage::Reload => {
                    log_debug!("Received SIGUSR2, reloading configuration");
                }
                SignalMessage::Shutdown => {
                    log_pipe!();
                    if sig == SIGINT {
                        log_info!("Received interrupt signal, shutting down...");
                    } else {
                        log_info!("Received termination request, shutting down...");
                    }
                    running.store(false, Ordering::SeqCst);
                }
                SignalMessage::Command(_) => {}
            }

            if sender.send(message).is_err() {
                // The loop is gone; nothing left to notify.
                running.store(false, Ordering::SeqCst);
                break;
            }
        }
    });

    Ok(state)
}

/// Install the handlers. Windows only delivers SIGINT and SIGTERM, which
/// clear the run flag; the loop notices on its next iteration.
#[cfg(not(unix))]
pub fn setup_signal_handler() -> Result<SignalState> {
    use signal_hook::consts::signal::{SIGINT, SIGTERM};

    let state = SignalState::detached();
    let shutdown = Arc::new(AtomicBool::new(false));
    for sig in [SIGINT, SIGTERM] {
        signal_hook::flag::register(sig, shutdown.clone())
            .context("failed to register signal handlers")?;
    }

    let running = state.running.clone();
    let sender = state.signal_sender.clone();
    std::thread::spawn(move || {
        while !shutdown.load(Ordering::SeqCst) {
            std::thread::sleep(std::time::Duration::from_millis(
                crate::common::constants::LOOP_SLICE_MS,
            ));
        }
        log_pipe!();
        log_info!("Received termination request, shutting down...");
        running.store(false, Ordering::SeqCst);
        let _ = sender.send(SignalMessage::Shutdown);
    });

    Ok(state)
}
