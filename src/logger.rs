//! Structured logging with box-drawing output.
//!
//! Every line goes through [`write_output`], which either prints to stdout with
//! ANSI colors or, once [`Log::start_file_logging`] has been called, forwards a
//! color-stripped copy to a writer thread that owns the log file.
//!
//! ## Conventions
//!
//! - `log_block_start!` opens a conceptual block (`┃` spacer, then `┣ message`).
//! - `log_decorated!` continues a block (`┣ message`).
//! - `log_indented!` lists details under the previous line (`┃   message`).
//! - `log_pipe!` inserts a bare `┃` before a leveled message that starts a block.
//! - `log_version!` prints the header once at startup, `log_end!` the final `╹`.
//! - `log_info!`, `log_warning!`, `log_error!`, `log_critical!` carry a `[LEVEL]` tag.
//! - `log_debug!` is silent unless debug output was switched on with `--debug`.
//! - `log_error_exit!` closes the whole tree with `┗[ERROR]`.

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Severity tag printed in front of leveled messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
    Debug,
    Critical,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "\x1b[32mINFO\x1b[0m",
            Level::Warning => "\x1b[33mWARNING\x1b[0m",
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Debug => "\x1b[36mDEBUG\x1b[0m",
            Level::Critical => "\x1b[31mCRITICAL\x1b[0m",
        }
    }
}

/// Runtime switches for the logger.
pub struct Log;

impl Log {
    /// Enable or disable all output. Tests turn logging off to keep runs quiet.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Enable `log_debug!` lines.
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    pub fn is_debug() -> bool {
        DEBUG_ENABLED.load(Ordering::SeqCst)
    }

    /// Route all further output to `file_path` until the returned guard is dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;
            while let Ok(LogMessage::Formatted(text)) = rx.recv() {
                file.write_all(text.as_bytes())?;
            }
            file.flush()?;
            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Format a leveled line. Used by the macros.
    pub fn leveled(level: Level, message: &str) -> String {
        format!("┣[{}] {message}\n", level.tag())
    }
}

/// Flushes and joins the file writer on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Write an already formatted line to the active sink.
pub fn write_output(text: &str) {
    if !Log::is_enabled() {
        return;
    }
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&format!("┣ {}\n", format_args!($($arg)+)))
    };
}

#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&format!("┃   {}\n", format_args!($($arg)+)))
    };
}

#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::logger::write_output("┃\n")
    };
}

#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&format!("┃\n┣ {}\n", format_args!($($arg)+)))
    };
}

#[macro_export]
macro_rules! log_version {
    () => {
        $crate::logger::write_output(&format!(
            "┏ eyeshade v{} ━━╸\n",
            env!("CARGO_PKG_VERSION")
        ))
    };
}

#[macro_export]
macro_rules! log_end {
    () => {
        $crate::logger::write_output("╹\n")
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&$crate::logger::Log::leveled(
            $crate::logger::Level::Info,
            &format!($($arg)+),
        ))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&$crate::logger::Log::leveled(
            $crate::logger::Level::Warning,
            &format!($($arg)+),
        ))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&$crate::logger::Log::leveled(
            $crate::logger::Level::Error,
            &format!($($arg)+),
        ))
    };
}

#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&$crate::logger::Log::leveled(
            $crate::logger::Level::Critical,
            &format!($($arg)+),
        ))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        if $crate::logger::Log::is_debug() {
            $crate::logger::write_output(&$crate::logger::Log::leveled(
                $crate::logger::Level::Debug,
                &format!($($arg)+),
            ))
        }
    };
}

/// Terminal error that closes the log tree.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => {
        $crate::logger::write_output(&format!(
            "┃\n┗[\x1b[31mERROR\x1b[0m] {}\n",
            format_args!($($arg)+)
        ))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_color_sequences() {
        let colored = Log::leveled(Level::Warning, "low battery");
        assert_eq!(strip_ansi_codes(&colored), "┣[WARNING] low battery\n");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(strip_ansi_codes("┃   6500K"), "┃   6500K");
    }
}
