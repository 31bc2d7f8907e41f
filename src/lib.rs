//! # eyeshade
//!
//! Display-state control and session scheduling for reducing eye strain.
//!
//! ## Architecture
//!
//! - **Entry point**: [`Eyeshade`] acquires resources and runs the engine
//! - **Event loop**: `core` owns every controller and receives commands,
//!   reloads and shutdowns over one channel
//! - **Controllers**: `gamma` (blue light filter), `overlay` (dimming and
//!   focus mode), `session` (break reminders), `geo` (sunset schedule)
//! - **Platform**: `platform` traits with Win32, Wayland and in-memory
//!   fake implementations
//! - **Configuration**: `config` for the TOML file, presets and hot reload
//! - **Infrastructure**: `io` for the instance lock and signals, `logger`

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod color;
pub mod commands;
pub mod common;
pub mod config;
pub mod core;
pub mod gamma;
pub mod geo;
pub mod io;
pub mod monitors;
pub mod overlay;
pub mod platform;
pub mod session;
pub mod time_source;

mod eyeshade;

pub use eyeshade::Eyeshade;
