//! One-shot command handlers.
//!
//! Each command runs to completion and exits without starting the engine.

pub mod help;
pub mod preset;
pub mod sun;
