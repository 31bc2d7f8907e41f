//! Translucent overlay surfaces: per-display dimming and focus mode.

pub mod dim;
pub mod focus;

pub use dim::DimOverlayManager;
pub use focus::FocusOverlayController;
