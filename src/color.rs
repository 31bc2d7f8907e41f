//! Color temperature to RGB channel multipliers.
//!
//! Uses the Tanner Helland curve fit of the Planckian locus, which maps a
//! blackbody temperature to 8-bit sRGB channel values. The values are divided
//! by 255 so callers get multipliers in `0.0..=1.0` that scale a gamma ramp.
//!
//! The fit is defined on hundreds of Kelvin. Red is saturated below 6600K and
//! blue is saturated above it; blue drops to zero at 1900K and below.

use crate::common::constants::DEFAULT_TEMP;

/// Per-channel intensity multipliers in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelMultipliers {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelMultipliers {
    /// Multipliers that leave the display untouched.
    pub const NEUTRAL: Self = Self {
        red: 1.0,
        green: 1.0,
        blue: 1.0,
    };

    pub fn as_array(&self) -> [f64; 3] {
        [self.red, self.green, self.blue]
    }
}

impl Default for ChannelMultipliers {
    fn default() -> Self {
        kelvin_to_multipliers(DEFAULT_TEMP)
    }
}

fn normalize(value: f64) -> f64 {
    value.clamp(0.0, 255.0) / 255.0
}

/// Convert a color temperature in Kelvin to channel multipliers.
///
/// Inputs outside the usual 1000K..6500K range are accepted; the curve is
/// extrapolated and every channel is clamped into `0.0..=1.0`.
pub fn kelvin_to_multipliers(kelvin: i32) -> ChannelMultipliers {
    // ln() is undefined at and below zero, and nothing below 100K is meaningful
    let t = (kelvin as f64 / 100.0).max(1.0);

    let red = if t <= 66.0 {
        1.0
    } else {
        normalize(329.6987 * (t - 60.0).powf(-0.1332))
    };

    let green = if t <= 66.0 {
        normalize(99.4708 * t.ln() - 161.1196)
    } else {
        normalize(288.1222 * (t - 60.0).powf(-0.0755))
    };

    let blue = if t >= 66.0 {
        1.0
    } else if t <= 19.0 {
        0.0
    } else {
        normalize(138.5177 * (t - 10.0).ln() - 305.0448)
    };

    ChannelMultipliers { red, green, blue }
}
