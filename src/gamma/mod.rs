//! Gamma ramp construction and the controller that owns the hardware ramp.
//!
//! The controller is the only code allowed to write the display gamma ramp.
//! The ramp found on the hardware before the first write is captured in a
//! [`SavedRamp`] and written back when the filter is switched off. Nothing in
//! here ever returns an error to callers: device failures are logged and the
//! controller keeps going with whatever state it could reach.

use anyhow::Result;

use crate::color::{ChannelMultipliers, kelvin_to_multipliers};
use crate::common::constants::{DEFAULT_TEMP, RAMP_SCALE, RAMP_SIZE};
use crate::platform::GammaDevice;

/// Three 256-entry 16-bit lookup tables in red, green, blue order.
///
/// The layout matches the Win32 `GetDeviceGammaRamp` buffer.
#[repr(C)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GammaRamp {
    pub red: [u16; RAMP_SIZE],
    pub green: [u16; RAMP_SIZE],
    pub blue: [u16; RAMP_SIZE],
}

fn channel_table(multiplier: f64) -> [u16; RAMP_SIZE] {
    let mut table = [0u16; RAMP_SIZE];
    for (i, entry) in table.iter_mut().enumerate() {
        let value = (i as f64 * multiplier * RAMP_SCALE).trunc();
        *entry = value.clamp(0.0, u16::MAX as f64) as u16;
    }
    table
}

impl GammaRamp {
    /// The linear ramp most drivers start with.
    pub fn identity() -> Self {
        Self::from_multipliers(ChannelMultipliers::NEUTRAL)
    }

    pub fn from_multipliers(multipliers: ChannelMultipliers) -> Self {
        Self {
            red: channel_table(multipliers.red),
            green: channel_table(multipliers.green),
            blue: channel_table(multipliers.blue),
        }
    }

    pub fn for_temperature(kelvin: i32) -> Self {
        Self::from_multipliers(kelvin_to_multipliers(kelvin))
    }

    pub fn channels(&self) -> [&[u16; RAMP_SIZE]; 3] {
        [&self.red, &self.green, &self.blue]
    }

    pub fn is_monotonic(&self) -> bool {
        self.channels()
            .iter()
            .all(|table| table.windows(2).all(|pair| pair[0] <= pair[1]))
    }
}

impl Default for GammaRamp {
    fn default() -> Self {
        Self::identity()
    }
}

/// The ramp that was on the hardware before the filter touched it.
///
/// Consumed by [`SavedRamp::restore`], so it can be written back at most once.
#[derive(Debug)]
pub struct SavedRamp {
    ramp: GammaRamp,
}

impl SavedRamp {
    fn capture(device: &mut dyn GammaDevice) -> Result<Self> {
        Ok(Self {
            ramp: device.read_ramp()?,
        })
    }

    pub fn ramp(&self) -> &GammaRamp {
        &self.ramp
    }

    fn restore(self, device: &mut dyn GammaDevice) -> Result<()> {
        device.write_ramp(&self.ramp)
    }
}

/// Blue-light filter backed by the hardware gamma ramp.
pub struct GammaRampController {
    device: Box<dyn GammaDevice>,
    enabled: bool,
    current_temperature: i32,
    saved: Option<SavedRamp>,
}

impl GammaRampController {
    pub fn new(device: Box<dyn GammaDevice>) -> Self {
        Self {
            device,
            enabled: false,
            current_temperature: DEFAULT_TEMP,
            saved: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn temperature(&self) -> i32 {
        self.current_temperature
    }

    pub fn has_saved_ramp(&self) -> bool {
        self.saved.is_some()
    }

    /// Switch the filter on at `temperature`.
    ///
    /// The hardware ramp is captured only on the off-to-on edge, so repeated
    /// calls never overwrite the original with a filtered ramp.
    pub fn enable(&mut self, temperature: i32) {
        if !self.enabled && self.saved.is_none() {
            match SavedRamp::capture(self.device.as_mut()) {
                Ok(saved) => self.saved = Some(saved),
                Err(e) => {
                    log_pipe!();
                    log_warning!("Could not read the current gamma ramp: {e}");
                    log_indented!("The display will not be restored when the filter is disabled");
                }
            }
        }

        self.set_temperature(temperature);
        self.enabled = true;
        log_debug!("Blue light filter enabled at {temperature}K");
    }

    /// Build a ramp for `kelvin` and apply it to every display.
    ///
    /// Works whether or not the filter is enabled.
    pub fn set_temperature(&mut self, kelvin: i32) {
        self.current_temperature = kelvin;
        let ramp = GammaRamp::for_temperature(kelvin);
        if let Err(e) = self.device.write_ramp(&ramp) {
            log_pipe!();
            log_error!("Failed to apply gamma ramp for {kelvin}K: {e}");
        }
    }

    /// Switch the filter off and put the original ramp back.
    ///
    /// Without a saved ramp the hardware keeps the last applied ramp.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }

        match self.saved.take() {
            Some(saved) => {
                if let Err(e) = saved.restore(self.device.as_mut()) {
                    log_pipe!();
                    log_error!("Failed to restore the original gamma ramp: {e}");
                }
            }
            None => {
                log_warning!("No saved gamma ramp, leaving the display as last set");
            }
        }

        self.current_temperature = DEFAULT_TEMP;
        self.enabled = false;
        log_debug!("Blue light filter disabled");
    }
}

impl Drop for GammaRampController {
    fn drop(&mut self) {
        self.disable();
    }
}
