//! RGB + cold/warm white light driver.
//!
//! On/off control over five LEDC PWM channels.  "On" drives both white
//! strings at the configured brightness with the colour channels dark;
//! "off" zeroes every channel.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real PWM via hw_init helpers.
//! On host/test: tracks channel duties in-memory only.

use log::info;

use crate::drivers::hw_init;
use crate::error::DriverError;

/// Power state applied at boot when nothing is persisted.
pub const DEFAULT_POWER: bool = true;

/// White-channel duty when on (8-bit).
pub const DEFAULT_BRIGHTNESS: u8 = 255;

const CHANNELS: [u32; 5] = [
    hw_init::LEDC_CH_RED,
    hw_init::LEDC_CH_GREEN,
    hw_init::LEDC_CH_BLUE,
    hw_init::LEDC_CH_COLD,
    hw_init::LEDC_CH_WARM,
];

pub struct LightDriver {
    on: bool,
    brightness: u8,
    duties: [u8; 5],
}

impl Default for LightDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl LightDriver {
    /// Outputs start dark; call [`set_power`](Self::set_power) to apply
    /// the boot state.
    pub fn new() -> Self {
        Self {
            on: false,
            brightness: DEFAULT_BRIGHTNESS,
            duties: [0; 5],
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Switch the light.  Returns `Ok(false)` when already in that state.
    pub fn set_power(&mut self, on: bool) -> Result<bool, DriverError> {
        if on == self.on && self.duties == self.target(on) {
            return Ok(false);
        }
        for (i, (&channel, duty)) in CHANNELS.iter().zip(self.target(on)).enumerate() {
            hw_init::ledc_set(channel, duty).map_err(|rc| {
                log::warn!("LIGHT: LEDC ch{channel} write failed (rc={rc})");
                DriverError::PwmWriteFailed
            })?;
            self.duties[i] = duty;
        }
        self.on = on;
        info!("LIGHT: {}", if on { "ON" } else { "OFF" });
        Ok(true)
    }

    pub fn toggle(&mut self) -> Result<bool, DriverError> {
        self.set_power(!self.on)?;
        Ok(self.on)
    }

    /// Current duty per channel: red, green, blue, cold, warm.
    pub fn duties(&self) -> [u8; 5] {
        self.duties
    }

    fn target(&self, on: bool) -> [u8; 5] {
        if on {
            [0, 0, 0, self.brightness, self.brightness]
        } else {
            [0; 5]
        }
    }
}
