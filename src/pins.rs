//! GPIO / peripheral pin assignments for the ESP32-C3 light board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Light outputs (LEDC PWM)
// ---------------------------------------------------------------------------

pub const LIGHT_RED_GPIO: i32 = 3;
pub const LIGHT_GREEN_GPIO: i32 = 4;
pub const LIGHT_BLUE_GPIO: i32 = 5;
/// Cold-white LED string.
pub const LIGHT_COLD_GPIO: i32 = 19;
/// Warm-white LED string.
pub const LIGHT_WARM_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits).  8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for the light channels (5 kHz, flicker-free).
pub const LIGHT_PWM_FREQ_HZ: u32 = 5_000;

// ---------------------------------------------------------------------------
// User button (active-low, internal pull-up)
// ---------------------------------------------------------------------------

/// BOOT button on the ESP32-C3 DevKit; toggles the light.
pub const BUTTON_GPIO: i32 = 9;
