//! Unified error types for the LightGatt firmware.
//!
//! A single `Error` enum that every bring-up path converts into, keeping
//! `main`'s handling uniform.  All variants are `Copy` so they pass through
//! the dispatch core without allocation.  Steady-state faults never become
//! an `Error`: they turn into a GATT status or a logged drop at the point
//! where they occur.

use core::fmt;

use crate::app::ports::StorageError;
use crate::config::ConfigError;
use crate::gatts::types::AppId;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Radio or host stack bring-up failed; there is no degraded mode.
    BringUp(BringUpError),
    /// Static configuration is invalid.
    Config(ConfigError),
    /// Persistent storage failed.
    Storage(StorageError),
    /// The light output could not be driven.
    Driver(DriverError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BringUp(e) => write!(f, "bring-up: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Driver(e) => write!(f, "driver: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Stack command errors
// ---------------------------------------------------------------------------

/// A host-stack command was rejected.  Carries the raw `esp_err_t`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackError(pub i32);

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "esp_err 0x{:x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Bring-up errors
// ---------------------------------------------------------------------------

/// The bring-up step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpStage {
    ReleaseClassicMemory,
    ControllerInit,
    ControllerEnable,
    HostInit,
    HostEnable,
    GattsCallback,
    GapCallback,
    AppRegister(AppId),
    /// `bring_up` was called on a controller that is not uninitialized.
    AlreadyStarted,
}

impl fmt::Display for BringUpStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReleaseClassicMemory => write!(f, "release classic BT memory"),
            Self::ControllerInit => write!(f, "initialize controller"),
            Self::ControllerEnable => write!(f, "enable controller"),
            Self::HostInit => write!(f, "init bluetooth host"),
            Self::HostEnable => write!(f, "enable bluetooth host"),
            Self::GattsCallback => write!(f, "register GATTS callback"),
            Self::GapCallback => write!(f, "register GAP callback"),
            Self::AppRegister(id) => write!(f, "register app {id}"),
            Self::AlreadyStarted => write!(f, "stack already started"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BringUpError {
    pub stage: BringUpStage,
    pub code: StackError,
}

impl fmt::Display for BringUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed ({})", self.stage, self.code)
    }
}

impl From<BringUpError> for Error {
    fn from(e: BringUpError) -> Self {
        Self::BringUp(e)
    }
}

// ---------------------------------------------------------------------------
// Driver errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// LEDC duty write failed.
    PwmWriteFailed,
    /// The output lock could not be taken (poisoned).
    Unavailable,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::Unavailable => write!(f, "light output unavailable"),
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
