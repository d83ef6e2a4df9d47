//! Application core — pure domain logic, zero I/O.
//!
//! This module holds the GATT server context that ties the state
//! machines in [`crate::gatts`] together.  All interaction with the radio,
//! the light and flash happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
