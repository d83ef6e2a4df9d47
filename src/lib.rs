//! LightGatt firmware library.
//!
//! A multi-profile BLE GATT server core and the light peripheral built on
//! it.  Exposes the pure-logic modules for integration testing; all
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod gatts;
pub mod pins;
