//! Light state adapter.
//!
//! Implements [`DeviceStatePort`] over the shared [`LightDriver`] and keeps
//! the power state in NVS so the light comes back the way it was left.
//!
//! The driver sits behind its own mutex: the GATT callback task and the
//! main-task button poll both switch it.  State changes only raise a dirty
//! flag; the main task commits the current state with [`flush`], so flash
//! I/O never runs on the callback task.
//!
//! [`flush`]: LightStateAdapter::flush

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{DeviceStatePort, StoragePort};
use crate::drivers::light::{DEFAULT_POWER, LightDriver};
use crate::error::DriverError;

const NAMESPACE: &str = "light";
const KEY_POWER: &str = "power";

/// On-flash record.  Extend by appending fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct LightRecord {
    on: bool,
}

pub struct LightStateAdapter<S: StoragePort> {
    light: Arc<Mutex<LightDriver>>,
    storage: Arc<Mutex<S>>,
    dirty: Arc<AtomicBool>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S: StoragePort> Clone for LightStateAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            light: Arc::clone(&self.light),
            storage: Arc::clone(&self.storage),
            dirty: Arc::clone(&self.dirty),
        }
    }
}

impl<S: StoragePort> LightStateAdapter<S> {
    pub fn new(light: LightDriver, storage: S) -> Self {
        Self {
            light: Arc::new(Mutex::new(light)),
            storage: Arc::new(Mutex::new(storage)),
            dirty: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Last persisted power state, if any record decodes.
    pub fn load_persisted(&self) -> Option<bool> {
        let storage = self.storage.lock().ok()?;
        let mut buf = [0u8; 8];
        let len = storage.read(NAMESPACE, KEY_POWER, &mut buf).ok()?;
        match postcard::from_bytes::<LightRecord>(&buf[..len]) {
            Ok(record) => Some(record.on),
            Err(e) => {
                warn!("LIGHT: persisted record unreadable ({e}), using default");
                None
            }
        }
    }

    /// Drive the light to its persisted state, or [`DEFAULT_POWER`].
    pub fn apply_boot_state(&self) -> Result<bool, DriverError> {
        let on = self.load_persisted().unwrap_or(DEFAULT_POWER);
        let mut light = self.light.lock().map_err(|_| DriverError::Unavailable)?;
        // LEDC channels are configured at duty 0, matching a fresh driver.
        light.set_power(on)?;
        info!("LIGHT: boot state {}", if on { "on" } else { "off" });
        Ok(on)
    }

    /// Flip the light (push-button path).  Returns the new state.
    pub fn toggle(&self) -> Result<bool, DriverError> {
        let mut light = self.light.lock().map_err(|_| DriverError::Unavailable)?;
        let on = light.toggle()?;
        self.dirty.store(true, Ordering::Release);
        Ok(on)
    }

    /// True while a state change has not been committed to flash.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Commit the current power state if it changed since the last flush.
    ///
    /// Main task only.  The flag is cleared before the snapshot is taken, so
    /// a change racing the commit leaves the flag set for the next call.
    /// Returns the state written, if any.
    pub fn flush(&self) -> Option<bool> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        let on = self.get_state();

        let mut buf = [0u8; 8];
        let bytes = match postcard::to_slice(&LightRecord { on }, &mut buf) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("LIGHT: encode failed: {e}");
                return None;
            }
        };
        let Ok(mut storage) = self.storage.lock() else {
            warn!("LIGHT: storage lock poisoned, state not persisted");
            return None;
        };
        match storage.write(NAMESPACE, KEY_POWER, bytes) {
            Ok(()) => Some(on),
            Err(e) => {
                warn!("NVS: persisting light state failed: {e}");
                None
            }
        }
    }
}

impl<S: StoragePort> DeviceStatePort for LightStateAdapter<S> {
    fn get_state(&self) -> bool {
        self.light.lock().map(|l| l.is_on()).unwrap_or(false)
    }

    fn set_state(&mut self, on: bool) -> Result<(), DriverError> {
        let mut light = self.light.lock().map_err(|_| DriverError::Unavailable)?;
        if light.set_power(on)? {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(())
    }
}
