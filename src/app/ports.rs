//! Port traits — the hexagonal boundary between the GATT core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GattServer (domain)
//! ```
//!
//! Driven adapters (Bluedroid, light driver, NVS, log output) implement
//! these traits.  The [`GattServer`](super::service::GattServer) consumes
//! them via generics, so the dispatch core never touches the radio or the
//! LEDs directly and runs unchanged against the recording mocks in tests.

use crate::config::{AdvParams, AdvPayload, ConnParams};
use crate::error::{DriverError, StackError};
use crate::gatts::types::{
    AppId, AttrHandle, AttrValue, BdAddr, CharProperties, GattStatus, InterfaceId, Permissions,
    ServiceId, Uuid,
};

// ───────────────────────────────────────────────────────────────
// Host stack port (driven adapter: domain → radio)
// ───────────────────────────────────────────────────────────────

/// Command surface of the BLE host stack.
///
/// Every command is fire-and-forget: `Ok(())` only means the stack
/// accepted it.  Completion arrives later as a
/// [`StackEvent`](crate::gatts::event::StackEvent) on the callback task.
pub trait GattStack {
    // ── Bring-up ──────────────────────────────────────────────

    /// Return the classic-BT controller memory to the heap.
    fn release_classic_memory(&mut self) -> Result<(), StackError>;

    fn init_controller(&mut self) -> Result<(), StackError>;

    /// Enable the controller in BLE-only mode.
    fn enable_controller(&mut self) -> Result<(), StackError>;

    fn init_host(&mut self) -> Result<(), StackError>;

    fn enable_host(&mut self) -> Result<(), StackError>;

    fn register_gatts_callback(&mut self) -> Result<(), StackError>;

    fn register_gap_callback(&mut self) -> Result<(), StackError>;

    // ── Application registration ──────────────────────────────

    fn register_app(&mut self, app_id: AppId) -> Result<(), StackError>;

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError>;

    // ── GAP ───────────────────────────────────────────────────

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError>;

    /// Configure either the advertising payload or the scan response,
    /// selected by [`AdvPayload::set_scan_rsp`].
    fn config_adv_data(&mut self, payload: &AdvPayload) -> Result<(), StackError>;

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError>;

    fn update_conn_params(&mut self, remote: BdAddr, params: &ConnParams) -> Result<(), StackError>;

    // ── GATT server ───────────────────────────────────────────

    fn create_service(
        &mut self,
        gatts_if: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), StackError>;

    fn start_service(&mut self, service_handle: AttrHandle) -> Result<(), StackError>;

    fn add_char(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        perm: Permissions,
        props: CharProperties,
    ) -> Result<(), StackError>;

    fn add_char_descr(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        perm: Permissions,
    ) -> Result<(), StackError>;

    fn send_response(
        &mut self,
        gatts_if: InterfaceId,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        value: Option<&AttrValue>,
    ) -> Result<(), StackError>;
}

// ───────────────────────────────────────────────────────────────
// Device state port (driven adapter: domain ↔ light output)
// ───────────────────────────────────────────────────────────────

/// The single externally owned boolean the characteristics expose.
///
/// Both calls must be non-blocking: they run on the stack's callback task.
pub trait DeviceStatePort {
    fn get_state(&self) -> bool;

    /// Fails only if the underlying actuator is unavailable.
    fn set_state(&mut self, on: bool) -> Result<(), DriverError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.
///
/// Keys are namespaced to prevent collisions between subsystems.
/// Writes must be atomic, with no partial writes on power loss.  ESP-IDF NVS
/// guarantees this per commit; the in-memory simulation trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Namespace or key exceeds the backend's length limit.
    InvalidKey,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::InvalidKey => write!(f, "namespace or key too long"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
