//! Value types shared by every GATT-server component.
//!
//! These mirror the Bluedroid wire-level vocabulary (interface ids,
//! attribute handles, status codes, property bitsets) without pulling in
//! any ESP-IDF bindings, so the whole dispatch core builds and tests on
//! the host.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Stable, configuration-assigned profile identity.  Doubles as the
/// index into the profile table.
pub type AppId = u16;

/// Attribute handle assigned by the stack.
pub type AttrHandle = u16;

/// Largest local MTU the server will request.
pub const MAX_LOCAL_MTU: u16 = 500;

/// Longest single write payload: one ATT PDU at [`MAX_LOCAL_MTU`] less its
/// 3-byte header.
pub const MAX_WRITE_LEN: usize = MAX_LOCAL_MTU as usize - 3;

/// Longest value served in one read response.  Attributes here are a state
/// byte or a 2-byte CCCD; this fits the default 23-byte ATT MTU.
pub const MAX_READ_LEN: usize = 22;

/// UUID of the client characteristic configuration descriptor.
pub const CCCD_UUID: u16 = 0x2902;

// ───────────────────────────────────────────────────────────────
// Interface ids
// ───────────────────────────────────────────────────────────────

/// Stack-assigned GATT-server interface id (`esp_gatt_if_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterfaceId(pub u8);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Interface addressing carried by every GATT-server event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattIf {
    /// The stack did not scope the event to one interface.
    Unspecified,
    /// The event belongs to exactly this interface.
    Bound(InterfaceId),
}

impl GattIf {
    /// Raw sentinel the stack uses for "no specific interface".
    pub const NONE_RAW: u8 = 0xFF;

    pub fn from_raw(raw: u8) -> Self {
        if raw == Self::NONE_RAW {
            Self::Unspecified
        } else {
            Self::Bound(InterfaceId(raw))
        }
    }
}

// ───────────────────────────────────────────────────────────────
// UUIDs
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Uuid {
    Uuid16(u16),
    Uuid32(u32),
    /// Little-endian byte order, as carried on the wire.
    Uuid128([u8; 16]),
}

impl Uuid {
    /// Expand a 16-bit UUID onto the Bluetooth base UUID
    /// (`0000xxxx-0000-1000-8000-00805F9B34FB`), little-endian.
    pub const fn from_u16_base(short: u16) -> [u8; 16] {
        let [lo, hi] = short.to_le_bytes();
        [
            0xfb, 0x34, 0x9b, 0x5f, 0x80, 0x00, 0x00, 0x80, 0x00, 0x10, 0x00, 0x00, lo, hi, 0x00,
            0x00,
        ]
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid16(u) => write!(f, "0x{u:04X}"),
            Self::Uuid32(u) => write!(f, "0x{u:08X}"),
            Self::Uuid128(bytes) => {
                for b in bytes.iter().rev() {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Identity of a service declaration (`esp_gatt_srvc_id_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceId {
    pub uuid: Uuid,
    pub inst_id: u8,
    pub is_primary: bool,
}

impl ServiceId {
    pub fn primary(uuid: Uuid) -> Self {
        Self {
            uuid,
            inst_id: 0,
            is_primary: true,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Property / permission bitsets
// ───────────────────────────────────────────────────────────────

/// Characteristic properties (`esp_gatt_char_prop_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharProperties(pub u8);

impl CharProperties {
    pub const BROADCAST: Self = Self(1 << 0);
    pub const READ: Self = Self(1 << 1);
    pub const WRITE_NR: Self = Self(1 << 2);
    pub const WRITE: Self = Self(1 << 3);
    pub const NOTIFY: Self = Self(1 << 4);
    pub const INDICATE: Self = Self(1 << 5);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_readable(self) -> bool {
        self.contains(Self::READ)
    }

    pub const fn is_writable(self) -> bool {
        self.0 & (Self::WRITE.0 | Self::WRITE_NR.0) != 0
    }
}

/// Attribute access permissions (`esp_gatt_perm_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permissions(pub u16);

impl Permissions {
    pub const READ: Self = Self(1 << 0);
    pub const READ_ENCRYPTED: Self = Self(1 << 1);
    pub const WRITE: Self = Self(1 << 4);
    pub const WRITE_ENCRYPTED: Self = Self(1 << 5);

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

// ───────────────────────────────────────────────────────────────
// Status codes
// ───────────────────────────────────────────────────────────────

/// ATT / GATT status (`esp_gatt_status_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Ok,
    InvalidHandle,
    ReadNotPermitted,
    WriteNotPermitted,
    RequestNotSupported,
    InvalidOffset,
    InvalidAttributeLength,
    UnlikelyError,
    Error,
    Other(u8),
}

impl GattStatus {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0x00 => Self::Ok,
            0x01 => Self::InvalidHandle,
            0x02 => Self::ReadNotPermitted,
            0x03 => Self::WriteNotPermitted,
            0x06 => Self::RequestNotSupported,
            0x07 => Self::InvalidOffset,
            0x0d => Self::InvalidAttributeLength,
            0x0e => Self::UnlikelyError,
            0x85 => Self::Error,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::InvalidHandle => 0x01,
            Self::ReadNotPermitted => 0x02,
            Self::WriteNotPermitted => 0x03,
            Self::RequestNotSupported => 0x06,
            Self::InvalidOffset => 0x07,
            Self::InvalidAttributeLength => 0x0d,
            Self::UnlikelyError => 0x0e,
            Self::Error => 0x85,
            Self::Other(raw) => raw,
        }
    }

    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

/// Controller / GAP completion status (`esp_bt_status_t`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BtStatus {
    Success,
    Failure(u32),
}

impl BtStatus {
    pub fn from_raw(raw: u32) -> Self {
        if raw == 0 {
            Self::Success
        } else {
            Self::Failure(raw)
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

// ───────────────────────────────────────────────────────────────
// Addresses and attribute values
// ───────────────────────────────────────────────────────────────

/// Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BdAddr(pub [u8; 6]);

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// Attribute value carried in a read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrValue {
    pub handle: AttrHandle,
    pub offset: u16,
    pub value: heapless::Vec<u8, MAX_READ_LEN>,
}

impl AttrValue {
    /// Build a response value; bytes past [`MAX_READ_LEN`] are dropped.
    pub fn new(handle: AttrHandle, bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_READ_LEN);
        let mut value = heapless::Vec::new();
        // Length is clamped to capacity above.
        let _ = value.extend_from_slice(&bytes[..len]);
        Self {
            handle,
            offset: 0,
            value,
        }
    }
}
