//! GATT server configuration
//!
//! Static description of everything the server declares: the device name,
//! the profile table, both advertising payloads, the advertising
//! parameters and the connection-parameter policy applied after connect.
//! Read once at startup and validated before any stack command is issued.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::gatts::types::{AppId, CCCD_UUID, CharProperties, MAX_LOCAL_MTU, Permissions, Uuid};

/// Upper bound on declared profiles.  Sizes the profile table.
pub const MAX_PROFILES: usize = 4;

/// Longest GAP device name accepted (fits a legacy advertising PDU).
pub const MAX_NAME_LEN: usize = 29;

/// Local MTU requested after registration.
pub const DEFAULT_LOCAL_MTU: u16 = MAX_LOCAL_MTU;

/// Handles per profile: service, characteristic declaration and value, CCCD.
pub const HANDLES_PER_PROFILE: u16 = 4;

// ───────────────────────────────────────────────────────────────
// Profiles
// ───────────────────────────────────────────────────────────────

/// How a profile serves read/write requests against the device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileBehavior {
    /// Reports the device state; writes to the value are refused.
    StateReport,
    /// Drives the device state from writes; reads report it when the
    /// characteristic is readable.
    StateControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Must equal the profile's position in [`ServerConfig::profiles`].
    pub app_id: AppId,
    pub service_uuid: Uuid,
    pub char_uuid: Uuid,
    pub descr_uuid: Uuid,
    pub num_handles: u16,
    pub properties: CharProperties,
    pub permissions: Permissions,
    pub behavior: ProfileBehavior,
}

impl ProfileConfig {
    /// A four-handle profile with a CCCD, readable and writable at the
    /// permission level.
    pub const fn light(
        app_id: AppId,
        service: u16,
        characteristic: u16,
        properties: CharProperties,
        behavior: ProfileBehavior,
    ) -> Self {
        Self {
            app_id,
            service_uuid: Uuid::Uuid16(service),
            char_uuid: Uuid::Uuid16(characteristic),
            descr_uuid: Uuid::Uuid16(CCCD_UUID),
            num_handles: HANDLES_PER_PROFILE,
            properties,
            permissions: Permissions::READ.union(Permissions::WRITE),
            behavior,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Advertising
// ───────────────────────────────────────────────────────────────

/// AD flags.
pub const ADV_FLAG_GEN_DISC: u8 = 0x02;
pub const ADV_FLAG_BREDR_NOT_SPT: u8 = 0x04;

/// One advertising-data or scan-response payload (`esp_ble_adv_data_t`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvPayload {
    /// `true` for the scan response, `false` for advertising data.
    pub set_scan_rsp: bool,
    pub include_name: bool,
    pub include_txpower: bool,
    /// Preferred slave connection interval hint, 1.25 ms units.  Zero omits it.
    pub min_interval: u16,
    pub max_interval: u16,
    pub appearance: u16,
    /// 128-bit service UUIDs, little-endian.
    pub service_uuids: heapless::Vec<[u8; 16], MAX_PROFILES>,
    pub flag: u8,
}

impl AdvPayload {
    /// Advertising data listing the given 16-bit services on the base UUID.
    pub fn advertising(services: &[u16]) -> Self {
        let mut service_uuids = heapless::Vec::new();
        for s in services.iter().take(MAX_PROFILES) {
            // Bounded by take() above.
            let _ = service_uuids.push(Uuid::from_u16_base(*s));
        }
        Self {
            set_scan_rsp: false,
            include_name: true,
            include_txpower: false,
            min_interval: 0x0006,
            max_interval: 0x0010,
            appearance: 0,
            service_uuids,
            flag: ADV_FLAG_GEN_DISC | ADV_FLAG_BREDR_NOT_SPT,
        }
    }

    pub fn scan_response() -> Self {
        Self {
            set_scan_rsp: true,
            include_name: true,
            include_txpower: true,
            min_interval: 0,
            max_interval: 0,
            appearance: 0,
            service_uuids: heapless::Vec::new(),
            flag: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvType {
    ConnectableUndirected,
    ScannableUndirected,
    NonConnectable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnAddrType {
    Public,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvFilterPolicy {
    AllowAny,
    WhitelistScan,
    WhitelistConnect,
    WhitelistBoth,
}

/// All three primary advertising channels.
pub const ADV_CHANNEL_ALL: u8 = 0x07;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvParams {
    /// 0.625 ms units.
    pub adv_int_min: u16,
    pub adv_int_max: u16,
    pub adv_type: AdvType,
    pub own_addr_type: OwnAddrType,
    pub channel_map: u8,
    pub filter_policy: AdvFilterPolicy,
}

impl Default for AdvParams {
    fn default() -> Self {
        Self {
            adv_int_min: 0x20, // 20 ms
            adv_int_max: 0x40, // 40 ms
            adv_type: AdvType::ConnectableUndirected,
            own_addr_type: OwnAddrType::Public,
            channel_map: ADV_CHANNEL_ALL,
            filter_policy: AdvFilterPolicy::AllowAny,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connection parameters
// ───────────────────────────────────────────────────────────────

/// Connection parameters requested right after a peer connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnParams {
    /// 1.25 ms units.
    pub min_int: u16,
    pub max_int: u16,
    /// Connection events the peripheral may skip.
    pub latency: u16,
    /// Supervision timeout, 10 ms units.
    pub timeout: u16,
}

impl Default for ConnParams {
    fn default() -> Self {
        Self {
            min_int: 0x10,  // 20 ms
            max_int: 0x20,  // 40 ms
            latency: 0,
            timeout: 400, // 4 s
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Server configuration
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub device_name: heapless::String<32>,
    pub local_mtu: u16,
    pub profiles: heapless::Vec<ProfileConfig, MAX_PROFILES>,
    pub adv_data: AdvPayload,
    pub scan_rsp_data: AdvPayload,
    pub adv_params: AdvParams,
    pub conn_params: ConnParams,
}

impl Default for ServerConfig {
    /// The light firmware layout: a readable state service on 0x00FF and a
    /// writable control service on 0x00EE.
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        // Fixed literal well under capacity.
        let _ = device_name.push_str("ESP32C3-LIGHT");

        let mut profiles = heapless::Vec::new();
        let _ = profiles.push(ProfileConfig::light(
            0,
            0x00FF,
            0xFF01,
            CharProperties::READ,
            ProfileBehavior::StateReport,
        ));
        let _ = profiles.push(ProfileConfig::light(
            1,
            0x00EE,
            0xEE01,
            CharProperties::WRITE,
            ProfileBehavior::StateControl,
        ));

        Self {
            device_name,
            local_mtu: DEFAULT_LOCAL_MTU,
            profiles,
            adv_data: AdvPayload::advertising(&[0x00EE, 0x00FF]),
            scan_rsp_data: AdvPayload::scan_response(),
            adv_params: AdvParams::default(),
            conn_params: ConnParams::default(),
        }
    }
}

impl ServerConfig {
    /// Range-check everything the stack would otherwise reject later.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.device_name.len() > MAX_NAME_LEN {
            return Err(ConfigError::NameTooLong);
        }
        if self.profiles.is_empty() {
            return Err(ConfigError::NoProfiles);
        }
        for (index, p) in self.profiles.iter().enumerate() {
            if usize::from(p.app_id) != index {
                return Err(ConfigError::AppIdOutOfOrder(p.app_id));
            }
            if p.num_handles < HANDLES_PER_PROFILE {
                return Err(ConfigError::HandleBudget(p.app_id));
            }
        }
        if !(23..=MAX_LOCAL_MTU).contains(&self.local_mtu) {
            return Err(ConfigError::LocalMtu);
        }
        if self.adv_data.set_scan_rsp || !self.scan_rsp_data.set_scan_rsp {
            return Err(ConfigError::PayloadKind);
        }

        let a = &self.adv_params;
        if a.adv_int_min < 0x20 || a.adv_int_max > 0x4000 || a.adv_int_min > a.adv_int_max {
            return Err(ConfigError::AdvInterval);
        }
        if a.channel_map & ADV_CHANNEL_ALL == 0 {
            return Err(ConfigError::AdvChannels);
        }

        let c = &self.conn_params;
        if c.min_int < 0x0006 || c.max_int > 0x0C80 || c.min_int > c.max_int {
            return Err(ConfigError::ConnInterval);
        }
        if c.latency > 499 {
            return Err(ConfigError::ConnLatency);
        }
        // timeout_ms > (1 + latency) * max_int_ms * 2, in native units:
        // timeout * 10 > (1 + latency) * max_int * 1.25 * 2
        let needed = (1 + u32::from(c.latency)) * u32::from(c.max_int);
        if c.timeout < 0x000A || c.timeout > 0x0C80 || u32::from(c.timeout) * 4 <= needed {
            return Err(ConfigError::SupervisionTimeout);
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    EmptyName,
    NameTooLong,
    NoProfiles,
    /// App ids must be unique and equal to their table index.
    AppIdOutOfOrder(AppId),
    HandleBudget(AppId),
    PayloadKind,
    AdvInterval,
    AdvChannels,
    ConnInterval,
    ConnLatency,
    SupervisionTimeout,
    LocalMtu,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "device name is empty"),
            Self::NameTooLong => write!(f, "device name longer than {MAX_NAME_LEN} bytes"),
            Self::NoProfiles => write!(f, "no profiles declared"),
            Self::AppIdOutOfOrder(id) => write!(f, "app id {id} does not match its table slot"),
            Self::HandleBudget(id) => {
                write!(f, "profile {id} needs at least {HANDLES_PER_PROFILE} handles")
            }
            Self::PayloadKind => write!(f, "advertising and scan response payloads swapped"),
            Self::AdvInterval => write!(f, "advertising interval out of range"),
            Self::AdvChannels => write!(f, "no advertising channel enabled"),
            Self::ConnInterval => write!(f, "connection interval out of range"),
            Self::ConnLatency => write!(f, "slave latency out of range"),
            Self::SupervisionTimeout => write!(f, "supervision timeout too short or out of range"),
            Self::LocalMtu => write!(f, "local MTU outside 23..={MAX_LOCAL_MTU}"),
        }
    }
}
