//! Outbound application events.
//!
//! The [`GattServer`](super::service::GattServer) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (log to serial, count them in tests).

use crate::gatts::router::DropReason;
use crate::gatts::types::{AppId, AttrHandle, BdAddr, InterfaceId};

/// Structured events emitted by the GATT server core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Controller and host are up, profiles submitted for registration.
    StackReady { profiles: usize },

    /// A profile received its interface id.
    ProfileBound { app_id: AppId, interface: InterfaceId },

    /// A profile finished building its attribute table.
    ProfileReady {
        app_id: AppId,
        service_handle: AttrHandle,
        char_handle: AttrHandle,
    },

    /// A profile failed registration or construction and is out of service.
    ProfileDisabled { app_id: AppId },

    /// Both payloads acknowledged and advertising requested.
    AdvertisingConfigured,

    /// The controller confirmed advertising is on air.
    AdvertisingStarted,

    Connected { conn_id: u16, remote: BdAddr },

    Disconnected { conn_id: u16, reason: u16 },

    ConnParamsUpdated {
        interval: u16,
        latency: u16,
        timeout: u16,
    },

    MtuChanged { conn_id: u16, mtu: u16 },

    /// A peer write changed the device state.
    LightChanged { on: bool },

    /// A stack event matched no profile.
    EventDropped { kind: &'static str, reason: DropReason },
}
