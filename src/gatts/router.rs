//! Event-to-profile resolution.
//!
//! Pure lookup: decides which profiles an event is for without touching
//! any of them.  Registration completions are resolved by `app_id`, every
//! other GATT-server event by interface id.

use crate::config::MAX_PROFILES;
use crate::gatts::event::GattsEvent;
use crate::gatts::profile::ProfileRegistry;
use crate::gatts::types::{AppId, GattIf, InterfaceId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Exactly one profile owns the event.
    Single(AppId),
    /// Stack-global event without an interface: every bound, enabled
    /// profile sees it, in table order.
    Broadcast(heapless::Vec<AppId, MAX_PROFILES>),
    Drop(DropReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Registration completion for an app id not in the table.
    UnknownApp(AppId),
    /// No profile is bound to this interface id.
    UnknownInterface(InterfaceId),
    /// The owning profile is disabled.
    Disabled(AppId),
    /// No interface id on an event kind that must carry one.
    Unscoped,
}

impl core::fmt::Display for DropReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownApp(id) => write!(f, "unknown app {id}"),
            Self::UnknownInterface(i) => write!(f, "no profile on {i}"),
            Self::Disabled(id) => write!(f, "app {id} disabled"),
            Self::Unscoped => write!(f, "no interface on a profile-scoped event"),
        }
    }
}

pub fn resolve(registry: &ProfileRegistry, gatts_if: GattIf, event: &GattsEvent) -> Route {
    if let GattsEvent::Register { app_id, .. } = event {
        return match registry.get(*app_id) {
            Some(_) => Route::Single(*app_id),
            None => Route::Drop(DropReason::UnknownApp(*app_id)),
        };
    }

    match gatts_if {
        GattIf::Bound(interface) => match registry.by_interface(interface) {
            Some(p) if p.is_disabled() => Route::Drop(DropReason::Disabled(p.app_id())),
            Some(p) => Route::Single(p.app_id()),
            None => Route::Drop(DropReason::UnknownInterface(interface)),
        },
        GattIf::Unspecified if event.is_link_scoped() => Route::Broadcast(registry.dispatchable()),
        GattIf::Unspecified => Route::Drop(DropReason::Unscoped),
    }
}
