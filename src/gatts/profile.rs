//! Profile table.
//!
//! One entry per declared profile, indexed by `app_id`.  The only fields
//! that ever change are the interface id and the attribute handles, each
//! assigned at most once, plus the construction step.

use log::warn;

use crate::config::{MAX_PROFILES, ProfileBehavior, ProfileConfig};
use crate::gatts::types::{AppId, AttrHandle, InterfaceId, ServiceId};

/// Where a profile is in its construction chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Registration submitted, no interface id yet.
    Unregistered,
    AwaitingService,
    AwaitingCharacteristic,
    AwaitingDescriptor,
    Ready,
    /// Registration or a creation step failed; excluded from dispatch.
    Disabled,
}

#[derive(Debug, Clone)]
pub struct Profile {
    config: ProfileConfig,
    interface: Option<InterfaceId>,
    service_handle: Option<AttrHandle>,
    char_handle: Option<AttrHandle>,
    descr_handle: Option<AttrHandle>,
    step: BuildStep,
    /// Client characteristic configuration value (notify/indicate bits).
    pub cccd: u16,
    /// Link this profile last saw connect, if still up.
    pub conn_id: Option<u16>,
}

impl Profile {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            config,
            interface: None,
            service_handle: None,
            char_handle: None,
            descr_handle: None,
            step: BuildStep::Unregistered,
            cccd: 0,
            conn_id: None,
        }
    }

    pub fn app_id(&self) -> AppId {
        self.config.app_id
    }

    pub fn config(&self) -> &ProfileConfig {
        &self.config
    }

    pub fn behavior(&self) -> ProfileBehavior {
        self.config.behavior
    }

    pub fn service_id(&self) -> ServiceId {
        ServiceId::primary(self.config.service_uuid)
    }

    pub fn interface(&self) -> Option<InterfaceId> {
        self.interface
    }

    pub fn service_handle(&self) -> Option<AttrHandle> {
        self.service_handle
    }

    pub fn char_handle(&self) -> Option<AttrHandle> {
        self.char_handle
    }

    pub fn descr_handle(&self) -> Option<AttrHandle> {
        self.descr_handle
    }

    pub fn step(&self) -> BuildStep {
        self.step
    }

    pub fn is_disabled(&self) -> bool {
        self.step == BuildStep::Disabled
    }

    pub fn is_ready(&self) -> bool {
        self.step == BuildStep::Ready
    }

    /// Bound to an interface and not disabled.
    pub fn is_dispatchable(&self) -> bool {
        self.interface.is_some() && !self.is_disabled()
    }

    pub(crate) fn bind(&mut self, interface: InterfaceId) -> bool {
        if self.interface.is_some() || self.is_disabled() {
            return false;
        }
        self.interface = Some(interface);
        self.step = BuildStep::AwaitingService;
        true
    }

    pub(crate) fn set_service_handle(&mut self, handle: AttrHandle) {
        assign_once(&mut self.service_handle, handle, self.config.app_id, "service");
        self.step = BuildStep::AwaitingCharacteristic;
    }

    pub(crate) fn set_char_handle(&mut self, handle: AttrHandle) {
        assign_once(&mut self.char_handle, handle, self.config.app_id, "char");
        self.step = BuildStep::AwaitingDescriptor;
    }

    pub(crate) fn set_descr_handle(&mut self, handle: AttrHandle) {
        assign_once(&mut self.descr_handle, handle, self.config.app_id, "descr");
        self.step = BuildStep::Ready;
    }

    pub(crate) fn disable(&mut self) {
        self.step = BuildStep::Disabled;
    }
}

fn assign_once(slot: &mut Option<AttrHandle>, handle: AttrHandle, app_id: AppId, what: &str) {
    match slot {
        Some(existing) => {
            warn!("GATTS: app {app_id} {what} handle already {existing}, ignoring {handle}");
        }
        None => *slot = Some(handle),
    }
}

/// Fixed-capacity profile table, built once from configuration.
#[derive(Debug)]
pub struct ProfileRegistry {
    profiles: heapless::Vec<Profile, MAX_PROFILES>,
}

impl ProfileRegistry {
    /// `configs` is assumed validated: app ids equal their index.
    pub fn new(configs: &[ProfileConfig]) -> Self {
        let mut profiles = heapless::Vec::new();
        for c in configs.iter().take(MAX_PROFILES) {
            // Bounded by take() above.
            let _ = profiles.push(Profile::new(*c));
        }
        Self { profiles }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.iter()
    }

    pub fn get(&self, app_id: AppId) -> Option<&Profile> {
        self.profiles.get(usize::from(app_id))
    }

    pub fn get_mut(&mut self, app_id: AppId) -> Option<&mut Profile> {
        self.profiles.get_mut(usize::from(app_id))
    }

    /// Store the interface id for `app_id`.  `false` when the app id is
    /// unknown or already bound.
    pub fn bind(&mut self, app_id: AppId, interface: InterfaceId) -> bool {
        self.get_mut(app_id).is_some_and(|p| p.bind(interface))
    }

    pub fn disable(&mut self, app_id: AppId) -> bool {
        match self.get_mut(app_id) {
            Some(p) => {
                p.disable();
                true
            }
            None => false,
        }
    }

    /// The profile bound to `interface`, including disabled ones.
    pub fn by_interface(&self, interface: InterfaceId) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.interface == Some(interface))
    }

    /// App ids of every bound, non-disabled profile, in table order.
    pub fn dispatchable(&self) -> heapless::Vec<AppId, MAX_PROFILES> {
        self.profiles
            .iter()
            .filter(|p| p.is_dispatchable())
            .map(Profile::app_id)
            .collect()
    }

    pub fn all_ready(&self) -> bool {
        self.profiles
            .iter()
            .all(|p| p.is_ready() || p.is_disabled())
    }
}
