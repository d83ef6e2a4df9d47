//! Per-profile attribute database construction.
//!
//! ```text
//!   bound ─▶ create service ─▶ SERVICE_CREATED ─▶ start + add char
//!         ─▶ CHAR_ADDED ─▶ add CCCD ─▶ DESCR_ADDED ─▶ Ready
//! ```
//!
//! Every completion is checked against the profile's expected step and
//! stored identity before it is applied.  A failed status or a rejected
//! follow-up command disables that profile only.

use log::{debug, info, warn};

use crate::app::ports::GattStack;
use crate::gatts::advertising::{AdvConfigKind, AdvertisingConfigurator};
use crate::gatts::profile::{BuildStep, Profile};
use crate::gatts::types::{AttrHandle, GattStatus, Uuid};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Moved to the next step.
    Advanced,
    /// Descriptor added; the profile is serving.
    Ready,
    /// The step failed and the profile is now disabled.
    Disabled,
    /// Out of order or not for this profile; nothing changed.
    Ignored,
}

#[derive(Debug, Default)]
pub struct ServiceBuilder {
    announced: bool,
}

impl ServiceBuilder {
    pub const fn new() -> Self {
        Self { announced: false }
    }

    /// Device name and advertising payloads have been requested.
    pub fn announced(&self) -> bool {
        self.announced
    }

    /// On the first successful registration of any profile: set the
    /// device name and request both advertising configurations.  Later
    /// calls do nothing.
    pub fn announce<S: GattStack>(
        &mut self,
        device_name: &str,
        adv: &mut AdvertisingConfigurator,
        stack: &mut S,
    ) {
        if self.announced {
            return;
        }
        self.announced = true;
        if let Err(e) = stack.set_device_name(device_name) {
            warn!("GAP: set device name failed: {e}");
        }
        // A rejected request already cleared its pending bit.
        let _ = adv.request_configuration(AdvConfigKind::AdvData, stack);
        let _ = adv.request_configuration(AdvConfigKind::ScanResponse, stack);
    }

    /// Declare the primary service for a freshly bound profile.
    pub fn begin<S: GattStack>(&self, profile: &mut Profile, stack: &mut S) -> StepOutcome {
        let (Some(interface), BuildStep::AwaitingService) = (profile.interface(), profile.step())
        else {
            return StepOutcome::Ignored;
        };
        let cfg = *profile.config();
        match stack.create_service(interface, &profile.service_id(), cfg.num_handles) {
            Ok(()) => {
                debug!("GATTS: app {} create service {}", cfg.app_id, cfg.service_uuid);
                StepOutcome::Advanced
            }
            Err(e) => fail(profile, "create service", e),
        }
    }

    pub fn on_service_created<S: GattStack>(
        &self,
        profile: &mut Profile,
        status: GattStatus,
        service_handle: AttrHandle,
        service_uuid: &Uuid,
        stack: &mut S,
    ) -> StepOutcome {
        let cfg = *profile.config();
        if profile.step() != BuildStep::AwaitingService || *service_uuid != cfg.service_uuid {
            debug!("GATTS: app {} unexpected service {service_uuid}", cfg.app_id);
            return StepOutcome::Ignored;
        }
        if !status.is_ok() {
            return fail(profile, "service creation", status);
        }
        profile.set_service_handle(service_handle);
        info!("GATTS: app {} service {} handle {service_handle}", cfg.app_id, cfg.service_uuid);

        if let Err(e) = stack.start_service(service_handle) {
            return fail(profile, "start service", e);
        }
        if let Err(e) = stack.add_char(service_handle, &cfg.char_uuid, cfg.permissions, cfg.properties) {
            return fail(profile, "add characteristic", e);
        }
        StepOutcome::Advanced
    }

    pub fn on_char_added<S: GattStack>(
        &self,
        profile: &mut Profile,
        status: GattStatus,
        attr_handle: AttrHandle,
        service_handle: AttrHandle,
        stack: &mut S,
    ) -> StepOutcome {
        let cfg = *profile.config();
        if profile.step() != BuildStep::AwaitingCharacteristic
            || profile.service_handle() != Some(service_handle)
        {
            return StepOutcome::Ignored;
        }
        if !status.is_ok() {
            return fail(profile, "characteristic", status);
        }
        profile.set_char_handle(attr_handle);
        debug!("GATTS: app {} char {} handle {attr_handle}", cfg.app_id, cfg.char_uuid);

        if let Err(e) = stack.add_char_descr(service_handle, &cfg.descr_uuid, cfg.permissions) {
            return fail(profile, "add descriptor", e);
        }
        StepOutcome::Advanced
    }

    pub fn on_descr_added(
        &self,
        profile: &mut Profile,
        status: GattStatus,
        attr_handle: AttrHandle,
        service_handle: AttrHandle,
    ) -> StepOutcome {
        if profile.step() != BuildStep::AwaitingDescriptor
            || profile.service_handle() != Some(service_handle)
        {
            return StepOutcome::Ignored;
        }
        if !status.is_ok() {
            return fail(profile, "descriptor", status);
        }
        profile.set_descr_handle(attr_handle);
        info!("GATTS: app {} ready (descr handle {attr_handle})", profile.app_id());
        StepOutcome::Ready
    }

    /// Service start completions don't gate the chain, but a failed start
    /// leaves the service unusable.
    pub fn on_service_started(
        &self,
        profile: &mut Profile,
        status: GattStatus,
        service_handle: AttrHandle,
    ) -> StepOutcome {
        if profile.service_handle() != Some(service_handle) || profile.is_disabled() {
            return StepOutcome::Ignored;
        }
        if !status.is_ok() {
            return fail(profile, "service start", status);
        }
        debug!("GATTS: app {} service {service_handle} started", profile.app_id());
        StepOutcome::Ignored
    }
}

fn fail(profile: &mut Profile, what: &str, cause: impl core::fmt::Debug) -> StepOutcome {
    warn!("GATTS: app {} {what} failed ({cause:?}), profile disabled", profile.app_id());
    profile.disable();
    StepOutcome::Disabled
}
