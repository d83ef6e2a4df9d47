//! Advertising configuration gate.
//!
//! The advertising payload and the scan response are configured by two
//! independent commands whose acknowledgements arrive in any order.
//! Advertising starts on the acknowledgement that clears the last pending
//! bit, and only then.

use log::{debug, info, warn};

use crate::app::ports::GattStack;
use crate::config::{AdvParams, AdvPayload};
use crate::error::StackError;

const ADV_CONFIG_FLAG: u8 = 1 << 0;
const SCAN_RSP_CONFIG_FLAG: u8 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvConfigKind {
    AdvData,
    ScanResponse,
}

impl AdvConfigKind {
    const fn bit(self) -> u8 {
        match self {
            Self::AdvData => ADV_CONFIG_FLAG,
            Self::ScanResponse => SCAN_RSP_CONFIG_FLAG,
        }
    }
}

/// What an acknowledgement did to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// The other configuration is still outstanding.
    Waiting,
    /// Last bit cleared; `start_advertising` was issued.
    Started,
    /// Last bit cleared but the stack refused `start_advertising`.
    StartFailed(StackError),
    /// The bit was not pending: stray or duplicate acknowledgement.
    Ignored,
}

#[derive(Debug)]
pub struct AdvertisingConfigurator {
    adv_data: AdvPayload,
    scan_rsp: AdvPayload,
    params: AdvParams,
    pending_mask: u8,
    configured: bool,
}

impl AdvertisingConfigurator {
    pub fn new(adv_data: AdvPayload, scan_rsp: AdvPayload, params: AdvParams) -> Self {
        Self {
            adv_data,
            scan_rsp,
            params,
            pending_mask: 0,
            configured: false,
        }
    }

    pub fn pending_mask(&self) -> u8 {
        self.pending_mask
    }

    /// Both payloads have been acknowledged at least once.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Mark `kind` pending and send its payload.
    ///
    /// If the stack rejects the command the bit is cleared again, so the
    /// gate never waits on an acknowledgement that cannot arrive.
    pub fn request_configuration<S: GattStack>(
        &mut self,
        kind: AdvConfigKind,
        stack: &mut S,
    ) -> Result<(), StackError> {
        self.pending_mask |= kind.bit();
        let payload = match kind {
            AdvConfigKind::AdvData => &self.adv_data,
            AdvConfigKind::ScanResponse => &self.scan_rsp,
        };
        if let Err(e) = stack.config_adv_data(payload) {
            self.pending_mask &= !kind.bit();
            warn!("ADV: config {kind:?} rejected: {e}");
            return Err(e);
        }
        debug!("ADV: config {kind:?} requested, pending=0b{:02b}", self.pending_mask);
        Ok(())
    }

    pub fn on_configuration_acked<S: GattStack>(
        &mut self,
        kind: AdvConfigKind,
        stack: &mut S,
    ) -> AckOutcome {
        if self.pending_mask & kind.bit() == 0 {
            debug!("ADV: stray {kind:?} ack ignored");
            return AckOutcome::Ignored;
        }
        self.pending_mask &= !kind.bit();
        if self.pending_mask != 0 {
            return AckOutcome::Waiting;
        }

        self.configured = true;
        match stack.start_advertising(&self.params) {
            Ok(()) => {
                info!("ADV: payloads configured, advertising requested");
                AckOutcome::Started
            }
            Err(e) => {
                warn!("ADV: start advertising failed: {e}");
                AckOutcome::StartFailed(e)
            }
        }
    }

    /// Re-enter discoverability after a link drops.
    ///
    /// Returns `false` without touching the stack while the payloads are
    /// still being configured; the outstanding ack starts advertising.
    pub fn restart<S: GattStack>(&mut self, stack: &mut S) -> Result<bool, StackError> {
        if !self.configured {
            debug!("ADV: restart deferred, configuration pending");
            return Ok(false);
        }
        stack.start_advertising(&self.params)?;
        Ok(true)
    }
}
