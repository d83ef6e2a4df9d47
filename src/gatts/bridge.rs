//! Characteristic I/O bridge.
//!
//! Serves reads and writes on a profile's attributes from the external
//! device state.  Every read is answered; a write is answered only when
//! the peer asked for a response.

use log::{debug, warn};

use crate::app::ports::{DeviceStatePort, GattStack};
use crate::config::ProfileBehavior;
use crate::gatts::event::{ReadRequest, WriteRequest};
use crate::gatts::profile::Profile;
use crate::gatts::types::{AttrValue, GattStatus, InterfaceId};

/// Result of serving a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub status: GattStatus,
    /// Device state applied by this write, if any.
    pub applied: Option<bool>,
}

impl WriteOutcome {
    const fn status(status: GattStatus) -> Self {
        Self {
            status,
            applied: None,
        }
    }
}

pub fn on_read<S: GattStack, D: DeviceStatePort>(
    profile: &Profile,
    interface: InterfaceId,
    req: &ReadRequest,
    device: &D,
    stack: &mut S,
) -> GattStatus {
    let current: Result<heapless::Vec<u8, 2>, GattStatus> = if Some(req.handle) == profile.char_handle() {
        if profile.config().properties.is_readable() {
            Ok(heapless::Vec::from_iter([u8::from(device.get_state())]))
        } else {
            Err(GattStatus::ReadNotPermitted)
        }
    } else if Some(req.handle) == profile.descr_handle() {
        Ok(heapless::Vec::from_iter(profile.cccd.to_le_bytes()))
    } else {
        Err(GattStatus::InvalidHandle)
    };

    let (status, value) = match current {
        Ok(bytes) if usize::from(req.offset) > bytes.len() => (GattStatus::InvalidOffset, None),
        Ok(bytes) => {
            let mut v = AttrValue::new(req.handle, &bytes[usize::from(req.offset)..]);
            v.offset = req.offset;
            (GattStatus::Ok, Some(v))
        }
        Err(status) => (status, None),
    };

    debug!(
        "GATTS: app {} read handle {} -> {status:?}",
        profile.app_id(),
        req.handle
    );
    respond(stack, interface, req.conn_id, req.trans_id, status, value.as_ref());
    status
}

pub fn on_write<S: GattStack, D: DeviceStatePort>(
    profile: &mut Profile,
    interface: InterfaceId,
    req: &WriteRequest,
    device: &mut D,
    stack: &mut S,
) -> WriteOutcome {
    let outcome = if req.is_prep {
        WriteOutcome::status(GattStatus::RequestNotSupported)
    } else if Some(req.handle) == profile.char_handle() {
        write_value(profile, req, device)
    } else if Some(req.handle) == profile.descr_handle() {
        match <[u8; 2]>::try_from(req.value.as_slice()) {
            Ok(raw) => {
                profile.cccd = u16::from_le_bytes(raw);
                debug!("GATTS: app {} cccd 0x{:04x}", profile.app_id(), profile.cccd);
                WriteOutcome::status(GattStatus::Ok)
            }
            Err(_) => WriteOutcome::status(GattStatus::InvalidAttributeLength),
        }
    } else {
        WriteOutcome::status(GattStatus::InvalidHandle)
    };

    debug!(
        "GATTS: app {} write handle {} len {} -> {:?}",
        profile.app_id(),
        req.handle,
        req.value.len(),
        outcome.status
    );
    if req.need_rsp {
        respond(stack, interface, req.conn_id, req.trans_id, outcome.status, None);
    }
    outcome
}

fn write_value<D: DeviceStatePort>(profile: &Profile, req: &WriteRequest, device: &mut D) -> WriteOutcome {
    let cfg = profile.config();
    if !cfg.properties.is_writable() || cfg.behavior == ProfileBehavior::StateReport {
        return WriteOutcome::status(GattStatus::WriteNotPermitted);
    }
    let Some(&first) = req.value.first() else {
        return WriteOutcome::status(GattStatus::InvalidAttributeLength);
    };
    let on = first != 0;
    match device.set_state(on) {
        Ok(()) => WriteOutcome {
            status: GattStatus::Ok,
            applied: Some(on),
        },
        Err(e) => {
            warn!("GATTS: app {} set state failed: {e}", profile.app_id());
            WriteOutcome::status(GattStatus::UnlikelyError)
        }
    }
}

/// Prepared writes are refused, so there is never a queue to execute or
/// cancel; acknowledge either way.
pub fn on_exec_write<S: GattStack>(interface: InterfaceId, conn_id: u16, trans_id: u32, stack: &mut S) {
    respond(stack, interface, conn_id, trans_id, GattStatus::Ok, None);
}

fn respond<S: GattStack>(
    stack: &mut S,
    interface: InterfaceId,
    conn_id: u16,
    trans_id: u32,
    status: GattStatus,
    value: Option<&AttrValue>,
) {
    if let Err(e) = stack.send_response(interface, conn_id, trans_id, status, value) {
        warn!("GATTS: send response (trans {trans_id}) failed: {e}");
    }
}
