//! Recording mock stack and test rig for integration tests.
//!
//! `MockStack` records every command the server issues so tests can assert
//! on the full command history; `Rig` plays the stack's side of the
//! conversation (registration, attribute-table creation, advertising acks).
//!
//! Also pulled into `tests/property_tests.rs`, which uses only part of it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lightgatt::app::events::AppEvent;
use lightgatt::app::ports::{DeviceStatePort, EventSink, GattStack, StorageError, StoragePort};
use lightgatt::app::service::GattServer;
use lightgatt::config::{AdvParams, AdvPayload, ConnParams, ServerConfig};
use lightgatt::error::{DriverError, StackError};
use lightgatt::gatts::event::{GapEvent, GattsEvent, ReadRequest, StackEvent, WriteRequest};
use lightgatt::gatts::types::{
    AppId, AttrHandle, AttrValue, BdAddr, BtStatus, CCCD_UUID, CharProperties, GattIf, GattStatus,
    InterfaceId, Permissions, ServiceId, Uuid,
};

// ── Stack command record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    BringUp(&'static str),
    RegisterApp(AppId),
    SetLocalMtu(u16),
    SetDeviceName(String),
    ConfigAdvData { scan_rsp: bool },
    StartAdvertising,
    UpdateConnParams(BdAddr),
    CreateService(InterfaceId, Uuid),
    StartService(AttrHandle),
    AddChar(AttrHandle, Uuid),
    AddCharDescr(AttrHandle, Uuid),
    Respond {
        gatts_if: InterfaceId,
        trans_id: u32,
        status: GattStatus,
        value: Option<Vec<u8>>,
    },
}

// ── MockStack ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockStack {
    pub cmds: Vec<Cmd>,
    /// Commands equal to this are recorded, then rejected.
    pub reject: Option<Cmd>,
}

impl MockStack {
    fn push(&mut self, cmd: Cmd) -> Result<(), StackError> {
        let rejected = self.reject.as_ref() == Some(&cmd);
        self.cmds.push(cmd);
        if rejected { Err(StackError(0x103)) } else { Ok(()) }
    }

    pub fn count(&self, cmd: &Cmd) -> usize {
        self.cmds.iter().filter(|c| *c == cmd).count()
    }

    pub fn adv_starts(&self) -> usize {
        self.count(&Cmd::StartAdvertising)
    }

    pub fn responses(&self) -> Vec<(u32, GattStatus, Option<Vec<u8>>)> {
        self.cmds
            .iter()
            .filter_map(|c| match c {
                Cmd::Respond {
                    trans_id,
                    status,
                    value,
                    ..
                } => Some((*trans_id, *status, value.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn last_response(&self) -> Option<(u32, GattStatus, Option<Vec<u8>>)> {
        self.responses().pop()
    }

    /// Interface the most recent response went out on.
    pub fn last_response_if(&self) -> Option<InterfaceId> {
        self.cmds.iter().rev().find_map(|c| match c {
            Cmd::Respond { gatts_if, .. } => Some(*gatts_if),
            _ => None,
        })
    }
}

impl GattStack for MockStack {
    fn release_classic_memory(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("mem_release"))
    }
    fn init_controller(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("controller_init"))
    }
    fn enable_controller(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("controller_enable"))
    }
    fn init_host(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("host_init"))
    }
    fn enable_host(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("host_enable"))
    }
    fn register_gatts_callback(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("gatts_callback"))
    }
    fn register_gap_callback(&mut self) -> Result<(), StackError> {
        self.push(Cmd::BringUp("gap_callback"))
    }
    fn register_app(&mut self, app_id: AppId) -> Result<(), StackError> {
        self.push(Cmd::RegisterApp(app_id))
    }
    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        self.push(Cmd::SetLocalMtu(mtu))
    }
    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        self.push(Cmd::SetDeviceName(name.to_owned()))
    }
    fn config_adv_data(&mut self, payload: &AdvPayload) -> Result<(), StackError> {
        self.push(Cmd::ConfigAdvData {
            scan_rsp: payload.set_scan_rsp,
        })
    }
    fn start_advertising(&mut self, _params: &AdvParams) -> Result<(), StackError> {
        self.push(Cmd::StartAdvertising)
    }
    fn update_conn_params(&mut self, remote: BdAddr, _params: &ConnParams) -> Result<(), StackError> {
        self.push(Cmd::UpdateConnParams(remote))
    }
    fn create_service(
        &mut self,
        gatts_if: InterfaceId,
        service: &ServiceId,
        _num_handles: u16,
    ) -> Result<(), StackError> {
        self.push(Cmd::CreateService(gatts_if, service.uuid))
    }
    fn start_service(&mut self, service_handle: AttrHandle) -> Result<(), StackError> {
        self.push(Cmd::StartService(service_handle))
    }
    fn add_char(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        _perm: Permissions,
        _props: CharProperties,
    ) -> Result<(), StackError> {
        self.push(Cmd::AddChar(service_handle, *uuid))
    }
    fn add_char_descr(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        _perm: Permissions,
    ) -> Result<(), StackError> {
        self.push(Cmd::AddCharDescr(service_handle, *uuid))
    }
    fn send_response(
        &mut self,
        gatts_if: InterfaceId,
        _conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        value: Option<&AttrValue>,
    ) -> Result<(), StackError> {
        self.push(Cmd::Respond {
            gatts_if,
            trans_id,
            status,
            value: value.map(|v| v.value.to_vec()),
        })
    }
}

// ── Device and sink ───────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MockLight {
    pub on: bool,
    pub unavailable: bool,
    pub sets: Vec<bool>,
}

impl DeviceStatePort for MockLight {
    fn get_state(&self) -> bool {
        self.on
    }

    fn set_state(&mut self, on: bool) -> Result<(), DriverError> {
        if self.unavailable {
            return Err(DriverError::Unavailable);
        }
        self.sets.push(on);
        self.on = on;
        Ok(())
    }
}

/// In-memory storage that counts commits.  Clones share the counter.
#[derive(Debug, Default)]
pub struct CountingStorage {
    values: HashMap<(String, String), Vec<u8>>,
    pub writes: Arc<AtomicUsize>,
}

impl CountingStorage {
    pub fn writes(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.writes)
    }
}

impl StoragePort for CountingStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let value = self
            .values
            .get(&(namespace.to_owned(), key.to_owned()))
            .ok_or(StorageError::NotFound)?;
        let len = value.len().min(buf.len());
        buf[..len].copy_from_slice(&value[..len]);
        Ok(len)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.values
            .insert((namespace.to_owned(), key.to_owned()), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.values.remove(&(namespace.to_owned(), key.to_owned()));
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.values
            .contains_key(&(namespace.to_owned(), key.to_owned()))
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Interface id the rig hands out for `app_id`.
pub const fn iface(app_id: AppId) -> u8 {
    3 + app_id as u8
}

/// Service handle the rig assigns `app_id`; char and descriptor follow.
pub const fn svc_handle(app_id: AppId) -> AttrHandle {
    40 + app_id * 4
}

pub const fn char_handle(app_id: AppId) -> AttrHandle {
    svc_handle(app_id) + 2
}

pub const fn descr_handle(app_id: AppId) -> AttrHandle {
    svc_handle(app_id) + 3
}

pub const PEER: BdAddr = BdAddr([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

pub struct Rig {
    pub server: GattServer,
    pub stack: MockStack,
    pub light: MockLight,
    pub sink: EventLog,
}

impl Rig {
    /// Constructed, not started.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            server: GattServer::new(config).expect("valid config"),
            stack: MockStack::default(),
            light: MockLight::default(),
            sink: EventLog::default(),
        }
    }

    /// Default config, bring-up and registration submitted.
    pub fn started() -> Self {
        let mut rig = Self::new(ServerConfig::default());
        rig.server
            .start(&mut rig.stack, &mut rig.sink)
            .expect("start succeeds");
        rig
    }

    /// Both profiles built and advertising on air.
    pub fn ready() -> Self {
        let mut rig = Self::started();
        for app_id in 0..2 {
            rig.register(app_id);
            rig.build(app_id);
        }
        rig.ack_adv_config();
        rig
    }

    pub fn deliver(&mut self, event: StackEvent) {
        self.server
            .handle_event(&event, &mut self.stack, &mut self.light, &mut self.sink);
    }

    pub fn gatts(&mut self, iface: u8, event: GattsEvent) {
        self.deliver(StackEvent::gatts(GattIf::from_raw(iface), event));
    }

    pub fn gap(&mut self, event: GapEvent) {
        self.deliver(StackEvent::Gap(event));
    }

    pub fn register(&mut self, app_id: AppId) {
        self.gatts(
            iface(app_id),
            GattsEvent::Register {
                status: GattStatus::Ok,
                app_id,
            },
        );
    }

    fn profile_uuids(&self, app_id: AppId) -> (Uuid, Uuid) {
        let cfg = self.server.profiles().get(app_id).expect("profile").config();
        (cfg.service_uuid, cfg.char_uuid)
    }

    pub fn service_created(&mut self, app_id: AppId) {
        let (service_uuid, _) = self.profile_uuids(app_id);
        self.gatts(
            iface(app_id),
            GattsEvent::ServiceCreated {
                status: GattStatus::Ok,
                service_handle: svc_handle(app_id),
                service_uuid,
            },
        );
    }

    pub fn char_added(&mut self, app_id: AppId) {
        let (_, char_uuid) = self.profile_uuids(app_id);
        self.gatts(
            iface(app_id),
            GattsEvent::CharAdded {
                status: GattStatus::Ok,
                attr_handle: char_handle(app_id),
                service_handle: svc_handle(app_id),
                char_uuid,
            },
        );
    }

    pub fn descr_added(&mut self, app_id: AppId) {
        self.gatts(
            iface(app_id),
            GattsEvent::DescrAdded {
                status: GattStatus::Ok,
                attr_handle: descr_handle(app_id),
                service_handle: svc_handle(app_id),
                descr_uuid: Uuid::Uuid16(CCCD_UUID),
            },
        );
    }

    pub fn service_started(&mut self, app_id: AppId) {
        self.gatts(
            iface(app_id),
            GattsEvent::ServiceStarted {
                status: GattStatus::Ok,
                service_handle: svc_handle(app_id),
            },
        );
    }

    /// Complete the whole attribute-table chain for a registered profile.
    pub fn build(&mut self, app_id: AppId) {
        self.service_created(app_id);
        self.service_started(app_id);
        self.char_added(app_id);
        self.descr_added(app_id);
    }

    pub fn ack_adv_config(&mut self) {
        self.gap(GapEvent::AdvDataSetComplete {
            status: BtStatus::Success,
        });
        self.gap(GapEvent::ScanRspDataSetComplete {
            status: BtStatus::Success,
        });
    }

    /// Link events arrive once per registered interface.
    pub fn connect(&mut self, conn_id: u16) {
        for app_id in 0..2 {
            self.gatts(
                iface(app_id),
                GattsEvent::Connect {
                    conn_id,
                    remote: PEER,
                },
            );
        }
    }

    pub fn disconnect(&mut self, conn_id: u16) {
        for app_id in 0..2 {
            self.gatts(
                iface(app_id),
                GattsEvent::Disconnect {
                    conn_id,
                    remote: PEER,
                    reason: 0x13,
                },
            );
        }
    }

    pub fn read(&mut self, app_id: AppId, handle: AttrHandle, trans_id: u32) {
        self.gatts(
            iface(app_id),
            GattsEvent::Read(ReadRequest {
                conn_id: 0,
                trans_id,
                handle,
                offset: 0,
            }),
        );
    }

    pub fn write(&mut self, app_id: AppId, handle: AttrHandle, bytes: &[u8], need_rsp: bool, trans_id: u32) {
        self.gatts(
            iface(app_id),
            GattsEvent::Write(WriteRequest::new(0, trans_id, handle, bytes, need_rsp)),
        );
    }
}
