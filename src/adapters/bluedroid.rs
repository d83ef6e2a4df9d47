//! Bluedroid adapter.
//!
//! Two halves:
//!
//! - [`BluedroidStack`] implements [`GattStack`] by calling straight into
//!   the ESP-IDF Bluedroid C API.  On host it logs each command and
//!   accepts it, so the firmware wiring runs unchanged in simulation.
//! - The callback side: Bluedroid invokes two C callbacks on its BTC task.
//!   They decode the raw parameter unions into [`StackEvent`]s and hand
//!   them to the installed [`Dispatcher`].
//!
//! ## Locking
//!
//! The dispatcher lives in one static `Mutex`.  `main` installs it and runs
//! [`GattServer::start`] while holding that lock, so registration events
//! raised during start-up wait for the lock instead of being lost.  All
//! later access comes from the BTC task only.

use std::sync::Mutex;

use log::debug;

use crate::adapters::light_state::LightStateAdapter;
use crate::adapters::log_sink::LogEventSink;
use crate::adapters::nvs::NvsAdapter;
use crate::app::ports::GattStack;
use crate::app::service::GattServer;
use crate::config::{AdvParams, AdvPayload, ConnParams};
use crate::error::StackError;
use crate::gatts::event::StackEvent;
use crate::gatts::types::{
    AppId, AttrHandle, AttrValue, BdAddr, CharProperties, GattStatus, InterfaceId, Permissions,
    ServiceId, Uuid,
};

#[cfg(target_os = "espidf")]
use crate::config::{AdvFilterPolicy, AdvType, MAX_PROFILES, OwnAddrType};
#[cfg(target_os = "espidf")]
use crate::gatts::event::{ConnParamsUpdate, GapEvent, GattsEvent, ReadRequest, WriteRequest};
#[cfg(target_os = "espidf")]
use crate::gatts::types::{BtStatus, GattIf, MAX_READ_LEN};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

// ───────────────────────────────────────────────────────────────
// Dispatcher
// ───────────────────────────────────────────────────────────────

/// Everything a stack callback needs to serve an event.
pub struct Dispatcher {
    pub server: GattServer,
    pub device: LightStateAdapter<NvsAdapter>,
    pub sink: LogEventSink,
}

static DISPATCHER: Mutex<Option<Dispatcher>> = Mutex::new(None);

/// Install the dispatcher, replacing any previous one.
pub fn install(dispatcher: Dispatcher) {
    match DISPATCHER.lock() {
        Ok(mut slot) => *slot = Some(dispatcher),
        Err(poisoned) => *poisoned.into_inner() = Some(dispatcher),
    }
}

/// Run `f` on the installed dispatcher under the lock.
///
/// Returns `None` when nothing is installed or the lock is poisoned.
pub fn with_dispatcher<T>(f: impl FnOnce(&mut Dispatcher) -> T) -> Option<T> {
    let mut slot = DISPATCHER.lock().ok()?;
    slot.as_mut().map(f)
}

/// Feed one decoded event through the server.  Returns `false` if it was
/// discarded because no dispatcher is installed.
pub fn dispatch(event: &StackEvent) -> bool {
    let handled = with_dispatcher(|d| {
        d.server
            .handle_event(event, &mut BluedroidStack, &mut d.device, &mut d.sink);
    });
    if handled.is_none() {
        debug!("BT: no dispatcher, event discarded: {event:?}");
    }
    handled.is_some()
}

// ───────────────────────────────────────────────────────────────
// Command side
// ───────────────────────────────────────────────────────────────

/// Zero-sized handle onto the process-wide Bluedroid instance.
#[derive(Debug, Default, Clone, Copy)]
pub struct BluedroidStack;

#[cfg(target_os = "espidf")]
fn esp(ret: esp_err_t) -> Result<(), StackError> {
    if ret == ESP_OK as i32 {
        Ok(())
    } else {
        Err(StackError(ret))
    }
}

#[cfg(target_os = "espidf")]
fn to_esp_uuid(uuid: &Uuid) -> esp_bt_uuid_t {
    // SAFETY: esp_bt_uuid_t is plain data; all-zero is a valid value.
    let mut raw: esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    match *uuid {
        Uuid::Uuid16(u) => {
            raw.len = 2;
            raw.uuid.uuid16 = u;
        }
        Uuid::Uuid32(u) => {
            raw.len = 4;
            raw.uuid.uuid32 = u;
        }
        Uuid::Uuid128(bytes) => {
            raw.len = 16;
            raw.uuid.uuid128 = bytes;
        }
    }
    raw
}

#[cfg(target_os = "espidf")]
fn from_esp_uuid(raw: &esp_bt_uuid_t) -> Uuid {
    // SAFETY: `len` selects the active union member.
    unsafe {
        match raw.len {
            2 => Uuid::Uuid16(raw.uuid.uuid16),
            4 => Uuid::Uuid32(raw.uuid.uuid32),
            _ => Uuid::Uuid128(raw.uuid.uuid128),
        }
    }
}

#[cfg(target_os = "espidf")]
impl GattStack for BluedroidStack {
    fn release_classic_memory(&mut self) -> Result<(), StackError> {
        esp(unsafe { esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT) })
    }

    fn init_controller(&mut self) -> Result<(), StackError> {
        let mut cfg = esp_bt_controller_config_t::default();
        esp(unsafe { esp_bt_controller_init(&mut cfg) })
    }

    fn enable_controller(&mut self) -> Result<(), StackError> {
        esp(unsafe { esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE) })
    }

    fn init_host(&mut self) -> Result<(), StackError> {
        esp(unsafe { esp_bluedroid_init() })
    }

    fn enable_host(&mut self) -> Result<(), StackError> {
        esp(unsafe { esp_bluedroid_enable() })
    }

    fn register_gatts_callback(&mut self) -> Result<(), StackError> {
        esp(unsafe { esp_ble_gatts_register_callback(Some(gatts_event_handler)) })
    }

    fn register_gap_callback(&mut self) -> Result<(), StackError> {
        esp(unsafe { esp_ble_gap_register_callback(Some(gap_event_handler)) })
    }

    fn register_app(&mut self, app_id: AppId) -> Result<(), StackError> {
        esp(unsafe { esp_ble_gatts_app_register(app_id) })
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        esp(unsafe { esp_ble_gatt_set_local_mtu(mtu) })
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        let name = std::ffi::CString::new(name).map_err(|_| StackError(ESP_ERR_INVALID_ARG as i32))?;
        esp(unsafe { esp_ble_gap_set_device_name(name.as_ptr()) })
    }

    fn config_adv_data(&mut self, payload: &AdvPayload) -> Result<(), StackError> {
        // Bluedroid copies the payload before returning.
        let mut uuids = [0u8; 16 * MAX_PROFILES];
        for (slot, uuid) in uuids.chunks_exact_mut(16).zip(&payload.service_uuids) {
            slot.copy_from_slice(uuid);
        }
        let uuid_len = 16 * payload.service_uuids.len();
        let mut data = esp_ble_adv_data_t {
            set_scan_rsp: payload.set_scan_rsp,
            include_name: payload.include_name,
            include_txpower: payload.include_txpower,
            min_interval: i32::from(payload.min_interval),
            max_interval: i32::from(payload.max_interval),
            appearance: i32::from(payload.appearance),
            manufacturer_len: 0,
            p_manufacturer_data: core::ptr::null_mut(),
            service_data_len: 0,
            p_service_data: core::ptr::null_mut(),
            service_uuid_len: uuid_len as u16,
            p_service_uuid: if uuid_len == 0 {
                core::ptr::null_mut()
            } else {
                uuids.as_mut_ptr()
            },
            flag: payload.flag,
        };
        esp(unsafe { esp_ble_gap_config_adv_data(&mut data) })
    }

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError> {
        let adv_type = match params.adv_type {
            AdvType::ConnectableUndirected => esp_ble_adv_type_t_ADV_TYPE_IND,
            AdvType::ScannableUndirected => esp_ble_adv_type_t_ADV_TYPE_SCAN_IND,
            AdvType::NonConnectable => esp_ble_adv_type_t_ADV_TYPE_NONCONN_IND,
        };
        let own_addr_type = match params.own_addr_type {
            OwnAddrType::Public => esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
            OwnAddrType::Random => esp_ble_addr_type_t_BLE_ADDR_TYPE_RANDOM,
        };
        let adv_filter_policy = match params.filter_policy {
            AdvFilterPolicy::AllowAny => esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
            AdvFilterPolicy::WhitelistScan => esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_WLST_CON_ANY,
            AdvFilterPolicy::WhitelistConnect => {
                esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_WLST
            }
            AdvFilterPolicy::WhitelistBoth => {
                esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_WLST_CON_WLST
            }
        };
        let mut raw = esp_ble_adv_params_t {
            adv_int_min: params.adv_int_min,
            adv_int_max: params.adv_int_max,
            adv_type,
            own_addr_type,
            channel_map: esp_ble_adv_channel_t::from(params.channel_map),
            adv_filter_policy,
            // SAFETY: peer address fields are unused for undirected advertising.
            ..unsafe { core::mem::zeroed() }
        };
        esp(unsafe { esp_ble_gap_start_advertising(&mut raw) })
    }

    fn update_conn_params(&mut self, remote: BdAddr, params: &ConnParams) -> Result<(), StackError> {
        let mut raw = esp_ble_conn_update_params_t {
            bda: remote.0,
            min_int: params.min_int,
            max_int: params.max_int,
            latency: params.latency,
            timeout: params.timeout,
        };
        esp(unsafe { esp_ble_gap_update_conn_params(&mut raw) })
    }

    fn create_service(
        &mut self,
        gatts_if: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), StackError> {
        let mut id = esp_gatt_srvc_id_t {
            id: esp_gatt_id_t {
                uuid: to_esp_uuid(&service.uuid),
                inst_id: service.inst_id,
            },
            is_primary: service.is_primary,
        };
        esp(unsafe { esp_ble_gatts_create_service(gatts_if.0, &mut id, num_handles) })
    }

    fn start_service(&mut self, service_handle: AttrHandle) -> Result<(), StackError> {
        esp(unsafe { esp_ble_gatts_start_service(service_handle) })
    }

    fn add_char(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        perm: Permissions,
        props: CharProperties,
    ) -> Result<(), StackError> {
        let mut raw = to_esp_uuid(uuid);
        esp(unsafe {
            esp_ble_gatts_add_char(
                service_handle,
                &mut raw,
                perm.0 as esp_gatt_perm_t,
                props.0 as esp_gatt_char_prop_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            )
        })
    }

    fn add_char_descr(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        perm: Permissions,
    ) -> Result<(), StackError> {
        let mut raw = to_esp_uuid(uuid);
        esp(unsafe {
            esp_ble_gatts_add_char_descr(
                service_handle,
                &mut raw,
                perm.0 as esp_gatt_perm_t,
                core::ptr::null_mut(),
                core::ptr::null_mut(),
            )
        })
    }

    fn send_response(
        &mut self,
        gatts_if: InterfaceId,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        value: Option<&AttrValue>,
    ) -> Result<(), StackError> {
        let status = status.raw() as esp_gatt_status_t;
        let Some(value) = value else {
            return esp(unsafe {
                esp_ble_gatts_send_response(gatts_if.0, conn_id, trans_id, status, core::ptr::null_mut())
            });
        };
        // SAFETY: esp_gatt_rsp_t is plain data; all-zero is a valid value.
        let mut rsp: esp_gatt_rsp_t = unsafe { core::mem::zeroed() };
        let len = value.value.len().min(MAX_READ_LEN);
        unsafe {
            rsp.attr_value.handle = value.handle;
            rsp.attr_value.offset = value.offset;
            rsp.attr_value.len = len as u16;
            rsp.attr_value.value[..len].copy_from_slice(&value.value[..len]);
        }
        esp(unsafe { esp_ble_gatts_send_response(gatts_if.0, conn_id, trans_id, status, &mut rsp) })
    }
}

#[cfg(not(target_os = "espidf"))]
impl GattStack for BluedroidStack {
    fn release_classic_memory(&mut self) -> Result<(), StackError> {
        debug!("BT(sim): release classic memory");
        Ok(())
    }

    fn init_controller(&mut self) -> Result<(), StackError> {
        debug!("BT(sim): controller init");
        Ok(())
    }

    fn enable_controller(&mut self) -> Result<(), StackError> {
        debug!("BT(sim): controller enable (BLE)");
        Ok(())
    }

    fn init_host(&mut self) -> Result<(), StackError> {
        debug!("BT(sim): host init");
        Ok(())
    }

    fn enable_host(&mut self) -> Result<(), StackError> {
        debug!("BT(sim): host enable");
        Ok(())
    }

    fn register_gatts_callback(&mut self) -> Result<(), StackError> {
        Ok(())
    }

    fn register_gap_callback(&mut self) -> Result<(), StackError> {
        Ok(())
    }

    fn register_app(&mut self, app_id: AppId) -> Result<(), StackError> {
        debug!("BT(sim): register app {app_id}");
        Ok(())
    }

    fn set_local_mtu(&mut self, mtu: u16) -> Result<(), StackError> {
        debug!("BT(sim): local MTU {mtu}");
        Ok(())
    }

    fn set_device_name(&mut self, name: &str) -> Result<(), StackError> {
        debug!("BT(sim): device name '{name}'");
        Ok(())
    }

    fn config_adv_data(&mut self, payload: &AdvPayload) -> Result<(), StackError> {
        debug!(
            "BT(sim): configure {} ({} service uuids)",
            if payload.set_scan_rsp { "scan response" } else { "adv data" },
            payload.service_uuids.len()
        );
        Ok(())
    }

    fn start_advertising(&mut self, params: &AdvParams) -> Result<(), StackError> {
        debug!(
            "BT(sim): advertising 0x{:x}-0x{:x}",
            params.adv_int_min, params.adv_int_max
        );
        Ok(())
    }

    fn update_conn_params(&mut self, remote: BdAddr, params: &ConnParams) -> Result<(), StackError> {
        debug!("BT(sim): conn params for {remote}: {params:?}");
        Ok(())
    }

    fn create_service(
        &mut self,
        gatts_if: InterfaceId,
        service: &ServiceId,
        num_handles: u16,
    ) -> Result<(), StackError> {
        debug!("BT(sim): create service {} on {gatts_if} ({num_handles} handles)", service.uuid);
        Ok(())
    }

    fn start_service(&mut self, service_handle: AttrHandle) -> Result<(), StackError> {
        debug!("BT(sim): start service {service_handle}");
        Ok(())
    }

    fn add_char(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        _perm: Permissions,
        _props: CharProperties,
    ) -> Result<(), StackError> {
        debug!("BT(sim): add char {uuid} to {service_handle}");
        Ok(())
    }

    fn add_char_descr(
        &mut self,
        service_handle: AttrHandle,
        uuid: &Uuid,
        _perm: Permissions,
    ) -> Result<(), StackError> {
        debug!("BT(sim): add descr {uuid} to {service_handle}");
        Ok(())
    }

    fn send_response(
        &mut self,
        gatts_if: InterfaceId,
        conn_id: u16,
        trans_id: u32,
        status: GattStatus,
        value: Option<&AttrValue>,
    ) -> Result<(), StackError> {
        debug!(
            "BT(sim): rsp {gatts_if} conn={conn_id} trans={trans_id} {status:?} {:02x?}",
            value.map(|v| v.value.as_slice())
        );
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Callback side (BTC task)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn bytes<const N: usize>(ptr: *const u8, len: u16) -> heapless::Vec<u8, N> {
    let mut out = heapless::Vec::new();
    if ptr.is_null() || len == 0 {
        return out;
    }
    let len = usize::from(len).min(N);
    // SAFETY: Bluedroid guarantees `len` readable bytes at `ptr` for the
    // duration of the callback; we copy at most `N` of them.
    let slice = unsafe { core::slice::from_raw_parts(ptr, len) };
    let _ = out.extend_from_slice(slice);
    out
}

/// Decode one GATT-server callback.  `None` for kinds the core ignores.
///
/// # Safety
///
/// `param` must be the parameter union Bluedroid passed with `event`.
#[cfg(target_os = "espidf")]
unsafe fn decode_gatts(event: esp_gatts_cb_event_t, param: &esp_ble_gatts_cb_param_t) -> Option<GattsEvent> {
    let status = |raw: esp_gatt_status_t| GattStatus::from_raw(raw as u8);
    // SAFETY (all arms): each arm reads the union member matching `event`.
    let decoded = match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            let p = unsafe { &param.reg };
            GattsEvent::Register {
                status: status(p.status),
                app_id: p.app_id,
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_READ_EVT => {
            let p = unsafe { &param.read };
            GattsEvent::Read(ReadRequest {
                conn_id: p.conn_id,
                trans_id: p.trans_id,
                handle: p.handle,
                offset: p.offset,
            })
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &param.write };
            GattsEvent::Write(WriteRequest {
                conn_id: p.conn_id,
                trans_id: p.trans_id,
                handle: p.handle,
                offset: p.offset,
                need_rsp: p.need_rsp,
                is_prep: p.is_prep,
                value: bytes(p.value, p.len),
            })
        }
        esp_gatts_cb_event_t_ESP_GATTS_EXEC_WRITE_EVT => {
            let p = unsafe { &param.exec_write };
            GattsEvent::ExecWrite {
                conn_id: p.conn_id,
                trans_id: p.trans_id,
                execute: u32::from(p.exec_write_flag) == ESP_GATT_PREP_WRITE_EXEC,
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_MTU_EVT => {
            let p = unsafe { &param.mtu };
            GattsEvent::Mtu {
                conn_id: p.conn_id,
                mtu: p.mtu,
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let p = unsafe { &param.create };
            GattsEvent::ServiceCreated {
                status: status(p.status),
                service_handle: p.service_handle,
                service_uuid: from_esp_uuid(&p.service_id.id.uuid),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let p = unsafe { &param.add_char };
            GattsEvent::CharAdded {
                status: status(p.status),
                attr_handle: p.attr_handle,
                service_handle: p.service_handle,
                char_uuid: from_esp_uuid(&p.char_uuid),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_DESCR_EVT => {
            let p = unsafe { &param.add_char_descr };
            GattsEvent::DescrAdded {
                status: status(p.status),
                attr_handle: p.attr_handle,
                service_handle: p.service_handle,
                descr_uuid: from_esp_uuid(&p.descr_uuid),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_START_EVT => {
            let p = unsafe { &param.start };
            GattsEvent::ServiceStarted {
                status: status(p.status),
                service_handle: p.service_handle,
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let p = unsafe { &param.connect };
            GattsEvent::Connect {
                conn_id: p.conn_id,
                remote: BdAddr(p.remote_bda),
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            let p = unsafe { &param.disconnect };
            GattsEvent::Disconnect {
                conn_id: p.conn_id,
                remote: BdAddr(p.remote_bda),
                reason: p.reason as u16,
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONF_EVT => {
            let p = unsafe { &param.conf };
            GattsEvent::Confirm {
                status: status(p.status),
                conn_id: p.conn_id,
                handle: p.handle,
                len: p.len,
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONGEST_EVT => {
            let p = unsafe { &param.congest };
            GattsEvent::Congest {
                conn_id: p.conn_id,
                congested: p.congested,
            }
        }
        _ => return None,
    };
    Some(decoded)
}

/// Decode one GAP callback.  `None` for kinds the core ignores.
///
/// # Safety
///
/// `param` must be the parameter union Bluedroid passed with `event`.
#[cfg(target_os = "espidf")]
unsafe fn decode_gap(event: esp_gap_ble_cb_event_t, param: &esp_ble_gap_cb_param_t) -> Option<GapEvent> {
    let status = |raw: esp_bt_status_t| BtStatus::from_raw(raw as u32);
    let decoded = match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_DATA_SET_COMPLETE_EVT => GapEvent::AdvDataSetComplete {
            status: status(unsafe { param.adv_data_cmpl.status }),
        },
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RSP_DATA_SET_COMPLETE_EVT => {
            GapEvent::ScanRspDataSetComplete {
                status: status(unsafe { param.scan_rsp_data_cmpl.status }),
            }
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => GapEvent::AdvStartComplete {
            status: status(unsafe { param.adv_start_cmpl.status }),
        },
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => GapEvent::AdvStopComplete {
            status: status(unsafe { param.adv_stop_cmpl.status }),
        },
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_UPDATE_CONN_PARAMS_EVT => {
            let p = unsafe { &param.update_conn_params };
            GapEvent::ConnParamsUpdated(ConnParamsUpdate {
                status: status(p.status),
                remote: BdAddr(p.bda),
                min_int: p.min_int,
                max_int: p.max_int,
                conn_int: p.conn_int,
                latency: p.latency,
                timeout: p.timeout,
            })
        }
        _ => return None,
    };
    Some(decoded)
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn gatts_event_handler(
    event: esp_gatts_cb_event_t,
    gatts_if: esp_gatt_if_t,
    param: *mut esp_ble_gatts_cb_param_t,
) {
    if param.is_null() {
        return;
    }
    // SAFETY: Bluedroid passes a valid parameter union for `event`.
    match unsafe { decode_gatts(event, &*param) } {
        Some(ev) => {
            dispatch(&StackEvent::gatts(GattIf::from_raw(gatts_if), ev));
        }
        None => debug!("GATTS: unhandled event {event}"),
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn gap_event_handler(event: esp_gap_ble_cb_event_t, param: *mut esp_ble_gap_cb_param_t) {
    if param.is_null() {
        return;
    }
    // SAFETY: Bluedroid passes a valid parameter union for `event`.
    match unsafe { decode_gap(event, &*param) } {
        Some(ev) => {
            dispatch(&StackEvent::Gap(ev));
        }
        None => debug!("GAP: unhandled event {event}"),
    }
}
