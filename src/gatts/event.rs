//! Inbound stack events.
//!
//! Everything the host stack can tell the core arrives as one
//! [`StackEvent`].  The Bluedroid adapter decodes the raw callback
//! parameters into these variants; tests construct them directly.

use super::types::{
    AppId, AttrHandle, BdAddr, BtStatus, GattIf, GattStatus, MAX_WRITE_LEN, Uuid,
};

/// Top-level event, tagged by which callback sink delivered it.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEvent {
    /// GAP (advertising / link management) callback.
    Gap(GapEvent),
    /// GATT-server callback, scoped by interface.
    Gatts { gatts_if: GattIf, event: GattsEvent },
}

impl StackEvent {
    pub fn gatts(gatts_if: GattIf, event: GattsEvent) -> Self {
        Self::Gatts { gatts_if, event }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GapEvent {
    AdvDataSetComplete { status: BtStatus },
    ScanRspDataSetComplete { status: BtStatus },
    AdvStartComplete { status: BtStatus },
    AdvStopComplete { status: BtStatus },
    ConnParamsUpdated(ConnParamsUpdate),
}

/// Outcome of a connection-parameter update procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnParamsUpdate {
    pub status: BtStatus,
    pub remote: BdAddr,
    pub min_int: u16,
    pub max_int: u16,
    pub conn_int: u16,
    pub latency: u16,
    pub timeout: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GattsEvent {
    Register {
        status: GattStatus,
        app_id: AppId,
    },
    Read(ReadRequest),
    Write(WriteRequest),
    ExecWrite {
        conn_id: u16,
        trans_id: u32,
        execute: bool,
    },
    Mtu {
        conn_id: u16,
        mtu: u16,
    },
    ServiceCreated {
        status: GattStatus,
        service_handle: AttrHandle,
        service_uuid: Uuid,
    },
    CharAdded {
        status: GattStatus,
        attr_handle: AttrHandle,
        service_handle: AttrHandle,
        char_uuid: Uuid,
    },
    DescrAdded {
        status: GattStatus,
        attr_handle: AttrHandle,
        service_handle: AttrHandle,
        descr_uuid: Uuid,
    },
    ServiceStarted {
        status: GattStatus,
        service_handle: AttrHandle,
    },
    Connect {
        conn_id: u16,
        remote: BdAddr,
    },
    Disconnect {
        conn_id: u16,
        remote: BdAddr,
        reason: u16,
    },
    Confirm {
        status: GattStatus,
        conn_id: u16,
        handle: AttrHandle,
        len: u16,
    },
    Congest {
        conn_id: u16,
        congested: bool,
    },
}

impl GattsEvent {
    /// Stack-global kinds that may legitimately arrive without an
    /// interface id.  Only these are ever broadcast.
    pub fn is_link_scoped(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Disconnect { .. } | Self::Mtu { .. } | Self::Congest { .. }
        )
    }

    /// Short name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Register { .. } => "REG",
            Self::Read(_) => "READ",
            Self::Write(_) => "WRITE",
            Self::ExecWrite { .. } => "EXEC_WRITE",
            Self::Mtu { .. } => "MTU",
            Self::ServiceCreated { .. } => "CREATE",
            Self::CharAdded { .. } => "ADD_CHAR",
            Self::DescrAdded { .. } => "ADD_DESCR",
            Self::ServiceStarted { .. } => "START",
            Self::Connect { .. } => "CONNECT",
            Self::Disconnect { .. } => "DISCONNECT",
            Self::Confirm { .. } => "CONF",
            Self::Congest { .. } => "CONGEST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub conn_id: u16,
    pub trans_id: u32,
    pub handle: AttrHandle,
    pub offset: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub conn_id: u16,
    pub trans_id: u32,
    pub handle: AttrHandle,
    pub offset: u16,
    pub need_rsp: bool,
    pub is_prep: bool,
    pub value: heapless::Vec<u8, MAX_WRITE_LEN>,
}

impl WriteRequest {
    /// Build a plain (non-prepared) write; excess bytes are truncated.
    pub fn new(conn_id: u16, trans_id: u32, handle: AttrHandle, bytes: &[u8], need_rsp: bool) -> Self {
        let mut value = heapless::Vec::new();
        let len = bytes.len().min(MAX_WRITE_LEN);
        // Length is clamped to capacity above.
        let _ = value.extend_from_slice(&bytes[..len]);
        Self {
            conn_id,
            trans_id,
            handle,
            offset: 0,
            need_rsp,
            is_prep: false,
            value,
        }
    }
}
