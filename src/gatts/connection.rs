//! Single-slot connection tracking.
//!
//! Connect and disconnect reach the server once per bound profile, so
//! the manager recognises repeated delivery of the same link event and
//! acts only on the first.

use log::{debug, info, warn};

use crate::app::ports::GattStack;
use crate::config::ConnParams;
use crate::error::StackError;
use crate::gatts::advertising::AdvertisingConfigurator;
use crate::gatts::event::ConnParamsUpdate;
use crate::gatts::types::BdAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    pub conn_id: u16,
    pub remote: BdAddr,
    /// Negotiated values, zero until the peer answers the update request.
    pub interval: u16,
    pub latency: u16,
    pub timeout: u16,
    pub mtu: u16,
}

/// Default ATT MTU before an exchange.
const DEFAULT_ATT_MTU: u16 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// New link stored; parameter update requested.
    Opened,
    /// New link stored but the stack rejected the parameter update.
    OpenedWithoutUpdate(StackError),
    /// Same link already recorded.
    Duplicate,
    /// Another link is up; slot left untouched.
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// Slot cleared; `restarted` reports whether advertising was re-issued.
    Closed { restarted: bool },
    Duplicate,
}

#[derive(Debug)]
pub struct ConnectionManager {
    policy: ConnParams,
    slot: Option<Connection>,
    last_closed: Option<u16>,
}

impl ConnectionManager {
    pub fn new(policy: ConnParams) -> Self {
        Self {
            policy,
            slot: None,
            last_closed: None,
        }
    }

    pub fn current(&self) -> Option<&Connection> {
        self.slot.as_ref()
    }

    pub fn on_connect<S: GattStack>(
        &mut self,
        conn_id: u16,
        remote: BdAddr,
        stack: &mut S,
    ) -> ConnectOutcome {
        if let Some(c) = &self.slot {
            if c.conn_id == conn_id && c.remote == remote {
                return ConnectOutcome::Duplicate;
            }
            warn!("CONN: {remote} (conn {conn_id}) rejected, {} already connected", c.remote);
            return ConnectOutcome::Rejected;
        }

        self.slot = Some(Connection {
            conn_id,
            remote,
            interval: 0,
            latency: 0,
            timeout: 0,
            mtu: DEFAULT_ATT_MTU,
        });
        self.last_closed = None;
        info!("CONN: {remote} connected, conn_id {conn_id}");

        match stack.update_conn_params(remote, &self.policy) {
            Ok(()) => ConnectOutcome::Opened,
            Err(e) => {
                warn!("CONN: conn params update request failed: {e}");
                ConnectOutcome::OpenedWithoutUpdate(e)
            }
        }
    }

    pub fn on_disconnect<S: GattStack>(
        &mut self,
        conn_id: u16,
        reason: u16,
        adv: &mut AdvertisingConfigurator,
        stack: &mut S,
    ) -> DisconnectOutcome {
        match self.slot {
            Some(c) if c.conn_id == conn_id => {}
            _ => {
                if self.last_closed != Some(conn_id) {
                    debug!("CONN: disconnect for unknown conn {conn_id}");
                }
                return DisconnectOutcome::Duplicate;
            }
        }
        self.slot = None;
        self.last_closed = Some(conn_id);
        info!("CONN: conn {conn_id} closed, reason 0x{reason:x}");

        let restarted = match adv.restart(stack) {
            Ok(started) => started,
            Err(e) => {
                warn!("ADV: restart after disconnect failed: {e}");
                false
            }
        };
        DisconnectOutcome::Closed { restarted }
    }

    /// Record the parameters the peer settled on.
    pub fn on_params_updated(&mut self, update: &ConnParamsUpdate) {
        info!(
            "CONN: params status={:?} min={} max={} int={} latency={} timeout={}",
            update.status, update.min_int, update.max_int, update.conn_int, update.latency, update.timeout
        );
        if !update.status.is_success() {
            return;
        }
        if let Some(c) = self.slot.as_mut().filter(|c| c.remote == update.remote) {
            c.interval = update.conn_int;
            c.latency = update.latency;
            c.timeout = update.timeout;
        }
    }

    pub fn on_mtu(&mut self, conn_id: u16, mtu: u16) -> bool {
        match self.slot.as_mut().filter(|c| c.conn_id == conn_id) {
            Some(c) if c.mtu != mtu => {
                c.mtu = mtu;
                info!("CONN: conn {conn_id} MTU {mtu}");
                true
            }
            _ => false,
        }
    }
}
