//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured GATT server events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::StackReady { profiles } => {
                info!("STACK | ready, {profiles} profiles registering");
            }
            AppEvent::ProfileBound { app_id, interface } => {
                info!("PROFILE | app={app_id} bound to {interface}");
            }
            AppEvent::ProfileReady {
                app_id,
                service_handle,
                char_handle,
            } => {
                info!("PROFILE | app={app_id} ready svc={service_handle} char={char_handle}");
            }
            AppEvent::ProfileDisabled { app_id } => {
                warn!("PROFILE | app={app_id} disabled");
            }
            AppEvent::AdvertisingConfigured => info!("ADV | payloads configured"),
            AppEvent::AdvertisingStarted => info!("ADV | on air"),
            AppEvent::Connected { conn_id, remote } => {
                info!("CONN | up conn_id={conn_id} peer={remote}");
            }
            AppEvent::Disconnected { conn_id, reason } => {
                info!("CONN | down conn_id={conn_id} reason=0x{reason:x}");
            }
            AppEvent::ConnParamsUpdated {
                interval,
                latency,
                timeout,
            } => {
                info!("CONN | params int={interval} latency={latency} timeout={timeout}");
            }
            AppEvent::MtuChanged { conn_id, mtu } => {
                info!("CONN | conn_id={conn_id} mtu={mtu}");
            }
            AppEvent::LightChanged { on } => {
                info!("LIGHT | {}", if *on { "on" } else { "off" });
            }
            AppEvent::EventDropped { kind, reason } => {
                warn!("DROP | {kind}: {reason}");
            }
        }
    }
}
