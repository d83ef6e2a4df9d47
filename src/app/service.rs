//! GATT server context — the hexagonal core.
//!
//! [`GattServer`] owns the profile table, the advertising gate and the
//! connection slot.  It exposes two entry points: [`GattServer::start`]
//! for bring-up and [`GattServer::handle_event`] for everything the stack
//! reports afterwards.  All I/O flows through port traits injected at call
//! sites, making the entire server testable with mock adapters.
//!
//! ```text
//!  StackEvent ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │          GattServer           │
//!   GattStack ◀── │ registry · builder · adv · conn│ ◀─▶ DeviceStatePort
//!                 └──────────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::config::{MAX_PROFILES, ServerConfig};
use crate::error::{BringUpError, BringUpStage, Error};
use crate::gatts::advertising::{AckOutcome, AdvConfigKind, AdvertisingConfigurator};
use crate::gatts::bridge;
use crate::gatts::builder::{ServiceBuilder, StepOutcome};
use crate::gatts::connection::{ConnectOutcome, ConnectionManager, DisconnectOutcome};
use crate::gatts::event::{GapEvent, GattsEvent, StackEvent};
use crate::gatts::profile::{Profile, ProfileRegistry};
use crate::gatts::router::{self, Route};
use crate::gatts::stack::{StackController, StackState};
use crate::gatts::types::{AppId, BtStatus, GattIf};

use super::events::AppEvent;
use super::ports::{DeviceStatePort, EventSink, GattStack};

// ───────────────────────────────────────────────────────────────
// GattServer
// ───────────────────────────────────────────────────────────────

pub struct GattServer {
    config: ServerConfig,
    stack: StackController,
    registry: ProfileRegistry,
    builder: ServiceBuilder,
    advertiser: AdvertisingConfigurator,
    connections: ConnectionManager,
}

impl GattServer {
    /// Validate `config` and build the profile table.
    ///
    /// Does **not** touch the stack; call [`start`](Self::start) next.
    pub fn new(config: ServerConfig) -> Result<Self, Error> {
        config.validate()?;
        let registry = ProfileRegistry::new(&config.profiles);
        let advertiser = AdvertisingConfigurator::new(
            config.adv_data.clone(),
            config.scan_rsp_data.clone(),
            config.adv_params,
        );
        let connections = ConnectionManager::new(config.conn_params);
        Ok(Self {
            config,
            stack: StackController::new(),
            registry,
            builder: ServiceBuilder::new(),
            advertiser,
            connections,
        })
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn stack_state(&self) -> StackState {
        self.stack.state()
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.registry
    }

    pub fn advertiser(&self) -> &AdvertisingConfigurator {
        &self.advertiser
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the stack up and submit every profile for registration.
    ///
    /// Any failure here is fatal.  A rejected MTU request is only logged.
    pub fn start<S: GattStack>(&mut self, stack: &mut S, sink: &mut impl EventSink) -> Result<(), Error> {
        self.stack.bring_up(stack)?;

        for profile in self.registry.iter() {
            let app_id = profile.app_id();
            stack.register_app(app_id).map_err(|code| {
                warn!("GATTS: register app {app_id} failed: {code}");
                BringUpError {
                    stage: BringUpStage::AppRegister(app_id),
                    code,
                }
            })?;
        }

        if let Err(e) = stack.set_local_mtu(self.config.local_mtu) {
            warn!("GATTS: set local MTU {} failed: {e}", self.config.local_mtu);
        }

        self.stack.mark_ready();
        sink.emit(&AppEvent::StackReady {
            profiles: self.registry.len(),
        });
        info!("GATTS: {} profiles submitted for registration", self.registry.len());
        Ok(())
    }

    // ── Dispatch ──────────────────────────────────────────────

    /// Single entry point for every stack callback.
    ///
    /// Never fails: faults become a status to the peer or a logged drop.
    pub fn handle_event<S: GattStack, D: DeviceStatePort>(
        &mut self,
        event: &StackEvent,
        stack: &mut S,
        device: &mut D,
        sink: &mut impl EventSink,
    ) {
        if !matches!(self.stack.state(), StackState::CallbacksBound | StackState::Ready) {
            debug!("GATTS: event before bring-up dropped: {event:?}");
            return;
        }
        match event {
            StackEvent::Gap(ev) => self.handle_gap(ev, stack, sink),
            StackEvent::Gatts { gatts_if, event } => {
                self.handle_gatts(*gatts_if, event, stack, device, sink);
            }
        }
    }

    fn handle_gap<S: GattStack>(&mut self, event: &GapEvent, stack: &mut S, sink: &mut impl EventSink) {
        match event {
            GapEvent::AdvDataSetComplete { status } => {
                self.config_acked(AdvConfigKind::AdvData, *status, stack, sink);
            }
            GapEvent::ScanRspDataSetComplete { status } => {
                self.config_acked(AdvConfigKind::ScanResponse, *status, stack, sink);
            }
            GapEvent::AdvStartComplete { status } => match status {
                BtStatus::Success => {
                    info!("GAP: advertising started");
                    sink.emit(&AppEvent::AdvertisingStarted);
                }
                BtStatus::Failure(code) => warn!("GAP: advertising start failed: {code}"),
            },
            GapEvent::AdvStopComplete { status } => match status {
                BtStatus::Success => info!("GAP: advertising stopped"),
                BtStatus::Failure(code) => warn!("GAP: advertising stop failed: {code}"),
            },
            GapEvent::ConnParamsUpdated(update) => {
                self.connections.on_params_updated(update);
                if update.status.is_success() {
                    sink.emit(&AppEvent::ConnParamsUpdated {
                        interval: update.conn_int,
                        latency: update.latency,
                        timeout: update.timeout,
                    });
                }
            }
        }
    }

    fn config_acked<S: GattStack>(
        &mut self,
        kind: AdvConfigKind,
        status: BtStatus,
        stack: &mut S,
        sink: &mut impl EventSink,
    ) {
        if let BtStatus::Failure(code) = status {
            warn!("GAP: {kind:?} set failed: {code}");
        }
        if self.advertiser.on_configuration_acked(kind, stack) == AckOutcome::Started {
            sink.emit(&AppEvent::AdvertisingConfigured);
        }
    }

    fn handle_gatts<S: GattStack, D: DeviceStatePort>(
        &mut self,
        gatts_if: GattIf,
        event: &GattsEvent,
        stack: &mut S,
        device: &mut D,
        sink: &mut impl EventSink,
    ) {
        let targets: heapless::Vec<AppId, MAX_PROFILES> =
            match router::resolve(&self.registry, gatts_if, event) {
                Route::Single(app_id) => core::iter::once(app_id).collect(),
                Route::Broadcast(app_ids) => app_ids,
                Route::Drop(reason) => {
                    debug!("GATTS: {} on {gatts_if:?} dropped: {reason}", event.kind());
                    sink.emit(&AppEvent::EventDropped {
                        kind: event.kind(),
                        reason,
                    });
                    return;
                }
            };

        // Link-level bookkeeping once per delivery, before any profile.
        match event {
            GattsEvent::Connect { conn_id, remote } => {
                let outcome = self.connections.on_connect(*conn_id, *remote, stack);
                if matches!(outcome, ConnectOutcome::Opened | ConnectOutcome::OpenedWithoutUpdate(_)) {
                    sink.emit(&AppEvent::Connected {
                        conn_id: *conn_id,
                        remote: *remote,
                    });
                }
            }
            GattsEvent::Disconnect { conn_id, reason, .. } => {
                let outcome = self.connections.on_disconnect(*conn_id, *reason, &mut self.advertiser, stack);
                if let DisconnectOutcome::Closed { .. } = outcome {
                    sink.emit(&AppEvent::Disconnected {
                        conn_id: *conn_id,
                        reason: *reason,
                    });
                }
            }
            GattsEvent::Mtu { conn_id, mtu } => {
                if self.connections.on_mtu(*conn_id, *mtu) {
                    sink.emit(&AppEvent::MtuChanged {
                        conn_id: *conn_id,
                        mtu: *mtu,
                    });
                }
            }
            _ => {}
        }

        for app_id in targets {
            self.dispatch(app_id, gatts_if, event, stack, device, sink);
        }
    }

    /// Apply one event to one profile.
    fn dispatch<S: GattStack, D: DeviceStatePort>(
        &mut self,
        app_id: AppId,
        gatts_if: GattIf,
        event: &GattsEvent,
        stack: &mut S,
        device: &mut D,
        sink: &mut impl EventSink,
    ) {
        if let GattsEvent::Register { status, .. } = event {
            self.on_registered(app_id, *status, gatts_if, stack, sink);
            return;
        }

        let Some(profile) = self.registry.get_mut(app_id) else {
            return;
        };
        let Some(interface) = profile.interface() else {
            return;
        };

        let outcome = match event {
            GattsEvent::Register { .. } => StepOutcome::Ignored,
            GattsEvent::ServiceCreated {
                status,
                service_handle,
                service_uuid,
            } => self
                .builder
                .on_service_created(profile, *status, *service_handle, service_uuid, stack),
            GattsEvent::CharAdded {
                status,
                attr_handle,
                service_handle,
                ..
            } => self
                .builder
                .on_char_added(profile, *status, *attr_handle, *service_handle, stack),
            GattsEvent::DescrAdded {
                status,
                attr_handle,
                service_handle,
                ..
            } => self
                .builder
                .on_descr_added(profile, *status, *attr_handle, *service_handle),
            GattsEvent::ServiceStarted {
                status,
                service_handle,
            } => self.builder.on_service_started(profile, *status, *service_handle),
            GattsEvent::Read(req) => {
                bridge::on_read(profile, interface, req, device, stack);
                StepOutcome::Ignored
            }
            GattsEvent::Write(req) => {
                let out = bridge::on_write(profile, interface, req, device, stack);
                if let Some(on) = out.applied {
                    sink.emit(&AppEvent::LightChanged { on });
                }
                StepOutcome::Ignored
            }
            GattsEvent::ExecWrite {
                conn_id, trans_id, ..
            } => {
                bridge::on_exec_write(interface, *conn_id, *trans_id, stack);
                StepOutcome::Ignored
            }
            GattsEvent::Connect { conn_id, .. } => {
                if self.connections.current().map(|c| c.conn_id) == Some(*conn_id) {
                    profile.conn_id = Some(*conn_id);
                }
                StepOutcome::Ignored
            }
            GattsEvent::Disconnect { conn_id, .. } => {
                if profile.conn_id == Some(*conn_id) {
                    profile.conn_id = None;
                }
                StepOutcome::Ignored
            }
            GattsEvent::Confirm {
                status,
                handle,
                len,
                ..
            } => {
                if !status.is_ok() {
                    warn!("GATTS: app {app_id} confirm on handle {handle} ({len} bytes) status {status:?}");
                }
                StepOutcome::Ignored
            }
            GattsEvent::Mtu { .. } => StepOutcome::Ignored,
            GattsEvent::Congest { conn_id, congested } => {
                debug!("GATTS: app {app_id} conn {conn_id} congested={congested}");
                StepOutcome::Ignored
            }
        };

        report(profile, outcome, sink);
        if outcome == StepOutcome::Ready && self.registry.all_ready() {
            info!("GATTS: all profiles settled");
        }
    }

    fn on_registered<S: GattStack>(
        &mut self,
        app_id: AppId,
        status: crate::gatts::types::GattStatus,
        gatts_if: GattIf,
        stack: &mut S,
        sink: &mut impl EventSink,
    ) {
        let interface = match (status.is_ok(), gatts_if) {
            (true, GattIf::Bound(interface)) => interface,
            _ if self
                .registry
                .get(app_id)
                .is_some_and(|p| p.interface().is_some()) =>
            {
                warn!("GATTS: app {app_id} already bound, failed registration ({status:?}) ignored");
                return;
            }
            _ => {
                warn!("GATTS: app {app_id} registration failed ({status:?}), profile disabled");
                if self.registry.disable(app_id) {
                    sink.emit(&AppEvent::ProfileDisabled { app_id });
                }
                return;
            }
        };

        if !self.registry.bind(app_id, interface) {
            debug!("GATTS: app {app_id} already bound, registration ignored");
            return;
        }
        info!("GATTS: app {app_id} registered on {interface}");
        sink.emit(&AppEvent::ProfileBound { app_id, interface });

        self.builder
            .announce(&self.config.device_name, &mut self.advertiser, stack);

        if let Some(profile) = self.registry.get_mut(app_id) {
            let outcome = self.builder.begin(profile, stack);
            report(profile, outcome, sink);
        }
    }
}

fn report(profile: &Profile, outcome: StepOutcome, sink: &mut impl EventSink) {
    match outcome {
        StepOutcome::Ready => {
            if let (Some(service_handle), Some(char_handle)) = (profile.service_handle(), profile.char_handle()) {
                sink.emit(&AppEvent::ProfileReady {
                    app_id: profile.app_id(),
                    service_handle,
                    char_handle,
                });
            }
        }
        StepOutcome::Disabled => sink.emit(&AppEvent::ProfileDisabled {
            app_id: profile.app_id(),
        }),
        StepOutcome::Advanced | StepOutcome::Ignored => {}
    }
}
