//! Fuzz target: `GattServer::handle_event`
//!
//! Decodes arbitrary bytes into a stream of stack events (any interface
//! id, any handle, any status, any order) and feeds them through a
//! started server via the simulated Bluedroid adapter.  The server must
//! never panic, and the connection slot and advertising gate must stay
//! consistent with what was delivered.
//!
//! cargo fuzz run fuzz_stack_events

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightgatt::adapters::bluedroid::BluedroidStack;
use lightgatt::app::events::AppEvent;
use lightgatt::app::ports::{DeviceStatePort, EventSink};
use lightgatt::app::service::GattServer;
use lightgatt::config::ServerConfig;
use lightgatt::error::DriverError;
use lightgatt::gatts::event::{
    ConnParamsUpdate, GapEvent, GattsEvent, ReadRequest, StackEvent, WriteRequest,
};
use lightgatt::gatts::types::{BdAddr, BtStatus, CCCD_UUID, GattIf, GattStatus, Uuid};

struct Light(bool);

impl DeviceStatePort for Light {
    fn get_state(&self) -> bool {
        self.0
    }
    fn set_state(&mut self, on: bool) -> Result<(), DriverError> {
        self.0 = on;
        Ok(())
    }
}

struct Sink;

impl EventSink for Sink {
    fn emit(&mut self, _: &AppEvent) {}
}

/// Pulls fixed-size fields off the front of the input; zero once exhausted.
struct Bytes<'a>(&'a [u8]);

impl Bytes<'_> {
    fn u8(&mut self) -> u8 {
        match self.0.split_first() {
            Some((&b, rest)) => {
                self.0 = rest;
                b
            }
            None => 0,
        }
    }

    fn u16(&mut self) -> u16 {
        u16::from_le_bytes([self.u8(), self.u8()])
    }

    fn status(&mut self) -> GattStatus {
        // Mostly OK so build chains make progress.
        let raw = self.u8();
        if raw < 0xC0 { GattStatus::Ok } else { GattStatus::from_raw(raw) }
    }

    fn bt_status(&mut self) -> BtStatus {
        let raw = self.u8();
        BtStatus::from_raw(if raw < 0xC0 { 0 } else { u32::from(raw) })
    }

    fn uuid(&mut self) -> Uuid {
        match self.u8() % 4 {
            0 => Uuid::Uuid16(0x00FF),
            1 => Uuid::Uuid16(0x00EE),
            2 => Uuid::Uuid16(CCCD_UUID),
            _ => Uuid::Uuid16(self.u16()),
        }
    }

    fn event(&mut self) -> StackEvent {
        let tag = self.u8();
        if tag & 0x80 != 0 {
            let gap = match tag % 5 {
                0 => GapEvent::AdvDataSetComplete { status: self.bt_status() },
                1 => GapEvent::ScanRspDataSetComplete { status: self.bt_status() },
                2 => GapEvent::AdvStartComplete { status: self.bt_status() },
                3 => GapEvent::AdvStopComplete { status: self.bt_status() },
                _ => GapEvent::ConnParamsUpdated(ConnParamsUpdate {
                    status: self.bt_status(),
                    remote: BdAddr([self.u8() % 2; 6]),
                    min_int: self.u16(),
                    max_int: self.u16(),
                    conn_int: self.u16(),
                    latency: self.u16(),
                    timeout: self.u16(),
                }),
            };
            return StackEvent::Gap(gap);
        }

        // Small interface ids collide with real ones; 0xFF is unspecified.
        let raw_if = match self.u8() % 8 {
            7 => 0xFF,
            n => n,
        };
        let conn_id = u16::from(self.u8() % 3);
        let handle = u16::from(self.u8() % 64);
        let gatts = match tag % 13 {
            0 => GattsEvent::Register { status: self.status(), app_id: u16::from(self.u8() % 4) },
            1 => GattsEvent::Read(ReadRequest {
                conn_id,
                trans_id: u32::from(self.u16()),
                handle,
                offset: u16::from(self.u8() % 4),
            }),
            2 => {
                let len = usize::from(self.u8() % 4);
                let bytes: Vec<u8> = (0..len).map(|_| self.u8()).collect();
                let mut req = WriteRequest::new(conn_id, u32::from(self.u16()), handle, &bytes, self.u8() & 1 == 1);
                req.is_prep = self.u8() % 8 == 0;
                GattsEvent::Write(req)
            }
            3 => GattsEvent::ExecWrite { conn_id, trans_id: 0, execute: self.u8() & 1 == 1 },
            4 => GattsEvent::Mtu { conn_id, mtu: self.u16() },
            5 => GattsEvent::ServiceCreated { status: self.status(), service_handle: handle, service_uuid: self.uuid() },
            6 => GattsEvent::CharAdded {
                status: self.status(),
                attr_handle: handle,
                service_handle: u16::from(self.u8() % 64),
                char_uuid: self.uuid(),
            },
            7 => GattsEvent::DescrAdded {
                status: self.status(),
                attr_handle: handle,
                service_handle: u16::from(self.u8() % 64),
                descr_uuid: self.uuid(),
            },
            8 => GattsEvent::ServiceStarted { status: self.status(), service_handle: handle },
            9 => GattsEvent::Connect { conn_id, remote: BdAddr([self.u8() % 2; 6]) },
            10 => GattsEvent::Disconnect { conn_id, remote: BdAddr([self.u8() % 2; 6]), reason: 0x13 },
            11 => GattsEvent::Confirm {
                status: self.status(),
                conn_id,
                handle,
                len: 0,
            },
            _ => GattsEvent::Congest { conn_id, congested: self.u8() & 1 == 1 },
        };
        StackEvent::gatts(GattIf::from_raw(raw_if), gatts)
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut server) = GattServer::new(ServerConfig::default()) else {
        return;
    };
    let mut stack = BluedroidStack;
    let mut light = Light(false);
    if server.start(&mut stack, &mut Sink).is_err() {
        return;
    }

    let mut input = Bytes(data);
    let mut budget = 256;
    while !input.0.is_empty() && budget > 0 {
        budget -= 1;
        let event = input.event();
        server.handle_event(&event, &mut stack, &mut light, &mut Sink);

        // A disconnect for the tracked link always empties the slot.
        if let StackEvent::Gatts {
            event: GattsEvent::Disconnect { conn_id, .. },
            gatts_if,
        } = &event
        {
            if let Some(c) = server.connections().current() {
                let routed = matches!(gatts_if, GattIf::Unspecified)
                    || server.profiles().iter().any(|p| {
                        p.is_dispatchable() && matches!(gatts_if, GattIf::Bound(i) if p.interface() == Some(*i))
                    });
                assert!(!routed || c.conn_id != *conn_id, "slot survived its own disconnect");
            }
        }
    }

    for p in server.profiles().iter() {
        if p.is_ready() {
            assert!(p.service_handle().is_some() && p.char_handle().is_some() && p.descr_handle().is_some());
        }
    }
});
