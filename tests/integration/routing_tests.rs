//! Profile table construction and event routing across profiles.

use crate::mock_stack::{Cmd, Rig, char_handle, descr_handle, iface, svc_handle};

use lightgatt::app::events::AppEvent;
use lightgatt::gatts::event::{GattsEvent, ReadRequest};
use lightgatt::gatts::profile::BuildStep;
use lightgatt::gatts::router::DropReason;
use lightgatt::gatts::types::{CCCD_UUID, GattStatus, InterfaceId, Uuid};

fn unscoped_read() -> GattsEvent {
    GattsEvent::Read(ReadRequest {
        conn_id: 0,
        trans_id: 1,
        handle: char_handle(0),
        offset: 0,
    })
}

#[test]
fn both_profiles_become_ready() {
    let rig = Rig::ready();

    for app_id in 0..2 {
        let p = rig.server.profiles().get(app_id).unwrap();
        assert_eq!(p.step(), BuildStep::Ready);
        assert_eq!(p.interface(), Some(InterfaceId(iface(app_id))));
        assert_eq!(p.service_handle(), Some(svc_handle(app_id)));
        assert_eq!(p.char_handle(), Some(char_handle(app_id)));
        assert_eq!(p.descr_handle(), Some(descr_handle(app_id)));
        assert!(rig.sink.events.contains(&AppEvent::ProfileReady {
            app_id,
            service_handle: svc_handle(app_id),
            char_handle: char_handle(app_id),
        }));
    }
    assert!(rig.server.profiles().all_ready());
}

#[test]
fn build_chain_issues_commands_in_order() {
    let mut rig = Rig::started();
    rig.register(1);
    rig.stack.cmds.clear();
    rig.build(1);

    assert_eq!(
        rig.stack.cmds,
        vec![
            Cmd::StartService(svc_handle(1)),
            Cmd::AddChar(svc_handle(1), Uuid::Uuid16(0xEE01)),
            Cmd::AddCharDescr(svc_handle(1), Uuid::Uuid16(CCCD_UUID)),
        ]
    );
}

#[test]
fn interleaved_chains_settle_independently() {
    let mut rig = Rig::started();
    rig.register(1);
    rig.register(0);
    rig.service_created(1);
    rig.service_created(0);
    rig.char_added(0);
    rig.char_added(1);
    rig.descr_added(1);
    assert!(rig.server.profiles().get(1).unwrap().is_ready());
    assert!(!rig.server.profiles().get(0).unwrap().is_ready());

    rig.descr_added(0);
    assert!(rig.server.profiles().all_ready());
}

#[test]
fn completion_on_the_wrong_interface_is_not_applied() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.register(1);

    // Profile 0's service announced on profile 1's interface.
    rig.gatts(
        iface(1),
        GattsEvent::ServiceCreated {
            status: GattStatus::Ok,
            service_handle: 99,
            service_uuid: Uuid::Uuid16(0x00FF),
        },
    );

    assert_eq!(rig.server.profiles().get(0).unwrap().service_handle(), None);
    assert_eq!(rig.server.profiles().get(1).unwrap().service_handle(), None);
    assert_eq!(rig.stack.count(&Cmd::StartService(99)), 0);
}

#[test]
fn addressed_read_never_reaches_another_profile() {
    let mut rig = Rig::ready();
    rig.light.on = true;

    // Profile 0's characteristic handle, sent on profile 1's interface.
    rig.read(1, char_handle(0), 5);

    assert_eq!(rig.stack.last_response(), Some((5, GattStatus::InvalidHandle, None)));
}

#[test]
fn failed_registration_disables_exactly_that_profile() {
    let mut rig = Rig::started();
    rig.gatts(
        0xFF,
        GattsEvent::Register {
            status: GattStatus::Error,
            app_id: 0,
        },
    );
    rig.register(1);
    rig.build(1);
    rig.ack_adv_config();

    let p0 = rig.server.profiles().get(0).unwrap();
    assert!(p0.is_disabled());
    assert!(rig.server.profiles().get(1).unwrap().is_ready());
    assert!(rig.sink.events.contains(&AppEvent::ProfileDisabled { app_id: 0 }));

    // Anything on profile 0's would-be interface is dropped unanswered.
    rig.read(0, char_handle(0), 9);
    assert!(rig.stack.responses().is_empty());
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::EventDropped {
            kind: "READ",
            reason: DropReason::UnknownInterface(InterfaceId(iface(0))),
        })
    );

    // Profile 1 still serves.
    rig.write(1, char_handle(1), &[1], true, 10);
    assert_eq!(rig.stack.last_response(), Some((10, GattStatus::Ok, None)));
}

#[test]
fn failed_creation_step_disables_profile_and_drops_its_events() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.gatts(
        iface(0),
        GattsEvent::ServiceCreated {
            status: GattStatus::Error,
            service_handle: 0,
            service_uuid: Uuid::Uuid16(0x00FF),
        },
    );

    assert!(rig.server.profiles().get(0).unwrap().is_disabled());
    assert!(rig.sink.events.contains(&AppEvent::ProfileDisabled { app_id: 0 }));

    rig.read(0, char_handle(0), 2);
    assert!(rig.stack.responses().is_empty());
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::EventDropped {
            kind: "READ",
            reason: DropReason::Disabled(0),
        })
    );
}

#[test]
fn registration_for_unknown_app_is_dropped() {
    let mut rig = Rig::started();
    rig.gatts(
        7,
        GattsEvent::Register {
            status: GattStatus::Ok,
            app_id: 9,
        },
    );

    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::EventDropped {
            kind: "REG",
            reason: DropReason::UnknownApp(9),
        })
    );
    assert_eq!(rig.stack.count(&Cmd::SetDeviceName("ESP32C3-LIGHT".into())), 0);
}

#[test]
fn unscoped_profile_event_is_dropped() {
    let mut rig = Rig::ready();
    rig.gatts(0xFF, unscoped_read());

    assert!(rig.stack.responses().is_empty());
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::EventDropped {
            kind: "READ",
            reason: DropReason::Unscoped,
        })
    );
}

#[test]
fn duplicate_registration_is_ignored() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.register(0);

    assert_eq!(rig.stack.count(&Cmd::CreateService(InterfaceId(iface(0)), Uuid::Uuid16(0x00FF))), 1);
}
