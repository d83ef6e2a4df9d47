//! Connection slot: per-interface delivery, advertising restart, link
//! parameter bookkeeping.

use crate::mock_stack::{Cmd, PEER, Rig, iface};

use lightgatt::app::events::AppEvent;
use lightgatt::gatts::event::{ConnParamsUpdate, GapEvent, GattsEvent};
use lightgatt::gatts::types::{BdAddr, BtStatus};

#[test]
fn connect_is_handled_once_per_link() {
    let mut rig = Rig::ready();
    rig.sink.events.clear();
    rig.connect(1);

    assert_eq!(rig.stack.count(&Cmd::UpdateConnParams(PEER)), 1);
    assert_eq!(
        rig.sink.events,
        vec![AppEvent::Connected {
            conn_id: 1,
            remote: PEER
        }]
    );
    let conn = rig.server.connections().current().unwrap();
    assert_eq!((conn.conn_id, conn.remote), (1, PEER));

    for app_id in 0..2 {
        assert_eq!(rig.server.profiles().get(app_id).unwrap().conn_id, Some(1));
    }
}

#[test]
fn disconnect_restarts_advertising_exactly_once() {
    let mut rig = Rig::ready();
    rig.connect(1);
    assert_eq!(rig.stack.adv_starts(), 1);

    rig.disconnect(1);

    assert_eq!(rig.stack.adv_starts(), 2);
    assert!(rig.server.connections().current().is_none());
    let downs = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::Disconnected { conn_id: 1, reason: 0x13 }))
        .count();
    assert_eq!(downs, 1);
    for app_id in 0..2 {
        assert_eq!(rig.server.profiles().get(app_id).unwrap().conn_id, None);
    }
}

#[test]
fn reconnect_after_disconnect_opens_a_new_slot() {
    let mut rig = Rig::ready();
    rig.connect(1);
    rig.disconnect(1);
    rig.connect(2);

    assert_eq!(rig.server.connections().current().unwrap().conn_id, 2);
    assert_eq!(rig.stack.count(&Cmd::UpdateConnParams(PEER)), 2);
}

#[test]
fn disconnect_before_payloads_acked_defers_to_the_ack() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.register(1);
    rig.connect(1);
    rig.disconnect(1);
    assert_eq!(rig.stack.adv_starts(), 0);

    rig.ack_adv_config();
    assert_eq!(rig.stack.adv_starts(), 1);
}

#[test]
fn unspecified_interface_connect_is_broadcast() {
    let mut rig = Rig::ready();
    rig.gatts(
        0xFF,
        GattsEvent::Connect {
            conn_id: 4,
            remote: PEER,
        },
    );

    assert_eq!(rig.server.connections().current().unwrap().conn_id, 4);
    for app_id in 0..2 {
        assert_eq!(rig.server.profiles().get(app_id).unwrap().conn_id, Some(4));
    }
}

#[test]
fn second_peer_is_not_tracked() {
    let mut rig = Rig::ready();
    rig.connect(1);
    let other = BdAddr([0xAA; 6]);
    rig.gatts(
        iface(0),
        GattsEvent::Connect {
            conn_id: 2,
            remote: other,
        },
    );

    assert_eq!(rig.server.connections().current().unwrap().remote, PEER);
    assert_eq!(rig.stack.count(&Cmd::UpdateConnParams(other)), 0);
}

#[test]
fn params_update_is_stored_on_the_connection() {
    let mut rig = Rig::ready();
    rig.connect(1);
    rig.gap(GapEvent::ConnParamsUpdated(ConnParamsUpdate {
        status: BtStatus::Success,
        remote: PEER,
        min_int: 0x10,
        max_int: 0x20,
        conn_int: 0x18,
        latency: 0,
        timeout: 400,
    }));

    let conn = rig.server.connections().current().unwrap();
    assert_eq!((conn.interval, conn.latency, conn.timeout), (0x18, 0, 400));
    assert_eq!(
        rig.sink.events.last(),
        Some(&AppEvent::ConnParamsUpdated {
            interval: 0x18,
            latency: 0,
            timeout: 400
        })
    );
}

#[test]
fn failed_params_update_leaves_connection_untouched() {
    let mut rig = Rig::ready();
    rig.connect(1);
    rig.gap(GapEvent::ConnParamsUpdated(ConnParamsUpdate {
        status: BtStatus::Failure(0x1e),
        remote: PEER,
        min_int: 0,
        max_int: 0,
        conn_int: 0x30,
        latency: 0,
        timeout: 0,
    }));

    assert_eq!(rig.server.connections().current().unwrap().interval, 0);
}

#[test]
fn mtu_is_recorded_once() {
    let mut rig = Rig::ready();
    rig.connect(1);
    rig.sink.events.clear();
    for app_id in 0..2 {
        rig.gatts(iface(app_id), GattsEvent::Mtu { conn_id: 1, mtu: 247 });
    }

    assert_eq!(rig.server.connections().current().unwrap().mtu, 247);
    assert_eq!(rig.sink.events, vec![AppEvent::MtuChanged { conn_id: 1, mtu: 247 }]);
}
