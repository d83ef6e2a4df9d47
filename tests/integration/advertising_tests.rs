//! Advertising: payload configuration gate and start completion.

use crate::mock_stack::{Cmd, Rig};

use lightgatt::app::events::AppEvent;
use lightgatt::gatts::event::GapEvent;
use lightgatt::gatts::types::BtStatus;

fn adv_ack() -> GapEvent {
    GapEvent::AdvDataSetComplete {
        status: BtStatus::Success,
    }
}

fn scan_rsp_ack() -> GapEvent {
    GapEvent::ScanRspDataSetComplete {
        status: BtStatus::Success,
    }
}

#[test]
fn first_registration_names_device_before_payloads() {
    let mut rig = Rig::started();
    rig.stack.cmds.clear();
    rig.register(0);

    assert_eq!(
        &rig.stack.cmds[..3],
        &[
            Cmd::SetDeviceName("ESP32C3-LIGHT".into()),
            Cmd::ConfigAdvData { scan_rsp: false },
            Cmd::ConfigAdvData { scan_rsp: true },
        ]
    );
}

#[test]
fn payloads_are_configured_once_for_all_profiles() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.register(1);

    assert_eq!(rig.stack.count(&Cmd::ConfigAdvData { scan_rsp: false }), 1);
    assert_eq!(rig.stack.count(&Cmd::ConfigAdvData { scan_rsp: true }), 1);
    assert_eq!(rig.stack.count(&Cmd::SetDeviceName("ESP32C3-LIGHT".into())), 1);
}

#[test]
fn advertising_starts_once_after_both_acks_in_either_order() {
    for acks in [[adv_ack(), scan_rsp_ack()], [scan_rsp_ack(), adv_ack()]] {
        let mut rig = Rig::started();
        rig.register(0);

        let [first, second] = acks;
        rig.gap(first);
        assert_eq!(rig.stack.adv_starts(), 0, "one ack outstanding");
        assert!(!rig.server.advertiser().is_configured());

        rig.gap(second);
        assert_eq!(rig.stack.adv_starts(), 1);
        assert!(rig.server.advertiser().is_configured());
        assert!(rig.sink.events.contains(&AppEvent::AdvertisingConfigured));
    }
}

#[test]
fn repeated_ack_does_not_restart() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.ack_adv_config();
    rig.ack_adv_config();

    assert_eq!(rig.stack.adv_starts(), 1);
}

#[test]
fn ack_without_request_is_ignored() {
    let mut rig = Rig::started();
    rig.ack_adv_config();

    assert_eq!(rig.stack.adv_starts(), 0);
}

#[test]
fn failed_config_status_still_clears_its_bit() {
    let mut rig = Rig::started();
    rig.register(0);
    rig.gap(GapEvent::AdvDataSetComplete {
        status: BtStatus::Failure(1),
    });
    rig.gap(scan_rsp_ack());

    assert_eq!(rig.stack.adv_starts(), 1);
}

#[test]
fn start_completion_reports_only_success() {
    let mut rig = Rig::ready();
    rig.sink.events.clear();

    rig.gap(GapEvent::AdvStartComplete {
        status: BtStatus::Failure(0x0c),
    });
    assert!(rig.sink.events.is_empty());

    rig.gap(GapEvent::AdvStartComplete {
        status: BtStatus::Success,
    });
    assert_eq!(rig.sink.events, vec![AppEvent::AdvertisingStarted]);
}
