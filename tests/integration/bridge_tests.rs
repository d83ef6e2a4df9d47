//! Characteristic reads and writes against the device state.

use std::sync::atomic::Ordering;

use crate::mock_stack::{CountingStorage, Rig, char_handle, descr_handle, iface};

use lightgatt::adapters::light_state::LightStateAdapter;
use lightgatt::app::events::AppEvent;
use lightgatt::app::ports::DeviceStatePort;
use lightgatt::drivers::light::LightDriver;
use lightgatt::gatts::event::{GattsEvent, ReadRequest, StackEvent, WriteRequest};
use lightgatt::gatts::types::{GattIf, GattStatus};

const REPORT: u16 = 0;
const CONTROL: u16 = 1;

#[test]
fn read_reflects_device_state() {
    let mut rig = Rig::ready();

    rig.light.on = true;
    rig.read(REPORT, char_handle(REPORT), 1);
    assert_eq!(rig.stack.last_response(), Some((1, GattStatus::Ok, Some(vec![1]))));

    rig.light.on = false;
    rig.read(REPORT, char_handle(REPORT), 2);
    assert_eq!(rig.stack.last_response(), Some((2, GattStatus::Ok, Some(vec![0]))));
}

#[test]
fn control_write_drives_the_light_and_report_reads_it_back() {
    let mut rig = Rig::ready();

    rig.write(CONTROL, char_handle(CONTROL), &[1], true, 3);
    assert!(rig.light.on);
    assert_eq!(rig.stack.last_response(), Some((3, GattStatus::Ok, None)));
    assert_eq!(rig.sink.events.last(), Some(&AppEvent::LightChanged { on: true }));

    rig.read(REPORT, char_handle(REPORT), 4);
    assert_eq!(rig.stack.last_response(), Some((4, GattStatus::Ok, Some(vec![1]))));

    // Any non-zero first byte means on; zero means off.
    rig.write(CONTROL, char_handle(CONTROL), &[0, 1], true, 5);
    assert!(!rig.light.on);
    rig.write(CONTROL, char_handle(CONTROL), &[0x7F], false, 6);
    assert!(rig.light.on);
}

#[test]
fn write_without_response_is_applied_silently() {
    let mut rig = Rig::ready();
    rig.write(CONTROL, char_handle(CONTROL), &[1], false, 7);

    assert!(rig.light.on);
    assert!(rig.stack.responses().is_empty());
}

#[test]
fn zero_length_write_never_changes_state() {
    let mut rig = Rig::ready();
    rig.light.on = true;

    rig.write(CONTROL, char_handle(CONTROL), &[], true, 8);
    assert!(rig.light.on);
    assert!(rig.light.sets.is_empty());
    assert_eq!(
        rig.stack.last_response(),
        Some((8, GattStatus::InvalidAttributeLength, None))
    );

    rig.write(CONTROL, char_handle(CONTROL), &[], false, 9);
    assert_eq!(rig.stack.responses().len(), 1);
}

#[test]
fn report_characteristic_refuses_writes() {
    let mut rig = Rig::ready();
    rig.write(REPORT, char_handle(REPORT), &[1], true, 10);

    assert!(!rig.light.on);
    assert_eq!(rig.stack.last_response(), Some((10, GattStatus::WriteNotPermitted, None)));
}

#[test]
fn control_characteristic_refuses_reads() {
    let mut rig = Rig::ready();
    rig.read(CONTROL, char_handle(CONTROL), 11);

    assert_eq!(rig.stack.last_response(), Some((11, GattStatus::ReadNotPermitted, None)));
}

#[test]
fn unavailable_actuator_reports_failure() {
    let mut rig = Rig::ready();
    rig.light.unavailable = true;
    rig.write(CONTROL, char_handle(CONTROL), &[1], true, 12);

    assert_eq!(rig.stack.last_response(), Some((12, GattStatus::UnlikelyError, None)));
    assert!(!rig.sink.events.iter().any(|e| matches!(e, AppEvent::LightChanged { .. })));
}

#[test]
fn cccd_round_trips_per_profile() {
    let mut rig = Rig::ready();
    rig.write(REPORT, descr_handle(REPORT), &[0x01, 0x00], true, 13);
    assert_eq!(rig.stack.last_response(), Some((13, GattStatus::Ok, None)));

    rig.read(REPORT, descr_handle(REPORT), 14);
    assert_eq!(rig.stack.last_response(), Some((14, GattStatus::Ok, Some(vec![0x01, 0x00]))));

    // The other profile's descriptor is untouched.
    rig.read(CONTROL, descr_handle(CONTROL), 15);
    assert_eq!(rig.stack.last_response(), Some((15, GattStatus::Ok, Some(vec![0, 0]))));

    rig.write(REPORT, descr_handle(REPORT), &[0x01], true, 16);
    assert_eq!(
        rig.stack.last_response(),
        Some((16, GattStatus::InvalidAttributeLength, None))
    );
}

#[test]
fn unknown_handle_is_rejected() {
    let mut rig = Rig::ready();
    rig.read(REPORT, 0x0FFF, 17);
    assert_eq!(rig.stack.last_response(), Some((17, GattStatus::InvalidHandle, None)));

    rig.write(CONTROL, 0x0FFF, &[1], true, 18);
    assert_eq!(rig.stack.last_response(), Some((18, GattStatus::InvalidHandle, None)));
    assert!(!rig.light.on);
}

#[test]
fn read_past_value_end_is_an_invalid_offset() {
    let mut rig = Rig::ready();
    rig.gatts(
        iface(REPORT),
        GattsEvent::Read(ReadRequest {
            conn_id: 0,
            trans_id: 19,
            handle: char_handle(REPORT),
            offset: 2,
        }),
    );

    assert_eq!(rig.stack.last_response(), Some((19, GattStatus::InvalidOffset, None)));
}

#[test]
fn prepared_write_is_refused_and_execute_acknowledged() {
    let mut rig = Rig::ready();
    let mut prep = WriteRequest::new(0, 20, char_handle(CONTROL), &[1], true);
    prep.is_prep = true;
    rig.gatts(iface(CONTROL), GattsEvent::Write(prep));

    assert!(!rig.light.on);
    assert_eq!(
        rig.stack.last_response(),
        Some((20, GattStatus::RequestNotSupported, None))
    );

    rig.gatts(
        iface(CONTROL),
        GattsEvent::ExecWrite {
            conn_id: 0,
            trans_id: 21,
            execute: true,
        },
    );
    assert_eq!(rig.stack.last_response(), Some((21, GattStatus::Ok, None)));
}

#[test]
fn control_writes_leave_flash_to_the_main_task() {
    let mut rig = Rig::ready();
    let storage = CountingStorage::default();
    let writes = storage.writes();
    let mut light = LightStateAdapter::new(LightDriver::new(), storage);
    light.apply_boot_state().unwrap();

    for (trans_id, byte) in [1u8, 0, 1].into_iter().enumerate() {
        let event = StackEvent::gatts(
            GattIf::from_raw(iface(CONTROL)),
            GattsEvent::Write(WriteRequest::new(0, trans_id as u32, char_handle(CONTROL), &[byte], true)),
        );
        rig.server
            .handle_event(&event, &mut rig.stack, &mut light, &mut rig.sink);
        assert_eq!(light.get_state(), byte != 0);
        assert_eq!(writes.load(Ordering::SeqCst), 0);
    }

    assert!(light.is_dirty());
    assert_eq!(light.flush(), Some(true));
    assert_eq!(writes.load(Ordering::SeqCst), 1);
    assert_eq!(light.load_persisted(), Some(true));
}
