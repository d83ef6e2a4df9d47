//! Bring-up and registration: ordering, fatal stages, MTU request.

use crate::mock_stack::{Cmd, Rig};

use lightgatt::app::events::AppEvent;
use lightgatt::config::ServerConfig;
use lightgatt::error::{BringUpError, BringUpStage, Error};
use lightgatt::gatts::stack::StackState;

const BRING_UP: [(&str, BringUpStage); 7] = [
    ("mem_release", BringUpStage::ReleaseClassicMemory),
    ("controller_init", BringUpStage::ControllerInit),
    ("controller_enable", BringUpStage::ControllerEnable),
    ("host_init", BringUpStage::HostInit),
    ("host_enable", BringUpStage::HostEnable),
    ("gatts_callback", BringUpStage::GattsCallback),
    ("gap_callback", BringUpStage::GapCallback),
];

#[test]
fn bring_up_then_register_every_profile_then_mtu() {
    let rig = Rig::started();

    let mut expected: Vec<Cmd> = BRING_UP.iter().map(|(name, _)| Cmd::BringUp(*name)).collect();
    expected.extend([Cmd::RegisterApp(0), Cmd::RegisterApp(1), Cmd::SetLocalMtu(500)]);
    assert_eq!(rig.stack.cmds, expected);

    assert_eq!(rig.server.stack_state(), StackState::Ready);
    assert_eq!(rig.sink.events, vec![AppEvent::StackReady { profiles: 2 }]);
}

#[test]
fn each_failed_stage_aborts_with_that_stage() {
    for (name, stage) in BRING_UP {
        let mut rig = Rig::new(ServerConfig::default());
        rig.stack.reject = Some(Cmd::BringUp(name));

        let err = rig.server.start(&mut rig.stack, &mut rig.sink).unwrap_err();
        match err {
            Error::BringUp(BringUpError { stage: got, .. }) => assert_eq!(got, stage, "stage {name}"),
            other => panic!("unexpected error {other:?}"),
        }

        // Nothing after the failing step is attempted.
        assert_eq!(rig.stack.cmds.last(), Some(&Cmd::BringUp(name)));
        assert_eq!(rig.stack.count(&Cmd::RegisterApp(0)), 0);
        assert_ne!(rig.server.stack_state(), StackState::Ready);
        assert!(rig.sink.events.is_empty());
    }
}

#[test]
fn rejected_registration_command_is_fatal() {
    let mut rig = Rig::new(ServerConfig::default());
    rig.stack.reject = Some(Cmd::RegisterApp(0));

    let err = rig.server.start(&mut rig.stack, &mut rig.sink).unwrap_err();
    assert!(matches!(
        err,
        Error::BringUp(BringUpError {
            stage: BringUpStage::AppRegister(0),
            ..
        })
    ));
    assert_eq!(rig.stack.count(&Cmd::RegisterApp(1)), 0);
}

#[test]
fn rejected_mtu_request_is_not_fatal() {
    let mut rig = Rig::new(ServerConfig::default());
    rig.stack.reject = Some(Cmd::SetLocalMtu(500));

    assert!(rig.server.start(&mut rig.stack, &mut rig.sink).is_ok());
    assert_eq!(rig.server.stack_state(), StackState::Ready);
}

#[test]
fn second_start_is_refused() {
    let mut rig = Rig::started();
    let before = rig.stack.cmds.len();

    let err = rig.server.start(&mut rig.stack, &mut rig.sink).unwrap_err();
    assert!(matches!(
        err,
        Error::BringUp(BringUpError {
            stage: BringUpStage::AlreadyStarted,
            ..
        })
    ));
    assert_eq!(rig.stack.cmds.len(), before);
}

#[test]
fn events_before_start_touch_nothing() {
    let mut rig = Rig::new(ServerConfig::default());
    rig.register(0);
    rig.ack_adv_config();

    assert!(rig.stack.cmds.is_empty());
    assert!(rig.sink.events.is_empty());
    assert!(rig.server.profiles().get(0).unwrap().interface().is_none());
}
