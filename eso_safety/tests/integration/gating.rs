//! Output energize gate and safe-state transitions.

use eso_common::safety::{FaultCode, SafetyError, SafetyEvent, SafetyState};

use super::common::Rig;

#[test]
fn energize_refused_while_safe_state_enforced() {
    let mut rig = Rig::category3();
    let before: Vec<u32> = (0..4).map(|ch| rig.board.write_attempts(ch)).collect();

    for ch in 0..4 {
        let err = rig.sup.set_output(ch, true).unwrap_err();
        assert!(matches!(err, SafetyError::OutputInhibited(_)));
    }
    let after: Vec<u32> = (0..4).map(|ch| rig.board.write_attempts(ch)).collect();
    assert_eq!(before, after);
}

#[test]
fn energize_refused_while_fault_active() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();
    rig.board.set_supply_ok(false);
    rig.tick();
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::PowerSupply);
    assert!(!rig.any_output_driven());

    rig.board.set_supply_ok(true);
    let writes = rig.board.write_attempts(0);
    assert!(rig.sup.set_output(0, true).is_err());
    assert_eq!(rig.board.write_attempts(0), writes);
}

#[test]
fn deenergize_is_always_allowed() {
    let mut rig = Rig::category3();
    rig.sup.force_stop("test").unwrap();
    for ch in 0..4 {
        rig.sup.set_output(ch, false).unwrap();
    }
}

#[test]
fn disabled_output_cannot_be_energized() {
    let mut rig = Rig::category3();
    rig.sup.cycle().unwrap();
    rig.sup.exit_safety_mode().unwrap();
    rig.sup.enter_safety_mode().unwrap();
    rig.sup
        .configure_output(3, eso_common::safety::SafetyOutputConfig::default())
        .unwrap();
    rig.sup.exit_safety_mode().unwrap();
    assert_eq!(rig.sup.set_output(3, true), Err(SafetyError::ChannelDisabled(3)));
}

#[test]
fn safety_mode_does_not_restore_outputs() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();

    rig.sup.enter_safety_mode().unwrap();
    assert!(!rig.any_output_driven());
    assert!(rig.sup.is_safe_state());

    rig.sup.exit_safety_mode().unwrap();
    assert!(!rig.any_output_driven());
    for ch in 0..4 {
        assert!(!rig.sup.output_status(ch).unwrap().energized);
    }
}

#[test]
fn request_reset_accepted_only_without_fault() {
    let mut rig = Rig::category3();
    rig.sup.request_reset().unwrap();
    assert_eq!(rig.sup.state(), SafetyState::Reset);
    assert_eq!(rig.sup.system_status().last_event, SafetyEvent::ResetRequest);

    rig.board.inject_short(2, true);
    rig.tick();
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::OutputShort);
    assert_eq!(
        rig.sup.request_reset(),
        Err(SafetyError::FaultActive(FaultCode::OutputShort))
    );
    assert_eq!(rig.sup.statistics().reset_count, 1);
}

#[test]
fn failing_relay_write_raises_internal_fault() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();
    rig.board.fail_writes(1, true);

    assert_eq!(rig.sup.set_output(1, false), Err(SafetyError::HardwareWrite(1)));
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::Internal);
    assert_eq!(rig.sup.state(), SafetyState::Fault);
}
