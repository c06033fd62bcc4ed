//! Fault detection, precedence, clearing and restart.

use eso_common::hal::InputLine;
use eso_common::safety::{
    FaultCode, InputType, SafetyError, SafetyEvent, SafetyFunction, SafetyInputConfig,
    SafetyState, SafetySystemConfig,
};

use super::common::Rig;

#[test]
fn cross_monitor_needs_more_than_one_test_pulse() {
    let mut rig = Rig::estops();
    rig.sup.cycle().unwrap();

    rig.board.set_line(4, InputLine::B, false);
    rig.ticks(2);
    assert!(!rig.sup.input_status(4).unwrap().cross_monitor_fail);

    rig.tick();
    let input = rig.sup.input_status(4).unwrap();
    assert!(input.cross_monitor_fail);
    assert!(input.fault);
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::CrossMonitor);
}

#[test]
fn watchdog_expiry_sets_bit_15() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();

    rig.clock.advance(501);
    let mask = rig.sup.run_diagnostics();
    assert!(mask.system_fault());
    assert_eq!(mask.bits() & (1 << 15), 1 << 15);
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::Watchdog);
    assert_eq!(rig.sup.system_status().last_event, SafetyEvent::WatchdogTimeout);
    assert!(!rig.any_output_driven());
}

#[test]
fn failing_hardware_watchdog_feed_expires_software_watchdog() {
    let mut rig = Rig::category3();
    rig.board.fail_watchdog(true);
    rig.ticks(6);
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::Watchdog);
}

#[test]
fn diagnostics_mask_reports_channels() {
    let mut rig = Rig::estops();
    rig.sup.cycle().unwrap();
    assert!(rig.sup.run_diagnostics().is_clear());

    rig.board.set_line(2, InputLine::A, false);
    rig.board.inject_short(1, true);
    rig.ticks(3);

    let mask = rig.sup.run_diagnostics();
    assert!(mask.input_fault(2));
    assert!(!mask.input_fault(0));
    assert!(mask.output_fault(1));
    assert!(mask.system_fault());
    // Cross-monitor outranks the output short.
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::CrossMonitor);
}

#[test]
fn set_category_rejects_out_of_range() {
    let mut rig = Rig::category3();
    assert_eq!(rig.sup.set_category(5), Err(SafetyError::InvalidCategory(5)));
    assert_eq!(rig.sup.set_category(0), Err(SafetyError::InvalidCategory(0)));
    assert_eq!(rig.sup.config().safety_category, 3);
    rig.sup.set_category(4).unwrap();
    assert_eq!(rig.sup.config().safety_category, 4);
}

#[test]
fn clear_fault_accepts_only_local_classes() {
    let mut rig = Rig::category3();
    for raw in 0..=0x08u8 {
        let code = FaultCode::from_u8(raw).unwrap();
        let result = rig.sup.clear_fault(code);
        assert_eq!(result.is_ok(), code.is_clearable(), "{code}");
    }
    assert!(rig.sup.clear_fault_code(0x09).is_err());
}

#[test]
fn short_circuit_needs_full_restart() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();
    rig.board.inject_short(0, true);
    rig.tick();

    assert_eq!(rig.sup.system_status().fault_code, FaultCode::OutputShort);
    assert_eq!(rig.sup.state(), SafetyState::Fault);
    assert!(rig.sup.clear_fault(FaultCode::OutputShort).is_err());

    rig.board.inject_short(0, false);
    rig.sup.restart().unwrap();
    assert_eq!(rig.sup.state(), SafetyState::Safe);
    assert!(rig.sup.is_safe_state());
    assert_eq!(rig.sup.statistics().fault_count, 1);

    rig.sup.cycle().unwrap();
    rig.sup.exit_safety_mode().unwrap();
    rig.sup.set_output(0, true).unwrap();
}

#[test]
fn restart_with_condition_present_faults_again() {
    let mut rig = Rig::category3();
    rig.board.set_supply_ok(false);
    rig.tick();
    rig.sup.restart().unwrap();
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::PowerSupply);
    assert_eq!(rig.sup.state(), SafetyState::Fault);
    assert_eq!(rig.sup.statistics().fault_count, 2);
}

#[test]
fn fault_while_in_emergency_stays_in_emergency() {
    let mut rig = Rig::category3();
    rig.sup.force_stop("test").unwrap();
    rig.board.set_supply_ok(false);
    rig.tick();
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::PowerSupply);
    assert_eq!(rig.sup.state(), SafetyState::Emergency);
}

#[test]
fn test_channel_helpers() {
    let mut rig = Rig::estops();
    assert_eq!(rig.sup.test_input(0), Ok(true));
    assert_eq!(rig.sup.test_output(0), Ok(true));
    rig.board.inject_short(0, true);
    assert_eq!(rig.sup.test_output(0), Ok(false));
    assert!(rig.sup.test_input(6).is_err());
}

#[test]
fn function_validation_at_category_3() {
    let mut rig = Rig::new(SafetySystemConfig::default().with_category(2));
    rig.sup
        .configure_input(1, SafetyInputConfig::new(InputType::SafetyEdge, 4))
        .unwrap();
    rig.sup.validate_function(SafetyFunction::SafetyEdge).unwrap();

    rig.sup.set_category(3).unwrap_err();
    rig.sup
        .configure_input(1, SafetyInputConfig::new(InputType::SafetyEdge, 4).dual(5))
        .unwrap();
    rig.sup.set_category(3).unwrap();
    rig.sup.validate_function(SafetyFunction::SafetyEdge).unwrap();
    assert!(rig.sup.validate_function(SafetyFunction::TwoHandControl).is_err());
}

#[test]
fn stuck_feedback_faults_even_when_output_is_rewritten_every_scan() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();
    rig.board.stick_feedback(0, Some(false));

    for _ in 0..20 {
        rig.tick();
        // Refused once the fault is latched; keep re-commanding like a PLC scan.
        let _ = rig.sup.set_output(0, true);
    }
    assert!(rig.sup.output_status(0).unwrap().feedback_mismatch);
    assert_eq!(rig.sup.system_status().fault_code, FaultCode::OutputFeedback);
    assert!(!rig.board.output(0));
}

#[test]
fn system_status_keeps_full_diagnostics_mask() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();
    rig.board.inject_short(3, true);

    let mask = rig.sup.run_diagnostics();
    assert!(mask.output_fault(3));
    assert!(mask.system_fault());
    assert_eq!(rig.sup.system_status().diagnostic_status, mask);
    assert_eq!(rig.sup.system_status().diagnostic_status.bits(), mask.bits());
}
