//! Property tests over random operation sequences.

use eso_common::safety::{FaultCode, SafetyError, SafetyState};
use proptest::prelude::*;

use super::common::Rig;

#[derive(Debug, Clone)]
enum Op {
    Energize(u8),
    Deenergize(u8),
    Exit,
    Enter,
    Reset,
    ForceStop,
    Tick,
    PressEstop(u8, bool),
    Short(u8, bool),
    Supply(bool),
    Restart,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0u8..4).prop_map(Op::Energize),
        2 => (0u8..4).prop_map(Op::Deenergize),
        3 => Just(Op::Exit),
        1 => Just(Op::Enter),
        1 => Just(Op::Reset),
        1 => Just(Op::ForceStop),
        4 => Just(Op::Tick),
        1 => ((0u8..6), any::<bool>()).prop_map(|(ch, pressed)| Op::PressEstop(ch, pressed)),
        1 => ((0u8..4), any::<bool>()).prop_map(|(ch, short)| Op::Short(ch, short)),
        1 => any::<bool>().prop_map(Op::Supply),
        1 => Just(Op::Restart),
    ]
}

fn apply(rig: &mut Rig, op: &Op) {
    match *op {
        Op::Energize(ch) => {
            let _ = rig.sup.set_output(ch, true);
        }
        Op::Deenergize(ch) => {
            let _ = rig.sup.set_output(ch, false);
        }
        Op::Exit => {
            let _ = rig.sup.exit_safety_mode();
        }
        Op::Enter => {
            let _ = rig.sup.enter_safety_mode();
        }
        Op::Reset => {
            let _ = rig.sup.request_reset();
        }
        Op::ForceStop => rig.sup.force_stop("prop").unwrap(),
        Op::Tick => rig.tick(),
        Op::PressEstop(ch, pressed) => rig.board.set_input(ch, !pressed),
        Op::Short(ch, short) => rig.board.inject_short(ch, short),
        Op::Supply(ok) => rig.board.set_supply_ok(ok),
        Op::Restart => rig.sup.restart().unwrap(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A driven relay implies an open gate.
    #[test]
    fn energized_outputs_imply_operational_and_fault_free(
        ops in proptest::collection::vec(op(), 1..60)
    ) {
        let mut rig = Rig::estops();
        for op in &ops {
            apply(&mut rig, op);
            let status = rig.sup.system_status();
            for ch in 0..4u8 {
                if rig.sup.output_status(ch).unwrap().energized {
                    prop_assert_eq!(status.current_state, SafetyState::Operational);
                    prop_assert!(!status.safe_state_enforced);
                    prop_assert_eq!(status.fault_code, FaultCode::None);
                }
            }
        }
    }

    /// Refused energize requests never reach the HAL.
    #[test]
    fn refused_energize_writes_nothing(
        ops in proptest::collection::vec(op(), 0..30),
        ch in 0u8..4
    ) {
        let mut rig = Rig::estops();
        for op in &ops {
            apply(&mut rig, op);
        }
        let writes = rig.board.write_attempts(ch);
        if let Err(err) = rig.sup.set_output(ch, true) {
            prop_assert!(matches!(err, SafetyError::OutputInhibited(_)));
            prop_assert_eq!(rig.board.write_attempts(ch), writes);
        }
    }

    /// force_stop twice leaves the same observable status as once.
    #[test]
    fn force_stop_is_idempotent(ops in proptest::collection::vec(op(), 0..30)) {
        let mut rig = Rig::estops();
        for op in &ops {
            apply(&mut rig, op);
        }
        rig.sup.force_stop("once").unwrap();
        let once = rig.sup.system_status();
        rig.sup.force_stop("twice").unwrap();
        let twice = rig.sup.system_status();

        prop_assert_eq!(once.current_state, SafetyState::Emergency);
        prop_assert_eq!(once.current_state, twice.current_state);
        prop_assert_eq!(once.safe_state_enforced, twice.safe_state_enforced);
        prop_assert_eq!(once.fault_code, twice.fault_code);
        prop_assert!(!rig.any_output_driven());
    }

    /// request_reset succeeds exactly when no fault is active.
    #[test]
    fn reset_accepted_iff_fault_free(ops in proptest::collection::vec(op(), 0..30)) {
        let mut rig = Rig::estops();
        for op in &ops {
            apply(&mut rig, op);
        }
        let fault = rig.sup.system_status().fault_code;
        let result = rig.sup.request_reset();
        prop_assert_eq!(result.is_ok(), fault.is_none());
        if result.is_ok() {
            prop_assert_eq!(rig.sup.state(), SafetyState::Reset);
        }
    }
}
