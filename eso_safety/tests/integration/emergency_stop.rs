//! Emergency stop: hardware button, software request and the stop latch.

use std::sync::Arc;

use eso_common::safety::{EventRecord, SafetyEvent, SafetyState};
use eso_safety::{FnObserver, SharedSupervisor};
use parking_lot::Mutex;

use super::common::Rig;

#[test]
fn category3_estop_press_reaches_emergency() {
    let mut rig = Rig::estops();
    let seen: Arc<Mutex<Vec<EventRecord>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    rig.sup
        .register_observer(Box::new(FnObserver(move |r: &EventRecord| {
            sink.lock().push(r.clone())
        })))
        .unwrap();

    rig.run_all_outputs();
    assert!(rig.any_output_driven());

    // Button pressed: both NC lines open.
    rig.board.set_input(0, false);
    rig.ticks(2);

    let status = rig.sup.system_status();
    assert_eq!(status.current_state, SafetyState::Emergency);
    assert!(!rig.any_output_driven());
    for ch in 0..4 {
        assert!(!rig.sup.output_status(ch).unwrap().energized);
    }

    let events = seen.lock();
    let stop = events
        .iter()
        .find(|r| r.event == SafetyEvent::EmergencyStop)
        .expect("emergency stop event");
    assert_eq!(stop.channel, Some(0));
    assert_eq!(stop.state, SafetyState::Emergency);
    assert_eq!(rig.board.emergency_stops(), 1);
}

#[test]
fn released_button_allows_reset_and_restart() {
    let mut rig = Rig::estops();
    rig.run_all_outputs();
    rig.board.set_input(3, false);
    rig.ticks(2);
    assert_eq!(rig.sup.state(), SafetyState::Emergency);

    rig.board.set_input(3, true);
    rig.ticks(2);
    assert_eq!(rig.sup.state(), SafetyState::Emergency);

    rig.sup.request_reset().unwrap();
    rig.tick();
    assert_eq!(rig.sup.state(), SafetyState::Reset);
    rig.sup.exit_safety_mode().unwrap();
    assert_eq!(rig.sup.state(), SafetyState::Operational);
    assert!(!rig.any_output_driven());
}

#[test]
fn software_stop_is_idempotent() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();

    rig.sup.force_stop("line halt").unwrap();
    let first = rig.sup.system_status();
    rig.sup.force_stop("line halt").unwrap();
    let second = rig.sup.system_status();

    assert_eq!(first.current_state, second.current_state);
    assert_eq!(first.safe_state_enforced, second.safe_state_enforced);
    assert_eq!(first.fault_code, second.fault_code);
    assert!(!rig.any_output_driven());
}

#[test]
fn stop_latch_from_another_thread() {
    let mut rig = Rig::category3();
    rig.run_all_outputs();
    let Rig { sup, board, clock } = rig;
    let shared = SharedSupervisor::new(sup);

    let handle = shared.stop_handle();
    std::thread::spawn(move || handle.trigger()).join().unwrap();

    // Pending latch already refuses energizing.
    assert!(shared.lock().set_output(1, true).is_err());
    clock.advance(100);
    shared.cycle().unwrap();

    assert_eq!(shared.system_status().current_state, SafetyState::Emergency);
    assert!((0..4).all(|ch| !board.output(ch)));
}
