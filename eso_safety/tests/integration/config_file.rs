//! Shipped configuration file and the periodic loop.

use std::path::PathBuf;

use eso_common::config::{ConfigLoader, Validate};
use eso_common::safety::{FaultCode, SafetyFunction, SafetyState};
use eso_hal::{DriverRegistry, SimulatedSafetyHal};
use eso_safety::config::SafetyAppConfig;
use eso_safety::cycle::CycleRunner;
use eso_safety::{SafetySupervisor, SharedSupervisor};

fn shipped_config() -> SafetyAppConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/safety.toml");
    SafetyAppConfig::load_validated(&path).unwrap()
}

#[test]
fn shipped_config_is_valid() {
    let cfg = shipped_config();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.system.safety_category, 3);
    assert_eq!(cfg.inputs.len(), 3);
    assert_eq!(cfg.outputs.len(), 3);
}

#[test]
fn shipped_config_runs_on_registry_driver() {
    let cfg = shipped_config();
    let hal = DriverRegistry::with_builtin().create_driver("simulation").unwrap();
    let mut sup = SafetySupervisor::with_monotonic_clock(hal);
    cfg.apply(&mut sup).unwrap();

    sup.validate_function(SafetyFunction::EmergencyStop).unwrap();
    sup.validate_function(SafetyFunction::LightCurtain).unwrap();
    // Guard door is wired single-channel.
    assert!(sup.validate_function(SafetyFunction::DoorInterlock).is_err());

    let shared = SharedSupervisor::new(sup);
    let mut runner = CycleRunner::new(shared.clone())
        .with_period_ms(5)
        .with_max_cycles(4);
    runner.run().unwrap();

    let status = shared.system_status();
    assert_eq!(status.current_state, SafetyState::Safe);
    assert_eq!(status.fault_code, FaultCode::None);
    assert_eq!(shared.lock().statistics().cycle_count, 4);
}

#[test]
fn supervisor_resumes_after_loop_with_shipped_config() {
    let cfg = shipped_config();
    let hal = SimulatedSafetyHal::new();
    let board = hal.handle();
    let mut sup = SafetySupervisor::with_monotonic_clock(hal);
    cfg.apply(&mut sup).unwrap();
    sup.cycle().unwrap();
    sup.exit_safety_mode().unwrap();
    sup.set_output(1, true).unwrap();
    assert!(board.output(1));
    assert!(sup.set_output(3, true).is_err());
}
