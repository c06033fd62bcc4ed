//! Shared fixtures.

use eso_common::clock::ManualClock;
use eso_common::safety::{
    InputType, OutputType, SafetyInputConfig, SafetyOutputConfig, SafetySystemConfig,
};
use eso_hal::{SimHandle, SimulatedSafetyHal};
use eso_safety::SafetySupervisor;

pub type Sup = SafetySupervisor<SimulatedSafetyHal, ManualClock>;

/// Test pulse of the default configuration [ms].
pub const PULSE_MS: u64 = 100;

pub struct Rig {
    pub sup: Sup,
    pub board: SimHandle,
    pub clock: ManualClock,
}

impl Rig {
    /// Initialized supervisor with all four outputs wired, no inputs.
    pub fn new(config: SafetySystemConfig) -> Self {
        let hal = SimulatedSafetyHal::new();
        let board = hal.handle();
        let clock = ManualClock::new();
        let mut sup = SafetySupervisor::new(hal, clock.clone());
        sup.init(config).unwrap();
        let types = [
            OutputType::DoorLock,
            OutputType::MotorBrake,
            OutputType::FaultLight,
            OutputType::ResetEnable,
        ];
        for (ch, ty) in types.into_iter().enumerate() {
            let ch = ch as u8;
            sup.configure_output(ch, SafetyOutputConfig::new(ty, 20 + 2 * ch, 21 + 2 * ch))
                .unwrap();
        }
        Self { sup, board, clock }
    }

    pub fn category3() -> Self {
        Self::new(SafetySystemConfig::default())
    }

    /// Category 3 rig with six dual-channel emergency stops.
    pub fn estops() -> Self {
        let mut rig = Self::category3();
        for ch in 0..6u8 {
            rig.sup
                .configure_input(
                    ch,
                    SafetyInputConfig::new(InputType::EmergencyStop, 2 * ch).dual(2 * ch + 1),
                )
                .unwrap();
        }
        rig
    }

    /// Advance one test pulse and run a cycle.
    pub fn tick(&mut self) {
        self.clock.advance(PULSE_MS);
        self.sup.cycle().unwrap();
    }

    pub fn ticks(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    /// Run one cycle, resume and energize every output.
    pub fn run_all_outputs(&mut self) {
        self.sup.cycle().unwrap();
        self.sup.exit_safety_mode().unwrap();
        for ch in 0..4 {
            self.sup.set_output(ch, true).unwrap();
        }
    }

    pub fn any_output_driven(&self) -> bool {
        (0..4).any(|ch| self.board.output(ch))
    }
}
