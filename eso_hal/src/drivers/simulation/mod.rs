//! Simulation driver module.
//!
//! Software safety I/O for development and testing without hardware.
//! Tests and the demo binary steer it through a [`SimHandle`].

mod driver;
mod state;

pub use driver::SimulatedSafetyHal;
pub use state::SimHandle;

use eso_common::hal::driver::SafetyHal;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn SafetyHal + Send> {
    Box::new(SimulatedSafetyHal::new())
}
