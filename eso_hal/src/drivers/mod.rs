//! HAL driver implementations.
//!
//! - [`simulation`] - Software safety I/O with fault injection
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement `SafetyHal` from `eso_common::hal::driver`
//! 3. Add its factory to [`builtin`]

pub mod simulation;

use eso_common::hal::DriverFactory;

const BUILTIN: &[(&str, DriverFactory)] =
    &[("simulation", simulation::create_driver as DriverFactory)];

/// Name and factory of every built-in driver.
pub fn builtin() -> &'static [(&'static str, DriverFactory)] {
    BUILTIN
}
