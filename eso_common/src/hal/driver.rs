//! HAL driver trait and error types.
//!
//! This module defines:
//! - `SafetyHal` trait - Interface implemented per target board
//! - `InputLine` enum - Selects channel A or B of a safety input
//! - `HalError` enum - Error types at the driver boundary
//! - `DriverFactory` type alias - Factory function type

use thiserror::Error;

/// Error types for HAL driver management.
#[derive(Debug, Clone, Error)]
pub enum HalError {
    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// A driver with this name is already registered
    #[error("Driver already registered: {0}")]
    AlreadyRegistered(String),
}

/// Electrical line of a safety input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputLine {
    /// Primary channel (`channel_a_pin`).
    A,
    /// Secondary channel (`channel_b_pin`), read only for dual-channel inputs.
    B,
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn SafetyHal + Send>;

/// Hardware access contract for the safety supervisor.
///
/// # Timing Contracts
///
/// Every method is called from the supervisory loop and MUST be
/// non-blocking with bounded execution time (no allocation, no I/O waits).
///
/// | Operation | Called | Meaning of return |
/// |-----------|--------|-------------------|
/// | `read_input()` | every cycle per enabled line | electrical level (`true` = high) |
/// | `write_output()` | on command / safe-state | `false` = write failed |
/// | `read_output_feedback()` | every cycle per enabled output | observed drive state |
/// | `feed_watchdog()` | once per cycle | `false` = feed failed |
/// | `emergency_stop()` | on forced stop | `false` = stop circuit failed |
///
/// Short-circuit and supply monitoring are board specific (current sense
/// or feedback timing); drivers without such hardware keep the defaults.
pub trait SafetyHal {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Read the raw electrical level of one line of an input channel.
    fn read_input(&mut self, channel: u8, line: InputLine) -> bool;

    /// Drive an output channel (`true` = energized).
    fn write_output(&mut self, channel: u8, energize: bool) -> bool;

    /// Read the feedback contact of an output channel (`true` = energized).
    fn read_output_feedback(&mut self, channel: u8) -> bool;

    /// Retrigger the hardware watchdog.
    fn feed_watchdog(&mut self) -> bool;

    /// Open the hardware emergency-stop circuit.
    fn emergency_stop(&mut self) -> bool;

    /// Whether the output driver currently reports a short circuit.
    /// Default: no short-circuit detection hardware.
    fn output_short_circuit(&mut self, _channel: u8) -> bool {
        false
    }

    /// Whether the safety supply rail is within tolerance.
    /// Default: no supply monitoring hardware.
    fn supply_ok(&mut self) -> bool {
        true
    }
}

impl<H: SafetyHal + ?Sized> SafetyHal for Box<H> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read_input(&mut self, channel: u8, line: InputLine) -> bool {
        (**self).read_input(channel, line)
    }

    fn write_output(&mut self, channel: u8, energize: bool) -> bool {
        (**self).write_output(channel, energize)
    }

    fn read_output_feedback(&mut self, channel: u8) -> bool {
        (**self).read_output_feedback(channel)
    }

    fn feed_watchdog(&mut self) -> bool {
        (**self).feed_watchdog()
    }

    fn emergency_stop(&mut self) -> bool {
        (**self).emergency_stop()
    }

    fn output_short_circuit(&mut self, channel: u8) -> bool {
        (**self).output_short_circuit(channel)
    }

    fn supply_ok(&mut self) -> bool {
        (**self).supply_ok()
    }
}
