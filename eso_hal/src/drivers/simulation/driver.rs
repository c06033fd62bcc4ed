//! Simulation driver implementation.
//!
//! `SimulatedSafetyHal` implements `SafetyHal` on top of a shared
//! [`SimHandle`]. Feedback follows the relay drive unless a stuck contact
//! is injected; opening the emergency-stop circuit drops every relay.

use super::state::SimHandle;
use eso_common::hal::driver::SafetyHal;
use eso_common::hal::InputLine;
use tracing::{trace, warn};

/// Simulation driver implementing the `SafetyHal` trait.
#[derive(Debug, Clone, Default)]
pub struct SimulatedSafetyHal {
    handle: SimHandle,
}

impl SimulatedSafetyHal {
    /// Create a driver over a fresh simulated board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a driver over an existing board.
    pub fn with_handle(handle: SimHandle) -> Self {
        Self { handle }
    }

    /// Handle for steering the board from tests and tools.
    pub fn handle(&self) -> SimHandle {
        self.handle.clone()
    }
}

impl SafetyHal for SimulatedSafetyHal {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn read_input(&mut self, channel: u8, line: InputLine) -> bool {
        // An unknown channel reads as an open circuit.
        self.handle.line(channel, line)
    }

    fn write_output(&mut self, channel: u8, energize: bool) -> bool {
        let mut state = self.handle.inner.lock();
        let ch = channel as usize;
        let Some(attempts) = state.write_attempts.get_mut(ch) else {
            warn!("Simulated write to unknown output {channel}");
            return false;
        };
        *attempts += 1;
        if state.write_fail[ch] {
            trace!("Simulated write failure on output {channel}");
            return false;
        }
        state.drive[ch] = energize;
        trace!("Output {channel} driven {}", if energize { "on" } else { "off" });
        true
    }

    fn read_output_feedback(&mut self, channel: u8) -> bool {
        let state = self.handle.inner.lock();
        let ch = channel as usize;
        match state.stuck_feedback.get(ch) {
            Some(Some(level)) => *level,
            Some(None) => state.drive[ch],
            None => false,
        }
    }

    fn feed_watchdog(&mut self) -> bool {
        let mut state = self.handle.inner.lock();
        if state.watchdog_fail {
            return false;
        }
        state.watchdog_feeds += 1;
        true
    }

    fn emergency_stop(&mut self) -> bool {
        let mut state = self.handle.inner.lock();
        state.emergency_stops += 1;
        state.drive = Default::default();
        trace!("Simulated emergency-stop circuit opened");
        !state.emergency_fail
    }

    fn output_short_circuit(&mut self, channel: u8) -> bool {
        self.handle
            .inner
            .lock()
            .short_circuit
            .get(channel as usize)
            .copied()
            .unwrap_or(false)
    }

    fn supply_ok(&mut self) -> bool {
        self.handle.inner.lock().supply_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feedback_follows_drive() {
        let mut hal = SimulatedSafetyHal::new();
        assert!(!hal.read_output_feedback(0));
        assert!(hal.write_output(0, true));
        assert!(hal.read_output_feedback(0));
        assert!(hal.handle().output(0));
    }

    #[test]
    fn stuck_feedback_overrides_drive() {
        let mut hal = SimulatedSafetyHal::new();
        hal.handle().stick_feedback(1, Some(true));
        assert!(hal.read_output_feedback(1));
        hal.handle().stick_feedback(1, None);
        assert!(!hal.read_output_feedback(1));
    }

    #[test]
    fn write_failure_keeps_drive() {
        let mut hal = SimulatedSafetyHal::new();
        let handle = hal.handle();
        handle.fail_writes(2, true);
        assert!(!hal.write_output(2, true));
        assert!(!handle.output(2));
        assert_eq!(handle.write_attempts(2), 1);
    }

    #[test]
    fn unknown_channels_are_safe() {
        let mut hal = SimulatedSafetyHal::new();
        assert!(!hal.read_input(42, InputLine::A));
        assert!(!hal.write_output(42, true));
        assert!(!hal.read_output_feedback(42));
        assert!(!hal.output_short_circuit(42));
    }

    #[test]
    fn emergency_stop_drops_relays() {
        let mut hal = SimulatedSafetyHal::new();
        let handle = hal.handle();
        hal.write_output(0, true);
        hal.write_output(3, true);
        assert!(hal.emergency_stop());
        assert!(!handle.output(0));
        assert!(!handle.output(3));
        assert_eq!(handle.emergency_stops(), 1);

        handle.fail_emergency_stop(true);
        assert!(!hal.emergency_stop());
    }

    #[test]
    fn lines_are_independent() {
        let mut hal = SimulatedSafetyHal::new();
        let handle = hal.handle();
        assert!(hal.read_input(0, InputLine::A));
        handle.set_line(0, InputLine::B, false);
        assert!(hal.read_input(0, InputLine::A));
        assert!(!hal.read_input(0, InputLine::B));
        handle.set_input(0, false);
        assert!(!hal.read_input(0, InputLine::A));
    }

    #[test]
    fn watchdog_and_supply_injection() {
        let mut hal = SimulatedSafetyHal::new();
        let handle = hal.handle();
        assert!(hal.feed_watchdog());
        handle.fail_watchdog(true);
        assert!(!hal.feed_watchdog());
        assert_eq!(handle.watchdog_feeds(), 1);

        assert!(hal.supply_ok());
        handle.set_supply_ok(false);
        assert!(!hal.supply_ok());
    }
}
