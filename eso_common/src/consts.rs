//! System-wide constants for the EsoCore safety workspace.
//!
//! Single source of truth for channel counts and supervisory timing.
//! Imported by all crates; nothing is redefined elsewhere.

use static_assertions::const_assert;

/// Number of safety input channels.
pub const SAFETY_INPUT_CHANNELS: usize = 6;

/// Number of safety output channels.
pub const SAFETY_OUTPUT_CHANNELS: usize = 4;

/// Default test pulse (supervisory cycle) interval [ms].
pub const SAFETY_TEST_PULSE_INTERVAL_MS: u32 = 100;

/// Default watchdog timeout [ms].
pub const SAFETY_WATCHDOG_TIMEOUT_MS: u32 = 500;

/// Default fault reset time / stuck-at proof-test window [ms].
pub const SAFETY_FAULT_RESET_TIME_MS: u32 = 3000;

/// Worst-case input reaction time accepted by function validation [ms].
pub const MAX_REACTION_TIME_MS: u32 = 250;

/// Depth of the circular safety event log.
pub const EVENT_LOG_DEPTH: usize = 32;

/// Maximum number of simultaneously registered event observers.
pub const MAX_OBSERVERS: usize = 4;

/// Capacity of a single observer event queue.
pub const EVENT_QUEUE_DEPTH: usize = 16;

/// Capacity of channel / system description strings.
pub const DESCRIPTION_LEN: usize = 32;

/// Capacity of event reason strings.
pub const REASON_LEN: usize = 48;

/// Bit set in the diagnostics mask when the system is not initialized.
pub const DIAG_NOT_INITIALIZED_BIT: u32 = 0;

/// First diagnostics bit used for input channel faults.
pub const DIAG_INPUT_BASE_BIT: u32 = 1;

/// First diagnostics bit used for output channel faults.
pub const DIAG_OUTPUT_BASE_BIT: u32 = DIAG_INPUT_BASE_BIT + SAFETY_INPUT_CHANNELS as u32;

/// Diagnostics bit for the aggregate system fault.
pub const DIAG_SYSTEM_FAULT_BIT: u32 = 15;

// Per-channel bits must never collide with the aggregate system fault bit.
const_assert!(DIAG_OUTPUT_BASE_BIT + SAFETY_OUTPUT_CHANNELS as u32 <= DIAG_SYSTEM_FAULT_BIT);
const_assert!(SAFETY_WATCHDOG_TIMEOUT_MS > SAFETY_TEST_PULSE_INTERVAL_MS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_are_consistent() {
        assert!(SAFETY_INPUT_CHANNELS > 0);
        assert!(SAFETY_OUTPUT_CHANNELS > 0);
        assert!(SAFETY_TEST_PULSE_INTERVAL_MS > 0);
        assert!(SAFETY_FAULT_RESET_TIME_MS > SAFETY_WATCHDOG_TIMEOUT_MS);
    }

    #[test]
    fn diagnostic_layout_matches_channel_counts() {
        assert_eq!(DIAG_OUTPUT_BASE_BIT, 7);
        assert_eq!(DIAG_OUTPUT_BASE_BIT + SAFETY_OUTPUT_CHANNELS as u32 - 1, 10);
    }
}
