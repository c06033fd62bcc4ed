//! Diagnostic codes for channels and the system-wide diagnostics mask.

use bitflags::bitflags;

use crate::consts::{
    DIAG_INPUT_BASE_BIT, DIAG_NOT_INITIALIZED_BIT, DIAG_OUTPUT_BASE_BIT, DIAG_SYSTEM_FAULT_BIT,
    SAFETY_INPUT_CHANNELS, SAFETY_OUTPUT_CHANNELS,
};

bitflags! {
    /// Per-input diagnostic detail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InputDiagnostic: u8 {
        /// Line A and B disagreed for longer than one test pulse (latched).
        const CROSS_MONITOR    = 0x01;
        /// No transition within the proof-test window (latched).
        const STUCK_AT         = 0x02;
        /// Raw electrical level of line A at the last sample.
        const LINE_A_HIGH      = 0x04;
        /// Raw electrical level of line B at the last sample.
        const LINE_B_HIGH      = 0x08;
        /// A new state is waiting for the debounce window.
        const DEBOUNCING       = 0x10;
        /// Lines currently disagree (not yet latched).
        const DISCREPANCY      = 0x20;
        /// Stuck-at proof-test window armed.
        const PROOF_TEST_ARMED = 0x40;
    }
}

impl Default for InputDiagnostic {
    fn default() -> Self {
        Self::empty()
    }
}

bitflags! {
    /// Per-output diagnostic detail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OutputDiagnostic: u8 {
        /// Feedback disagreed with command longer than one test pulse (latched).
        const FEEDBACK_MISMATCH = 0x01;
        /// Driver reported a short circuit (latched).
        const SHORT_CIRCUIT     = 0x02;
        /// Last HAL write failed.
        const WRITE_FAILED      = 0x04;
        /// Feedback contact level at the last sample.
        const FEEDBACK_HIGH     = 0x08;
        /// Feedback currently disagrees (not yet latched).
        const MISMATCH_PENDING  = 0x10;
    }
}

impl Default for OutputDiagnostic {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of `run_diagnostics`.
///
/// | Bit | Meaning |
/// |-----|---------|
/// | 0 | system not initialized |
/// | 1..=6 | input channel fault |
/// | 7..=10 | output channel fault |
/// | 15 | aggregate system fault (`fault_code != None`) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DiagnosticsMask(u16);

impl DiagnosticsMask {
    /// All checks passed.
    pub const CLEAR: Self = Self(0);

    /// Mask reported by an uninitialized system.
    pub const NOT_INITIALIZED: Self = Self(1 << DIAG_NOT_INITIALIZED_BIT);

    #[inline]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(&self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_clear(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn not_initialized(&self) -> bool {
        self.0 & (1 << DIAG_NOT_INITIALIZED_BIT) != 0
    }

    #[inline]
    pub const fn system_fault(&self) -> bool {
        self.0 & (1 << DIAG_SYSTEM_FAULT_BIT) != 0
    }

    /// Whether input channel `ch` reported a fault (`false` if out of range).
    #[inline]
    pub const fn input_fault(&self, ch: usize) -> bool {
        ch < SAFETY_INPUT_CHANNELS && self.0 & (1 << (DIAG_INPUT_BASE_BIT + ch as u32)) != 0
    }

    /// Whether output channel `ch` reported a fault (`false` if out of range).
    #[inline]
    pub const fn output_fault(&self, ch: usize) -> bool {
        ch < SAFETY_OUTPUT_CHANNELS && self.0 & (1 << (DIAG_OUTPUT_BASE_BIT + ch as u32)) != 0
    }

    pub fn set_input_fault(&mut self, ch: usize) {
        if ch < SAFETY_INPUT_CHANNELS {
            self.0 |= 1 << (DIAG_INPUT_BASE_BIT + ch as u32);
        }
    }

    pub fn set_output_fault(&mut self, ch: usize) {
        if ch < SAFETY_OUTPUT_CHANNELS {
            self.0 |= 1 << (DIAG_OUTPUT_BASE_BIT + ch as u32);
        }
    }

    pub fn set_system_fault(&mut self) {
        self.0 |= 1 << DIAG_SYSTEM_FAULT_BIT;
    }
}
