//! Shared simulated board state and fault injection.

use eso_common::consts::{SAFETY_INPUT_CHANNELS, SAFETY_OUTPUT_CHANNELS};
use eso_common::hal::InputLine;
use parking_lot::Mutex;
use std::sync::Arc;

/// Electrical and bookkeeping state of the simulated board.
#[derive(Debug, Clone)]
pub(super) struct SimState {
    /// Line A / line B levels per input (`true` = high).
    pub inputs: [[bool; 2]; SAFETY_INPUT_CHANNELS],
    /// Relay drive per output.
    pub drive: [bool; SAFETY_OUTPUT_CHANNELS],
    /// Feedback forced to a fixed level (welded contact, broken wire).
    pub stuck_feedback: [Option<bool>; SAFETY_OUTPUT_CHANNELS],
    /// Short circuit reported by the output driver.
    pub short_circuit: [bool; SAFETY_OUTPUT_CHANNELS],
    /// Writes to these outputs fail.
    pub write_fail: [bool; SAFETY_OUTPUT_CHANNELS],
    /// Write attempts per output.
    pub write_attempts: [u32; SAFETY_OUTPUT_CHANNELS],
    pub supply_ok: bool,
    pub watchdog_fail: bool,
    pub emergency_fail: bool,
    pub watchdog_feeds: u64,
    pub emergency_stops: u32,
}

impl Default for SimState {
    /// Closed NC circuits on every line, outputs off, healthy supply.
    fn default() -> Self {
        Self {
            inputs: [[true; 2]; SAFETY_INPUT_CHANNELS],
            drive: [false; SAFETY_OUTPUT_CHANNELS],
            stuck_feedback: [None; SAFETY_OUTPUT_CHANNELS],
            short_circuit: [false; SAFETY_OUTPUT_CHANNELS],
            write_fail: [false; SAFETY_OUTPUT_CHANNELS],
            write_attempts: [0; SAFETY_OUTPUT_CHANNELS],
            supply_ok: true,
            watchdog_fail: false,
            emergency_fail: false,
            watchdog_feeds: 0,
            emergency_stops: 0,
        }
    }
}

/// Cloneable handle to the simulated board.
///
/// The driver and any number of handles share one state, so a test can
/// move the driver into a supervisor and keep steering the board.
#[derive(Debug, Clone, Default)]
pub struct SimHandle {
    pub(super) inner: Arc<Mutex<SimState>>,
}

impl SimHandle {
    /// Create a handle to a fresh board.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the level of one input line. Out-of-range channels are ignored.
    pub fn set_line(&self, channel: u8, line: InputLine, level: bool) {
        if let Some(lines) = self.inner.lock().inputs.get_mut(channel as usize) {
            lines[line_index(line)] = level;
        }
    }

    /// Set both lines of an input to the same level.
    pub fn set_input(&self, channel: u8, level: bool) {
        if let Some(lines) = self.inner.lock().inputs.get_mut(channel as usize) {
            *lines = [level, level];
        }
    }

    /// Current level of one input line.
    pub fn line(&self, channel: u8, line: InputLine) -> bool {
        self.inner
            .lock()
            .inputs
            .get(channel as usize)
            .is_some_and(|lines| lines[line_index(line)])
    }

    /// Current relay drive of an output.
    pub fn output(&self, channel: u8) -> bool {
        self.inner
            .lock()
            .drive
            .get(channel as usize)
            .copied()
            .unwrap_or(false)
    }

    /// Force the feedback contact of an output to `level`, or release it.
    pub fn stick_feedback(&self, channel: u8, level: Option<bool>) {
        if let Some(slot) = self.inner.lock().stuck_feedback.get_mut(channel as usize) {
            *slot = level;
        }
    }

    /// Inject or clear a short circuit on an output.
    pub fn inject_short(&self, channel: u8, shorted: bool) {
        if let Some(slot) = self.inner.lock().short_circuit.get_mut(channel as usize) {
            *slot = shorted;
        }
    }

    /// Make writes to an output fail (or succeed again).
    pub fn fail_writes(&self, channel: u8, fail: bool) {
        if let Some(slot) = self.inner.lock().write_fail.get_mut(channel as usize) {
            *slot = fail;
        }
    }

    /// Set supply rail health.
    pub fn set_supply_ok(&self, ok: bool) {
        self.inner.lock().supply_ok = ok;
    }

    /// Make watchdog retriggers fail.
    pub fn fail_watchdog(&self, fail: bool) {
        self.inner.lock().watchdog_fail = fail;
    }

    /// Make the emergency-stop circuit report failure.
    pub fn fail_emergency_stop(&self, fail: bool) {
        self.inner.lock().emergency_fail = fail;
    }

    /// Number of write attempts on an output since creation.
    pub fn write_attempts(&self, channel: u8) -> u32 {
        self.inner
            .lock()
            .write_attempts
            .get(channel as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Number of successful watchdog retriggers.
    pub fn watchdog_feeds(&self) -> u64 {
        self.inner.lock().watchdog_feeds
    }

    /// Number of emergency-stop circuit activations.
    pub fn emergency_stops(&self) -> u32 {
        self.inner.lock().emergency_stops
    }
}

#[inline]
const fn line_index(line: InputLine) -> usize {
    match line {
        InputLine::A => 0,
        InputLine::B => 1,
    }
}
