//! Per-output supervisor: deny-by-default energize gate, feedback
//! supervision and short-circuit latching.

use eso_common::hal::SafetyHal;
use eso_common::safety::{OutputDiagnostic, SafetyError, SafetyOutputConfig, SafetyOutputStatus};
use tracing::{debug, error};

/// Whether the system currently allows energizing outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permit {
    Granted,
    Denied(&'static str),
}

/// Supervisor for one safety output channel.
#[derive(Debug, Clone)]
pub struct OutputSupervisor {
    channel: u8,
    config: SafetyOutputConfig,
    status: SafetyOutputStatus,
    /// Start of the current command/feedback disagreement.
    mismatch_since: Option<u64>,
}

impl OutputSupervisor {
    /// Disabled supervisor for `channel`.
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            config: SafetyOutputConfig::default(),
            status: SafetyOutputStatus::default(),
            mismatch_since: None,
        }
    }

    #[inline]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    #[inline]
    pub fn config(&self) -> &SafetyOutputConfig {
        &self.config
    }

    #[inline]
    pub const fn status(&self) -> SafetyOutputStatus {
        self.status
    }

    /// Replace the configuration and start from a clean status.
    pub fn configure(&mut self, config: SafetyOutputConfig) {
        *self = Self {
            config,
            ..Self::new(self.channel)
        };
    }

    /// Command the output.
    ///
    /// Energizing needs an enabled channel and a granted permit; both are
    /// checked before the HAL is touched. De-energizing is always attempted.
    ///
    /// # Errors
    /// `ChannelDisabled`, `OutputInhibited` or `HardwareWrite`.
    pub fn set<H: SafetyHal + ?Sized>(
        &mut self,
        hal: &mut H,
        energize: bool,
        permit: Permit,
        now: u64,
    ) -> Result<(), SafetyError> {
        if energize {
            if !self.config.enabled {
                return Err(SafetyError::ChannelDisabled(self.channel));
            }
            if let Permit::Denied(reason) = permit {
                return Err(SafetyError::OutputInhibited(reason));
            }
        }

        if !hal.write_output(self.channel, energize) {
            self.status.diagnostic_code.insert(OutputDiagnostic::WRITE_FAILED);
            error!(
                "Output {}: HAL write ({}) failed",
                self.channel,
                if energize { "on" } else { "off" }
            );
            return Err(SafetyError::HardwareWrite(self.channel));
        }
        self.status.diagnostic_code.remove(OutputDiagnostic::WRITE_FAILED);

        // Only a changed command opens a new feedback window; re-writing the
        // same state keeps the running one.
        match (self.status.energized, energize) {
            (false, true) => {
                self.status.cycle_count = self.status.cycle_count.wrapping_add(1);
                self.status.energize_time = now;
                self.mismatch_since = None;
                debug!("Output {} energized", self.channel);
            }
            (true, false) => {
                self.status.deenergize_time = now;
                self.mismatch_since = None;
                debug!("Output {} de-energized", self.channel);
            }
            _ => {}
        }
        self.status.energized = energize;
        Ok(())
    }

    /// Read back feedback and short-circuit state.
    pub fn supervise<H: SafetyHal + ?Sized>(
        &mut self,
        hal: &mut H,
        now: u64,
        test_pulse_ms: u32,
    ) -> SafetyOutputStatus {
        if !self.config.enabled {
            return self.status;
        }

        let feedback = hal.read_output_feedback(self.channel);
        let diag = &mut self.status.diagnostic_code;
        diag.set(OutputDiagnostic::FEEDBACK_HIGH, feedback);
        diag.remove(OutputDiagnostic::MISMATCH_PENDING);

        if feedback != self.status.energized {
            diag.insert(OutputDiagnostic::MISMATCH_PENDING);
            let since = *self.mismatch_since.get_or_insert(now);
            if !self.status.feedback_mismatch
                && now.saturating_sub(since) > u64::from(test_pulse_ms)
            {
                self.status.feedback_mismatch = true;
                error!(
                    "Output {}: feedback {} disagrees with command for {} ms",
                    self.channel,
                    feedback,
                    now - since
                );
            }
        } else {
            self.mismatch_since = None;
        }

        if !self.status.short_circuit && hal.output_short_circuit(self.channel) {
            self.status.short_circuit = true;
            error!("Output {}: short circuit reported", self.channel);
        }

        self.refresh();
        self.status
    }

    /// Clear the feedback-mismatch latch.
    pub fn clear_feedback(&mut self) {
        self.status.feedback_mismatch = false;
        self.mismatch_since = None;
        self.refresh();
    }

    /// Clear every latch, keeping commanded state and counters.
    pub fn rearm(&mut self) {
        self.status.short_circuit = false;
        self.clear_feedback();
        self.status.diagnostic_code = OutputDiagnostic::empty();
        self.refresh();
    }

    fn refresh(&mut self) {
        let status = &mut self.status;
        status.fault = status.feedback_mismatch || status.short_circuit;
        status
            .diagnostic_code
            .set(OutputDiagnostic::FEEDBACK_MISMATCH, status.feedback_mismatch);
        status
            .diagnostic_code
            .set(OutputDiagnostic::SHORT_CIRCUIT, status.short_circuit);
    }
}
