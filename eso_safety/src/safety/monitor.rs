//! Per-input channel monitor: debounce, dual-channel cross-comparison and
//! stuck-at proof testing.
//!
//! All times are milliseconds since `init()`.

use eso_common::hal::{InputLine, SafetyHal};
use eso_common::safety::{InputDiagnostic, SafetyInputConfig, SafetyInputStatus, SafetySystemConfig};
use tracing::{debug, error};

/// System-level switches and timing the monitors read every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub dual_channel_monitoring: bool,
    pub cross_monitoring: bool,
    /// Discrepancy tolerance [ms].
    pub test_pulse_ms: u32,
    /// Stuck-at proof-test window [ms].
    pub proof_window_ms: u32,
}

impl MonitorSettings {
    pub fn from_config(config: &SafetySystemConfig) -> Self {
        Self {
            dual_channel_monitoring: config.enable_dual_channel_monitoring,
            cross_monitoring: config.enable_cross_monitoring,
            test_pulse_ms: config.test_pulse_interval_ms,
            proof_window_ms: config.fault_reset_time_ms,
        }
    }
}

/// Monitor for one safety input channel.
#[derive(Debug, Clone)]
pub struct ChannelMonitor {
    channel: u8,
    config: SafetyInputConfig,
    status: SafetyInputStatus,
    /// Latest undebounced logical state and when it was first seen.
    candidate: bool,
    candidate_since: u64,
    /// Start of the current line A/B disagreement.
    discrepancy_since: Option<u64>,
    /// End of the armed proof-test window.
    proof_deadline: Option<u64>,
}

impl ChannelMonitor {
    /// Disabled monitor for `channel`.
    pub fn new(channel: u8) -> Self {
        Self {
            channel,
            config: SafetyInputConfig::default(),
            status: SafetyInputStatus::default(),
            candidate: false,
            candidate_since: 0,
            discrepancy_since: None,
            proof_deadline: None,
        }
    }

    #[inline]
    pub const fn channel(&self) -> u8 {
        self.channel
    }

    #[inline]
    pub fn config(&self) -> &SafetyInputConfig {
        &self.config
    }

    #[inline]
    pub const fn status(&self) -> SafetyInputStatus {
        self.status
    }

    /// Enabled and currently demanding a safety stop.
    #[inline]
    pub const fn is_demanding(&self) -> bool {
        self.config.enabled && self.status.active
    }

    /// Replace the configuration and start from a clean status.
    pub fn configure(&mut self, config: SafetyInputConfig) {
        *self = Self {
            config,
            ..Self::new(self.channel)
        };
    }

    /// Arm the stuck-at proof test: the debounced state must change
    /// within `window_ms` from `now`.
    pub fn expect_cycle(&mut self, now: u64, window_ms: u32) {
        self.proof_deadline = Some(now + u64::from(window_ms));
        self.refresh_diagnostics(InputDiagnostic::PROOF_TEST_ARMED);
    }

    /// Clear the stuck-at latch.
    pub fn clear_stuck(&mut self) {
        self.status.stuck_at = false;
        self.refresh_fault();
    }

    /// Clear every latch and pending window, keeping the debounced state
    /// and counters.
    pub fn rearm(&mut self) {
        self.status.stuck_at = false;
        self.status.cross_monitor_fail = false;
        self.discrepancy_since = None;
        self.proof_deadline = None;
        self.refresh_fault();
        self.status.diagnostic_code = InputDiagnostic::empty();
    }

    /// Sample the HAL and recompute the channel status.
    pub fn update<H: SafetyHal + ?Sized>(
        &mut self,
        hal: &mut H,
        now: u64,
        settings: &MonitorSettings,
    ) -> SafetyInputStatus {
        if !self.config.enabled {
            self.status = SafetyInputStatus::default();
            return self.status;
        }

        let mut transient = InputDiagnostic::empty();
        let dual = self.config.dual_channel && settings.dual_channel_monitoring;

        let level_a = hal.read_input(self.channel, InputLine::A);
        transient.set(InputDiagnostic::LINE_A_HIGH, level_a);
        let level_b = if dual {
            let level = hal.read_input(self.channel, InputLine::B);
            transient.set(InputDiagnostic::LINE_B_HIGH, level);
            Some(level)
        } else {
            None
        };

        // Either line demanding is a demand.
        let raw = self.config.demand_from_level(level_a)
            || level_b.is_some_and(|level| self.config.demand_from_level(level));

        self.cross_compare(level_a, level_b, now, settings, &mut transient);
        self.debounce(raw, now, &mut transient);
        self.proof_test(now, &mut transient);

        self.refresh_fault();
        self.refresh_diagnostics(transient);
        self.status
    }

    fn cross_compare(
        &mut self,
        level_a: bool,
        level_b: Option<bool>,
        now: u64,
        settings: &MonitorSettings,
        transient: &mut InputDiagnostic,
    ) {
        let Some(level_b) = level_b.filter(|_| settings.cross_monitoring) else {
            self.discrepancy_since = None;
            return;
        };
        if level_a == level_b {
            self.discrepancy_since = None;
            return;
        }

        transient.insert(InputDiagnostic::DISCREPANCY);
        let since = *self.discrepancy_since.get_or_insert(now);
        if !self.status.cross_monitor_fail && now.saturating_sub(since) > u64::from(settings.test_pulse_ms) {
            self.status.cross_monitor_fail = true;
            error!(
                "Input {}: line A/B disagree for {} ms, cross-monitor failure",
                self.channel,
                now - since
            );
        }
    }

    fn debounce(&mut self, raw: bool, now: u64, transient: &mut InputDiagnostic) {
        if raw != self.candidate {
            self.candidate = raw;
            self.candidate_since = now;
        }
        if self.candidate == self.status.active {
            return;
        }
        if now.saturating_sub(self.candidate_since) < u64::from(self.config.debounce_time_ms) {
            transient.insert(InputDiagnostic::DEBOUNCING);
            return;
        }

        self.status.active = self.candidate;
        if self.status.active {
            self.status.activation_count = self.status.activation_count.wrapping_add(1);
            self.status.activation_time = now;
        } else {
            self.status.deactivation_time = now;
        }
        // Any accepted transition satisfies the proof test.
        self.proof_deadline = None;
        debug!(
            "Input {} {}",
            self.channel,
            if self.status.active { "active" } else { "released" }
        );
    }

    fn proof_test(&mut self, now: u64, transient: &mut InputDiagnostic) {
        let Some(deadline) = self.proof_deadline else {
            return;
        };
        if now > deadline {
            self.proof_deadline = None;
            self.status.stuck_at = true;
            error!("Input {}: no transition within proof-test window, stuck-at", self.channel);
        } else {
            transient.insert(InputDiagnostic::PROOF_TEST_ARMED);
        }
    }

    fn refresh_fault(&mut self) {
        self.status.fault = self.status.stuck_at || self.status.cross_monitor_fail;
    }

    fn refresh_diagnostics(&mut self, transient: InputDiagnostic) {
        let mut code = transient;
        code.set(InputDiagnostic::STUCK_AT, self.status.stuck_at);
        code.set(InputDiagnostic::CROSS_MONITOR, self.status.cross_monitor_fail);
        self.status.diagnostic_code = code;
    }
}
