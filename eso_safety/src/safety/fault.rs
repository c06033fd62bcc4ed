//! Fault aggregation and software watchdog.
//!
//! Per-channel conditions are latched by the monitors; system-level
//! conditions (watchdog, supply, configuration, internal) are latched here
//! until [`FaultAggregator::rearm`].

use eso_common::safety::{FaultCode, FaultFlags, SafetyInputStatus, SafetyOutputStatus};

// ─── Watchdog ───────────────────────────────────────────────────────

/// Software watchdog fed once per supervisory cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watchdog {
    timeout_ms: u32,
    last_feed: u64,
    enabled: bool,
}

impl Watchdog {
    pub const fn new(timeout_ms: u32, now: u64) -> Self {
        Self {
            timeout_ms,
            last_feed: now,
            enabled: true,
        }
    }

    #[inline]
    pub fn feed(&mut self, now: u64) {
        self.last_feed = now;
    }

    /// Time since the last feed [ms].
    #[inline]
    pub const fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.last_feed)
    }

    /// Enabled and not fed for longer than the timeout.
    #[inline]
    pub const fn expired(&self, now: u64) -> bool {
        self.enabled && self.elapsed(now) > self.timeout_ms as u64
    }

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabling restarts the timeout from `now`.
    pub fn set_enabled(&mut self, enabled: bool, now: u64) {
        if enabled && !self.enabled {
            self.last_feed = now;
        }
        self.enabled = enabled;
    }

    pub fn set_timeout(&mut self, timeout_ms: u32) {
        self.timeout_ms = timeout_ms;
    }
}

// ─── Aggregator ─────────────────────────────────────────────────────

/// Conditions sampled for one aggregation pass.
#[derive(Debug, Clone, Copy)]
pub struct FaultInputs<'a> {
    pub inputs: &'a [SafetyInputStatus],
    pub outputs: &'a [SafetyOutputStatus],
    pub watchdog_expired: bool,
    pub supply_ok: bool,
    pub config_fault: bool,
    pub internal_fault: bool,
}

/// Outcome of one aggregation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultReport {
    /// Highest-precedence active fault.
    pub code: FaultCode,
    /// Every active condition.
    pub flags: FaultFlags,
    /// Conditions that were not active on the previous pass.
    pub raised: FaultFlags,
}

/// Merges every fault condition into one surfaced code.
#[derive(Debug, Clone, Default)]
pub struct FaultAggregator {
    latched: FaultFlags,
    flags: FaultFlags,
}

impl FaultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate all conditions.
    pub fn check(&mut self, inputs: &FaultInputs<'_>) -> FaultReport {
        let mut flags = FaultFlags::empty();
        for status in inputs.inputs {
            if status.stuck_at {
                flags.insert(FaultFlags::INPUT_STUCK);
            }
            if status.cross_monitor_fail {
                flags.insert(FaultFlags::CROSS_MONITOR);
            }
        }
        for status in inputs.outputs {
            if status.short_circuit {
                flags.insert(FaultFlags::OUTPUT_SHORT);
            }
            if status.feedback_mismatch {
                flags.insert(FaultFlags::OUTPUT_FEEDBACK);
            }
        }

        if inputs.watchdog_expired {
            self.latched.insert(FaultFlags::WATCHDOG);
        }
        if !inputs.supply_ok {
            self.latched.insert(FaultFlags::POWER_SUPPLY);
        }
        if inputs.config_fault {
            self.latched.insert(FaultFlags::CONFIGURATION);
        }
        if inputs.internal_fault {
            self.latched.insert(FaultFlags::INTERNAL);
        }

        flags |= self.latched;
        let raised = flags.difference(self.flags);
        self.flags = flags;
        FaultReport {
            code: flags.highest(),
            flags,
            raised,
        }
    }

    /// Conditions found by the last pass.
    #[inline]
    pub fn flags(&self) -> FaultFlags {
        self.flags
    }

    /// Drop every latch (full restart only).
    pub fn rearm(&mut self) {
        self.latched = FaultFlags::empty();
        self.flags = FaultFlags::empty();
    }
}
