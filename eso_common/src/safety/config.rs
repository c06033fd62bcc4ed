//! System-level supervisory configuration.

use serde::{Deserialize, Serialize};

use super::error::SafetyError;
use super::types::Description;
use crate::consts::{
    SAFETY_FAULT_RESET_TIME_MS, SAFETY_TEST_PULSE_INTERVAL_MS, SAFETY_WATCHDOG_TIMEOUT_MS,
};

fn default_watchdog_timeout_ms() -> u32 {
    SAFETY_WATCHDOG_TIMEOUT_MS
}

fn default_test_pulse_interval_ms() -> u32 {
    SAFETY_TEST_PULSE_INTERVAL_MS
}

fn default_fault_reset_time_ms() -> u32 {
    SAFETY_FAULT_RESET_TIME_MS
}

fn default_true() -> bool {
    true
}

fn default_category() -> u8 {
    3
}

/// Supervisory timing and monitoring switches, supplied at `init()`.
///
/// # TOML Example
///
/// ```toml
/// watchdog_timeout_ms = 500
/// test_pulse_interval_ms = 100
/// fault_reset_time_ms = 3000
/// safety_category = 3
/// description = "press line 2"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySystemConfig {
    /// Software watchdog timeout [ms].
    #[serde(default = "default_watchdog_timeout_ms")]
    pub watchdog_timeout_ms: u32,
    /// Supervisory cycle period [ms].
    #[serde(default = "default_test_pulse_interval_ms")]
    pub test_pulse_interval_ms: u32,
    /// Stuck-at proof-test window [ms].
    #[serde(default = "default_fault_reset_time_ms")]
    pub fault_reset_time_ms: u32,
    #[serde(default = "default_true")]
    pub enable_dual_channel_monitoring: bool,
    #[serde(default = "default_true")]
    pub enable_cross_monitoring: bool,
    #[serde(default = "default_true")]
    pub enable_safe_state_enforcement: bool,
    /// EN ISO 13849-1 category (1..=4).
    #[serde(default = "default_category")]
    pub safety_category: u8,
    #[serde(default)]
    pub description: Description,
}

impl Default for SafetySystemConfig {
    fn default() -> Self {
        Self {
            watchdog_timeout_ms: SAFETY_WATCHDOG_TIMEOUT_MS,
            test_pulse_interval_ms: SAFETY_TEST_PULSE_INTERVAL_MS,
            fault_reset_time_ms: SAFETY_FAULT_RESET_TIME_MS,
            enable_dual_channel_monitoring: true,
            enable_cross_monitoring: true,
            enable_safe_state_enforcement: true,
            safety_category: default_category(),
            description: Description::new(),
        }
    }
}

impl SafetySystemConfig {
    /// Validate timing and category consistency.
    ///
    /// # Errors
    /// - `InvalidConfig` for zero intervals, a watchdog timeout not longer
    ///   than one test pulse, or category 3+ without dual-channel monitoring.
    /// - `InvalidCategory` for a category outside `1..=4`.
    pub fn validate(&self) -> Result<(), SafetyError> {
        if self.watchdog_timeout_ms == 0
            || self.test_pulse_interval_ms == 0
            || self.fault_reset_time_ms == 0
        {
            return Err(SafetyError::InvalidConfig("timing intervals must be non-zero"));
        }
        if self.watchdog_timeout_ms <= self.test_pulse_interval_ms {
            return Err(SafetyError::InvalidConfig(
                "watchdog timeout must exceed the test pulse interval",
            ));
        }
        if !(1..=4).contains(&self.safety_category) {
            return Err(SafetyError::InvalidCategory(self.safety_category));
        }
        if self.safety_category >= 3 && !self.enable_dual_channel_monitoring {
            return Err(SafetyError::InvalidConfig(
                "category 3+ requires dual-channel monitoring",
            ));
        }
        Ok(())
    }

    /// Copy of this config with another category.
    pub fn with_category(&self, category: u8) -> Self {
        Self {
            safety_category: category,
            ..self.clone()
        }
    }
}
