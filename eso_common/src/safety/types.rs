//! Channel configuration and status types.

use serde::{Deserialize, Serialize};

use super::diag::{DiagnosticsMask, InputDiagnostic, OutputDiagnostic};
use super::error::SafetyError;
use super::fault::FaultCode;
use super::state::{SafetyEvent, SafetyState};
use crate::consts::DESCRIPTION_LEN;

/// Bounded description text.
pub type Description = heapless::String<DESCRIPTION_LEN>;

// ─── Channel Identity ───────────────────────────────────────────────

/// Safety input device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum InputType {
    /// Emergency stop button.
    #[default]
    EmergencyStop = 0,
    /// Safety edge contact.
    SafetyEdge = 1,
    /// Light curtain interruption.
    LightCurtain = 2,
    /// Door position sensor.
    DoorSensor = 3,
    /// Two-hand control.
    TwoHand = 4,
    /// Magnetic safety switch.
    Magnetic = 5,
}

impl InputType {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::EmergencyStop),
            1 => Some(Self::SafetyEdge),
            2 => Some(Self::LightCurtain),
            3 => Some(Self::DoorSensor),
            4 => Some(Self::TwoHand),
            5 => Some(Self::Magnetic),
            _ => None,
        }
    }

    /// Devices that Category 3 and above require to be wired dual-channel.
    #[inline]
    pub const fn requires_dual_channel(&self, category: u8) -> bool {
        category >= 3
            && matches!(
                self,
                Self::EmergencyStop | Self::SafetyEdge | Self::LightCurtain | Self::TwoHand
            )
    }
}

/// Safety output device type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum OutputType {
    /// Door lock solenoid.
    #[default]
    DoorLock = 0,
    /// Motor brake control.
    MotorBrake = 1,
    /// Fault indicator light.
    FaultLight = 2,
    /// Reset enable signal.
    ResetEnable = 3,
}

impl OutputType {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::DoorLock),
            1 => Some(Self::MotorBrake),
            2 => Some(Self::FaultLight),
            3 => Some(Self::ResetEnable),
            _ => None,
        }
    }
}

/// Safety function checked by `validate_function`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyFunction {
    EmergencyStop,
    SafetyEdge,
    LightCurtain,
    DoorInterlock,
    TwoHandControl,
}

impl SafetyFunction {
    /// Whether an input of `input_type` implements this function.
    #[inline]
    pub const fn served_by(&self, input_type: InputType) -> bool {
        matches!(
            (self, input_type),
            (Self::EmergencyStop, InputType::EmergencyStop)
                | (Self::SafetyEdge, InputType::SafetyEdge)
                | (Self::LightCurtain, InputType::LightCurtain)
                | (Self::DoorInterlock, InputType::DoorSensor | InputType::Magnetic)
                | (Self::TwoHandControl, InputType::TwoHand)
        )
    }
}

// ─── Configuration ──────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_debounce_ms() -> u32 {
    20
}

/// Safety input channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyInputConfig {
    /// Device type.
    #[serde(default)]
    pub input_type: InputType,
    /// Channel supervised.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// NC contact (circuit open = demand) or NO contact (circuit closed = demand).
    #[serde(default = "default_true")]
    pub normally_closed: bool,
    /// Time a new state must persist before it is accepted [ms].
    #[serde(default = "default_debounce_ms")]
    pub debounce_time_ms: u32,
    /// Read line A and line B and cross-compare them.
    #[serde(default)]
    pub dual_channel: bool,
    /// Line A GPIO pin.
    #[serde(default)]
    pub channel_a_pin: u8,
    /// Line B GPIO pin.
    #[serde(default)]
    pub channel_b_pin: u8,
    #[serde(default)]
    pub description: Description,
}

impl Default for SafetyInputConfig {
    /// Disabled placeholder channel.
    fn default() -> Self {
        Self {
            input_type: InputType::EmergencyStop,
            enabled: false,
            normally_closed: true,
            debounce_time_ms: default_debounce_ms(),
            dual_channel: false,
            channel_a_pin: 0,
            channel_b_pin: 0,
            description: Description::new(),
        }
    }
}

impl SafetyInputConfig {
    /// Enabled single-channel NC input on `pin`.
    pub fn new(input_type: InputType, pin: u8) -> Self {
        Self {
            input_type,
            enabled: true,
            channel_a_pin: pin,
            channel_b_pin: pin,
            ..Self::default()
        }
    }

    /// Wire as dual-channel with line B on `pin_b`.
    pub fn dual(mut self, pin_b: u8) -> Self {
        self.dual_channel = true;
        self.channel_b_pin = pin_b;
        self
    }

    /// Use a normally-open contact.
    pub fn normally_open(mut self) -> Self {
        self.normally_closed = false;
        self
    }

    pub fn debounce(mut self, ms: u32) -> Self {
        self.debounce_time_ms = ms;
        self
    }

    pub fn with_description(mut self, text: &str) -> Self {
        self.description = describe(text);
        self
    }

    /// Validate wiring.
    ///
    /// # Errors
    /// `InvalidConfig` when a dual-channel input uses the same pin twice.
    pub fn validate(&self) -> Result<(), SafetyError> {
        if self.enabled && self.dual_channel && self.channel_a_pin == self.channel_b_pin {
            return Err(SafetyError::InvalidConfig(
                "dual-channel input needs distinct channel A/B pins",
            ));
        }
        Ok(())
    }

    /// Convert an electrical level to a logical demand.
    #[inline]
    pub const fn demand_from_level(&self, level_high: bool) -> bool {
        if self.normally_closed {
            !level_high
        } else {
            level_high
        }
    }
}

/// Safety output channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyOutputConfig {
    /// Device type.
    #[serde(default)]
    pub output_type: OutputType,
    /// Channel supervised and commandable.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// De-energized is the safe state (fail-safe relay).
    #[serde(default = "default_true")]
    pub fail_safe: bool,
    /// Relay driver GPIO pin.
    #[serde(default)]
    pub relay_pin: u8,
    /// Feedback contact GPIO pin.
    #[serde(default)]
    pub feedback_pin: u8,
    #[serde(default)]
    pub description: Description,
}

impl Default for SafetyOutputConfig {
    /// Disabled placeholder channel.
    fn default() -> Self {
        Self {
            output_type: OutputType::DoorLock,
            enabled: false,
            fail_safe: true,
            relay_pin: 0,
            feedback_pin: 0,
            description: Description::new(),
        }
    }
}

impl SafetyOutputConfig {
    /// Enabled fail-safe output.
    pub fn new(output_type: OutputType, relay_pin: u8, feedback_pin: u8) -> Self {
        Self {
            output_type,
            enabled: true,
            relay_pin,
            feedback_pin,
            ..Self::default()
        }
    }

    pub fn with_description(mut self, text: &str) -> Self {
        self.description = describe(text);
        self
    }

    /// Validate wiring against the safety category.
    pub fn validate(&self, category: u8) -> Result<(), SafetyError> {
        if !self.enabled {
            return Ok(());
        }
        if self.relay_pin == self.feedback_pin {
            return Err(SafetyError::InvalidConfig(
                "output relay and feedback pins must differ",
            ));
        }
        if category >= 3 && !self.fail_safe {
            return Err(SafetyError::InvalidConfig(
                "category 3+ outputs must be fail-safe",
            ));
        }
        Ok(())
    }
}

fn describe(text: &str) -> Description {
    let mut out = Description::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// ─── Status Snapshots ───────────────────────────────────────────────

/// Per-input status, recomputed every supervisory cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyInputStatus {
    /// Debounced safety demand.
    pub active: bool,
    /// `stuck_at || cross_monitor_fail`.
    pub fault: bool,
    pub stuck_at: bool,
    pub cross_monitor_fail: bool,
    /// Last inactive→active transition [ms since init].
    pub activation_time: u64,
    /// Last active→inactive transition [ms since init].
    pub deactivation_time: u64,
    pub activation_count: u32,
    pub diagnostic_code: InputDiagnostic,
}

/// Per-output status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyOutputStatus {
    /// Commanded drive state.
    pub energized: bool,
    /// `feedback_mismatch || short_circuit`.
    pub fault: bool,
    pub feedback_mismatch: bool,
    pub short_circuit: bool,
    /// Last off→on command [ms since init].
    pub energize_time: u64,
    /// Last on→off command [ms since init].
    pub deenergize_time: u64,
    /// Number of off→on cycles.
    pub cycle_count: u32,
    pub diagnostic_code: OutputDiagnostic,
}

/// Aggregate system status, the single source of truth for consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetySystemStatus {
    pub current_state: SafetyState,
    pub last_event: SafetyEvent,
    /// Time of `last_event` [ms since init].
    pub event_timestamp: u64,
    /// Time of the last state transition [ms since init].
    pub state_change_time: u64,
    pub fault_code: FaultCode,
    /// Mask from the last `run_diagnostics` pass.
    pub diagnostic_status: DiagnosticsMask,
    pub watchdog_active: bool,
    pub safe_state_enforced: bool,
    pub uptime_seconds: u32,
    /// Cumulative number of detected faults.
    pub fault_count: u32,
}

/// Lifetime counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyStatistics {
    pub uptime_seconds: u32,
    pub fault_count: u32,
    pub reset_count: u32,
    pub cycle_count: u64,
}
