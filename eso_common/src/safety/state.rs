//! Safety system states and events.
//!
//! All enums use `#[repr(u8)]` with the numeric values of the field-bus
//! and telemetry representation, so `from_u8` round-trips raw codes.

use serde::{Deserialize, Serialize};

use super::types::InputType;

/// Safety system state.
///
/// `Emergency` is terminal for the session and exits only through an
/// explicit reset request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SafetyState {
    /// Safe state: all outputs de-energized (initial).
    #[default]
    Safe = 0,
    /// Normal operation, outputs may be commanded.
    Operational = 1,
    /// Safety stop initiated by a safety input demand.
    Stop = 2,
    /// Safety fault detected.
    Fault = 3,
    /// Reset in progress.
    Reset = 4,
    /// Emergency stop.
    Emergency = 5,
}

impl SafetyState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Safe),
            1 => Some(Self::Operational),
            2 => Some(Self::Stop),
            3 => Some(Self::Fault),
            4 => Some(Self::Reset),
            5 => Some(Self::Emergency),
            _ => None,
        }
    }

    /// Whether outputs are forced off in this state.
    #[inline]
    pub const fn outputs_forced_off(&self) -> bool {
        !matches!(self, Self::Operational)
    }

    /// States left only through `request_reset` (or a restart).
    #[inline]
    pub const fn requires_reset(&self) -> bool {
        matches!(self, Self::Stop | Self::Fault | Self::Emergency)
    }
}

/// Safety events published to observers and recorded in the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum SafetyEvent {
    /// No event.
    #[default]
    None = 0,
    /// Emergency stop activated.
    EmergencyStop = 1,
    /// Safety edge triggered.
    SafetyEdge = 2,
    /// Light curtain breached.
    LightCurtain = 3,
    /// Door opened during operation.
    DoorOpen = 4,
    /// Safety fault detected.
    FaultDetected = 5,
    /// Watchdog timeout.
    WatchdogTimeout = 6,
    /// Cross-monitoring failure.
    CrossMonitorFail = 7,
    /// Power supply fault.
    PowerLoss = 8,
    /// Reset requested.
    ResetRequest = 9,
    /// Two-hand control released during operation.
    TwoHandRelease = 10,
}

impl SafetyEvent {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::EmergencyStop),
            2 => Some(Self::SafetyEdge),
            3 => Some(Self::LightCurtain),
            4 => Some(Self::DoorOpen),
            5 => Some(Self::FaultDetected),
            6 => Some(Self::WatchdogTimeout),
            7 => Some(Self::CrossMonitorFail),
            8 => Some(Self::PowerLoss),
            9 => Some(Self::ResetRequest),
            10 => Some(Self::TwoHandRelease),
            _ => None,
        }
    }

    /// Event raised when an input of the given type becomes active.
    #[inline]
    pub const fn for_demand(input_type: InputType) -> Self {
        match input_type {
            InputType::EmergencyStop => Self::EmergencyStop,
            InputType::SafetyEdge => Self::SafetyEdge,
            InputType::LightCurtain => Self::LightCurtain,
            InputType::DoorSensor | InputType::Magnetic => Self::DoorOpen,
            InputType::TwoHand => Self::TwoHandRelease,
        }
    }
}
