//! Fault codes and fault condition bitflags.
//!
//! Only one [`FaultCode`] is surfaced at a time; every simultaneously true
//! condition stays inspectable through [`FaultFlags`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Active fault code (values match the device fault register).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FaultCode {
    /// No fault.
    #[default]
    None = 0x00,
    /// Input stuck at high/low.
    InputStuck = 0x01,
    /// Cross-monitoring failure.
    CrossMonitor = 0x02,
    /// Watchdog timeout.
    Watchdog = 0x03,
    /// Output short circuit.
    OutputShort = 0x04,
    /// Output feedback mismatch.
    OutputFeedback = 0x05,
    /// Power supply fault.
    PowerSupply = 0x06,
    /// Configuration error.
    Configuration = 0x07,
    /// Internal system fault.
    Internal = 0x08,
}

impl FaultCode {
    /// Fault codes in reporting precedence (highest first).
    pub const PRECEDENCE: [FaultCode; 8] = [
        FaultCode::InputStuck,
        FaultCode::CrossMonitor,
        FaultCode::Watchdog,
        FaultCode::OutputShort,
        FaultCode::OutputFeedback,
        FaultCode::PowerSupply,
        FaultCode::Configuration,
        FaultCode::Internal,
    ];

    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::InputStuck),
            0x02 => Some(Self::CrossMonitor),
            0x03 => Some(Self::Watchdog),
            0x04 => Some(Self::OutputShort),
            0x05 => Some(Self::OutputFeedback),
            0x06 => Some(Self::PowerSupply),
            0x07 => Some(Self::Configuration),
            0x08 => Some(Self::Internal),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Faults that `clear_fault` may reset locally. Every other fault
    /// needs a full restart after external inspection.
    #[inline]
    pub const fn is_clearable(&self) -> bool {
        matches!(self, Self::None | Self::InputStuck | Self::OutputFeedback)
    }

    /// Human-readable description.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::None => "No fault",
            Self::InputStuck => "Safety input stuck at high/low",
            Self::CrossMonitor => "Cross-monitoring failure",
            Self::Watchdog => "Watchdog timeout",
            Self::OutputShort => "Safety output short circuit",
            Self::OutputFeedback => "Safety output feedback mismatch",
            Self::PowerSupply => "Power supply fault",
            Self::Configuration => "Configuration error",
            Self::Internal => "Internal system fault",
        }
    }

    /// Description for a raw register value, including unknown codes.
    pub const fn describe_raw(raw: u8) -> &'static str {
        match Self::from_u8(raw) {
            Some(code) => code.description(),
            None => "Unknown fault",
        }
    }

    /// Condition flag corresponding to this code.
    #[inline]
    pub const fn flag(&self) -> FaultFlags {
        match self {
            Self::None => FaultFlags::empty(),
            Self::InputStuck => FaultFlags::INPUT_STUCK,
            Self::CrossMonitor => FaultFlags::CROSS_MONITOR,
            Self::Watchdog => FaultFlags::WATCHDOG,
            Self::OutputShort => FaultFlags::OUTPUT_SHORT,
            Self::OutputFeedback => FaultFlags::OUTPUT_FEEDBACK,
            Self::PowerSupply => FaultFlags::POWER_SUPPLY,
            Self::Configuration => FaultFlags::CONFIGURATION,
            Self::Internal => FaultFlags::INTERNAL,
        }
    }
}

impl core::fmt::Display for FaultCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:02X})", self.description(), *self as u8)
    }
}

bitflags! {
    /// Simultaneously true fault conditions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u16 {
        /// At least one input has a latched stuck-at fault.
        const INPUT_STUCK     = 0x0001;
        /// At least one input has a latched cross-monitor failure.
        const CROSS_MONITOR   = 0x0002;
        /// Watchdog not fed within its timeout.
        const WATCHDOG        = 0x0004;
        /// At least one output reports a short circuit.
        const OUTPUT_SHORT    = 0x0008;
        /// At least one output has a latched feedback mismatch.
        const OUTPUT_FEEDBACK = 0x0010;
        /// Safety supply out of tolerance.
        const POWER_SUPPLY    = 0x0020;
        /// Configuration inconsistent with the safety category.
        const CONFIGURATION   = 0x0040;
        /// Internal fault (safe state could not be reached).
        const INTERNAL        = 0x0080;
    }
}

impl FaultFlags {
    /// Highest-precedence code among the set flags.
    pub fn highest(&self) -> FaultCode {
        FaultCode::PRECEDENCE
            .iter()
            .copied()
            .find(|code| self.contains(code.flag()))
            .unwrap_or(FaultCode::None)
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}
