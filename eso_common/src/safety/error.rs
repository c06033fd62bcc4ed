//! Error type returned by every supervisor operation.
//!
//! Payloads are `Copy` (`&'static str`, codes) so errors can be built in
//! the supervisory loop without allocation.

use thiserror::Error;

use super::fault::FaultCode;
use super::state::SafetyState;

/// Supervisor operation errors.
///
/// Configuration errors are rejected synchronously with no partial state
/// change. Hardware faults are never reported through this type; they are
/// latched as the system `fault_code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SafetyError {
    /// Operation requires `init()` first.
    #[error("safety system not initialized")]
    NotInitialized,

    /// `init()` called twice.
    #[error("safety system already initialized")]
    AlreadyInitialized,

    /// Channel index beyond the fixed channel count.
    #[error("channel {channel} out of range (max {max})")]
    ChannelOutOfRange { channel: u8, max: usize },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Configuration setters are locked while operational.
    #[error("configuration locked while operational")]
    ConfigLocked,

    /// Safety category outside 1..=4.
    #[error("invalid safety category {0} (expected 1..=4)")]
    InvalidCategory(u8),

    /// Output energize refused (deny-by-default gate).
    #[error("output inhibited: {0}")]
    OutputInhibited(&'static str),

    /// Output or input channel is disabled.
    #[error("channel {0} is disabled")]
    ChannelDisabled(u8),

    /// Operation requires `fault_code == None`.
    #[error("fault active: {0}")]
    FaultActive(FaultCode),

    /// An enabled safety input is still demanding a stop.
    #[error("safety demand active on input {0}")]
    DemandActive(u8),

    /// Watchdog supervision is disabled.
    #[error("safety supervision disabled")]
    SupervisionDisabled,

    /// State machine rejected the requested transition.
    #[error("transition rejected in state {state:?}: {reason}")]
    InvalidTransition {
        state: SafetyState,
        reason: &'static str,
    },

    /// HAL reported a failed output write.
    #[error("hardware write failed on output {0}")]
    HardwareWrite(u8),

    /// HAL emergency-stop circuit reported failure.
    #[error("hardware emergency stop failed")]
    EmergencyStopFailed,

    /// Fault class requires a full restart.
    #[error("fault not clearable locally: {0}")]
    FaultNotClearable(FaultCode),

    /// Unknown raw fault code.
    #[error("unknown fault code 0x{0:02X}")]
    UnknownFaultCode(u8),

    /// Observer table is full.
    #[error("observer limit ({0}) reached")]
    ObserverLimit(usize),

    /// Observer id not registered.
    #[error("unknown observer id {0}")]
    UnknownObserver(u32),

    /// Safety function validation failed.
    #[error("safety function validation failed: {0}")]
    ValidationFailed(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_carry_detail() {
        let err = SafetyError::ChannelOutOfRange { channel: 9, max: 6 };
        assert!(err.to_string().contains('9'));

        let err = SafetyError::FaultActive(FaultCode::Watchdog);
        assert!(err.to_string().contains("Watchdog timeout"));

        let err = SafetyError::InvalidTransition {
            state: SafetyState::Emergency,
            reason: "emergency exits only through reset",
        };
        assert!(err.to_string().contains("Emergency"));
    }
}
