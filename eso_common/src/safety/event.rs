//! Event records pushed to observers and kept in the event log.

use serde::{Deserialize, Serialize};

use super::fault::FaultCode;
use super::state::{SafetyEvent, SafetyState};
use crate::consts::REASON_LEN;

/// Bounded, allocation-free event reason text.
pub type Reason = heapless::String<REASON_LEN>;

/// Build a [`Reason`], truncating at a character boundary when the text
/// exceeds the capacity.
pub fn reason(text: &str) -> Reason {
    let mut out = Reason::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// One published safety event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event kind.
    pub event: SafetyEvent,
    /// Time of detection [ms since init].
    pub timestamp_ms: u64,
    /// State after the event was handled.
    pub state: SafetyState,
    /// Active fault code after the event was handled.
    pub fault: FaultCode,
    /// Originating input channel, if any.
    pub channel: Option<u8>,
    /// Free-text context (stop reason, fault description).
    pub reason: Reason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_truncates_at_capacity() {
        let long = "x".repeat(REASON_LEN * 2);
        assert_eq!(reason(&long).len(), REASON_LEN);
        assert_eq!(reason("operator request").as_str(), "operator request");
    }

    #[test]
    fn reason_respects_char_boundaries() {
        let text = "ü".repeat(REASON_LEN);
        let r = reason(&text);
        assert!(r.len() <= REASON_LEN);
        assert!(r.chars().all(|c| c == 'ü'));
    }
}
