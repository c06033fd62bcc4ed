//! Safety system state machine (transition table only).
//!
//! Safe → Operational → {Stop, Fault, Emergency} → Reset → Operational | Safe.
//! Stop, Fault and Emergency exit only through Reset (or a full restart).
//! Side effects (outputs, events, timestamps) belong to the supervisor.

use eso_common::safety::SafetyState;

/// Requests that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// `exit_safety_mode`: resume operation.
    Resume,
    /// `enter_safety_mode`: controlled de-energize.
    EnterSafe,
    /// Safety input demand other than emergency stop.
    Demand,
    /// Forced stop (API, stop latch or emergency-stop input).
    EmergencyStop,
    /// Newly detected fault.
    Fault,
    /// `request_reset`.
    Reset,
    /// Full restart after external inspection.
    Restart,
}

/// Result of a state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Ok(SafetyState),
    Rejected(&'static str),
}

/// Top-level safety state machine.
#[derive(Debug, Clone)]
pub struct SafetyStateMachine {
    state: SafetyState,
}

impl SafetyStateMachine {
    pub const fn new() -> Self {
        Self {
            state: SafetyState::Safe,
        }
    }

    #[inline]
    pub const fn state(&self) -> SafetyState {
        self.state
    }

    /// Apply a trigger. The state is only changed on `Transition::Ok`.
    pub fn handle(&mut self, trigger: Trigger) -> Transition {
        use SafetyState as S;
        use Trigger as T;

        let next = match (self.state, trigger) {
            // Resume from the controlled states only.
            (S::Safe | S::Reset | S::Operational, T::Resume) => S::Operational,
            (S::Stop, T::Resume) => return Transition::Rejected("stop exits only through reset"),
            (S::Fault | S::Emergency, T::Resume) => {
                return Transition::Rejected("fault and emergency exit only through reset");
            }

            (S::Safe | S::Operational | S::Reset, T::EnterSafe) => S::Safe,
            (S::Stop, T::EnterSafe) => return Transition::Rejected("stop exits only through reset"),
            (S::Fault | S::Emergency, T::EnterSafe) => {
                return Transition::Rejected("fault and emergency exit only through reset");
            }

            (S::Operational | S::Stop, T::Demand) => S::Stop,
            (_, T::Demand) => return Transition::Rejected("no operation to stop"),

            // Always reachable.
            (_, T::EmergencyStop) => S::Emergency,
            (S::Emergency, T::Fault) => S::Emergency,
            (_, T::Fault) => S::Fault,
            (_, T::Reset) => S::Reset,
            (_, T::Restart) => S::Safe,
        };

        self.state = next;
        Transition::Ok(next)
    }
}

impl Default for SafetyStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
