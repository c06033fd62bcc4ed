//! Safety I/O data model shared by the supervisor, HAL drivers and tools.
//!
//! Modelled after EN ISO 13849-1 Category 3 / PL d patterns:
//! dual-channel inputs, fail-safe relay outputs, one surfaced fault code.

pub mod config;
pub mod diag;
pub mod error;
pub mod event;
pub mod fault;
pub mod state;
pub mod types;

pub use config::SafetySystemConfig;
pub use diag::{DiagnosticsMask, InputDiagnostic, OutputDiagnostic};
pub use error::SafetyError;
pub use event::{EventRecord, Reason};
pub use fault::{FaultCode, FaultFlags};
pub use state::{SafetyEvent, SafetyState};
pub use types::{
    InputType, OutputType, SafetyFunction, SafetyInputConfig, SafetyInputStatus,
    SafetyOutputConfig, SafetyOutputStatus, SafetyStatistics, SafetySystemStatus,
};
