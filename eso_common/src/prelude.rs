//! Prelude module for common re-exports.
//!
//! `use eso_common::prelude::*;` brings in the data model, HAL contract,
//! clocks and configuration traits used by every EsoCore crate.
//!
//! # Usage
//!
//! ```rust
//! use eso_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig, Validate};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{
    EVENT_LOG_DEPTH, MAX_OBSERVERS, SAFETY_INPUT_CHANNELS, SAFETY_OUTPUT_CHANNELS,
};

// ─── Time ───────────────────────────────────────────────────────────
pub use crate::clock::{Clock, ManualClock, MonotonicClock};

// ─── Hardware Access ────────────────────────────────────────────────
pub use crate::hal::{HalError, InputLine, SafetyHal};

// ─── Safety Data Model ──────────────────────────────────────────────
pub use crate::safety::{
    DiagnosticsMask, EventRecord, FaultCode, FaultFlags, InputType, OutputType, SafetyError,
    SafetyEvent, SafetyFunction, SafetyInputConfig, SafetyInputStatus, SafetyOutputConfig,
    SafetyOutputStatus, SafetyState, SafetyStatistics, SafetySystemConfig, SafetySystemStatus,
};
