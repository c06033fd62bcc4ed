//! # EsoCore HAL Library
//!
//! Safety I/O drivers implementing the `SafetyHal` trait defined in
//! `eso_common::hal::driver`, plus the registry the supervisor binary
//! uses to pick one by name.
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - HAL driver implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────┐
//! │  eso_safety supervisor   │─────►│  SafetyHal (trait)   │
//! └────────────┬─────────────┘      └──────────▲───────────┘
//!              │ by name                       │ impl
//!              ▼                               │
//! ┌──────────────────────────┐      ┌──────────┴───────────┐
//! │     DriverRegistry       │─────►│  SimulatedSafetyHal  │
//! └──────────────────────────┘      └──────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod driver_registry;
pub mod drivers;

pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::simulation::{SimHandle, SimulatedSafetyHal};
