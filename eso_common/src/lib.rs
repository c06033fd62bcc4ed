//! EsoCore Common Library
//!
//! Shared constants, data model, HAL contract and configuration loading
//! for all EsoCore safety workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Channel counts and supervisory timing defaults
//! - [`safety`] - Safety I/O data model (configs, statuses, states, events, faults)
//! - [`hal`] - Hardware access contract implemented per target board
//! - [`clock`] - Millisecond time sources
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use eso_common::prelude::*;
//!
//! let config = SafetySystemConfig::default();
//! assert!(config.validate().is_ok());
//! ```

pub mod clock;
pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod safety;
