//! Hardware access layer contract.
//!
//! The safety supervisor depends only on the [`driver::SafetyHal`] trait;
//! no knowledge of electrical wiring leaks past it.

pub mod driver;

pub use driver::{DriverFactory, HalError, InputLine, SafetyHal};
