//! Driver registry for safety HAL drivers.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving driver
//! factories. Constructor-injected, no global state.

use eso_common::hal::driver::{DriverFactory, HalError, SafetyHal};
use std::collections::HashMap;
use tracing::debug;

/// Registry of available safety HAL drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry populated with every built-in driver.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();
        for (name, factory) in crate::drivers::builtin() {
            // Built-in names are distinct; a clash here is a programming error
            // caught by the registry tests.
            let _ = reg.register(name, *factory);
        }
        reg
    }

    /// Register a driver factory.
    ///
    /// # Errors
    /// Returns `HalError::AlreadyRegistered` if the name is taken.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Result<(), HalError> {
        if self.factories.contains_key(name) {
            return Err(HalError::AlreadyRegistered(name.to_string()));
        }
        debug!("Registered safety HAL driver '{name}'");
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// Returns `HalError::DriverNotFound` if no driver with the given name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn SafetyHal + Send>, HalError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| HalError::DriverNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered driver names (sorted).
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
