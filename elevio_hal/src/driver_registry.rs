//! Name-to-factory table of I/O drivers.
//!
//! `IoCore::new` looks the configured `driver.name` up here. The binary
//! builds the table once with [`DriverRegistry::with_builtin_drivers`];
//! tests register their own drivers on an empty one.
//!
//! # Adding a driver
//!
//! Put it under `drivers/`, implement `IoDriver`, give it a
//! `create_driver()` factory and add one line to
//! [`DriverRegistry::with_builtin_drivers`].

use crate::drivers;
use elevio_common::driver::{DriverFactory, IoDriver, IoError};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Table of the drivers `IoCore` can be built on, keyed by config name.
#[derive(Default)]
pub struct DriverRegistry {
    factories: BTreeMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table of every driver compiled into this build: `simulation`, plus
    /// `comedi` with the `comedi` feature.
    pub fn with_builtin_drivers() -> Self {
        let mut factories = BTreeMap::new();
        factories.insert("simulation", drivers::simulation::create_driver as DriverFactory);
        #[cfg(feature = "comedi")]
        factories.insert("comedi", drivers::comedi::create_driver as DriverFactory);
        Self { factories }
    }

    /// Add a driver under `name`.
    ///
    /// # Errors
    /// `IoError::ConfigError` if `name` is taken; the table is unchanged.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) -> Result<(), IoError> {
        if self.factories.contains_key(name) {
            return Err(IoError::ConfigError(format!(
                "driver '{name}' is registered twice"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Whether a driver called `name` is available.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build a fresh, uninitialized instance of driver `name`.
    ///
    /// # Errors
    /// `IoError::DriverNotFound` if no driver of that name is registered.
    pub fn create_driver(&self, name: &str) -> Result<Box<dyn IoDriver>, IoError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| IoError::DriverNotFound(name.to_string()))?;
        let driver = factory();
        debug!("Created driver '{}' v{}", driver.name(), driver.version());
        Ok(driver)
    }

    /// Registered names in alphabetical order.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}
