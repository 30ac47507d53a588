//! I/O driver trait and error types.
//!
//! This module defines:
//! - `IoDriver` trait - Interface for pluggable I/O backends
//! - `IoError` enum - Error types for I/O operations
//! - `DriverFactory` type alias - Factory function type
//! - `DriverDiagnostics` struct - Optional driver diagnostics

use crate::channel::{Access, Channel};
use crate::config::{ConfigError, IoConfig};
use std::time::Duration;
use thiserror::Error;

/// Magnitude written to or read from an analog line.
pub type AnalogValue = u32;

/// Error types for I/O operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IoError {
    /// Driver initialization failed
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// `init()` called on a core that is already initialized
    #[error("I/O core is already initialized")]
    AlreadyInitialized,

    /// Line operation attempted before a successful `init()`
    #[error("I/O core is not initialized")]
    NotInitialized,

    /// No port covers the channel
    #[error("Channel {0} is not mapped to any port")]
    InvalidChannel(Channel),

    /// The port covering the channel does not support the operation
    #[error("Channel {channel} on port '{port}' does not support {access}")]
    WrongAccess {
        /// Offending channel
        channel: Channel,
        /// Port covering the channel
        port: String,
        /// Requested access
        access: Access,
    },

    /// Analog value above the converter's full scale
    #[error("Analog value {value} on channel {channel} exceeds maximum {max}")]
    AnalogOutOfRange {
        /// Target channel
        channel: Channel,
        /// Requested value
        value: AnalogValue,
        /// Configured full scale
        max: AnalogValue,
    },

    /// Hardware communication error
    #[error("Hardware communication error: {0}")]
    Hardware(String),

    /// Driver not found
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Cab did not reach a floor sensor while homing
    #[error("No floor sensor reached within {0:?}")]
    HomingTimeout(Duration),
}

impl From<ConfigError> for IoError {
    fn from(err: ConfigError) -> Self {
        Self::ConfigError(err.to_string())
    }
}

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn IoDriver>;

/// Optional driver diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverDiagnostics {
    /// Number of line reads served
    pub reads: u64,
    /// Number of line writes served
    pub writes: u64,
    /// Faults observed by the driver, oldest first
    pub faults: Vec<String>,
}

/// Trait defining the interface for I/O drivers.
///
/// `IoCore` owns one driver through this trait and validates every channel
/// against the configured layout before calling it, so drivers may assume
/// the channel exists and supports the access.
///
/// # Lifecycle
///
/// 1. `init()` - Called once; `Err` is the "init failed" signal
/// 2. line operations - Any number of times after a successful `init()`
/// 3. `shutdown()` - Releases the hardware; `init()` may follow again
pub trait IoDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation", "comedi").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Initialize the driver.
    ///
    /// # Errors
    /// Return `IoError::InitFailed` if the hardware cannot be brought up.
    fn init(&mut self, config: &IoConfig) -> Result<(), IoError>;

    /// Drive a digital output high.
    fn set_bit(&mut self, channel: Channel) -> Result<(), IoError>;

    /// Drive a digital output low.
    fn clear_bit(&mut self, channel: Channel) -> Result<(), IoError>;

    /// Drive an analog output to `value`.
    fn write_analog(&mut self, channel: Channel, value: AnalogValue) -> Result<(), IoError>;

    /// Read the level of a digital line.
    fn read_bit(&mut self, channel: Channel) -> Result<bool, IoError>;

    /// Read the magnitude of an analog line.
    fn read_analog(&mut self, channel: Channel) -> Result<AnalogValue, IoError>;

    /// Release hardware resources.
    /// Default: no-op
    fn shutdown(&mut self) -> Result<(), IoError> {
        Ok(())
    }

    /// Get driver-specific diagnostics.
    /// Default: None
    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestDriver {
        initialized: bool,
    }

    impl IoDriver for TestDriver {
        fn name(&self) -> &'static str {
            "test"
        }

        fn version(&self) -> &'static str {
            "0.1.0"
        }

        fn init(&mut self, _config: &IoConfig) -> Result<(), IoError> {
            self.initialized = true;
            Ok(())
        }

        fn set_bit(&mut self, _channel: Channel) -> Result<(), IoError> {
            Ok(())
        }

        fn clear_bit(&mut self, _channel: Channel) -> Result<(), IoError> {
            Ok(())
        }

        fn write_analog(&mut self, _channel: Channel, _value: AnalogValue) -> Result<(), IoError> {
            Ok(())
        }

        fn read_bit(&mut self, _channel: Channel) -> Result<bool, IoError> {
            Ok(false)
        }

        fn read_analog(&mut self, _channel: Channel) -> Result<AnalogValue, IoError> {
            Ok(0)
        }
    }

    #[test]
    fn test_io_error_display() {
        let err = IoError::InitFailed("no device".to_string());
        assert!(err.to_string().contains("no device"));

        let err = IoError::InvalidChannel(Channel::new(3, 14));
        assert!(err.to_string().contains("0x300+14"));

        let err = IoError::WrongAccess {
            channel: Channel::new(2, 4),
            port: "port1".to_string(),
            access: Access::WriteBit,
        };
        assert!(err.to_string().contains("port1"));
        assert!(err.to_string().contains("digital write"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: IoError = ConfigError::ValidationError("bad".to_string()).into();
        assert!(matches!(err, IoError::ConfigError(msg) if msg.contains("bad")));
    }

    #[test]
    fn test_trait_defaults() {
        let mut driver = TestDriver { initialized: false };
        driver.init(&IoConfig::default()).unwrap();
        assert!(driver.initialized);
        assert!(driver.diagnostics().is_none());
        assert!(driver.shutdown().is_ok());
    }

    #[test]
    fn test_driver_diagnostics_default() {
        let diag = DriverDiagnostics::default();
        assert_eq!(diag.reads, 0);
        assert_eq!(diag.writes, 0);
        assert!(diag.faults.is_empty());
    }
}
