//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the TOML configuration
//! of the I/O core, its driver, the simulator and the elevator panel.
//!
//! # Usage
//!
//! ```rust,no_run
//! use elevio_common::config::{ConfigLoader, ConfigError, IoConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = IoConfig::load(Path::new("elevio.toml"))?;
//!     config.validate()?;
//!     println!("Driver: {}", config.driver.name);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::channel::{ChannelLayout, PortConfig};
use crate::consts::{
    DEFAULT_ANALOG_MAX, DEFAULT_DEVICE_PATH, DEFAULT_POLL_INTERVAL_MS, IO_SERVICE_NAME, N_FLOORS,
};
use crate::driver::AnalogValue;

/// Error type for configuration loading operations.
///
/// This enum represents all possible errors that can occur when loading
/// configuration files.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "elevio-rig-07"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    IO_SERVICE_NAME.to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to do with an analog write above `analog_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalogPolicy {
    /// Fail the write with `IoError::AnalogOutOfRange`.
    #[default]
    Reject,
    /// Write `analog_max` instead and log a warning.
    Clamp,
}

/// Driver selection and line limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriverConfig {
    /// Registered driver name ("simulation", "comedi").
    #[serde(default = "default_driver_name")]
    pub name: String,

    /// Device node opened by hardware drivers.
    #[serde(default = "default_device")]
    pub device: PathBuf,

    /// Full scale of analog outputs.
    #[serde(default = "default_analog_max")]
    pub analog_max: AnalogValue,

    /// Out-of-range analog write handling.
    #[serde(default)]
    pub analog_policy: AnalogPolicy,
}

fn default_driver_name() -> String {
    "simulation".to_string()
}

fn default_device() -> PathBuf {
    PathBuf::from(DEFAULT_DEVICE_PATH)
}

fn default_analog_max() -> AnalogValue {
    DEFAULT_ANALOG_MAX
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: default_driver_name(),
            device: default_device(),
            analog_max: default_analog_max(),
            analog_policy: AnalogPolicy::default(),
        }
    }
}

/// Timing of the simulated elevator shaft.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    /// Number of floors in the shaft.
    pub floors: u8,
    /// Floor the cab rests at when the simulation starts.
    pub start_floor: u8,
    /// Travel time between two floor sensors [ms].
    pub travel_between_floors_ms: u64,
    /// Time the cab spends inside one floor sensor [ms].
    pub passing_floor_ms: u64,
    /// How long a simulated button press is held [ms].
    pub button_press_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            floors: N_FLOORS as u8,
            start_floor: 1,
            travel_between_floors_ms: 3000,
            passing_floor_ms: 1000,
            button_press_ms: 200,
        }
    }
}

impl SimulationConfig {
    /// Travel time between two floor sensors.
    pub fn travel_between_floors(&self) -> Duration {
        Duration::from_millis(self.travel_between_floors_ms)
    }

    /// Time spent inside one floor sensor.
    pub fn passing_floor(&self) -> Duration {
        Duration::from_millis(self.passing_floor_ms)
    }

    /// Duration of a simulated button press.
    pub fn button_press(&self) -> Duration {
        Duration::from_millis(self.button_press_ms)
    }
}

/// Elevator panel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ElevatorConfig {
    /// Whether the elevator panel channel map is in use.
    pub enabled: bool,
    /// Input polling interval [ms].
    pub poll_interval_ms: u64,
    /// Delay before the motor level is dropped on stop [ms].
    pub stop_delay_ms: u64,
    /// Upper bound on the initial drive down to a floor [ms].
    pub homing_timeout_ms: u64,
}

impl Default for ElevatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            stop_delay_ms: 50,
            homing_timeout_ms: 30_000,
        }
    }
}

impl ElevatorConfig {
    /// Input polling interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Delay before the motor level is dropped on stop.
    pub fn stop_delay(&self) -> Duration {
        Duration::from_millis(self.stop_delay_ms)
    }

    /// Upper bound on the initial drive down to a floor.
    pub fn homing_timeout(&self) -> Duration {
        Duration::from_millis(self.homing_timeout_ms)
    }
}

/// Complete configuration of the I/O core.
///
/// Every section is optional; an empty file yields the simulated elevator
/// rig.
///
/// # TOML Example
///
/// ```toml
/// [driver]
/// name = "comedi"
/// device = "/dev/comedi0"
/// analog_policy = "clamp"
///
/// [[ports]]
/// name = "motor"
/// subdevice = 1
/// offset = 0
/// width = 1
/// kind = "analog"
/// direction = "output"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    /// Logging and instance naming.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Driver selection and line limits.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Port layout; defaults to the elevator rig.
    #[serde(default = "default_ports")]
    pub ports: Vec<PortConfig>,

    /// Simulated shaft timing.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Elevator panel settings.
    #[serde(default)]
    pub elevator: ElevatorConfig,
}

fn default_ports() -> Vec<PortConfig> {
    ChannelLayout::elevator_rig().ports().to_vec()
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            driver: DriverConfig::default(),
            ports: default_ports(),
            simulation: SimulationConfig::default(),
            elevator: ElevatorConfig::default(),
        }
    }
}

impl IoConfig {
    /// Port layout described by this configuration.
    pub fn layout(&self) -> ChannelLayout {
        ChannelLayout::new(self.ports.clone())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared.service_name` is empty
    /// - `driver.name` is empty or `driver.analog_max` is zero
    /// - the port layout is invalid (see `ChannelLayout::validate`)
    /// - `simulation.start_floor` is not below `simulation.floors`
    /// - a simulated travel time is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.driver.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver.name cannot be empty".to_string(),
            ));
        }
        if self.driver.analog_max == 0 {
            return Err(ConfigError::ValidationError(
                "driver.analog_max must be greater than zero".to_string(),
            ));
        }

        self.layout().validate()?;

        let sim = &self.simulation;
        if sim.floors < 2 {
            return Err(ConfigError::ValidationError(format!(
                "simulation.floors must be at least 2, got {}",
                sim.floors
            )));
        }
        if sim.start_floor >= sim.floors {
            return Err(ConfigError::ValidationError(format!(
                "simulation.start_floor {} is outside 0..{}",
                sim.start_floor, sim.floors
            )));
        }
        if sim.travel_between_floors_ms == 0 || sim.passing_floor_ms == 0 {
            return Err(ConfigError::ValidationError(
                "simulation travel times must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load `path`, or `default_path` when no file was requested.
    ///
    /// A missing file at `default_path` yields the built-in defaults. A
    /// missing file at an explicit `path` is an error.
    ///
    /// # Errors
    /// - `ConfigError::FileNotFound` if an explicit `path` does not exist
    /// - `ConfigError::ParseError` if the file that was found is invalid
    pub fn load_or_default(path: Option<&Path>, default_path: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::load(default_path) {
                Err(ConfigError::FileNotFound) => Ok(Self::default()),
                other => other,
            },
        }
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
