//! I/O Core struct.
//!
//! The `IoCore` struct is the main entry point for I/O operations. It owns
//! the driver, validates every channel against the configured layout, and
//! enforces the init/shutdown lifecycle and the analog range policy.

use crate::driver_registry::DriverRegistry;
use elevio_common::channel::{Access, Channel, ChannelKind, ChannelLayout, PortDirection};
use elevio_common::config::{AnalogPolicy, ConfigLoader, IoConfig};
use elevio_common::driver::{AnalogValue, DriverDiagnostics, IoDriver, IoError};
use elevio_common::elevator;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Operation counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IoStats {
    /// Successful digital and analog writes
    pub writes: u64,
    /// Successful digital and analog reads
    pub reads: u64,
    /// Operations rejected by the core or failed by the driver
    pub errors: u64,
    /// Analog writes clamped to full scale
    pub clamped: u64,
}

/// Value of one channel in a [`IoCore::snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelReading {
    /// Channel in `0x300+14` notation
    pub channel: String,
    /// Elevator rig name, if the channel has one
    pub name: Option<&'static str>,
    /// Port covering the channel
    pub port: String,
    /// Port kind
    pub kind: ChannelKind,
    /// Port direction
    pub direction: PortDirection,
    /// Bit level (0/1) or analog magnitude
    pub value: AnalogValue,
}

/// I/O Core manages the driver and the channel layout.
pub struct IoCore {
    /// Configuration
    config: IoConfig,
    /// Channel layout derived from `config.ports`
    layout: ChannelLayout,
    /// Driver instance
    driver: Box<dyn IoDriver>,
    /// Set by a successful `init()`
    initialized: bool,
    /// Operation counters
    stats: IoStats,
}

impl IoCore {
    /// Create a core using the driver named in `config.driver.name`.
    ///
    /// # Errors
    /// Returns error if configuration validation fails or the driver is not
    /// registered.
    pub fn new(config: IoConfig, registry: &DriverRegistry) -> Result<Self, IoError> {
        let driver = registry.create_driver(&config.driver.name)?;
        Self::with_driver(config, driver)
    }

    /// Create a core around an existing driver instance.
    ///
    /// # Errors
    /// Returns error if configuration validation fails.
    pub fn with_driver(config: IoConfig, driver: Box<dyn IoDriver>) -> Result<Self, IoError> {
        config.validate()?;
        let layout = config.layout();

        info!(
            "IoCore created: driver={} v{}, {} ports",
            driver.name(),
            driver.version(),
            layout.ports().len()
        );

        Ok(Self {
            config,
            layout,
            driver,
            initialized: false,
            stats: IoStats::default(),
        })
    }

    /// Load configuration from a TOML file.
    pub fn load_config(config_path: &Path) -> Result<IoConfig, IoError> {
        info!("Loading configuration from {:?}", config_path);

        let config = IoConfig::load(config_path).map_err(|e| {
            IoError::ConfigError(format!("Failed to load config file {:?}: {}", config_path, e))
        })?;

        info!(
            "Loaded config: driver={}, {} ports",
            config.driver.name,
            config.ports.len()
        );
        Ok(config)
    }

    /// Initialize the I/O hardware.
    ///
    /// # Errors
    /// - `IoError::AlreadyInitialized` if called twice without `shutdown()`
    /// - `IoError::InitFailed` (or another driver error) if the driver fails;
    ///   the core stays uninitialized
    pub fn init(&mut self) -> Result<(), IoError> {
        if self.initialized {
            return Err(IoError::AlreadyInitialized);
        }

        info!("Initializing driver '{}'...", self.driver.name());
        self.driver.init(&self.config).inspect_err(|e| {
            warn!("Driver '{}' failed to initialize: {}", self.driver.name(), e);
        })?;

        self.initialized = true;
        info!("IoCore initialized successfully");
        Ok(())
    }

    /// Whether `init()` has succeeded and `shutdown()` has not been called.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Drive a digital output high.
    pub fn set_bit(&mut self, channel: Channel) -> Result<(), IoError> {
        self.check(channel, Access::WriteBit)?;
        let result = self.driver.set_bit(channel);
        self.record(result, false)
    }

    /// Drive a digital output low.
    pub fn clear_bit(&mut self, channel: Channel) -> Result<(), IoError> {
        self.check(channel, Access::WriteBit)?;
        let result = self.driver.clear_bit(channel);
        self.record(result, false)
    }

    /// Drive an analog output to `value`.
    ///
    /// Values above `driver.analog_max` are rejected or clamped according
    /// to `driver.analog_policy`.
    pub fn write_analog(&mut self, channel: Channel, value: AnalogValue) -> Result<(), IoError> {
        self.check(channel, Access::WriteAnalog)?;

        let max = self.config.driver.analog_max;
        let value = if value > max {
            match self.config.driver.analog_policy {
                AnalogPolicy::Reject => {
                    self.stats.errors += 1;
                    return Err(IoError::AnalogOutOfRange {
                        channel,
                        value,
                        max,
                    });
                }
                AnalogPolicy::Clamp => {
                    warn!("Analog value {} on {} clamped to {}", value, channel, max);
                    self.stats.clamped += 1;
                    max
                }
            }
        } else {
            value
        };

        let result = self.driver.write_analog(channel, value);
        self.record(result, false)
    }

    /// Read a digital line.
    pub fn read_bit(&mut self, channel: Channel) -> Result<bool, IoError> {
        self.check(channel, Access::ReadBit)?;
        let result = self.driver.read_bit(channel);
        self.record(result, true)
    }

    /// Read an analog line.
    pub fn read_analog(&mut self, channel: Channel) -> Result<AnalogValue, IoError> {
        self.check(channel, Access::ReadAnalog)?;
        let result = self.driver.read_analog(channel);
        self.record(result, true)
    }

    /// Release the driver. A later `init()` brings it back.
    pub fn shutdown(&mut self) -> Result<(), IoError> {
        if !self.initialized {
            debug!("Shutdown requested on uninitialized core");
            return Ok(());
        }

        info!("Shutdown requested");
        self.initialized = false;
        self.driver.shutdown()
    }

    /// Read every channel of the layout.
    pub fn snapshot(&mut self) -> Result<Vec<ChannelReading>, IoError> {
        let channels: Vec<(Channel, String, ChannelKind, PortDirection)> = self
            .layout
            .channels()
            .map(|(ch, port)| (ch, port.name.clone(), port.kind, port.direction))
            .collect();

        channels
            .into_iter()
            .map(|(channel, port, kind, direction)| {
                let value = match kind {
                    ChannelKind::Digital => AnalogValue::from(self.read_bit(channel)?),
                    ChannelKind::Analog => self.read_analog(channel)?,
                };
                Ok(ChannelReading {
                    channel: channel.to_string(),
                    name: elevator::name_of(channel),
                    port,
                    kind,
                    direction,
                    value,
                })
            })
            .collect()
    }

    /// Channel layout in use.
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }

    /// Configuration in use.
    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    /// Name of the active driver.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }

    /// Operation counters.
    pub fn stats(&self) -> IoStats {
        self.stats
    }

    /// Driver diagnostics, if the driver provides them.
    pub fn diagnostics(&self) -> Option<DriverDiagnostics> {
        self.driver.diagnostics()
    }

    /// Lifecycle and layout check shared by every line operation.
    fn check(&mut self, channel: Channel, access: Access) -> Result<(), IoError> {
        let result = if self.initialized {
            self.layout.resolve(channel, access).map(|_| ())
        } else {
            Err(IoError::NotInitialized)
        };
        if let Err(e) = &result {
            debug!("Rejected {} on {}: {}", access, channel, e);
            self.stats.errors += 1;
        }
        result
    }

    fn record<T>(&mut self, result: Result<T, IoError>, read: bool) -> Result<T, IoError> {
        match &result {
            Ok(_) if read => self.stats.reads += 1,
            Ok(_) => self.stats.writes += 1,
            Err(e) => {
                warn!("Driver '{}' error: {}", self.driver.name(), e);
                self.stats.errors += 1;
            }
        }
        result
    }
}

impl Drop for IoCore {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Driver shutdown failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elevio_common::config::IoConfig;
    use elevio_common::elevator::channels::*;

    struct FailingDriver;

    impl IoDriver for FailingDriver {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn version(&self) -> &'static str {
            "0.0.0"
        }

        fn init(&mut self, _config: &IoConfig) -> Result<(), IoError> {
            Err(IoError::InitFailed("no device".to_string()))
        }

        fn set_bit(&mut self, _channel: Channel) -> Result<(), IoError> {
            unreachable!()
        }

        fn clear_bit(&mut self, _channel: Channel) -> Result<(), IoError> {
            unreachable!()
        }

        fn write_analog(&mut self, _channel: Channel, _value: AnalogValue) -> Result<(), IoError> {
            unreachable!()
        }

        fn read_bit(&mut self, _channel: Channel) -> Result<bool, IoError> {
            unreachable!()
        }

        fn read_analog(&mut self, _channel: Channel) -> Result<AnalogValue, IoError> {
            unreachable!()
        }
    }

    fn core() -> IoCore {
        let mut config = IoConfig::default();
        config.elevator.enabled = false;
        IoCore::new(config, &DriverRegistry::with_builtin_drivers()).unwrap()
    }

    #[test]
    fn failed_init_leaves_core_uninitialized() {
        let mut core = IoCore::with_driver(IoConfig::default(), Box::new(FailingDriver)).unwrap();
        assert!(matches!(core.init(), Err(IoError::InitFailed(_))));
        assert!(!core.is_initialized());
        assert_eq!(core.set_bit(LIGHT_STOP), Err(IoError::NotInitialized));
    }

    #[test]
    fn second_init_is_rejected() {
        let mut core = core();
        core.init().unwrap();
        assert_eq!(core.init(), Err(IoError::AlreadyInitialized));
        assert!(core.is_initialized());
    }

    #[test]
    fn unknown_driver_is_reported() {
        let mut config = IoConfig::default();
        config.driver.name = "ethercat".to_string();
        let result = IoCore::new(config, &DriverRegistry::with_builtin_drivers());
        assert!(matches!(result, Err(IoError::DriverNotFound(name)) if name == "ethercat"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = IoConfig::default();
        config.driver.analog_max = 0;
        let result = IoCore::new(config, &DriverRegistry::with_builtin_drivers());
        assert!(matches!(result, Err(IoError::ConfigError(_))));
    }

    #[test]
    fn rejects_write_to_input_port() {
        let mut core = core();
        core.init().unwrap();
        assert!(matches!(
            core.set_bit(STOP_BUTTON),
            Err(IoError::WrongAccess { access: Access::WriteBit, .. })
        ));
        assert!(matches!(
            core.read_analog(LIGHT_STOP),
            Err(IoError::WrongAccess { .. })
        ));
        assert_eq!(core.stats().errors, 2);
    }

    #[test]
    fn analog_reject_policy() {
        let mut core = core();
        core.init().unwrap();
        assert_eq!(
            core.write_analog(MOTOR, 5000),
            Err(IoError::AnalogOutOfRange {
                channel: MOTOR,
                value: 5000,
                max: 4095
            })
        );
        assert!(core.write_analog(MOTOR, 4095).is_ok());
    }

    #[test]
    fn analog_clamp_policy() {
        let mut config = IoConfig::default();
        config.elevator.enabled = false;
        config.driver.analog_policy = AnalogPolicy::Clamp;
        let mut core = IoCore::new(config, &DriverRegistry::with_builtin_drivers()).unwrap();
        core.init().unwrap();

        core.write_analog(MOTOR, 9999).unwrap();
        assert_eq!(core.read_analog(MOTOR).unwrap(), 4095);
        assert_eq!(core.stats().clamped, 1);
    }

    #[test]
    fn stats_count_operations() {
        let mut core = core();
        core.init().unwrap();
        core.set_bit(LIGHT_STOP).unwrap();
        core.clear_bit(LIGHT_STOP).unwrap();
        core.read_bit(LIGHT_STOP).unwrap();

        let stats = core.stats();
        assert_eq!(stats.writes, 2);
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn snapshot_covers_layout() {
        let mut core = core();
        core.init().unwrap();
        core.set_bit(LIGHT_DOOR_OPEN).unwrap();
        core.write_analog(MOTOR, 100).unwrap();

        let snapshot = core.snapshot().unwrap();
        assert_eq!(snapshot.len(), core.layout().channels().count());

        let door = snapshot
            .iter()
            .find(|r| r.name == Some("LIGHT_DOOR_OPEN"))
            .unwrap();
        assert_eq!(door.value, 1);
        assert_eq!(door.port, "port2");

        let motor = snapshot.iter().find(|r| r.name == Some("MOTOR")).unwrap();
        assert_eq!(motor.value, 100);
        assert_eq!(motor.kind, ChannelKind::Analog);
    }

    #[test]
    fn shutdown_then_reinit() {
        let mut core = core();
        core.init().unwrap();
        core.shutdown().unwrap();
        assert!(!core.is_initialized());
        assert_eq!(core.read_bit(LIGHT_STOP), Err(IoError::NotInitialized));
        core.init().unwrap();
        assert!(core.read_bit(LIGHT_STOP).is_ok());
    }
}
