//! Simulation driver implementation.
//!
//! The `SimulationDriver` implements the `IoDriver` trait on top of an
//! `IoImage` (what the host wrote, what the operator pressed) and, when the
//! elevator panel is enabled, a `ShaftSimulator` that moves the cab from
//! the motor outputs and drives the floor sensors.
//!
//! Simulation time is advanced lazily: every driver call first brings the
//! shaft up to the clock's current instant using the motor state that was
//! in force since the previous call, then applies the call.

use super::io::IoImage;
use super::physics::{Motion, ShaftFault, ShaftSimulator};
use crate::clock::{Clock, SystemClock};
use elevio_common::channel::{Access, Channel, ChannelKind, ChannelLayout, PortDirection};
use elevio_common::config::IoConfig;
use elevio_common::consts::N_FLOORS;
use elevio_common::driver::{AnalogValue, DriverDiagnostics, IoDriver, IoError};
use elevio_common::elevator::{self, channels};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// State shared between the driver and its handles.
#[derive(Debug, Default)]
struct SimState {
    /// Set by a successful `init()`
    initialized: bool,
    /// Line image
    image: IoImage,
    /// Shaft model (elevator panel enabled only)
    shaft: Option<ShaftSimulator>,
    /// Layout used to check injected inputs
    layout: Option<ChannelLayout>,
    /// How long `press()` holds an input
    button_press: Duration,
    /// Diagnostics counters
    reads: u64,
    writes: u64,
    faults: Vec<ShaftFault>,
}

impl SimState {
    fn motion(&self) -> Motion {
        if self.image.analog(channels::MOTOR) == 0 {
            Motion::Stopped
        } else if self.image.bit(channels::MOTORDIR) {
            Motion::Down
        } else {
            Motion::Up
        }
    }

    /// Bring the shaft up to `now`.
    fn sync(&mut self, clock: &dyn Clock) {
        let motion = self.motion();
        if let Some(shaft) = self.shaft.as_mut() {
            if let Some(fault) = shaft.update(clock.now(), motion) {
                self.faults.push(fault);
            }
        }
    }

    fn ensure_initialized(&self) -> Result<(), IoError> {
        if self.initialized {
            Ok(())
        } else {
            Err(IoError::NotInitialized)
        }
    }

    /// Floor whose sensor the shaft model drives on `channel`.
    ///
    /// Only sensor lines the layout maps as digital inputs follow the shaft.
    /// Any other mapping of those lines reads back like a plain port.
    fn shaft_sensor(&self, channel: Channel) -> Option<u8> {
        self.shaft.as_ref()?;
        let floor = elevator::FLOOR_SENSORS.iter().position(|&c| c == channel)?;
        let port = self.layout.as_ref()?.port_of(channel)?;
        let is_input = port.kind == ChannelKind::Digital && port.direction == PortDirection::Input;
        is_input.then_some(floor as u8)
    }

    /// Check that `channel` is a digital or analog input the operator may drive.
    fn check_input(&self, channel: Channel, kind: ChannelKind) -> Result<(), IoError> {
        self.ensure_initialized()?;
        let access = match kind {
            ChannelKind::Digital => Access::ReadBit,
            ChannelKind::Analog => Access::ReadAnalog,
        };
        let layout = self.layout.as_ref().ok_or(IoError::NotInitialized)?;
        let port = layout.resolve(channel, access)?;
        if port.direction != PortDirection::Input {
            return Err(IoError::WrongAccess {
                channel,
                port: port.name.clone(),
                access,
            });
        }
        // Floor sensors belong to the shaft model while it runs
        if self.shaft_sensor(channel).is_some() {
            return Err(IoError::WrongAccess {
                channel,
                port: port.name.clone(),
                access: Access::WriteBit,
            });
        }
        Ok(())
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulation driver implementing the IoDriver trait.
pub struct SimulationDriver {
    /// Driver name
    name: &'static str,
    /// Driver version
    version: &'static str,
    /// Simulated rig
    state: Arc<Mutex<SimState>>,
    /// Simulation time source
    clock: Arc<dyn Clock>,
}

impl SimulationDriver {
    /// Create a new simulation driver running on the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a simulation driver running on `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            name: "simulation",
            version: env!("CARGO_PKG_VERSION"),
            state: Arc::new(Mutex::new(SimState::default())),
            clock,
        }
    }

    /// Handle for operating the simulated panel while the driver is owned
    /// by an `IoCore`.
    pub fn handle(&self) -> SimulationHandle {
        SimulationHandle {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> Result<T, IoError>) -> Result<T, IoError> {
        let mut state = lock(&self.state);
        state.ensure_initialized()?;
        state.sync(self.clock.as_ref());
        f(&mut state)
    }
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl IoDriver for SimulationDriver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn version(&self) -> &'static str {
        self.version
    }

    fn init(&mut self, config: &IoConfig) -> Result<(), IoError> {
        let sim = &config.simulation;
        if config.elevator.enabled && sim.floors as usize != N_FLOORS {
            return Err(IoError::InitFailed(format!(
                "simulator supports exactly {} floors with the elevator panel, got {}",
                N_FLOORS, sim.floors
            )));
        }

        let mut state = lock(&self.state);
        *state = SimState {
            initialized: true,
            image: IoImage::new(),
            shaft: config
                .elevator
                .enabled
                .then(|| ShaftSimulator::new(sim, self.clock.now())),
            layout: Some(config.layout()),
            button_press: sim.button_press(),
            ..SimState::default()
        };

        info!(
            "Simulation driver initialized ({} ports, elevator panel {})",
            config.ports.len(),
            if config.elevator.enabled { "on" } else { "off" }
        );
        Ok(())
    }

    fn set_bit(&mut self, channel: Channel) -> Result<(), IoError> {
        self.with_state(|state| {
            state.writes += 1;
            state.image.write_bit(channel, true);
            Ok(())
        })
    }

    fn clear_bit(&mut self, channel: Channel) -> Result<(), IoError> {
        self.with_state(|state| {
            state.writes += 1;
            state.image.write_bit(channel, false);
            Ok(())
        })
    }

    fn write_analog(&mut self, channel: Channel, value: AnalogValue) -> Result<(), IoError> {
        self.with_state(|state| {
            state.writes += 1;
            state.image.write_analog(channel, value);
            Ok(())
        })
    }

    fn read_bit(&mut self, channel: Channel) -> Result<bool, IoError> {
        let now = self.clock.now();
        self.with_state(|state| {
            state.reads += 1;
            if let (Some(floor), Some(shaft)) = (state.shaft_sensor(channel), state.shaft.as_ref()) {
                return Ok(shaft.floor_sensor(floor));
            }
            Ok(state.image.input(channel, now) || state.image.bit(channel))
        })
    }

    fn read_analog(&mut self, channel: Channel) -> Result<AnalogValue, IoError> {
        self.with_state(|state| {
            state.reads += 1;
            Ok(state.image.analog(channel))
        })
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        let mut state = lock(&self.state);
        debug!(
            "Simulation driver shutdown after {} reads, {} writes",
            state.reads, state.writes
        );
        state.initialized = false;
        Ok(())
    }

    fn diagnostics(&self) -> Option<DriverDiagnostics> {
        let state = lock(&self.state);
        Some(DriverDiagnostics {
            reads: state.reads,
            writes: state.writes,
            faults: state.faults.iter().map(ToString::to_string).collect(),
        })
    }
}

/// Operator's side of the simulated rig.
///
/// Obtained from [`SimulationDriver::handle`]; stays valid after the driver
/// is moved into an `IoCore`.
#[derive(Clone)]
pub struct SimulationHandle {
    state: Arc<Mutex<SimState>>,
    clock: Arc<dyn Clock>,
}

impl SimulationHandle {
    /// Press a digital input (button) for the configured press time.
    ///
    /// # Errors
    /// `IoError::WrongAccess` if the channel is not a digital input, or is a
    /// floor sensor driven by the shaft model.
    pub fn press(&self, channel: Channel) -> Result<(), IoError> {
        let mut state = lock(&self.state);
        state.check_input(channel, ChannelKind::Digital)?;
        let hold = state.button_press;
        state.image.press(channel, self.clock.now(), hold);
        debug!("Pressed {}", channel);
        Ok(())
    }

    /// Latch a digital input (switch) at `level`.
    ///
    /// # Errors
    /// Same as [`press`](Self::press).
    pub fn set_input(&self, channel: Channel, level: bool) -> Result<(), IoError> {
        let mut state = lock(&self.state);
        state.check_input(channel, ChannelKind::Digital)?;
        state.image.latch_input(channel, level);
        Ok(())
    }

    /// Inject the magnitude seen on an analog input.
    pub fn set_analog_input(&self, channel: Channel, value: AnalogValue) -> Result<(), IoError> {
        let mut state = lock(&self.state);
        state.check_input(channel, ChannelKind::Analog)?;
        state.image.write_analog(channel, value);
        Ok(())
    }

    /// Floor whose sensor is currently active.
    pub fn current_floor(&self) -> Option<u8> {
        let mut state = lock(&self.state);
        state.sync(self.clock.as_ref());
        state.shaft.as_ref().and_then(ShaftSimulator::current_floor)
    }

    /// Cab position in floors.
    pub fn cab_position(&self) -> Option<f64> {
        let mut state = lock(&self.state);
        state.sync(self.clock.as_ref());
        state.shaft.as_ref().map(ShaftSimulator::position)
    }

    /// Shaft faults recorded so far.
    pub fn faults(&self) -> Vec<ShaftFault> {
        let mut state = lock(&self.state);
        state.sync(self.clock.as_ref());
        state.faults.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use elevio_common::channel::PortConfig;
    use elevio_common::elevator::channels::*;

    fn driver() -> (SimulationDriver, ManualClock) {
        let clock = ManualClock::new();
        let mut driver = SimulationDriver::with_clock(Arc::new(clock.clone()));
        driver.init(&IoConfig::default()).unwrap();
        (driver, clock)
    }

    #[test]
    fn operations_before_init_fail() {
        let mut driver = SimulationDriver::new();
        assert_eq!(driver.set_bit(LIGHT_STOP), Err(IoError::NotInitialized));
        assert_eq!(driver.read_bit(LIGHT_STOP), Err(IoError::NotInitialized));
        assert_eq!(driver.read_analog(MOTOR), Err(IoError::NotInitialized));
    }

    #[test]
    fn init_rejects_other_floor_counts() {
        let mut config = IoConfig::default();
        config.simulation.floors = 5;
        let mut driver = SimulationDriver::new();
        assert!(matches!(driver.init(&config), Err(IoError::InitFailed(_))));

        config.elevator.enabled = false;
        assert!(driver.init(&config).is_ok());
    }

    #[test]
    fn set_and_clear_read_back() {
        let (mut driver, _) = driver();
        driver.set_bit(LIGHT_DOOR_OPEN).unwrap();
        assert!(driver.read_bit(LIGHT_DOOR_OPEN).unwrap());
        driver.clear_bit(LIGHT_DOOR_OPEN).unwrap();
        assert!(!driver.read_bit(LIGHT_DOOR_OPEN).unwrap());
    }

    #[test]
    fn analog_reads_back() {
        let (mut driver, _) = driver();
        driver.write_analog(MOTOR, 1234).unwrap();
        assert_eq!(driver.read_analog(MOTOR).unwrap(), 1234);
    }

    #[test]
    fn floor_sensor_follows_motor() {
        let (mut driver, clock) = driver();
        assert!(driver.read_bit(SENSOR_FLOOR2).unwrap());

        driver.clear_bit(MOTORDIR).unwrap();
        driver.write_analog(MOTOR, 2800).unwrap();
        clock.advance(Duration::from_millis(1000));
        assert!(!driver.read_bit(SENSOR_FLOOR2).unwrap());

        clock.advance(Duration::from_millis(2500));
        assert!(driver.read_bit(SENSOR_FLOOR3).unwrap());

        driver.write_analog(MOTOR, 0).unwrap();
        clock.advance(Duration::from_secs(10));
        assert!(driver.read_bit(SENSOR_FLOOR3).unwrap());
    }

    #[test]
    fn motor_direction_bit_drives_down() {
        let (mut driver, clock) = driver();
        let handle = driver.handle();

        driver.set_bit(MOTORDIR).unwrap();
        driver.write_analog(MOTOR, 2800).unwrap();
        clock.advance(Duration::from_millis(3500));
        assert_eq!(handle.current_floor(), Some(0));

        clock.advance(Duration::from_secs(5));
        assert_eq!(handle.faults(), vec![ShaftFault::UnderBottom]);
        assert_eq!(driver.diagnostics().unwrap().faults.len(), 1);
    }

    #[test]
    fn press_holds_button_for_press_time() {
        let (mut driver, clock) = driver();
        let handle = driver.handle();

        handle.press(BUTTON_COMMAND3).unwrap();
        assert!(driver.read_bit(BUTTON_COMMAND3).unwrap());
        clock.advance(Duration::from_millis(199));
        assert!(driver.read_bit(BUTTON_COMMAND3).unwrap());
        clock.advance(Duration::from_millis(1));
        assert!(!driver.read_bit(BUTTON_COMMAND3).unwrap());
    }

    #[test]
    fn handle_rejects_outputs_and_unknown_channels() {
        let (driver, _) = driver();
        let handle = driver.handle();

        assert!(matches!(
            handle.press(LIGHT_STOP),
            Err(IoError::WrongAccess { .. })
        ));
        assert_eq!(
            handle.press(Channel::new(7, 0)),
            Err(IoError::InvalidChannel(Channel::new(7, 0)))
        );
        assert!(handle.set_analog_input(MOTOR, 5).is_err());
    }

    #[test]
    fn obstruction_switch_latches() {
        let (mut driver, clock) = driver();
        let handle = driver.handle();

        handle.set_input(OBSTRUCTION, true).unwrap();
        clock.advance(Duration::from_secs(30));
        assert!(driver.read_bit(OBSTRUCTION).unwrap());
        handle.set_input(OBSTRUCTION, false).unwrap();
        assert!(!driver.read_bit(OBSTRUCTION).unwrap());
    }

    #[test]
    fn floor_sensors_cannot_be_injected_while_shaft_runs() {
        let (mut driver, _) = driver();
        let handle = driver.handle();

        assert!(matches!(
            handle.set_input(SENSOR_FLOOR4, true),
            Err(IoError::WrongAccess { access: Access::WriteBit, .. })
        ));
        assert!(matches!(
            handle.press(SENSOR_FLOOR1),
            Err(IoError::WrongAccess { .. })
        ));
        assert!(!driver.read_bit(SENSOR_FLOOR4).unwrap());
    }

    #[test]
    fn floor_sensors_are_plain_inputs_without_shaft() {
        let mut config = IoConfig::default();
        config.elevator.enabled = false;
        let mut driver = SimulationDriver::with_clock(Arc::new(ManualClock::new()));
        driver.init(&config).unwrap();
        let handle = driver.handle();

        handle.set_input(SENSOR_FLOOR4, true).unwrap();
        assert!(driver.read_bit(SENSOR_FLOOR4).unwrap());
    }

    #[test]
    fn sensor_lines_mapped_as_outputs_read_back() {
        let mut config = IoConfig::default();
        config.ports = vec![
            PortConfig::new("leds", 2, 0, 8, ChannelKind::Digital, PortDirection::Output),
            PortConfig::new("motor", 1, 0, 1, ChannelKind::Analog, PortDirection::Output),
        ];
        let mut driver = SimulationDriver::with_clock(Arc::new(ManualClock::new()));
        driver.init(&config).unwrap();

        // The cab starts on the floor of SENSOR_FLOOR2
        driver.clear_bit(SENSOR_FLOOR2).unwrap();
        assert!(!driver.read_bit(SENSOR_FLOOR2).unwrap());
        driver.set_bit(SENSOR_FLOOR1).unwrap();
        assert!(driver.read_bit(SENSOR_FLOOR1).unwrap());
    }

    #[test]
    fn diagnostics_count_operations() {
        let (mut driver, _) = driver();
        driver.set_bit(LIGHT_STOP).unwrap();
        driver.read_bit(LIGHT_STOP).unwrap();
        driver.read_analog(MOTOR).unwrap();

        let diag = driver.diagnostics().unwrap();
        assert_eq!(diag.writes, 1);
        assert_eq!(diag.reads, 2);
        assert!(diag.faults.is_empty());
    }

    #[test]
    fn shutdown_requires_reinit() {
        let (mut driver, _) = driver();
        driver.shutdown().unwrap();
        assert_eq!(driver.set_bit(LIGHT_STOP), Err(IoError::NotInitialized));
        driver.init(&IoConfig::default()).unwrap();
        assert!(driver.set_bit(LIGHT_STOP).is_ok());
    }
}
