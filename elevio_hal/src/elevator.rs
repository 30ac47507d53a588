//! Elevator panel on top of the I/O core.
//!
//! [`Elevator`] turns the rig's channel map into lamp, button, sensor and
//! motor operations. [`InputPoller`] edge-detects the inputs and reports
//! each press or floor arrival once.

use crate::clock::Clock;
use crate::core::IoCore;
use elevio_common::channel::Channel;
use elevio_common::consts::{MOTOR_SPEED, N_FLOORS};
use elevio_common::driver::IoError;
use elevio_common::elevator::{self, ButtonKind, FLOOR_SENSORS, MotorDirection, channels};
use elevio_common::orders::Orders;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of events one poll can produce.
pub const MAX_EVENTS: usize = N_FLOORS * ButtonKind::ALL.len() + 2;

/// Events returned by one [`InputPoller::poll`].
pub type ElevatorEvents = heapless::Vec<ElevatorEvent, MAX_EVENTS>;

/// Something the operator or the cab did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ElevatorEvent {
    /// A floor button went down.
    ButtonPressed {
        /// Button kind
        kind: ButtonKind,
        /// Floor of the button
        floor: u8,
    },
    /// The stop button went down.
    StopPressed,
    /// The cab reached a floor sensor other than the previous one.
    FloorReached {
        /// Floor whose sensor triggered
        floor: u8,
    },
}

/// Elevator panel driven through an [`IoCore`].
pub struct Elevator {
    core: IoCore,
    clock: Arc<dyn Clock>,
}

impl Elevator {
    /// Wrap `core`; nothing touches the hardware until [`init`](Self::init).
    pub fn new(core: IoCore, clock: Arc<dyn Clock>) -> Self {
        Self { core, clock }
    }

    /// Initialize the core, turn every lamp off and bring the cab to a floor.
    ///
    /// If anything after the core's own init fails, the core is shut down
    /// again so that `init` can be retried.
    ///
    /// # Errors
    /// - Any error of [`IoCore::init`]
    /// - `IoError::InvalidChannel` / `IoError::WrongAccess` if the layout
    ///   lacks a panel line
    /// - `IoError::HomingTimeout` if no floor sensor triggers in time
    pub fn init(&mut self) -> Result<(), IoError> {
        self.core.init()?;
        let floor = match self.reset_lamps().and_then(|()| self.home()) {
            Ok(floor) => floor,
            Err(e) => {
                if let Err(shutdown) = self.core.shutdown() {
                    warn!("Shutdown after failed init: {}", shutdown);
                }
                return Err(e);
            }
        };
        info!("Elevator ready at floor {}", floor);
        Ok(())
    }

    /// Drive the cab down until a floor sensor is active and return that
    /// floor. Does nothing if the cab already rests on a floor.
    ///
    /// # Errors
    /// `IoError::HomingTimeout` if no sensor triggers within
    /// `elevator.homing_timeout_ms`; the motor is stopped first.
    pub fn home(&mut self) -> Result<u8, IoError> {
        if let Some(floor) = self.floor_sensor()? {
            return Ok(floor);
        }

        let timeout = self.core.config().elevator.homing_timeout();
        let poll = self.core.config().elevator.poll_interval();
        let start = self.clock.now();

        info!("Cab between floors, homing down");
        self.set_motor_direction(MotorDirection::Down)?;
        loop {
            if let Some(floor) = self.floor_sensor()? {
                self.set_motor_direction(MotorDirection::Stop)?;
                info!("Homed to floor {}", floor);
                return Ok(floor);
            }
            if self.clock.now().saturating_duration_since(start) >= timeout {
                self.set_motor_direction(MotorDirection::Stop)?;
                return Err(IoError::HomingTimeout(timeout));
            }
            self.clock.sleep(poll);
        }
    }

    /// Turn every lamp off and show floor 0 on the indicator.
    fn reset_lamps(&mut self) -> Result<(), IoError> {
        for floor in 0..N_FLOORS as u8 {
            for kind in ButtonKind::ALL {
                if let Some(lamp) = elevator::lamp_channel(kind, floor) {
                    self.core.clear_bit(lamp)?;
                }
            }
        }
        self.core.clear_bit(channels::LIGHT_STOP)?;
        self.core.clear_bit(channels::LIGHT_DOOR_OPEN)?;
        self.set_floor_indicator(0)?;
        debug!("All lamps reset");
        Ok(())
    }

    /// Switch the lamp of a floor button.
    ///
    /// Buttons that do not exist on the rig are ignored with a warning.
    pub fn set_button_lamp(&mut self, kind: ButtonKind, floor: u8, on: bool) -> Result<(), IoError> {
        match elevator::lamp_channel(kind, floor) {
            Some(lamp) => self.write_bit(lamp, on),
            None => {
                warn!("No {} lamp at floor {}", kind, floor);
                Ok(())
            }
        }
    }

    /// Light the button lamps of exactly the orders in `orders`.
    pub fn set_order_lamps(&mut self, orders: &Orders) -> Result<(), IoError> {
        for floor in 0..N_FLOORS as u8 {
            for kind in ButtonKind::ALL {
                if let Some(lamp) = elevator::lamp_channel(kind, floor) {
                    self.write_bit(lamp, orders.contains(kind, floor))?;
                }
            }
        }
        Ok(())
    }

    /// Switch the stop lamp.
    pub fn set_stop_lamp(&mut self, on: bool) -> Result<(), IoError> {
        self.write_bit(channels::LIGHT_STOP, on)
    }

    /// Switch the door open lamp.
    pub fn set_door_open_lamp(&mut self, on: bool) -> Result<(), IoError> {
        self.write_bit(channels::LIGHT_DOOR_OPEN, on)
    }

    /// Show `floor` on the two-bit floor indicator.
    pub fn set_floor_indicator(&mut self, floor: u8) -> Result<(), IoError> {
        let top = N_FLOORS as u8 - 1;
        let floor = if floor > top {
            warn!("Floor indicator {} out of range, showing {}", floor, top);
            top
        } else {
            floor
        };

        let (ind1, ind2) = elevator::floor_indicator_bits(floor);
        self.write_bit(channels::LIGHT_FLOOR_IND1, ind1)?;
        self.write_bit(channels::LIGHT_FLOOR_IND2, ind2)
    }

    /// Floor whose sensor is active, if any.
    pub fn floor_sensor(&mut self) -> Result<Option<u8>, IoError> {
        for (floor, &sensor) in FLOOR_SENSORS.iter().enumerate() {
            if self.core.read_bit(sensor)? {
                return Ok(Some(floor as u8));
            }
        }
        Ok(None)
    }

    /// Whether a floor button is held. Nonexistent buttons read `false`.
    pub fn button_pressed(&mut self, kind: ButtonKind, floor: u8) -> Result<bool, IoError> {
        match elevator::button_channel(kind, floor) {
            Some(button) => self.core.read_bit(button),
            None => Ok(false),
        }
    }

    /// Whether the stop button is held.
    pub fn stop_pressed(&mut self) -> Result<bool, IoError> {
        self.core.read_bit(channels::STOP_BUTTON)
    }

    /// Whether the obstruction switch is on.
    pub fn obstructed(&mut self) -> Result<bool, IoError> {
        self.core.read_bit(channels::OBSTRUCTION)
    }

    /// Drive the motor.
    ///
    /// `Stop` waits `elevator.stop_delay_ms` before cutting the motor.
    pub fn set_motor_direction(&mut self, direction: MotorDirection) -> Result<(), IoError> {
        debug!("Motor {:?}", direction);
        match direction {
            MotorDirection::Up => {
                self.core.clear_bit(channels::MOTORDIR)?;
                self.core.write_analog(channels::MOTOR, MOTOR_SPEED)
            }
            MotorDirection::Down => {
                self.core.set_bit(channels::MOTORDIR)?;
                self.core.write_analog(channels::MOTOR, MOTOR_SPEED)
            }
            MotorDirection::Stop => {
                let delay = self.core.config().elevator.stop_delay();
                if !delay.is_zero() {
                    self.clock.sleep(delay);
                }
                self.core.write_analog(channels::MOTOR, 0)
            }
        }
    }

    /// Underlying I/O core.
    pub fn core(&self) -> &IoCore {
        &self.core
    }

    /// Underlying I/O core, for raw line access.
    pub fn core_mut(&mut self) -> &mut IoCore {
        &mut self.core
    }

    /// Give the I/O core back.
    pub fn into_core(self) -> IoCore {
        self.core
    }

    fn write_bit(&mut self, channel: Channel, on: bool) -> Result<(), IoError> {
        if on {
            self.core.set_bit(channel)
        } else {
            self.core.clear_bit(channel)
        }
    }
}

/// Edge detector over the elevator inputs.
#[derive(Debug, Default)]
pub struct InputPoller {
    buttons: [[bool; 3]; N_FLOORS],
    stop: bool,
    last_floor: Option<u8>,
}

impl InputPoller {
    /// Poller with every input released and no floor seen yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every input once and report what changed since the last poll.
    ///
    /// A floor arrival also updates the floor indicator.
    pub fn poll(&mut self, elevator: &mut Elevator) -> Result<ElevatorEvents, IoError> {
        let mut events = ElevatorEvents::new();

        for (floor, row) in self.buttons.iter_mut().enumerate() {
            let floor = floor as u8;
            for (held, kind) in row.iter_mut().zip(ButtonKind::ALL) {
                let pressed = elevator.button_pressed(kind, floor)?;
                if pressed && !*held {
                    push(&mut events, ElevatorEvent::ButtonPressed { kind, floor });
                }
                *held = pressed;
            }
        }

        let stop = elevator.stop_pressed()?;
        if stop && !self.stop {
            push(&mut events, ElevatorEvent::StopPressed);
        }
        self.stop = stop;

        if let Some(floor) = elevator.floor_sensor()? {
            if self.last_floor != Some(floor) {
                self.last_floor = Some(floor);
                elevator.set_floor_indicator(floor)?;
                push(&mut events, ElevatorEvent::FloorReached { floor });
            }
        }

        Ok(events)
    }

    /// Last floor reported.
    pub fn last_floor(&self) -> Option<u8> {
        self.last_floor
    }
}

fn push(events: &mut ElevatorEvents, event: ElevatorEvent) {
    if events.push(event).is_err() {
        warn!("Event buffer full, dropped {:?}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::drivers::simulation::{SimulationDriver, SimulationHandle};
    use elevio_common::config::IoConfig;
    use std::time::Duration;

    fn rig() -> (Elevator, SimulationHandle, ManualClock) {
        let clock = ManualClock::new();
        let driver = SimulationDriver::with_clock(Arc::new(clock.clone()));
        let handle = driver.handle();
        let core = IoCore::with_driver(IoConfig::default(), Box::new(driver)).unwrap();
        let mut elevator = Elevator::new(core, Arc::new(clock.clone()));
        elevator.init().unwrap();
        (elevator, handle, clock)
    }

    #[test]
    fn init_resets_lamps() {
        let (mut elevator, _, _) = rig();
        let core = elevator.core_mut();
        assert!(!core.read_bit(channels::LIGHT_STOP).unwrap());
        assert!(!core.read_bit(channels::LIGHT_UP1).unwrap());
        assert!(!core.read_bit(channels::LIGHT_FLOOR_IND1).unwrap());
    }

    #[test]
    fn missing_buttons_are_ignored() {
        let (mut elevator, _, _) = rig();
        assert!(elevator.set_button_lamp(ButtonKind::CallDown, 0, true).is_ok());
        assert!(!elevator.button_pressed(ButtonKind::CallUp, 3).unwrap());
    }

    #[test]
    fn floor_indicator_encodes_two_bits() {
        let (mut elevator, _, _) = rig();
        elevator.set_floor_indicator(2).unwrap();
        let core = elevator.core_mut();
        assert!(core.read_bit(channels::LIGHT_FLOOR_IND1).unwrap());
        assert!(!core.read_bit(channels::LIGHT_FLOOR_IND2).unwrap());

        elevator.set_floor_indicator(9).unwrap();
        let core = elevator.core_mut();
        assert!(core.read_bit(channels::LIGHT_FLOOR_IND1).unwrap());
        assert!(core.read_bit(channels::LIGHT_FLOOR_IND2).unwrap());
    }

    #[test]
    fn poller_reports_press_once() {
        let (mut elevator, handle, clock) = rig();
        let mut poller = InputPoller::new();

        let first = poller.poll(&mut elevator).unwrap();
        assert_eq!(first.as_slice(), &[ElevatorEvent::FloorReached { floor: 1 }]);

        handle.press(channels::BUTTON_UP3).unwrap();
        let events = poller.poll(&mut elevator).unwrap();
        assert_eq!(
            events.as_slice(),
            &[ElevatorEvent::ButtonPressed {
                kind: ButtonKind::CallUp,
                floor: 2
            }]
        );

        clock.advance(Duration::from_millis(50));
        assert!(poller.poll(&mut elevator).unwrap().is_empty());
    }

    #[test]
    fn order_lamps_follow_the_book() {
        let (mut elevator, _, _) = rig();
        let mut orders = Orders::new();
        orders.add(ButtonKind::CallDown, 3);
        orders.add(ButtonKind::Command, 1);
        elevator.set_button_lamp(ButtonKind::CallUp, 0, true).unwrap();

        elevator.set_order_lamps(&orders).unwrap();
        let core = elevator.core_mut();
        assert!(core.read_bit(channels::LIGHT_DOWN4).unwrap());
        assert!(core.read_bit(channels::LIGHT_COMMAND2).unwrap());
        assert!(!core.read_bit(channels::LIGHT_UP1).unwrap());

        orders.clear_floor(3);
        elevator.set_order_lamps(&orders).unwrap();
        assert!(!elevator.core_mut().read_bit(channels::LIGHT_DOWN4).unwrap());
    }

    #[test]
    fn stop_delay_uses_clock() {
        let (mut elevator, _, clock) = rig();
        let start = clock.now();
        elevator.set_motor_direction(MotorDirection::Stop).unwrap();
        assert_eq!(clock.now() - start, Duration::from_millis(50));
    }
}
