//! Elevator shaft simulator.
//!
//! The cab position is tracked in microseconds of travel from the centre of
//! the ground floor sensor. Floor `f` has its sensor centred at `f * pitch`
//! where `pitch = passing + between`, and the sensor is active for
//! `passing` of travel around that centre. Starting at rest on a floor, the
//! cab therefore leaves the sensor after `passing / 2` and reaches the next
//! one after a further `between`.

use elevio_common::config::SimulationConfig;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, trace};

/// Motor state as seen by the shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Motor level is zero
    Stopped,
    /// Driving towards the top floor
    Up,
    /// Driving towards the ground floor
    Down,
}

/// Cab driven past an end of the shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShaftFault {
    /// Cab left the top floor sensor going up
    #[error("cab driven over the top floor")]
    OverTop,
    /// Cab left the ground floor sensor going down
    #[error("cab driven under the bottom floor")]
    UnderBottom,
}

/// Shaft simulator tracking cab position and floor sensors.
#[derive(Debug)]
pub struct ShaftSimulator {
    floors: u8,
    /// Distance between sensor centres [us]
    pitch_us: i64,
    /// Sensor length [us]
    passing_us: i64,
    /// Cab position [us]
    position_us: i64,
    last_update: Instant,
    last_floor: u8,
    /// End stop the cab currently rests against
    at_limit: Option<ShaftFault>,
}

impl ShaftSimulator {
    /// Create a shaft with the cab resting on `config.start_floor`.
    pub fn new(config: &SimulationConfig, now: Instant) -> Self {
        let passing_us = config.passing_floor().as_micros() as i64;
        let pitch_us = passing_us + config.travel_between_floors().as_micros() as i64;

        debug!(
            "Shaft: {} floors, pitch={}us, sensor={}us, start floor {}",
            config.floors, pitch_us, passing_us, config.start_floor
        );

        Self {
            floors: config.floors,
            pitch_us,
            passing_us,
            position_us: config.start_floor as i64 * pitch_us,
            last_update: now,
            last_floor: config.start_floor,
            at_limit: None,
        }
    }

    /// Advance the cab to `now` with the motor in `motion` since the last
    /// update.
    ///
    /// Returns a fault the first time the cab hits an end of the shaft.
    pub fn update(&mut self, now: Instant, motion: Motion) -> Option<ShaftFault> {
        let dt_us = now.saturating_duration_since(self.last_update).as_micros() as i64;
        self.last_update = now;

        let delta = match motion {
            Motion::Stopped => return None,
            Motion::Up => dt_us,
            Motion::Down => -dt_us,
        };
        if delta == 0 {
            return None;
        }

        let min = -self.passing_us / 2;
        let max = (self.floors as i64 - 1) * self.pitch_us + self.passing_us / 2;
        let target = self.position_us + delta;

        let hit = if target > max {
            self.position_us = max;
            Some(ShaftFault::OverTop)
        } else if target < min {
            self.position_us = min;
            Some(ShaftFault::UnderBottom)
        } else {
            self.position_us = target;
            None
        };

        if let Some(floor) = self.current_floor() {
            if floor != self.last_floor {
                trace!("Cab entered floor {} sensor", floor);
                self.last_floor = floor;
            }
        }

        match hit {
            Some(fault) if self.at_limit != Some(fault) => {
                self.at_limit = Some(fault);
                error!("Shaft fault at floor {}: {}", self.last_floor, fault);
                Some(fault)
            }
            Some(_) => None,
            None => {
                self.at_limit = None;
                None
            }
        }
    }

    /// Whether the sensor of `floor` is active.
    pub fn floor_sensor(&self, floor: u8) -> bool {
        if floor >= self.floors {
            return false;
        }
        let centre = floor as i64 * self.pitch_us;
        (self.position_us - centre).abs() * 2 <= self.passing_us
    }

    /// Floor whose sensor is active, if any.
    pub fn current_floor(&self) -> Option<u8> {
        (0..self.floors).find(|&floor| self.floor_sensor(floor))
    }

    /// Last floor whose sensor the cab passed.
    pub fn last_floor(&self) -> u8 {
        self.last_floor
    }

    /// Cab position in floors (1.5 = halfway between floors 1 and 2).
    pub fn position(&self) -> f64 {
        self.position_us as f64 / self.pitch_us as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shaft() -> (ShaftSimulator, Instant) {
        let now = Instant::now();
        (ShaftSimulator::new(&SimulationConfig::default(), now), now)
    }

    #[test]
    fn starts_on_start_floor() {
        let (shaft, _) = shaft();
        assert_eq!(shaft.current_floor(), Some(1));
        assert!(shaft.floor_sensor(1));
        assert!(!shaft.floor_sensor(0));
        assert_eq!(shaft.last_floor(), 1);
        assert!((shaft.position() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn stopped_motor_does_not_move() {
        let (mut shaft, start) = shaft();
        assert_eq!(shaft.update(start + Duration::from_secs(10), Motion::Stopped), None);
        assert_eq!(shaft.current_floor(), Some(1));
    }

    #[test]
    fn leaves_sensor_after_half_passing_time() {
        let (mut shaft, start) = shaft();
        shaft.update(start + Duration::from_millis(500), Motion::Up);
        assert!(shaft.floor_sensor(1));
        shaft.update(start + Duration::from_millis(501), Motion::Up);
        assert_eq!(shaft.current_floor(), None);
    }

    #[test]
    fn reaches_next_floor_after_travel_time() {
        let (mut shaft, start) = shaft();
        shaft.update(start + Duration::from_millis(3499), Motion::Up);
        assert_eq!(shaft.current_floor(), None);
        shaft.update(start + Duration::from_millis(3500), Motion::Up);
        assert_eq!(shaft.current_floor(), Some(2));
        assert_eq!(shaft.last_floor(), 2);
    }

    #[test]
    fn direction_reversal_returns_to_floor() {
        let (mut shaft, start) = shaft();
        shaft.update(start + Duration::from_millis(2000), Motion::Down);
        assert_eq!(shaft.current_floor(), None);
        shaft.update(start + Duration::from_millis(3600), Motion::Up);
        assert_eq!(shaft.current_floor(), Some(1));
    }

    #[test]
    fn driving_past_the_bottom_faults_once() {
        let (mut shaft, start) = shaft();
        let fault = shaft.update(start + Duration::from_secs(10), Motion::Down);
        assert_eq!(fault, Some(ShaftFault::UnderBottom));
        assert_eq!(shaft.current_floor(), Some(0));

        // Still pushing against the end stop: no repeated fault.
        assert_eq!(shaft.update(start + Duration::from_secs(11), Motion::Down), None);

        // Moving away clears the end stop.
        assert_eq!(shaft.update(start + Duration::from_secs(12), Motion::Up), None);
        assert_eq!(
            shaft.update(start + Duration::from_secs(30), Motion::Down),
            Some(ShaftFault::UnderBottom)
        );
    }

    #[test]
    fn driving_past_the_top_faults() {
        let (mut shaft, start) = shaft();
        let fault = shaft.update(start + Duration::from_secs(60), Motion::Up);
        assert_eq!(fault, Some(ShaftFault::OverTop));
        assert_eq!(shaft.current_floor(), Some(3));
    }
}
