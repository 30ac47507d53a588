//! Order book and dispatch decisions for the elevator.
//!
//! [`Orders`] holds the buttons a cab has accepted. [`CabState`] combines
//! them with where the cab is and which way it travels, and decides whether
//! to stop at the current floor and where to go next. [`assign_order`]
//! hands a new call to the cheapest of several cabs.
//!
//! Cost of an order is `TRAVEL_COST` per floor travelled plus `STOP_COST`
//! per stop made on the way, following the cab's current sweep.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::consts::{N_FLOORS, STOP_COST, TRAVEL_COST};
use crate::elevator::{self, ButtonKind, MotorDirection};

const TOP_FLOOR: u8 = N_FLOORS as u8 - 1;

/// Accepted orders, one flag per floor and button kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Orders {
    matrix: [[bool; 3]; N_FLOORS],
}

impl Orders {
    /// Empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the order of button `(kind, floor)`.
    ///
    /// Returns `false` and leaves the book unchanged if the rig has no such
    /// button (call-up on the top floor, call-down on the ground floor).
    pub fn add(&mut self, kind: ButtonKind, floor: u8) -> bool {
        if elevator::button_channel(kind, floor).is_none() {
            return false;
        }
        self.matrix[floor as usize][kind.column()] = true;
        true
    }

    /// Whether `(kind, floor)` is ordered.
    pub fn contains(&self, kind: ButtonKind, floor: u8) -> bool {
        self.matrix
            .get(floor as usize)
            .is_some_and(|row| row[kind.column()])
    }

    /// Whether any order is pending at `floor`.
    pub fn any_at(&self, floor: u8) -> bool {
        self.matrix
            .get(floor as usize)
            .is_some_and(|row| row.contains(&true))
    }

    /// Whether any order is pending above `floor`.
    pub fn any_above(&self, floor: u8) -> bool {
        (floor as usize + 1..N_FLOORS).any(|f| self.any_at(f as u8))
    }

    /// Whether any order is pending below `floor`.
    pub fn any_below(&self, floor: u8) -> bool {
        (0..floor).any(|f| self.any_at(f))
    }

    /// No order pending anywhere.
    pub fn is_empty(&self) -> bool {
        self.matrix.iter().flatten().all(|&ordered| !ordered)
    }

    /// Clear every order at `floor`, returning the kinds that were set.
    pub fn clear_floor(&mut self, floor: u8) -> Vec<ButtonKind> {
        let Some(row) = self.matrix.get_mut(floor as usize) else {
            return Vec::new();
        };
        let cleared = ButtonKind::ALL
            .into_iter()
            .filter(|kind| row[kind.column()])
            .collect();
        *row = [false; 3];
        cleared
    }

    /// Pending orders as `(kind, floor)`, ground floor first.
    pub fn iter(&self) -> impl Iterator<Item = (ButtonKind, u8)> + '_ {
        self.matrix.iter().enumerate().flat_map(|(floor, row)| {
            ButtonKind::ALL
                .into_iter()
                .filter(move |kind| row[kind.column()])
                .map(move |kind| (kind, floor as u8))
        })
    }
}

/// Where a cab is, where it heads, and what it has to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CabState {
    /// Last floor whose sensor triggered.
    pub last_floor: u8,
    /// Direction of the current sweep; `Stop` when the cab has none.
    pub direction: MotorDirection,
    /// Whether the motor is running.
    pub moving: bool,
    /// Orders this cab serves.
    pub orders: Orders,
}

impl CabState {
    /// Stationary cab at `floor` with nothing to do.
    pub fn idle_at(floor: u8) -> Self {
        Self {
            last_floor: floor,
            direction: MotorDirection::Stop,
            moving: false,
            orders: Orders::new(),
        }
    }

    /// Stationary, no sweep and no orders.
    pub fn is_idle(&self) -> bool {
        !self.moving && self.direction == MotorDirection::Stop && self.orders.is_empty()
    }

    /// Whether the cab should stop at `last_floor`.
    ///
    /// A sweep stops for a command order or a call in its own direction,
    /// at the end of the shaft, and when nothing is left ahead of it.
    pub fn should_stop(&self) -> bool {
        let floor = self.last_floor;
        let command = self.orders.contains(ButtonKind::Command, floor);
        match self.direction {
            MotorDirection::Stop => true,
            MotorDirection::Up => {
                command
                    || self.orders.contains(ButtonKind::CallUp, floor)
                    || !self.orders.any_above(floor)
                    || floor >= TOP_FLOOR
            }
            MotorDirection::Down => {
                command
                    || self.orders.contains(ButtonKind::CallDown, floor)
                    || !self.orders.any_below(floor)
                    || floor == 0
            }
        }
    }

    /// Direction to leave `last_floor` in.
    ///
    /// Keeps the current sweep while it has orders ahead, otherwise turns
    /// to whichever side has orders, preferring up. `Stop` when the only
    /// orders left are at this floor.
    pub fn next_direction(&self) -> MotorDirection {
        let floor = self.last_floor;
        let above = self.orders.any_above(floor);
        let below = self.orders.any_below(floor);

        if self.direction == MotorDirection::Up && above && floor < TOP_FLOOR {
            return MotorDirection::Up;
        }
        if self.direction != MotorDirection::Stop && below && floor > 0 {
            return MotorDirection::Down;
        }
        if above {
            MotorDirection::Up
        } else if below {
            MotorDirection::Down
        } else {
            MotorDirection::Stop
        }
    }

    /// Floors travelled and stops made before the cab serves `(kind, floor)`,
    /// following its current sweep and its own orders.
    ///
    /// A cab without a sweep at the order's floor needs `(0, 0)`. The
    /// order's floor does not count as a stop.
    pub fn distance_to(&self, kind: ButtonKind, floor: u8) -> (u32, u32) {
        let target = floor.min(TOP_FLOOR);
        let mut direction = self.direction;

        if direction == MotorDirection::Stop && self.last_floor == target {
            return (0, 0);
        }
        if target > self.last_floor {
            if !(direction == MotorDirection::Down && self.orders.any_below(self.last_floor)) {
                direction = MotorDirection::Up;
            }
        } else if target < self.last_floor
            && !(direction == MotorDirection::Up && self.orders.any_above(self.last_floor))
        {
            direction = MotorDirection::Down;
        }

        let (mut floors, mut stops) = (0, 0);
        let mut next = step(self.last_floor, direction);
        while let Some(current) = next {
            floors += 1;
            if current == target && self.serves_on_arrival(kind, current, direction) {
                break;
            }
            if self.orders.any_at(current) {
                stops += 1;
            }
            if current == TOP_FLOOR {
                direction = MotorDirection::Down;
            } else if current == 0 {
                direction = MotorDirection::Up;
            }
            next = step(current, direction);
        }
        (floors, stops)
    }

    /// Dispatch cost of `(kind, floor)` for this cab.
    pub fn cost_to(&self, kind: ButtonKind, floor: u8) -> u32 {
        let (floors, stops) = self.distance_to(kind, floor);
        floors * TRAVEL_COST + stops * STOP_COST
    }

    /// Whether a cab sweeping in `direction` serves `kind` on reaching `floor`.
    fn serves_on_arrival(&self, kind: ButtonKind, floor: u8, direction: MotorDirection) -> bool {
        if floor == 0 || floor == TOP_FLOOR {
            return true;
        }
        match (kind, direction) {
            (ButtonKind::Command, _)
            | (ButtonKind::CallUp, MotorDirection::Up)
            | (ButtonKind::CallDown, MotorDirection::Down) => true,
            // Against the sweep: only once nothing is left beyond the floor
            (_, MotorDirection::Up) => !self.orders.any_above(floor),
            (_, MotorDirection::Down) => !self.orders.any_below(floor),
            (_, MotorDirection::Stop) => true,
        }
    }
}

/// Next floor in `direction`, `None` past either end of the shaft.
fn step(floor: u8, direction: MotorDirection) -> Option<u8> {
    match direction {
        MotorDirection::Up if floor < TOP_FLOOR => Some(floor + 1),
        MotorDirection::Down if floor > 0 => Some(floor - 1),
        _ => None,
    }
}

/// Pick the cab that serves `(kind, floor)` at the lowest cost.
///
/// Ties go to the smallest id. `None` if `cabs` is empty.
pub fn assign_order<'a, I>(cabs: I, kind: ButtonKind, floor: u8) -> Option<&'a str>
where
    I: IntoIterator<Item = (&'a str, &'a CabState)>,
{
    cabs.into_iter()
        .map(|(id, cab)| {
            let cost = cab.cost_to(kind, floor);
            debug!("Cab {} costs {} for {} at floor {}", id, cost, kind, floor);
            (cost, id)
        })
        .min()
        .map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cab(last_floor: u8, direction: MotorDirection, orders: &[(ButtonKind, u8)]) -> CabState {
        let mut state = CabState {
            last_floor,
            direction,
            moving: direction != MotorDirection::Stop,
            orders: Orders::new(),
        };
        for &(kind, floor) in orders {
            assert!(state.orders.add(kind, floor));
        }
        state
    }

    #[test]
    fn missing_buttons_are_not_accepted() {
        let mut orders = Orders::new();
        assert!(!orders.add(ButtonKind::CallUp, 3));
        assert!(!orders.add(ButtonKind::CallDown, 0));
        assert!(!orders.add(ButtonKind::Command, 4));
        assert!(orders.is_empty());
    }

    #[test]
    fn orders_above_below_and_clear() {
        let mut orders = Orders::new();
        orders.add(ButtonKind::Command, 2);
        orders.add(ButtonKind::CallDown, 2);
        orders.add(ButtonKind::CallUp, 0);

        assert!(orders.any_above(1));
        assert!(!orders.any_above(2));
        assert!(orders.any_below(1));
        assert!(!orders.any_below(0));
        assert_eq!(
            orders.iter().collect::<Vec<_>>(),
            vec![
                (ButtonKind::CallUp, 0),
                (ButtonKind::CallDown, 2),
                (ButtonKind::Command, 2)
            ]
        );

        assert_eq!(
            orders.clear_floor(2),
            vec![ButtonKind::CallDown, ButtonKind::Command]
        );
        assert!(!orders.any_at(2));
        assert!(orders.clear_floor(9).is_empty());
    }

    #[test]
    fn sweep_stops_for_its_own_calls_only() {
        let up = MotorDirection::Up;
        assert!(!cab(1, up, &[(ButtonKind::Command, 3)]).should_stop());
        assert!(cab(1, up, &[(ButtonKind::Command, 1), (ButtonKind::Command, 3)]).should_stop());
        assert!(cab(1, up, &[(ButtonKind::CallUp, 1), (ButtonKind::Command, 3)]).should_stop());
        assert!(!cab(1, up, &[(ButtonKind::CallDown, 1), (ButtonKind::Command, 3)]).should_stop());

        // Nothing left ahead
        assert!(cab(1, up, &[(ButtonKind::CallDown, 1)]).should_stop());
        assert!(cab(2, MotorDirection::Down, &[(ButtonKind::Command, 3)]).should_stop());
        assert!(cab(0, MotorDirection::Down, &[(ButtonKind::Command, 3)]).should_stop());
        assert!(cab(2, MotorDirection::Stop, &[(ButtonKind::Command, 0)]).should_stop());
    }

    #[test]
    fn next_direction_keeps_the_sweep() {
        let orders = [(ButtonKind::Command, 0), (ButtonKind::Command, 3)];
        assert_eq!(cab(1, MotorDirection::Up, &orders).next_direction(), MotorDirection::Up);
        assert_eq!(cab(2, MotorDirection::Down, &orders).next_direction(), MotorDirection::Down);
        assert_eq!(cab(1, MotorDirection::Stop, &orders).next_direction(), MotorDirection::Up);

        let below = [(ButtonKind::CallUp, 0)];
        assert_eq!(cab(3, MotorDirection::Up, &below).next_direction(), MotorDirection::Down);
        assert_eq!(cab(2, MotorDirection::Stop, &below).next_direction(), MotorDirection::Down);

        let here = [(ButtonKind::Command, 2)];
        assert_eq!(cab(2, MotorDirection::Up, &here).next_direction(), MotorDirection::Stop);
        assert_eq!(CabState::idle_at(1).next_direction(), MotorDirection::Stop);
    }

    #[test]
    fn distance_follows_the_sweep() {
        assert_eq!(CabState::idle_at(2).distance_to(ButtonKind::CallUp, 2), (0, 0));
        assert_eq!(CabState::idle_at(0).distance_to(ButtonKind::Command, 3), (3, 0));

        // Stops at 1 on the way up to the call at 2
        let going_up = cab(0, MotorDirection::Up, &[(ButtonKind::Command, 1)]);
        assert_eq!(going_up.distance_to(ButtonKind::CallUp, 2), (2, 1));
        assert_eq!(going_up.cost_to(ButtonKind::CallUp, 2), 2 * TRAVEL_COST + STOP_COST);

        // A down call passed on the way up is served on the way back
        let to_top = cab(0, MotorDirection::Up, &[(ButtonKind::Command, 3)]);
        assert_eq!(to_top.distance_to(ButtonKind::CallDown, 1), (5, 1));

        // Nothing beyond it, so it is served right away
        assert_eq!(
            cab(0, MotorDirection::Up, &[]).distance_to(ButtonKind::CallDown, 1),
            (1, 0)
        );
    }

    #[test]
    fn moving_cab_without_sweep_at_the_floor_costs_nothing() {
        let mut state = CabState::idle_at(1);
        state.moving = true;
        assert!(!state.is_idle());
        assert_eq!(state.cost_to(ButtonKind::CallDown, 1), 0);
    }

    #[test]
    fn order_goes_to_the_cheapest_cab() {
        let ground = CabState::idle_at(0);
        let top = CabState::idle_at(3);
        let cabs = [("a", &ground), ("b", &top)];
        assert_eq!(assign_order(cabs, ButtonKind::CallDown, 2), Some("b"));
        assert_eq!(assign_order(cabs, ButtonKind::CallUp, 0), Some("a"));
    }

    #[test]
    fn ties_go_to_the_smallest_id() {
        let first = CabState::idle_at(1);
        let second = CabState::idle_at(1);
        let cabs = [("10.0.0.2", &second), ("10.0.0.1", &first)];
        assert_eq!(assign_order(cabs, ButtonKind::Command, 2), Some("10.0.0.1"));

        let none: [(&str, &CabState); 0] = [];
        assert_eq!(assign_order(none, ButtonKind::Command, 2), None);
    }
}
