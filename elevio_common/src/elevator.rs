//! Channel map of the elevator rig.
//!
//! The rig wires four floors of call buttons, lamps and floor sensors, a
//! stop switch, an obstruction switch, a two-bit floor indicator and one
//! analog motor output to the DAQ card. Buttons that do not exist
//! (down at the ground floor, up at the top floor) map to `None`.

use core::fmt;
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::consts::N_FLOORS;

/// Raw channel constants of the rig.
pub mod channels {
    use crate::channel::Channel;

    // in port 4
    pub const OBSTRUCTION: Channel = Channel::new(3, 23);
    pub const STOP_BUTTON: Channel = Channel::new(3, 22);
    pub const BUTTON_COMMAND1: Channel = Channel::new(3, 21);
    pub const BUTTON_COMMAND2: Channel = Channel::new(3, 20);
    pub const BUTTON_COMMAND3: Channel = Channel::new(3, 19);
    pub const BUTTON_COMMAND4: Channel = Channel::new(3, 18);
    pub const BUTTON_UP1: Channel = Channel::new(3, 17);
    pub const BUTTON_UP2: Channel = Channel::new(3, 16);

    // in port 1
    pub const BUTTON_DOWN2: Channel = Channel::new(2, 0);
    pub const BUTTON_UP3: Channel = Channel::new(2, 1);
    pub const BUTTON_DOWN3: Channel = Channel::new(2, 2);
    pub const BUTTON_DOWN4: Channel = Channel::new(2, 3);
    pub const SENSOR_FLOOR1: Channel = Channel::new(2, 4);
    pub const SENSOR_FLOOR2: Channel = Channel::new(2, 5);
    pub const SENSOR_FLOOR3: Channel = Channel::new(2, 6);
    pub const SENSOR_FLOOR4: Channel = Channel::new(2, 7);

    // out port 3
    pub const MOTORDIR: Channel = Channel::new(3, 15);
    pub const LIGHT_STOP: Channel = Channel::new(3, 14);
    pub const LIGHT_COMMAND1: Channel = Channel::new(3, 13);
    pub const LIGHT_COMMAND2: Channel = Channel::new(3, 12);
    pub const LIGHT_COMMAND3: Channel = Channel::new(3, 11);
    pub const LIGHT_COMMAND4: Channel = Channel::new(3, 10);
    pub const LIGHT_UP1: Channel = Channel::new(3, 9);
    pub const LIGHT_UP2: Channel = Channel::new(3, 8);

    // out port 2
    pub const LIGHT_DOWN2: Channel = Channel::new(3, 7);
    pub const LIGHT_UP3: Channel = Channel::new(3, 6);
    pub const LIGHT_DOWN3: Channel = Channel::new(3, 5);
    pub const LIGHT_DOWN4: Channel = Channel::new(3, 4);
    pub const LIGHT_DOOR_OPEN: Channel = Channel::new(3, 3);
    pub const LIGHT_FLOOR_IND2: Channel = Channel::new(3, 1);
    pub const LIGHT_FLOOR_IND1: Channel = Channel::new(3, 0);

    // analog out
    pub const MOTOR: Channel = Channel::new(1, 0);
}

use channels::*;

/// Symbolic names accepted by `Channel::from_str`.
pub const NAMED_CHANNELS: &[(&str, Channel)] = &[
    ("OBSTRUCTION", OBSTRUCTION),
    ("STOP", STOP_BUTTON),
    ("STOP_BUTTON", STOP_BUTTON),
    ("BUTTON_COMMAND1", BUTTON_COMMAND1),
    ("BUTTON_COMMAND2", BUTTON_COMMAND2),
    ("BUTTON_COMMAND3", BUTTON_COMMAND3),
    ("BUTTON_COMMAND4", BUTTON_COMMAND4),
    ("BUTTON_UP1", BUTTON_UP1),
    ("BUTTON_UP2", BUTTON_UP2),
    ("BUTTON_UP3", BUTTON_UP3),
    ("BUTTON_DOWN2", BUTTON_DOWN2),
    ("BUTTON_DOWN3", BUTTON_DOWN3),
    ("BUTTON_DOWN4", BUTTON_DOWN4),
    ("SENSOR_FLOOR1", SENSOR_FLOOR1),
    ("SENSOR_FLOOR2", SENSOR_FLOOR2),
    ("SENSOR_FLOOR3", SENSOR_FLOOR3),
    ("SENSOR_FLOOR4", SENSOR_FLOOR4),
    ("MOTORDIR", MOTORDIR),
    ("LIGHT_STOP", LIGHT_STOP),
    ("LIGHT_COMMAND1", LIGHT_COMMAND1),
    ("LIGHT_COMMAND2", LIGHT_COMMAND2),
    ("LIGHT_COMMAND3", LIGHT_COMMAND3),
    ("LIGHT_COMMAND4", LIGHT_COMMAND4),
    ("LIGHT_UP1", LIGHT_UP1),
    ("LIGHT_UP2", LIGHT_UP2),
    ("LIGHT_UP3", LIGHT_UP3),
    ("LIGHT_DOWN2", LIGHT_DOWN2),
    ("LIGHT_DOWN3", LIGHT_DOWN3),
    ("LIGHT_DOWN4", LIGHT_DOWN4),
    ("LIGHT_DOOR_OPEN", LIGHT_DOOR_OPEN),
    ("LIGHT_FLOOR_IND1", LIGHT_FLOOR_IND1),
    ("LIGHT_FLOOR_IND2", LIGHT_FLOOR_IND2),
    ("MOTOR", MOTOR),
];

/// Look up a channel by its symbolic name (case-insensitive).
pub fn channel_by_name(name: &str) -> Option<Channel> {
    let name = name.trim();
    NAMED_CHANNELS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, channel)| channel)
}

/// Symbolic name of a channel, if it has one.
pub fn name_of(channel: Channel) -> Option<&'static str> {
    NAMED_CHANNELS
        .iter()
        .find(|&&(_, c)| c == channel)
        .map(|&(name, _)| name)
}

/// Kind of a floor button and its lamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    /// Hall call going up.
    CallUp,
    /// Hall call going down.
    CallDown,
    /// Cab command to a floor.
    Command,
}

impl ButtonKind {
    /// All kinds, in matrix column order.
    pub const ALL: [ButtonKind; 3] = [Self::CallUp, Self::CallDown, Self::Command];

    pub(crate) const fn column(self) -> usize {
        match self {
            Self::CallUp => 0,
            Self::CallDown => 1,
            Self::Command => 2,
        }
    }
}

impl fmt::Display for ButtonKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CallUp => write!(f, "call-up"),
            Self::CallDown => write!(f, "call-down"),
            Self::Command => write!(f, "command"),
        }
    }
}

/// Motor command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotorDirection {
    /// Towards the top floor.
    Up,
    /// Towards the ground floor.
    Down,
    /// Motor level zero.
    Stop,
}

const BUTTONS: [[Option<Channel>; 3]; N_FLOORS] = [
    [Some(BUTTON_UP1), None, Some(BUTTON_COMMAND1)],
    [Some(BUTTON_UP2), Some(BUTTON_DOWN2), Some(BUTTON_COMMAND2)],
    [Some(BUTTON_UP3), Some(BUTTON_DOWN3), Some(BUTTON_COMMAND3)],
    [None, Some(BUTTON_DOWN4), Some(BUTTON_COMMAND4)],
];

const LAMPS: [[Option<Channel>; 3]; N_FLOORS] = [
    [Some(LIGHT_UP1), None, Some(LIGHT_COMMAND1)],
    [Some(LIGHT_UP2), Some(LIGHT_DOWN2), Some(LIGHT_COMMAND2)],
    [Some(LIGHT_UP3), Some(LIGHT_DOWN3), Some(LIGHT_COMMAND3)],
    [None, Some(LIGHT_DOWN4), Some(LIGHT_COMMAND4)],
];

/// Floor sensors, ground floor first.
pub const FLOOR_SENSORS: [Channel; N_FLOORS] =
    [SENSOR_FLOOR1, SENSOR_FLOOR2, SENSOR_FLOOR3, SENSOR_FLOOR4];

/// Button input of `kind` at `floor`.
pub fn button_channel(kind: ButtonKind, floor: u8) -> Option<Channel> {
    BUTTONS
        .get(floor as usize)
        .and_then(|row| row[kind.column()])
}

/// Lamp output of `kind` at `floor`.
pub fn lamp_channel(kind: ButtonKind, floor: u8) -> Option<Channel> {
    LAMPS.get(floor as usize).and_then(|row| row[kind.column()])
}

/// Button `(kind, floor)` wired to `channel`, if any.
pub fn button_at(channel: Channel) -> Option<(ButtonKind, u8)> {
    BUTTONS.iter().enumerate().find_map(|(floor, row)| {
        ButtonKind::ALL
            .iter()
            .find(|kind| row[kind.column()] == Some(channel))
            .map(|&kind| (kind, floor as u8))
    })
}

/// Floor sensor input of `floor`.
pub fn floor_sensor_channel(floor: u8) -> Option<Channel> {
    FLOOR_SENSORS.get(floor as usize).copied()
}

/// Levels of `(LIGHT_FLOOR_IND1, LIGHT_FLOOR_IND2)` showing `floor`.
pub const fn floor_indicator_bits(floor: u8) -> (bool, bool) {
    (floor & 0x02 != 0, floor & 0x01 != 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{Access, ChannelLayout};

    #[test]
    fn every_named_channel_is_in_the_rig_layout() {
        let layout = ChannelLayout::elevator_rig();
        for (name, channel) in NAMED_CHANNELS {
            assert!(layout.port_of(*channel).is_some(), "{name} not mapped");
        }
    }

    #[test]
    fn lamps_are_outputs_and_buttons_are_inputs() {
        let layout = ChannelLayout::elevator_rig();
        for floor in 0..N_FLOORS as u8 {
            for kind in ButtonKind::ALL {
                if let Some(lamp) = lamp_channel(kind, floor) {
                    assert!(layout.resolve(lamp, Access::WriteBit).is_ok());
                }
                if let Some(button) = button_channel(kind, floor) {
                    assert!(layout.resolve(button, Access::WriteBit).is_err());
                    assert!(layout.resolve(button, Access::ReadBit).is_ok());
                }
            }
        }
        assert!(layout.resolve(MOTOR, Access::WriteAnalog).is_ok());
        assert!(layout.resolve(MOTORDIR, Access::WriteBit).is_ok());
    }

    #[test]
    fn missing_buttons_are_none() {
        assert_eq!(button_channel(ButtonKind::CallDown, 0), None);
        assert_eq!(button_channel(ButtonKind::CallUp, 3), None);
        assert_eq!(lamp_channel(ButtonKind::CallDown, 0), None);
        assert_eq!(lamp_channel(ButtonKind::CallUp, 3), None);
        assert_eq!(button_channel(ButtonKind::Command, 4), None);
        assert_eq!(button_channel(ButtonKind::Command, 3), Some(BUTTON_COMMAND4));
    }

    #[test]
    fn button_at_inverts_button_channel() {
        assert_eq!(button_at(BUTTON_DOWN3), Some((ButtonKind::CallDown, 2)));
        assert_eq!(button_at(BUTTON_UP1), Some((ButtonKind::CallUp, 0)));
        assert_eq!(button_at(LIGHT_UP1), None);
    }

    #[test]
    fn names_round_trip() {
        assert_eq!(channel_by_name("sensor_floor3"), Some(SENSOR_FLOOR3));
        assert_eq!(name_of(MOTOR), Some("MOTOR"));
        assert_eq!(channel_by_name("LIGHT_UP4"), None);
    }

    #[test]
    fn floor_indicator_is_binary() {
        assert_eq!(floor_indicator_bits(0), (false, false));
        assert_eq!(floor_indicator_bits(1), (false, true));
        assert_eq!(floor_indicator_bits(2), (true, false));
        assert_eq!(floor_indicator_bits(3), (true, true));
    }
}
