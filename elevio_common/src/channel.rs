//! Channel identifiers and port layout.
//!
//! A `Channel` names one physical line as `(subdevice, index)`, encoded on
//! the wire of the comedi rig as `subdevice << 8 | index` (`0x300 + 14`).
//! The `ChannelLayout` lists the ports that actually exist; a channel is
//! only usable if some port covers it, and only for the accesses that
//! port's kind and direction allow.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::consts::LINES_PER_SUBDEVICE;
use crate::driver::IoError;
use crate::elevator;

// ─── Channel ────────────────────────────────────────────────────────

/// Identifier of a single digital or analog line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u16", into = "u16")]
pub struct Channel {
    subdevice: u8,
    index: u8,
}

impl Channel {
    /// Build a channel from its subdevice and line index.
    pub const fn new(subdevice: u8, index: u8) -> Self {
        Self { subdevice, index }
    }

    /// Decode the packed `subdevice << 8 | index` form.
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            subdevice: (raw >> 8) as u8,
            index: (raw & 0xff) as u8,
        }
    }

    /// Packed `subdevice << 8 | index` form.
    pub const fn raw(self) -> u16 {
        ((self.subdevice as u16) << 8) | self.index as u16
    }

    /// Subdevice number.
    pub const fn subdevice(self) -> u8 {
        self.subdevice
    }

    /// Line index within the subdevice.
    pub const fn index(self) -> u8 {
        self.index
    }
}

impl From<u16> for Channel {
    fn from(raw: u16) -> Self {
        Self::from_raw(raw)
    }
}

impl From<Channel> for u16 {
    fn from(channel: Channel) -> Self {
        channel.raw()
    }
}

impl TryFrom<i32> for Channel {
    type Error = ChannelParseError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        u16::try_from(raw)
            .map(Self::from_raw)
            .map_err(|_| ChannelParseError::OutOfRange(raw.to_string()))
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}00+{}", self.subdevice, self.index)
    }
}

/// Error returned when a channel string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelParseError {
    /// Not a number, `base+offset` expression or known channel name.
    #[error("unrecognised channel '{0}'")]
    Unrecognised(String),

    /// Numeric value does not fit the 16-bit channel encoding.
    #[error("channel '{0}' is outside 0x0000..=0xffff")]
    OutOfRange(String),
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

impl FromStr for Channel {
    type Err = ChannelParseError;

    /// Accepts `"LIGHT_STOP"`, `"0x300+14"`, `"0x30e"` and `"782"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(channel) = elevator::channel_by_name(s) {
            return Ok(channel);
        }

        let value = match s.split_once('+') {
            Some((base, offset)) => parse_number(base)
                .zip(parse_number(offset))
                .map(|(base, offset)| base.saturating_add(offset)),
            None => parse_number(s),
        }
        .ok_or_else(|| ChannelParseError::Unrecognised(s.to_string()))?;

        u16::try_from(value)
            .map(Self::from_raw)
            .map_err(|_| ChannelParseError::OutOfRange(s.to_string()))
    }
}

// ─── Port ───────────────────────────────────────────────────────────

/// Signal kind of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Two-level line.
    Digital,
    /// Multi-level line carrying an integer magnitude.
    Analog,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Digital => f.pad("digital"),
            Self::Analog => f.pad("analog"),
        }
    }
}

/// Direction of a port as seen from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Host reads the line.
    Input,
    /// Host drives the line.
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.pad("input"),
            Self::Output => f.pad("output"),
        }
    }
}

/// One operation of the I/O interface, used to check a channel against
/// its port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Set or clear a digital line.
    WriteBit,
    /// Read a digital line.
    ReadBit,
    /// Drive an analog line.
    WriteAnalog,
    /// Read an analog line.
    ReadAnalog,
}

impl Access {
    /// Whether a port of the given kind and direction supports this access.
    ///
    /// Reads are allowed on outputs too (read-back of the driven level).
    pub fn permitted(self, kind: ChannelKind, direction: PortDirection) -> bool {
        match self {
            Self::WriteBit => kind == ChannelKind::Digital && direction == PortDirection::Output,
            Self::ReadBit => kind == ChannelKind::Digital,
            Self::WriteAnalog => kind == ChannelKind::Analog && direction == PortDirection::Output,
            Self::ReadAnalog => kind == ChannelKind::Analog,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WriteBit => write!(f, "digital write"),
            Self::ReadBit => write!(f, "digital read"),
            Self::WriteAnalog => write!(f, "analog write"),
            Self::ReadAnalog => write!(f, "analog read"),
        }
    }
}

/// A contiguous run of lines on one subdevice sharing kind and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PortConfig {
    /// Human-readable port name.
    pub name: String,
    /// Subdevice number.
    pub subdevice: u8,
    /// First line index of the port.
    pub offset: u8,
    /// Number of lines.
    pub width: u16,
    /// Signal kind.
    pub kind: ChannelKind,
    /// Direction.
    pub direction: PortDirection,
}

impl PortConfig {
    /// Create a port definition.
    pub fn new(
        name: &str,
        subdevice: u8,
        offset: u8,
        width: u16,
        kind: ChannelKind,
        direction: PortDirection,
    ) -> Self {
        Self {
            name: name.to_string(),
            subdevice,
            offset,
            width,
            kind,
            direction,
        }
    }

    /// Whether this port covers the given channel.
    pub fn contains(&self, channel: Channel) -> bool {
        let index = channel.index() as u32;
        let start = self.offset as u32;
        channel.subdevice() == self.subdevice && index >= start && index < start + self.width as u32
    }

    /// All channels of this port, in index order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        let start = self.offset as u16;
        let end = start.saturating_add(self.width).min(LINES_PER_SUBDEVICE);
        (start..end).map(move |index| Channel::new(self.subdevice, index as u8))
    }

    fn overlaps(&self, other: &PortConfig) -> bool {
        let (a_start, b_start) = (self.offset as u32, other.offset as u32);
        self.subdevice == other.subdevice
            && a_start < b_start + other.width as u32
            && b_start < a_start + self.width as u32
    }
}

// ─── ChannelLayout ──────────────────────────────────────────────────

/// The set of ports a driver exposes.
///
/// Immutable after construction; every operation of the I/O core resolves
/// its channel here before touching the driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    ports: Vec<PortConfig>,
}

impl ChannelLayout {
    /// Build a layout from port definitions. Call [`validate`](Self::validate)
    /// before use.
    pub fn new(ports: Vec<PortConfig>) -> Self {
        Self { ports }
    }

    /// Port layout of the elevator rig's DAQ card.
    pub fn elevator_rig() -> Self {
        use ChannelKind::{Analog, Digital};
        use PortDirection::{Input, Output};

        Self::new(vec![
            PortConfig::new("port1", 2, 0, 8, Digital, Input),
            PortConfig::new("port2", 3, 0, 8, Digital, Output),
            PortConfig::new("port3", 3, 8, 8, Digital, Output),
            PortConfig::new("port4", 3, 16, 8, Digital, Input),
            PortConfig::new("motor", 1, 0, 1, Analog, Output),
        ])
    }

    /// All ports.
    pub fn ports(&self) -> &[PortConfig] {
        &self.ports
    }

    /// Port covering the channel, if any.
    pub fn port_of(&self, channel: Channel) -> Option<&PortConfig> {
        self.ports.iter().find(|p| p.contains(channel))
    }

    /// Resolve a channel for an access.
    ///
    /// # Errors
    /// - `IoError::InvalidChannel` if no port covers the channel
    /// - `IoError::WrongAccess` if the port does not support the access
    pub fn resolve(&self, channel: Channel, access: Access) -> Result<&PortConfig, IoError> {
        let port = self
            .port_of(channel)
            .ok_or(IoError::InvalidChannel(channel))?;

        if !access.permitted(port.kind, port.direction) {
            return Err(IoError::WrongAccess {
                channel,
                port: port.name.clone(),
                access,
            });
        }
        Ok(port)
    }

    /// Every channel of every port, paired with its port.
    pub fn channels(&self) -> impl Iterator<Item = (Channel, &PortConfig)> {
        self.ports
            .iter()
            .flat_map(|port| port.channels().map(move |channel| (channel, port)))
    }

    /// Validate the layout.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if:
    /// - the layout has no ports
    /// - a port has an empty name or zero width
    /// - a port runs past the last line of its subdevice
    /// - two ports overlap
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ports.is_empty() {
            return Err(ConfigError::ValidationError(
                "layout must define at least one port".to_string(),
            ));
        }

        for (i, port) in self.ports.iter().enumerate() {
            if port.name.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "port #{i} has an empty name"
                )));
            }
            if port.width == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "port '{}' has zero width",
                    port.name
                )));
            }
            if port.offset as u32 + port.width as u32 > LINES_PER_SUBDEVICE as u32 {
                return Err(ConfigError::ValidationError(format!(
                    "port '{}' runs past line {} of subdevice {}",
                    port.name,
                    LINES_PER_SUBDEVICE - 1,
                    port.subdevice
                )));
            }
            if let Some(other) = self.ports[..i].iter().find(|o| o.overlaps(port)) {
                return Err(ConfigError::ValidationError(format!(
                    "ports '{}' and '{}' overlap on subdevice {}",
                    other.name, port.name, port.subdevice
                )));
            }
        }
        Ok(())
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        Self::elevator_rig()
    }
}
