//! I/O image for the simulation driver.
//!
//! The `IoImage` stores:
//! - Digital outputs and analog levels as last written (read-back)
//! - Latched digital inputs (switches such as obstruction)
//! - Timed presses that hold an input high until they expire

use elevio_common::channel::Channel;
use elevio_common::driver::AnalogValue;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// Input held high until `release_at`.
#[derive(Debug, Clone, Copy)]
struct Press {
    channel: Channel,
    release_at: Instant,
}

/// Simulated state of every line the host has touched.
#[derive(Debug, Default)]
pub struct IoImage {
    /// Digital lines as driven by the host
    bits: HashMap<Channel, bool>,
    /// Analog lines as driven by the host (or injected for inputs)
    analog: HashMap<Channel, AnalogValue>,
    /// Latched digital inputs
    latched: HashMap<Channel, bool>,
    /// Pending momentary presses
    presses: Vec<Press>,
}

impl IoImage {
    /// Empty image: every line reads low / zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive a digital line.
    pub fn write_bit(&mut self, channel: Channel, level: bool) {
        trace!("bit {} <- {}", channel, level);
        self.bits.insert(channel, level);
    }

    /// Last driven level of a digital line.
    pub fn bit(&self, channel: Channel) -> bool {
        self.bits.get(&channel).copied().unwrap_or(false)
    }

    /// Drive an analog line.
    pub fn write_analog(&mut self, channel: Channel, value: AnalogValue) {
        trace!("analog {} <- {}", channel, value);
        self.analog.insert(channel, value);
    }

    /// Last driven magnitude of an analog line.
    pub fn analog(&self, channel: Channel) -> AnalogValue {
        self.analog.get(&channel).copied().unwrap_or(0)
    }

    /// Latch a digital input at `level`.
    pub fn latch_input(&mut self, channel: Channel, level: bool) {
        self.latched.insert(channel, level);
    }

    /// Hold a digital input high for `hold`, starting at `now`.
    pub fn press(&mut self, channel: Channel, now: Instant, hold: Duration) {
        self.presses.push(Press {
            channel,
            release_at: now + hold,
        });
    }

    /// Level of a digital input at `now`: latched or pressed.
    pub fn input(&mut self, channel: Channel, now: Instant) -> bool {
        self.expire_presses(now);
        self.latched.get(&channel).copied().unwrap_or(false)
            || self.presses.iter().any(|p| p.channel == channel)
    }

    /// Drop presses released at or before `now`.
    fn expire_presses(&mut self, now: Instant) {
        self.presses.retain(|p| {
            let held = p.release_at > now;
            if !held {
                trace!("released {}", p.channel);
            }
            held
        });
    }
}
