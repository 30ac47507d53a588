//! System-wide constants for the ELEVIO workspace.
//!
//! Single source of truth for numeric limits and default paths.

use static_assertions::const_assert;

use crate::driver::AnalogValue;

/// Canonical service name (used for logging).
pub const IO_SERVICE_NAME: &str = "elevio";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/elevio/elevio.toml";

/// Default comedi device node.
pub const DEFAULT_DEVICE_PATH: &str = "/dev/comedi0";

/// Number of addressable lines per subdevice (channel index is one byte).
pub const LINES_PER_SUBDEVICE: u16 = 256;

/// Full scale of the rig's 12-bit analog converters.
pub const DEFAULT_ANALOG_MAX: AnalogValue = 4095;

/// Number of floors served by the elevator rig.
pub const N_FLOORS: usize = 4;

/// Motor level written when the cab moves (200 per speed step, 14 steps).
pub const MOTOR_SPEED: AnalogValue = 200 * 14;

/// Default input polling interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Dispatch cost of travelling one floor.
pub const TRAVEL_COST: u32 = 2;

/// Dispatch cost of each stop made on the way to an order.
pub const STOP_COST: u32 = 3;

// Floor indicator is two bits wide.
const_assert!(N_FLOORS >= 2 && N_FLOORS <= 4);
const_assert!(MOTOR_SPEED <= DEFAULT_ANALOG_MAX);
