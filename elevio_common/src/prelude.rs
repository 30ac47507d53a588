//! Prelude module for common re-exports.
//!
//! ```rust
//! use elevio_common::prelude::*;
//! ```

// ─── Channels ───────────────────────────────────────────────────────
pub use crate::channel::{Access, Channel, ChannelKind, ChannelLayout, PortConfig, PortDirection};

// ─── Driver ─────────────────────────────────────────────────────────
pub use crate::driver::{AnalogValue, DriverDiagnostics, DriverFactory, IoDriver, IoError};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{AnalogPolicy, ConfigError, ConfigLoader, IoConfig, LogLevel};

// ─── Elevator ───────────────────────────────────────────────────────
pub use crate::elevator::{ButtonKind, MotorDirection};
pub use crate::orders::{CabState, Orders};
