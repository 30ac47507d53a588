//! # ELEVIO HAL Library
//!
//! Digital/analog I/O core with a pluggable driver architecture.
//!
//! Drivers implement the `IoDriver` trait defined in
//! `elevio_common::driver`. [`IoCore`] owns one driver, checks every channel
//! against the configured port layout and exposes the six I/O operations.
//!
//! # Module Structure
//!
//! - [`core`] - IoCore struct, lifecycle and channel validation
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Driver implementations
//! - [`elevator`] - Elevator panel on top of the core
//! - [`clock`] - Time source for the simulator and the panel
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        elevio_hal                            │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐  │
//! │  │  Elevator   │───►│   IoCore     │◄───│ Driver Registry │  │
//! │  │  panel      │    │  (layout,    │    │                 │  │
//! │  └─────────────┘    │   lifecycle) │    └─────────────────┘  │
//! │                     └──────┬───────┘                         │
//! │                            ▼                                 │
//! │                   ┌────────────────┐                         │
//! │                   │  IoDriver      │ simulation | comedi     │
//! │                   └────────────────┘                         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use elevio_common::config::IoConfig;
//! use elevio_common::elevator::channels::LIGHT_STOP;
//! use elevio_hal::{DriverRegistry, IoCore};
//!
//! let registry = DriverRegistry::with_builtin_drivers();
//! let mut core = IoCore::new(IoConfig::default(), &registry).unwrap();
//! core.init().unwrap();
//! core.set_bit(LIGHT_STOP).unwrap();
//! assert!(core.read_bit(LIGHT_STOP).unwrap());
//! ```

#![warn(missing_docs)]

pub mod clock;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod elevator;

// Re-export key types for convenience
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::{ChannelReading, IoCore, IoStats};
pub use crate::driver_registry::DriverRegistry;
pub use crate::elevator::{Elevator, ElevatorEvent, InputPoller};
