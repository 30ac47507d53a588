//! I/O driver implementations.
//!
//! - [`simulation`] - Software simulation of the elevator rig
//! - `comedi` - Comedi DAQ card backend (cargo feature `comedi`)
//!
//! Each driver exposes a `create_driver()` factory that
//! [`DriverRegistry`](crate::driver_registry::DriverRegistry) lists under
//! the driver's config name.

#[cfg(feature = "comedi")]
pub mod comedi;
pub mod simulation;
