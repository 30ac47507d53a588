//! Simulation driver module.
//!
//! Software replacement for the elevator rig, for development and testing
//! without a DAQ card. Outputs read back as written, buttons are pressed
//! through a [`SimulationHandle`], and a shaft model drives the floor
//! sensors from the motor outputs.

mod driver;
mod io;
mod physics;

pub use driver::{SimulationDriver, SimulationHandle};
pub use io::IoImage;
pub use physics::{Motion, ShaftFault, ShaftSimulator};

use elevio_common::driver::IoDriver;

/// Factory function to create a simulation driver instance.
pub fn create_driver() -> Box<dyn IoDriver> {
    Box::new(SimulationDriver::new())
}
