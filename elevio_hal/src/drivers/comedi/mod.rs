//! Comedi DAQ card driver.
//!
//! Drives the elevator rig's card through libcomedi. Built only with the
//! `comedi` cargo feature, which links against the system library.

#[allow(non_camel_case_types, missing_docs)]
mod ffi;
mod driver;

pub use driver::ComediDriver;

use elevio_common::driver::IoDriver;

/// Factory function to create a comedi driver instance.
pub fn create_driver() -> Box<dyn IoDriver> {
    Box::new(ComediDriver::new())
}
