//! Physics simulation modules.
//!
//! - [`shaft`] - Elevator cab travel and floor sensors

pub mod shaft;

pub use shaft::{Motion, ShaftFault, ShaftSimulator};
