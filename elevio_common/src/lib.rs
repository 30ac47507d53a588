//! ELEVIO Common Library
//!
//! This crate provides the shared vocabulary of the ELEVIO workspace:
//! channel identifiers, the port layout that decides which channels exist,
//! the `IoDriver` trait implemented by every backend, and TOML
//! configuration loading.
//!
//! # Module Structure
//!
//! - [`channel`] - `Channel`, ports and the `ChannelLayout`
//! - [`driver`] - `IoDriver` trait and `IoError`
//! - [`config`] - Configuration loading traits and types
//! - [`elevator`] - Channel map of the elevator rig
//! - [`orders`] - Order book, stop and direction decisions, cost dispatch
//! - [`consts`] - Workspace-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use elevio_common::prelude::*;
//!
//! let layout = ChannelLayout::elevator_rig();
//! let stop_lamp: Channel = "LIGHT_STOP".parse().unwrap();
//! assert!(layout.resolve(stop_lamp, Access::WriteBit).is_ok());
//! ```

pub mod channel;
pub mod config;
pub mod consts;
pub mod driver;
pub mod elevator;
pub mod orders;
pub mod prelude;
