//! Configuration types
//!
//! Board-agnostic bus settings. With the `serde` feature they can be loaded
//! from the firmware's TOML machine config.

pub mod bus;

pub use bus::*;
