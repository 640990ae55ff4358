//! Async driver for Futaba RS30X serial servos
//!
//! Several servos share one half-duplex UART. This crate provides:
//! - [`ServoBus`]: serialized writes, response framing and routing
//! - [`Servo`]: per-id commands and status reads
//! - [`MotionPlayer`]: synchronized keyframe playback over broadcast packets
//!
//! The driver is generic over an [`embedded_io_async::Write`] transmitter and
//! an embassy [`RawMutex`](embassy_sync::blocking_mutex::raw::RawMutex). The
//! receive half is pumped separately, either with [`ServoBus::receive`] or by
//! calling [`ServoBus::on_readable`] from the firmware's UART task.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod log;

pub mod bus;
pub mod correlator;
pub mod error;
pub mod player;
pub mod servo;

pub use bus::ServoBus;
pub use correlator::{Delivery, Registration, RegistryError, MAX_SERVOS};
pub use error::ServoError;
pub use player::{MotionPlayer, Playback};
pub use servo::Servo;

pub use rs30x_core::config::BusConfig;
pub use rs30x_core::motion::Motion;
pub use rs30x_protocol::{Rotation, Status, TorqueMode};
