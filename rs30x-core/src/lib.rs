//! Board-agnostic core logic for RS30X servo buses
//!
//! This crate contains the logic that does not touch the serial port or the
//! clock:
//!
//! - Bus configuration types
//! - Keyframe motion model
//! - Cue planner (sparse keyframe tracks → timed batch targets)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod motion;
