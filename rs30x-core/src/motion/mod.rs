//! Keyframe motion
//!
//! Sparse multi-track keyframe motions and the planner that turns them into
//! per-cue batches of timed targets.

pub mod cue;
pub mod keyframes;

pub use cue::{CuePlanner, CueStep, CueTarget};
pub use keyframes::{Motion, MotionError, MAX_TRACKS};
