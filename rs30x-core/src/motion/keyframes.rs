//! Sparse keyframe motions
//!
//! A motion is a list of cue points, each a fraction of the total duration,
//! and one keyframe track per servo. Track entries line up with the cue
//! points; `None` means the servo holds through that cue.

use rs30x_protocol::MAX_BATCH_ENTRIES;

/// Maximum tracks (servos) per motion, bounded by one batch packet
pub const MAX_TRACKS: usize = MAX_BATCH_ENTRIES;

/// Motion validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotionError {
    /// More tracks than fit in a batch packet
    TooManyTracks { tracks: usize },
    /// Track count differs from the number of servos playing it
    TrackCountMismatch { expected: usize, found: usize },
    /// A track's length differs from the number of cue points
    TrackLengthMismatch { track: usize, found: usize },
    /// Cue point outside [0, 1]
    CueOutOfRange { cue: usize },
    /// Cue point earlier than its predecessor
    CueNotOrdered { cue: usize },
}

/// A multi-track keyframe motion
#[derive(Debug, Clone, Copy)]
pub struct Motion<'a> {
    /// Total duration in milliseconds
    pub duration_ms: u32,
    /// Cue points as fractions of the duration, non-decreasing, in [0, 1]
    pub cue_points: &'a [f32],
    /// One track per servo, each aligned to `cue_points`
    pub key_frames: &'a [&'a [Option<f32>]],
}

impl<'a> Motion<'a> {
    /// Create a motion
    pub const fn new(
        duration_ms: u32,
        cue_points: &'a [f32],
        key_frames: &'a [&'a [Option<f32>]],
    ) -> Self {
        Self {
            duration_ms,
            cue_points,
            key_frames,
        }
    }

    /// Number of keyframe tracks
    pub fn tracks(&self) -> usize {
        self.key_frames.len()
    }

    /// Check track shapes and cue ordering
    pub fn validate(&self) -> Result<(), MotionError> {
        if self.key_frames.len() > MAX_TRACKS {
            return Err(MotionError::TooManyTracks {
                tracks: self.key_frames.len(),
            });
        }
        for (track, frames) in self.key_frames.iter().enumerate() {
            if frames.len() != self.cue_points.len() {
                return Err(MotionError::TrackLengthMismatch {
                    track,
                    found: frames.len(),
                });
            }
        }

        let mut previous = 0.0f32;
        for (cue, &point) in self.cue_points.iter().enumerate() {
            // NaN fails the range check
            if !(0.0..=1.0).contains(&point) {
                return Err(MotionError::CueOutOfRange { cue });
            }
            if point < previous {
                return Err(MotionError::CueNotOrdered { cue });
            }
            previous = point;
        }
        Ok(())
    }

    /// Check the motion fits a group of `servos` servos
    pub fn validate_for(&self, servos: usize) -> Result<(), MotionError> {
        if self.key_frames.len() != servos {
            return Err(MotionError::TrackCountMismatch {
                expected: servos,
                found: self.key_frames.len(),
            });
        }
        self.validate()
    }

    /// Wall-clock offset of a cue point from the start of the motion
    pub fn offset_ms(&self, cue: usize) -> u32 {
        let fraction = self.cue_points.get(cue).copied().unwrap_or(1.0);
        // Non-negative after validation, round to the nearest millisecond
        (fraction * self.duration_ms as f32 + 0.5) as u32
    }
}
