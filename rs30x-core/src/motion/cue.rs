//! Cue planner
//!
//! Walks a [`Motion`] cue by cue and decides, for every track, whether it
//! receives a new target at that cue. Each track keeps its own cursor and the
//! time of its last command, so tracks with different sparsity stay locked to
//! the same global cue clock.
//!
//! At cue `i` (offset `t_i`) a track scans forward from its cursor to its next
//! defined keyframe. If that keyframe sits at cue `i` the track contributes
//! `(angle, goal = t_i - last_command)` and its cursor moves past `i`; a
//! keyframe further ahead is held until its own cue.

use heapless::Vec;

use super::keyframes::{Motion, MotionError, MAX_TRACKS};

/// One track's target at a cue
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CueTarget {
    /// Track index (position of the servo in the playing group)
    pub track: usize,
    /// Target angle in degrees
    pub degrees: f32,
    /// Time to reach the target, measured from the track's previous command
    pub goal_ms: u32,
}

/// Everything that happens at one cue point
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CueStep {
    /// Cue index
    pub index: usize,
    /// Offset from the start of the motion
    pub offset_ms: u32,
    /// Wait since the previous cue
    pub delay_ms: u32,
    /// Tracks receiving a target at this cue (may be empty)
    pub targets: Vec<CueTarget, MAX_TRACKS>,
}

/// Iterator over the cue steps of a motion
#[derive(Debug, Clone)]
pub struct CuePlanner<'a> {
    motion: Motion<'a>,
    next_cue: usize,
    /// Per-track index of the first keyframe not yet consumed
    cursors: Vec<usize, MAX_TRACKS>,
    /// Per-track offset of the last command sent
    last_command_ms: Vec<u32, MAX_TRACKS>,
    previous_offset_ms: u32,
}

impl<'a> CuePlanner<'a> {
    /// Create a planner for a validated motion
    pub fn new(motion: Motion<'a>) -> Result<Self, MotionError> {
        motion.validate()?;

        let mut cursors = Vec::new();
        let mut last_command_ms = Vec::new();
        for _ in 0..motion.tracks() {
            // Track count was checked against MAX_TRACKS
            let _ = cursors.push(0);
            let _ = last_command_ms.push(0);
        }

        Ok(Self {
            motion,
            next_cue: 0,
            cursors,
            last_command_ms,
            previous_offset_ms: 0,
        })
    }

    /// Number of cue steps left
    pub fn remaining(&self) -> usize {
        self.motion.cue_points.len() - self.next_cue
    }

    /// Decide whether `track` contributes at `cue`
    fn target_for(&mut self, track: usize, cue: usize, offset_ms: u32) -> Option<CueTarget> {
        let frames = self.motion.key_frames[track];
        let cursor = self.cursors[track];

        let next = frames[cursor..]
            .iter()
            .position(Option::is_some)
            .map(|i| cursor + i);

        match next {
            Some(k) if k == cue => {
                let degrees = frames[k]?;
                let goal_ms = offset_ms.saturating_sub(self.last_command_ms[track]);
                self.last_command_ms[track] = offset_ms;
                self.cursors[track] = k + 1;
                Some(CueTarget {
                    track,
                    degrees,
                    goal_ms,
                })
            }
            Some(k) => {
                // Hold until cue k, skipping the empty cues already scanned
                self.cursors[track] = k;
                None
            }
            None => {
                self.cursors[track] = frames.len();
                None
            }
        }
    }
}

impl<'a> Iterator for CuePlanner<'a> {
    type Item = CueStep;

    fn next(&mut self) -> Option<Self::Item> {
        let cue = self.next_cue;
        if cue >= self.motion.cue_points.len() {
            return None;
        }
        self.next_cue += 1;

        let offset_ms = self.motion.offset_ms(cue);
        let delay_ms = offset_ms.saturating_sub(self.previous_offset_ms);
        self.previous_offset_ms = offset_ms;

        let mut targets = Vec::new();
        for track in 0..self.motion.tracks() {
            if let Some(target) = self.target_for(track, cue, offset_ms) {
                // At most one target per track
                let _ = targets.push(target);
            }
        }

        Some(CueStep {
            index: cue,
            offset_ms,
            delay_ms,
            targets,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining(), Some(self.remaining()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn target(track: usize, degrees: f32, goal_ms: u32) -> CueTarget {
        CueTarget {
            track,
            degrees,
            goal_ms,
        }
    }

    #[test]
    fn test_two_track_sequence() {
        let a: &[Option<f32>] = &[Some(10.0), None, Some(30.0)];
        let b: &[Option<f32>] = &[None, Some(20.0), None];
        let tracks = [a, b];
        let motion = Motion::new(1000, &[0.0, 0.5, 1.0], &tracks);

        let steps: std::vec::Vec<CueStep> = CuePlanner::new(motion).unwrap().collect();
        assert_eq!(steps.len(), 3);

        assert_eq!(steps[0].offset_ms, 0);
        assert_eq!(&steps[0].targets[..], &[target(0, 10.0, 0)]);

        assert_eq!(steps[1].offset_ms, 500);
        assert_eq!(steps[1].delay_ms, 500);
        assert_eq!(&steps[1].targets[..], &[target(1, 20.0, 500)]);

        assert_eq!(steps[2].offset_ms, 1000);
        assert_eq!(steps[2].delay_ms, 500);
        assert_eq!(&steps[2].targets[..], &[target(0, 30.0, 1000)]);
    }

    #[test]
    fn test_dense_tracks_share_cues() {
        let pan: &[Option<f32>] = &[None, None, Some(20.0), None, None, Some(140.0)];
        let tilt: &[Option<f32>] = &[None, Some(20.0), Some(40.0), Some(60.0), Some(80.0), Some(100.0)];
        let tracks = [pan, tilt];
        let motion = Motion::new(2000, &[0.0, 0.1, 0.2, 0.3, 0.5, 1.0], &tracks);

        let steps: std::vec::Vec<CueStep> = CuePlanner::new(motion).unwrap().collect();
        let offsets: std::vec::Vec<u32> = steps.iter().map(|s| s.offset_ms).collect();
        assert_eq!(offsets, [0, 200, 400, 600, 1000, 2000]);

        assert!(steps[0].targets.is_empty());
        assert_eq!(&steps[1].targets[..], &[target(1, 20.0, 200)]);
        assert_eq!(
            &steps[2].targets[..],
            &[target(0, 20.0, 400), target(1, 40.0, 200)]
        );
        assert_eq!(&steps[3].targets[..], &[target(1, 60.0, 200)]);
        assert_eq!(&steps[4].targets[..], &[target(1, 80.0, 400)]);
        assert_eq!(
            &steps[5].targets[..],
            &[target(0, 140.0, 1600), target(1, 100.0, 1000)]
        );
    }

    #[test]
    fn test_all_empty_track_never_contributes() {
        let silent: &[Option<f32>] = &[None, None];
        let tracks = [silent];
        let motion = Motion::new(100, &[0.0, 1.0], &tracks);

        let planner = CuePlanner::new(motion).unwrap();
        assert_eq!(planner.size_hint(), (2, Some(2)));
        for step in planner {
            assert!(step.targets.is_empty());
        }
    }

    #[test]
    fn test_repeated_cue_point() {
        let a: &[Option<f32>] = &[Some(0.0), Some(5.0)];
        let tracks = [a];
        let motion = Motion::new(1000, &[0.5, 0.5], &tracks);

        let steps: std::vec::Vec<CueStep> = CuePlanner::new(motion).unwrap().collect();
        assert_eq!(steps[0].delay_ms, 500);
        assert_eq!(steps[1].delay_ms, 0);
        assert_eq!(&steps[1].targets[..], &[target(0, 5.0, 0)]);
    }

    #[test]
    fn test_invalid_motion_rejected() {
        let a: &[Option<f32>] = &[Some(0.0)];
        let tracks = [a];
        let motion = Motion::new(1000, &[0.0, 1.0], &tracks);
        assert!(CuePlanner::new(motion).is_err());
    }

    #[test]
    fn test_empty_motion() {
        let motion = Motion::new(1000, &[], &[]);
        assert_eq!(CuePlanner::new(motion).unwrap().count(), 0);
    }

    fn single_track() -> impl Strategy<Value = (std::vec::Vec<f32>, std::vec::Vec<Option<f32>>)> {
        (1usize..12).prop_flat_map(|n| {
            (
                proptest::collection::vec(0.0f32..=1.0, n),
                proptest::collection::vec(proptest::option::of(-180.0f32..180.0), n),
            )
        })
    }

    proptest! {
        #[test]
        fn test_every_keyframe_played_once((mut cues, frames) in single_track()) {
            cues.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let track: &[Option<f32>] = &frames;
            let tracks = [track];
            let motion = Motion::new(1000, &cues, &tracks);

            let targets: std::vec::Vec<CueTarget> = CuePlanner::new(motion)
                .unwrap()
                .flat_map(|step| step.targets.into_iter())
                .collect();

            let expected: std::vec::Vec<f32> = frames.iter().flatten().copied().collect();
            let played: std::vec::Vec<f32> = targets.iter().map(|t| t.degrees).collect();
            prop_assert_eq!(played, expected);

            // Goals chain back to the start of the motion
            let last = frames.iter().rposition(Option::is_some);
            let total: u32 = targets.iter().map(|t| t.goal_ms).sum();
            prop_assert_eq!(total, last.map_or(0, |i| motion.offset_ms(i)));
        }
    }
}
