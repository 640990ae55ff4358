//! Keyframe motion playback
//!
//! A [`MotionPlayer`] drives a fixed group of servos through a [`Motion`].
//! Each cue is timed against the absolute start of the motion, so write
//! latency never accumulates into drift. At every cue the servos that have a
//! keyframe there are moved together with one broadcast SET_ANGLES_IN_TIME
//! packet; cues where nobody moves write nothing.

use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::{NoopRawMutex, RawMutex};
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::Write;
use heapless::Vec;

use rs30x_core::motion::{CuePlanner, Motion, MotionError, MAX_TRACKS};
use rs30x_protocol::{encode_angles_in_time, BatchEntry};

use crate::bus::ServoBus;
use crate::error::ServoError;
use crate::servo::Servo;

/// How a playback ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Playback {
    /// Every cue was played
    Completed,
    /// Stopped by the cancel signal
    Cancelled,
}

/// Plays motions on a fixed group of servos
///
/// The player borrows its servos, so none of them can be dropped or re-flashed
/// to another id while it exists:
///
/// ```compile_fail
/// # use embassy_sync::blocking_mutex::raw::NoopRawMutex;
/// # use rs30x_driver::{BusConfig, MotionPlayer, Servo, ServoBus};
/// # fn group<T: embedded_io_async::Write>(tx: T) {
/// let bus = ServoBus::<NoopRawMutex, T>::new(tx, BusConfig::default()).ok().unwrap();
/// let pan = Servo::new(&bus, 1).ok().unwrap();
/// let player = MotionPlayer::new(&bus, &[&pan]).ok().unwrap();
/// drop(pan);
/// let _ = player.ids().count();
/// # }
/// ```
pub struct MotionPlayer<'s, 'a, M: RawMutex, T: Write> {
    bus: &'a ServoBus<M, T>,
    /// One servo per track, in group order
    servos: Vec<&'s Servo<'a, M, T>, MAX_TRACKS>,
}

impl<'s, 'a, M: RawMutex, T: Write> MotionPlayer<'s, 'a, M, T> {
    /// Create a player for `servos`; track `i` of a motion drives `servos[i]`
    pub fn new(
        bus: &'a ServoBus<M, T>,
        servos: &[&'s Servo<'a, M, T>],
    ) -> Result<Self, ServoError<T::Error>> {
        let mut group = Vec::new();
        for &servo in servos {
            if !core::ptr::eq(servo.bus(), bus) {
                return Err(ServoError::ForeignServo { id: servo.id() });
            }
            group.push(servo).map_err(|_| MotionError::TooManyTracks {
                tracks: servos.len(),
            })?;
        }
        Ok(Self { bus, servos: group })
    }

    /// Device ids of the group, in track order
    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.servos.iter().map(|servo| servo.id())
    }

    /// Play `motion` to the end
    ///
    /// The motion must have exactly one track per servo. It is checked before
    /// anything is written.
    pub async fn play(&self, motion: &Motion<'_>) -> Result<(), ServoError<T::Error>> {
        self.run::<NoopRawMutex>(motion, None).await.map(|_| ())
    }

    /// Play `motion` until it ends or `cancel` is signaled
    ///
    /// Cancellation is only observed while waiting for the next cue, so a
    /// batch packet that has started is always written in full. Servos keep
    /// whatever target they were last sent.
    pub async fn play_until<C: RawMutex>(
        &self,
        motion: &Motion<'_>,
        cancel: &Signal<C, ()>,
    ) -> Result<Playback, ServoError<T::Error>> {
        self.run(motion, Some(cancel)).await
    }

    async fn run<C: RawMutex>(
        &self,
        motion: &Motion<'_>,
        cancel: Option<&Signal<C, ()>>,
    ) -> Result<Playback, ServoError<T::Error>> {
        motion.validate_for(self.servos.len())?;
        let planner = CuePlanner::new(*motion)?;
        log_info!(
            "playing motion: {} cues over {}ms",
            motion.cue_points.len(),
            motion.duration_ms
        );

        let start = Instant::now();
        for step in planner {
            let due = Timer::at(start + Duration::from_millis(step.offset_ms as u64));
            match cancel {
                Some(cancel) => {
                    if let Either::Second(()) = select(due, cancel.wait()).await {
                        log_info!("motion cancelled before cue {}", step.index);
                        return Ok(Playback::Cancelled);
                    }
                }
                None => due.await,
            }
            if step.targets.is_empty() {
                continue;
            }

            let mut entries: Vec<BatchEntry, MAX_TRACKS> = Vec::new();
            for target in &step.targets {
                // One target per track at most
                let _ = entries.push(BatchEntry {
                    id: self.servos[target.track].id(),
                    degrees: target.degrees,
                    goal_ms: target.goal_ms,
                });
            }
            let packet = encode_angles_in_time(&entries)?;
            self.bus.write(&packet).await?;
            log_debug!(
                "cue {} at {}ms: moved {} servos",
                step.index,
                step.offset_ms,
                entries.len()
            );
        }
        Ok(Playback::Completed)
    }
}
