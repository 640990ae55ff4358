//! Driver errors

use rs30x_core::config::ConfigError;
use rs30x_core::motion::MotionError;
use rs30x_protocol::{PacketError, StatusError};

/// Errors returned by the servo driver
///
/// `E` is the error type of the serial writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServoError<E> {
    /// Writing to the serial port failed
    Serial(E),
    /// Another live servo already uses this id
    DuplicateRegistration { id: u8 },
    /// Every registry slot is taken
    RegistryFull,
    /// A status request for this id is still outstanding
    RequestPending { id: u8 },
    /// The servo did not answer within the response timeout
    NoResponse { id: u8 },
    /// A response arrived but is not a valid status block
    MalformedStatus(StatusError),
    /// A packet could not be encoded
    Packet(PacketError),
    /// The motion does not fit the playing group
    Motion(MotionError),
    /// The bus configuration is unusable
    Config(ConfigError),
    /// A servo handed to a player belongs to a different bus
    ForeignServo { id: u8 },
}

impl<E> From<PacketError> for ServoError<E> {
    fn from(e: PacketError) -> Self {
        Self::Packet(e)
    }
}

impl<E> From<StatusError> for ServoError<E> {
    fn from(e: StatusError) -> Self {
        Self::MalformedStatus(e)
    }
}

impl<E> From<MotionError> for ServoError<E> {
    fn from(e: MotionError) -> Self {
        Self::Motion(e)
    }
}

impl<E> From<ConfigError> for ServoError<E> {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
