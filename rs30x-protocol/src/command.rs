//! Single-servo commands
//!
//! Each [`CommandKind`] carries its fixed opcode (flags, address, length,
//! count) and the number of argument bytes that follow it. [`Command`] pairs
//! a kind with its argument values and encodes to a complete packet.

use crate::packet::{PacketBuf, PacketBuilder, PacketError};

/// Angle limit for single-servo commands (degrees)
pub const SINGLE_ANGLE_LIMIT_DEG: f32 = 150.0;

/// Angle limit for broadcast batch commands (degrees)
pub const BATCH_ANGLE_LIMIT_DEG: f32 = 180.0;

/// Protocol time unit in milliseconds
pub const TIME_UNIT_MS: u32 = 10;

/// Torque output mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TorqueMode {
    /// Output shaft free
    Off = 0,
    /// Holding torque
    On = 1,
    /// Brake mode (weak holding)
    Brake = 2,
}

impl From<bool> for TorqueMode {
    fn from(enable: bool) -> Self {
        if enable {
            TorqueMode::On
        } else {
            TorqueMode::Off
        }
    }
}

/// Compliance slope side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

/// Every single-servo command the driver can send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandKind {
    SetServoId,
    SetReturnDelay,
    SetComplianceSlopeCw,
    SetComplianceSlopeCcw,
    SetAngle,
    SetAngleInTime,
    SetMaxTorque,
    SetTorque,
    RequestStatus,
    Reboot,
    Flash,
}

impl CommandKind {
    /// Opcode bytes: flags, address, length, count
    pub const fn opcode(self) -> [u8; 4] {
        match self {
            CommandKind::SetServoId => [0x03, 0x04, 0x01, 0x01],
            CommandKind::SetReturnDelay => [0x03, 0x07, 0x01, 0x01],
            CommandKind::SetComplianceSlopeCw => [0x03, 0x1A, 0x01, 0x01],
            CommandKind::SetComplianceSlopeCcw => [0x03, 0x1B, 0x01, 0x01],
            CommandKind::SetAngle => [0x03, 0x1E, 0x02, 0x01],
            CommandKind::SetAngleInTime => [0x03, 0x1E, 0x04, 0x01],
            CommandKind::SetMaxTorque => [0x03, 0x23, 0x01, 0x01],
            CommandKind::SetTorque => [0x03, 0x24, 0x01, 0x01],
            // Flag 0x09: return memory map 42-59 after execution
            CommandKind::RequestStatus => [0x09, 0x00, 0x00, 0x01],
            CommandKind::Reboot => [0x20, 0xFF, 0x00, 0x00],
            CommandKind::Flash => [0x40, 0xFF, 0x00, 0x00],
        }
    }

    /// Number of argument bytes following the opcode
    pub const fn arity(self) -> usize {
        // LENGTH × COUNT
        let op = self.opcode();
        op[2] as usize * op[3] as usize
    }

    /// Whether the servo answers this command with a response packet
    pub const fn expects_reply(self) -> bool {
        matches!(self, CommandKind::RequestStatus)
    }
}

/// A single-servo command with its arguments
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Change the servo id (takes effect in RAM, persist with [`Command::Flash`])
    SetServoId(u8),
    /// Response delay (50µs + value × 100µs)
    SetReturnDelay(u8),
    /// Compliance slope for one side
    SetComplianceSlope { rotation: Rotation, slope: u8 },
    /// Move immediately; clamped to ±150°
    SetAngle { degrees: f32 },
    /// Move over `goal_ms`; clamped to ±150°
    SetAngleInTime { degrees: f32, goal_ms: u32 },
    /// Torque limit in percent
    SetMaxTorque(u8),
    /// Torque output mode
    SetTorque(TorqueMode),
    /// Read the present position/time/speed/current/temperature/voltage block
    RequestStatus,
    /// Restart the servo
    Reboot,
    /// Write RAM settings to ROM
    Flash,
}

impl Command {
    /// The kind of this command
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetServoId(_) => CommandKind::SetServoId,
            Command::SetReturnDelay(_) => CommandKind::SetReturnDelay,
            Command::SetComplianceSlope {
                rotation: Rotation::Clockwise,
                ..
            } => CommandKind::SetComplianceSlopeCw,
            Command::SetComplianceSlope {
                rotation: Rotation::CounterClockwise,
                ..
            } => CommandKind::SetComplianceSlopeCcw,
            Command::SetAngle { .. } => CommandKind::SetAngle,
            Command::SetAngleInTime { .. } => CommandKind::SetAngleInTime,
            Command::SetMaxTorque(_) => CommandKind::SetMaxTorque,
            Command::SetTorque(_) => CommandKind::SetTorque,
            Command::RequestStatus => CommandKind::RequestStatus,
            Command::Reboot => CommandKind::Reboot,
            Command::Flash => CommandKind::Flash,
        }
    }

    /// Argument bytes, left-aligned; only the first `kind().arity()` are used
    fn args(&self) -> [u8; 4] {
        match *self {
            Command::SetServoId(id) => [id, 0, 0, 0],
            Command::SetReturnDelay(delay) => [delay, 0, 0, 0],
            Command::SetComplianceSlope { slope, .. } => [slope, 0, 0, 0],
            Command::SetAngle { degrees } => {
                let [lo, hi] = single_angle_raw(degrees).to_le_bytes();
                [lo, hi, 0, 0]
            }
            Command::SetAngleInTime { degrees, goal_ms } => {
                let [a_lo, a_hi] = single_angle_raw(degrees).to_le_bytes();
                let [t_lo, t_hi] = goal_time_raw(goal_ms).to_le_bytes();
                [a_lo, a_hi, t_lo, t_hi]
            }
            Command::SetMaxTorque(percent) => [percent, 0, 0, 0],
            Command::SetTorque(mode) => [mode as u8, 0, 0, 0],
            Command::RequestStatus | Command::Reboot | Command::Flash => [0; 4],
        }
    }

    /// Encode into a complete packet addressed to `device_id`
    pub fn encode(&self, device_id: u8) -> Result<PacketBuf, PacketError> {
        let kind = self.kind();
        let args = self.args();

        let mut builder = PacketBuilder::command(device_id);
        builder.extend(&kind.opcode())?;
        builder.extend(&args[..kind.arity()])?;
        builder.finish()
    }
}

/// Clamp to ±150° and convert to tenths of a degree
pub fn single_angle_raw(degrees: f32) -> i16 {
    angle_raw(degrees, SINGLE_ANGLE_LIMIT_DEG)
}

/// Clamp to ±180° and convert to tenths of a degree
pub fn batch_angle_raw(degrees: f32) -> i16 {
    angle_raw(degrees, BATCH_ANGLE_LIMIT_DEG)
}

fn angle_raw(degrees: f32, limit: f32) -> i16 {
    // NaN casts to 0 (center)
    (degrees.clamp(-limit, limit) * 10.0) as i16
}

/// Convert a goal time in milliseconds to 10ms protocol units (saturating)
pub fn goal_time_raw(goal_ms: u32) -> u16 {
    (goal_ms / TIME_UNIT_MS).min(u16::MAX as u32) as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    const ALL_KINDS: [CommandKind; 11] = [
        CommandKind::SetServoId,
        CommandKind::SetReturnDelay,
        CommandKind::SetComplianceSlopeCw,
        CommandKind::SetComplianceSlopeCcw,
        CommandKind::SetAngle,
        CommandKind::SetAngleInTime,
        CommandKind::SetMaxTorque,
        CommandKind::SetTorque,
        CommandKind::RequestStatus,
        CommandKind::Reboot,
        CommandKind::Flash,
    ];

    #[test]
    fn test_arity_fits_argument_buffer() {
        for kind in ALL_KINDS {
            assert!(kind.arity() <= 4);
        }
        assert_eq!(CommandKind::SetAngleInTime.arity(), 4);
        assert_eq!(CommandKind::RequestStatus.arity(), 0);
    }

    #[test]
    fn test_only_status_expects_reply() {
        for kind in ALL_KINDS {
            assert_eq!(kind.expects_reply(), kind == CommandKind::RequestStatus);
        }
    }

    #[test]
    fn test_set_angle_encoding() {
        let packet = Command::SetAngle { degrees: 90.0 }.encode(1).unwrap();

        assert_eq!(
            &packet[..],
            &[0xFA, 0xAF, 0x01, 0x03, 0x1E, 0x02, 0x01, 0x84, 0x03, 0x98]
        );
    }

    #[test]
    fn test_set_angle_negative() {
        let packet = Command::SetAngle { degrees: -40.0 }.encode(2).unwrap();
        // -400 = 0xFE70
        assert_eq!(&packet[7..9], &[0x70, 0xFE]);
    }

    #[test]
    fn test_set_angle_clamp() {
        let high = Command::SetAngle { degrees: 999.0 }.encode(1).unwrap();
        let max = Command::SetAngle { degrees: 150.0 }.encode(1).unwrap();
        assert_eq!(high, max);

        let low = Command::SetAngle { degrees: -999.0 }.encode(1).unwrap();
        let min = Command::SetAngle { degrees: -150.0 }.encode(1).unwrap();
        assert_eq!(low, min);
    }

    #[test]
    fn test_set_angle_in_time_encoding() {
        let cmd = Command::SetAngleInTime {
            degrees: 120.0,
            goal_ms: 500,
        };
        let packet = cmd.encode(1).unwrap();

        assert_eq!(&packet[3..7], &[0x03, 0x1E, 0x04, 0x01]);
        assert_eq!(&packet[7..9], &1200i16.to_le_bytes());
        assert_eq!(&packet[9..11], &50u16.to_le_bytes());
        assert_eq!(packet.len(), 12);
        assert_eq!(packet[11], checksum(&packet[2..11]));
    }

    #[test]
    fn test_compliance_slope_selects_side() {
        let cw = Command::SetComplianceSlope {
            rotation: Rotation::Clockwise,
            slope: 0x24,
        };
        let ccw = Command::SetComplianceSlope {
            rotation: Rotation::CounterClockwise,
            slope: 0x24,
        };
        assert_eq!(cw.encode(2).unwrap()[4], 0x1A);
        assert_eq!(ccw.encode(2).unwrap()[4], 0x1B);
        assert_eq!(ccw.encode(2).unwrap()[7], 0x24);
    }

    #[test]
    fn test_torque_modes() {
        assert_eq!(TorqueMode::from(true), TorqueMode::On);
        assert_eq!(TorqueMode::from(false), TorqueMode::Off);

        let packet = Command::SetTorque(TorqueMode::Brake).encode(1).unwrap();
        assert_eq!(&packet[3..8], &[0x03, 0x24, 0x01, 0x01, 0x02]);
    }

    #[test]
    fn test_request_status_has_no_args() {
        let packet = Command::RequestStatus.encode(5).unwrap();
        assert_eq!(&packet[..], &[0xFA, 0xAF, 0x05, 0x09, 0x00, 0x00, 0x01, 0x0D]);
    }

    #[test]
    fn test_goal_time_conversion() {
        assert_eq!(goal_time_raw(0), 0);
        assert_eq!(goal_time_raw(1000), 100);
        assert_eq!(goal_time_raw(15), 1);
        assert_eq!(goal_time_raw(u32::MAX), u16::MAX);
    }

    #[test]
    fn test_angle_limits_differ() {
        assert_eq!(single_angle_raw(170.0), 1500);
        assert_eq!(batch_angle_raw(170.0), 1700);
        assert_eq!(batch_angle_raw(-500.0), -1800);
        assert_eq!(single_angle_raw(f32::NAN), 0);
    }
}
