//! Broadcast multi-servo commands
//!
//! Sent to the broadcast id with opcode `00 1E LEN COUNT`, where LEN is the
//! per-servo block size (id included) and COUNT the number of servos. No
//! servo answers a broadcast packet.

use crate::command::{batch_angle_raw, goal_time_raw};
use crate::packet::{PacketBuf, PacketBuilder, PacketError, BROADCAST_ID};

/// Most entries one batch packet carries (servo ids 1-31)
pub const MAX_BATCH_ENTRIES: usize = 31;

/// Opcode prefix for SET_ANGLES: flags, address, block length
const SET_ANGLES: [u8; 3] = [0x00, 0x1E, 0x03];

/// Opcode prefix for SET_ANGLES_IN_TIME: flags, address, block length
const SET_ANGLES_IN_TIME: [u8; 3] = [0x00, 0x1E, 0x05];

/// One servo's target inside a batch
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatchEntry {
    /// Target servo id
    pub id: u8,
    /// Target angle in degrees (clamped to ±180°)
    pub degrees: f32,
    /// Time to reach the target in milliseconds
    pub goal_ms: u32,
}

fn start_batch(prefix: &[u8; 3], count: usize) -> Result<PacketBuilder, PacketError> {
    if count > MAX_BATCH_ENTRIES {
        return Err(PacketError::TooManyEntries);
    }
    let mut builder = PacketBuilder::command(BROADCAST_ID);
    builder.extend(prefix)?;
    builder.push(count as u8)?;
    Ok(builder)
}

/// Encode a SET_ANGLES_IN_TIME broadcast packet
///
/// Each entry becomes `[id, angle_lo, angle_hi, time_lo, time_hi]`.
pub fn encode_angles_in_time(entries: &[BatchEntry]) -> Result<PacketBuf, PacketError> {
    let mut builder = start_batch(&SET_ANGLES_IN_TIME, entries.len())?;
    for entry in entries {
        builder.push(entry.id)?;
        builder.extend(&batch_angle_raw(entry.degrees).to_le_bytes())?;
        builder.extend(&goal_time_raw(entry.goal_ms).to_le_bytes())?;
    }
    builder.finish()
}

/// Encode a SET_ANGLES broadcast packet (immediate moves)
///
/// Each `(id, degrees)` pair becomes `[id, angle_lo, angle_hi]`.
pub fn encode_angles(targets: &[(u8, f32)]) -> Result<PacketBuf, PacketError> {
    let mut builder = start_batch(&SET_ANGLES, targets.len())?;
    for &(id, degrees) in targets {
        builder.push(id)?;
        builder.extend(&batch_angle_raw(degrees).to_le_bytes())?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::checksum;

    #[test]
    fn test_angles_in_time_layout() {
        let entries = [
            BatchEntry {
                id: 1,
                degrees: 10.0,
                goal_ms: 0,
            },
            BatchEntry {
                id: 2,
                degrees: -20.0,
                goal_ms: 500,
            },
        ];
        let packet = encode_angles_in_time(&entries).unwrap();

        assert_eq!(&packet[..7], &[0xFA, 0xAF, 0x00, 0x00, 0x1E, 0x05, 0x02]);
        assert_eq!(&packet[7..12], &[0x01, 0x64, 0x00, 0x00, 0x00]);
        assert_eq!(&packet[12..17], &[0x02, 0x38, 0xFF, 0x32, 0x00]);
        assert_eq!(packet.len(), 18);
        assert_eq!(packet[17], checksum(&packet[2..17]));
    }

    #[test]
    fn test_batch_clamps_to_180() {
        let wide = encode_angles_in_time(&[BatchEntry {
            id: 1,
            degrees: 170.0,
            goal_ms: 0,
        }])
        .unwrap();
        assert_eq!(&wide[8..10], &1700i16.to_le_bytes());

        let clamped = encode_angles_in_time(&[BatchEntry {
            id: 1,
            degrees: 400.0,
            goal_ms: 0,
        }])
        .unwrap();
        assert_eq!(&clamped[8..10], &1800i16.to_le_bytes());
    }

    #[test]
    fn test_angles_layout() {
        let packet = encode_angles(&[(3, 45.0)]).unwrap();
        assert_eq!(&packet[3..7], &[0x00, 0x1E, 0x03, 0x01]);
        assert_eq!(&packet[7..10], &[0x03, 0xC2, 0x01]);
        assert_eq!(packet.len(), 11);
    }

    #[test]
    fn test_empty_batch() {
        let packet = encode_angles_in_time(&[]).unwrap();
        assert_eq!(packet[6], 0);
        assert_eq!(packet.len(), 8);
    }

    #[test]
    fn test_full_batch_fits() {
        let mut entries = [BatchEntry {
            id: 0,
            degrees: 0.0,
            goal_ms: 0,
        }; MAX_BATCH_ENTRIES];
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.id = i as u8 + 1;
        }
        let packet = encode_angles_in_time(&entries).unwrap();
        assert_eq!(packet.len(), 7 + 5 * MAX_BATCH_ENTRIES + 1);
    }

    #[test]
    fn test_too_many_entries() {
        let entries = [BatchEntry {
            id: 1,
            degrees: 0.0,
            goal_ms: 0,
        }; MAX_BATCH_ENTRIES + 1];
        assert_eq!(
            encode_angles_in_time(&entries),
            Err(PacketError::TooManyEntries)
        );
    }
}
