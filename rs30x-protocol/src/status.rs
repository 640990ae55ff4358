//! Status response decoding
//!
//! A REQUEST_STATUS command makes the servo return its memory map from
//! address 42 onwards. All fields are little-endian:
//!
//! | Offset | Field       | Type | Unit          |
//! |--------|-------------|------|---------------|
//! | 0      | angle       | i16  | 0.1°          |
//! | 2      | time        | u16  | 10 ms         |
//! | 4      | speed       | i16  | °/s           |
//! | 6      | current     | u16  | mA            |
//! | 8      | temperature | u16  | °C            |
//! | 10     | voltage     | u16  | 10 mV         |
//! | 12..18 | reserved    |      |               |

/// Minimum payload length of a status response
pub const STATUS_PAYLOAD_LEN: usize = 18;

/// Memory map address the status block starts at
pub const STATUS_ADDRESS: u8 = 42;

/// Status decode errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusError {
    /// Payload shorter than [`STATUS_PAYLOAD_LEN`]
    TooShort { len: usize },
}

/// Present servo state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// Present angle in 0.1° units
    pub angle: i16,
    /// Elapsed move time in 10ms units
    pub time: u16,
    /// Present speed
    pub speed: i16,
    /// Load current in mA
    pub current: u16,
    /// Temperature in °C
    pub temperature: u16,
    /// Supply voltage in 10mV units
    pub voltage: u16,
}

impl Status {
    /// Decode from a status response payload
    pub fn decode(payload: &[u8]) -> Result<Self, StatusError> {
        if payload.len() < STATUS_PAYLOAD_LEN {
            return Err(StatusError::TooShort { len: payload.len() });
        }
        let u16_at = |i: usize| u16::from_le_bytes([payload[i], payload[i + 1]]);
        let i16_at = |i: usize| i16::from_le_bytes([payload[i], payload[i + 1]]);

        Ok(Self {
            angle: i16_at(0),
            time: u16_at(2),
            speed: i16_at(4),
            current: u16_at(6),
            temperature: u16_at(8),
            voltage: u16_at(10),
        })
    }

    /// Present angle in degrees
    pub fn angle_degrees(&self) -> f32 {
        self.angle as f32 / 10.0
    }

    /// Elapsed move time in milliseconds
    pub fn time_ms(&self) -> u32 {
        self.time as u32 * 10
    }

    /// Supply voltage in millivolts
    pub fn voltage_mv(&self) -> u32 {
        self.voltage as u32 * 10
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [u8; 18] = [
        0x90, 0x01, // angle 400
        0x0A, 0x00, // time 10
        0x00, 0x00, // speed 0
        0x64, 0x00, // current 100
        0x1E, 0x00, // temperature 30
        0x78, 0x00, // voltage 120
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    ];

    #[test]
    fn test_decode_sample() {
        let status = Status::decode(&SAMPLE).unwrap();

        assert_eq!(status.angle_degrees(), 40.0);
        assert_eq!(status.time_ms(), 100);
        assert_eq!(status.speed, 0);
        assert_eq!(status.current, 100);
        assert_eq!(status.temperature, 30);
        assert_eq!(status.voltage_mv(), 1200);
    }

    #[test]
    fn test_decode_negative_angle() {
        let mut payload = SAMPLE;
        // -400 = 0xFE70
        payload[0] = 0x70;
        payload[1] = 0xFE;
        let status = Status::decode(&payload).unwrap();
        assert_eq!(status.angle, -400);
        assert_eq!(status.angle_degrees(), -40.0);
    }

    #[test]
    fn test_decode_wraparound_boundary() {
        let mut payload = SAMPLE;
        payload[0] = 0xFF;
        payload[1] = 0x7F;
        assert_eq!(Status::decode(&payload).unwrap().angle, i16::MAX);

        payload[0] = 0x00;
        payload[1] = 0x80;
        assert_eq!(Status::decode(&payload).unwrap().angle, i16::MIN);
    }

    #[test]
    fn test_decode_longer_payload() {
        let mut payload = [0u8; 24];
        payload[..18].copy_from_slice(&SAMPLE);
        assert!(Status::decode(&payload).is_ok());
    }

    #[test]
    fn test_decode_too_short() {
        assert_eq!(
            Status::decode(&SAMPLE[..17]),
            Err(StatusError::TooShort { len: 17 })
        );
        assert_eq!(Status::decode(&[]), Err(StatusError::TooShort { len: 0 }));
    }
}
