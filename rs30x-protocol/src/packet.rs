//! Packet layout and construction
//!
//! Every packet shares the same skeleton:
//! - HEADER (2 bytes): `FA AF` for commands, `FD DF` for responses
//! - ID (1 byte): device id, 0 is the broadcast address
//! - FLAGS, ADDRESS, LENGTH, COUNT (1 byte each): the opcode
//! - DATA (LENGTH × COUNT bytes, broadcast packets add one id per entry)
//! - CHECKSUM (1 byte): XOR of ID through the last data byte

use heapless::Vec;

use crate::checksum::checksum;

/// Command packet header
pub const COMMAND_HEADER: [u8; 2] = [0xFA, 0xAF];

/// Response packet header
pub const RESPONSE_HEADER: [u8; 2] = [0xFD, 0xDF];

/// Broadcast device id (used by multi-servo packets)
pub const BROADCAST_ID: u8 = 0;

/// Bytes before the data section (header + id + flags + address + length)
pub const HEADER_LEN: usize = 6;

/// Offset of the first data byte (after COUNT)
pub const DATA_OFFSET: usize = 7;

/// Receive buffer capacity
pub const RX_BUFFER_SIZE: usize = 64;

/// Largest data section a received packet can carry
pub const MAX_PAYLOAD_SIZE: usize = RX_BUFFER_SIZE - DATA_OFFSET - 1;

/// Largest packet we ever transmit (a full 31-servo batch fits)
pub const MAX_PACKET_SIZE: usize = 192;

/// An encoded packet ready for the wire
pub type PacketBuf = Vec<u8, MAX_PACKET_SIZE>;

/// Data section of a received packet
pub type Payload = Vec<u8, MAX_PAYLOAD_SIZE>;

/// Errors that can occur while building a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Packet does not fit in [`MAX_PACKET_SIZE`]
    TooLong,
    /// Broadcast packet has more entries than fit in one packet
    TooManyEntries,
}

/// Packet direction, identified by the 2-byte header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    /// Host → servo (also seen as the transceiver echo)
    Command,
    /// Servo → host
    Response,
}

impl PacketType {
    /// Header bytes for this packet type
    pub const fn header(self) -> [u8; 2] {
        match self {
            PacketType::Command => COMMAND_HEADER,
            PacketType::Response => RESPONSE_HEADER,
        }
    }

    /// Identify a packet type from its first two bytes
    pub fn from_header(first: u8, second: u8) -> Option<Self> {
        match [first, second] {
            COMMAND_HEADER => Some(PacketType::Command),
            RESPONSE_HEADER => Some(PacketType::Response),
            _ => None,
        }
    }
}

/// Incremental packet writer
///
/// Writes the header and id up front; [`PacketBuilder::finish`] appends the
/// checksum over everything after the header.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    buf: PacketBuf,
}

impl PacketBuilder {
    /// Start a command packet addressed to `device_id`
    pub fn command(device_id: u8) -> Self {
        Self::with_type(PacketType::Command, device_id)
    }

    /// Start a packet of the given type
    pub fn with_type(packet_type: PacketType, device_id: u8) -> Self {
        let mut buf = PacketBuf::new();
        // Capacity is far above three bytes
        let _ = buf.extend_from_slice(&packet_type.header());
        let _ = buf.push(device_id);
        Self { buf }
    }

    /// Append one byte
    pub fn push(&mut self, byte: u8) -> Result<&mut Self, PacketError> {
        self.buf.push(byte).map_err(|_| PacketError::TooLong)?;
        Ok(self)
    }

    /// Append a run of bytes
    pub fn extend(&mut self, bytes: &[u8]) -> Result<&mut Self, PacketError> {
        self.buf
            .extend_from_slice(bytes)
            .map_err(|_| PacketError::TooLong)?;
        Ok(self)
    }

    /// Append the checksum and return the finished packet
    pub fn finish(mut self) -> Result<PacketBuf, PacketError> {
        let sum = checksum(&self.buf[2..]);
        self.buf.push(sum).map_err(|_| PacketError::TooLong)?;
        Ok(self.buf)
    }
}

/// Encode a servo response packet (for testing or bus simulation)
///
/// Uses the layout a servo answers a memory read with: flags 0, the
/// start address, LENGTH = data length and COUNT = 1.
pub fn encode_response(device_id: u8, address: u8, data: &[u8]) -> Result<PacketBuf, PacketError> {
    if data.len() > MAX_PAYLOAD_SIZE {
        return Err(PacketError::TooLong);
    }
    let mut builder = PacketBuilder::with_type(PacketType::Response, device_id);
    builder.extend(&[0x00, address, data.len() as u8, 0x01])?;
    builder.extend(data)?;
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup() {
        assert_eq!(PacketType::from_header(0xFA, 0xAF), Some(PacketType::Command));
        assert_eq!(PacketType::from_header(0xFD, 0xDF), Some(PacketType::Response));
        assert_eq!(PacketType::from_header(0xAF, 0xFA), None);
        assert_eq!(PacketType::Response.header(), RESPONSE_HEADER);
    }

    #[test]
    fn test_builder_appends_checksum() {
        let mut builder = PacketBuilder::command(0x01);
        builder.extend(&[0x20, 0xFF, 0x00, 0x00]).unwrap();
        let packet = builder.finish().unwrap();

        assert_eq!(&packet[..], &[0xFA, 0xAF, 0x01, 0x20, 0xFF, 0x00, 0x00, 0xDE]);
    }

    #[test]
    fn test_builder_overflow() {
        let mut builder = PacketBuilder::command(0x01);
        let filler = [0u8; MAX_PACKET_SIZE];
        assert_eq!(builder.extend(&filler).err(), Some(PacketError::TooLong));
    }

    #[test]
    fn test_encode_response_layout() {
        let packet = encode_response(0x02, 0x2A, &[0x11, 0x22]).unwrap();

        assert_eq!(&packet[..2], &RESPONSE_HEADER);
        assert_eq!(packet[2], 0x02); // id
        assert_eq!(packet[4], 0x2A); // address
        assert_eq!(packet[5], 2); // length
        assert_eq!(packet[6], 1); // count
        assert_eq!(&packet[DATA_OFFSET..DATA_OFFSET + 2], &[0x11, 0x22]);
        assert_eq!(packet.len(), DATA_OFFSET + 2 + 1);
        assert_eq!(packet[packet.len() - 1], checksum(&packet[2..packet.len() - 1]));
    }

    #[test]
    fn test_encode_response_too_long() {
        let data = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(encode_response(1, 0, &data), Err(PacketError::TooLong));
    }
}
