//! Packet checksum
//!
//! RS30X packets carry a single XOR byte computed over the device id, the
//! opcode bytes and the data. The two header bytes and the checksum byte
//! itself are never part of the span.

/// XOR-fold of all bytes
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Check a span against its expected checksum
pub fn verify(bytes: &[u8], expected: u8) -> bool {
    checksum(bytes) == expected
}
