//! Receive-side packet framer
//!
//! Bytes arrive one at a time from the bus. The framer hunts for a header,
//! reads the fixed part to learn the packet length, then collects the body and
//! validates the checksum. Every path, including every error, ends back in
//! [`RxState::Seeking`] so a corrupted stream always resynchronizes.
//!
//! Responses carry their body length in LENGTH. Command echoes carry
//! LENGTH × COUNT data bytes, so the framer also waits for COUNT before sizing
//! them. Broadcast batches can be larger than the receive buffer; those echoes
//! are skipped byte by byte so none of their data is rescanned for a header.
//!
//! ```text
//!            header found            6 bytes (response)
//!                                    7 bytes (command)
//! Seeking ───────────────▶ ReadingHeader ──────────▶ ReadingBody { remaining }
//!    ▲  ╲ no header: slide       │ │ response overflow      │ remaining == 0
//!    │   ╲ window by one byte    │ │                        │
//!    ├────┴──────────────────────┘ └─▶ Skipping { remaining }│
//!    │                                 oversized echo   │    │
//!    └──────────────────────────────────────────────────┴────┘
//! ```

use heapless::Vec;

use crate::checksum::verify;
use crate::packet::{PacketType, Payload, DATA_OFFSET, HEADER_LEN, RX_BUFFER_SIZE};

/// Framer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxState {
    /// Looking for a 2-byte header
    Seeking,
    /// Header found, collecting id and opcode bytes
    ReadingHeader,
    /// Collecting the rest of the packet up to and including the checksum
    ReadingBody {
        /// Bytes still to arrive, checksum included
        remaining: usize,
    },
    /// Discarding a command echo too large for the receive buffer
    Skipping {
        /// Bytes still to discard, checksum included
        remaining: usize,
    },
}

/// Errors reported while framing
///
/// Both are recoverable: the framer has already resynchronized when it
/// returns one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// Trailing byte does not match the computed checksum
    ChecksumMismatch { device_id: u8 },
    /// Declared length does not fit in the receive buffer
    LengthOverflow { declared: u8 },
}

/// A complete, checksum-valid packet
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Command (echo) or response
    pub packet_type: PacketType,
    /// Device id byte
    pub device_id: u8,
    /// Data section between COUNT and the checksum
    pub payload: Payload,
}

impl Frame {
    /// Whether this is our own command reflected by the transceiver
    pub fn is_echo(&self) -> bool {
        self.packet_type == PacketType::Command
    }
}

/// Byte-stream state machine
#[derive(Debug, Clone)]
pub struct PacketFramer {
    state: RxState,
    buffer: [u8; RX_BUFFER_SIZE],
    len: usize,
}

impl Default for PacketFramer {
    fn default() -> Self {
        Self::new()
    }
}

impl PacketFramer {
    /// Create a framer in the seeking state
    pub const fn new() -> Self {
        Self {
            state: RxState::Seeking,
            buffer: [0; RX_BUFFER_SIZE],
            len: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> RxState {
        self.state
    }

    /// Number of bytes held for the packet in progress
    pub fn buffered(&self) -> usize {
        self.len
    }

    /// Drop any partial packet and go back to seeking
    pub fn reset(&mut self) {
        self.state = RxState::Seeking;
        self.len = 0;
    }

    /// Feed a single byte
    ///
    /// Returns `Ok(Some(frame))` when a packet completes with a valid checksum,
    /// `Ok(None)` when more bytes are needed, or `Err` when a packet was dropped.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Frame>, FrameError> {
        if let RxState::Skipping { remaining } = self.state {
            if remaining > 1 {
                self.state = RxState::Skipping {
                    remaining: remaining - 1,
                };
            } else {
                self.reset();
            }
            return Ok(None);
        }
        if self.len >= RX_BUFFER_SIZE {
            // Lengths are checked in ReadingHeader, so only a logic error lands here
            let declared = self.buffer[5];
            self.reset();
            return Err(FrameError::LengthOverflow { declared });
        }
        self.buffer[self.len] = byte;
        self.len += 1;
        self.transition()
    }

    /// Feed every byte of `bytes`, reporting each completed packet or error
    pub fn feed_all<F>(&mut self, bytes: &[u8], mut on_packet: F)
    where
        F: FnMut(Result<Frame, FrameError>),
    {
        for &byte in bytes {
            match self.feed(byte) {
                Ok(Some(frame)) => on_packet(Ok(frame)),
                Ok(None) => {}
                Err(e) => on_packet(Err(e)),
            }
        }
    }

    /// Advance the state machine after a byte was appended
    fn transition(&mut self) -> Result<Option<Frame>, FrameError> {
        match self.state {
            RxState::Seeking => {
                if self.len < 2 {
                    return Ok(None);
                }
                if PacketType::from_header(self.buffer[0], self.buffer[1]).is_some() {
                    self.state = RxState::ReadingHeader;
                } else {
                    // Slide the window: the second byte may start a header
                    self.buffer[0] = self.buffer[1];
                    self.len = 1;
                }
                Ok(None)
            }
            RxState::ReadingHeader => {
                match PacketType::from_header(self.buffer[0], self.buffer[1]) {
                    Some(PacketType::Command) => self.size_command(),
                    _ => self.size_response(),
                }
            }
            RxState::ReadingBody { remaining } => {
                let remaining = remaining - 1;
                if remaining > 0 {
                    self.state = RxState::ReadingBody { remaining };
                    return Ok(None);
                }
                let result = self.complete();
                self.reset();
                result.map(Some)
            }
            // Handled in feed before the byte is stored
            RxState::Skipping { .. } => Ok(None),
        }
    }

    /// Size a response once LENGTH is held
    fn size_response(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.len < HEADER_LEN {
            return Ok(None);
        }
        let declared = self.buffer[HEADER_LEN - 1];
        // COUNT + data + checksum
        let remaining = declared as usize + 2;
        if HEADER_LEN + remaining > RX_BUFFER_SIZE {
            self.reset();
            return Err(FrameError::LengthOverflow { declared });
        }
        self.state = RxState::ReadingBody { remaining };
        Ok(None)
    }

    /// Size a command echo once LENGTH and COUNT are held
    fn size_command(&mut self) -> Result<Option<Frame>, FrameError> {
        if self.len < DATA_OFFSET {
            return Ok(None);
        }
        let length = self.buffer[HEADER_LEN - 1] as usize;
        let count = self.buffer[DATA_OFFSET - 1] as usize;
        // data + checksum
        let remaining = length * count + 1;
        if DATA_OFFSET + remaining > RX_BUFFER_SIZE {
            self.len = 0;
            self.state = RxState::Skipping { remaining };
        } else {
            self.state = RxState::ReadingBody { remaining };
        }
        Ok(None)
    }

    /// Validate the buffered packet and extract its payload
    fn complete(&self) -> Result<Frame, FrameError> {
        let end = self.len - 1;
        let device_id = self.buffer[2];
        if !verify(&self.buffer[2..end], self.buffer[end]) {
            return Err(FrameError::ChecksumMismatch { device_id });
        }

        // The header was validated on entry to ReadingHeader
        let packet_type = PacketType::from_header(self.buffer[0], self.buffer[1])
            .unwrap_or(PacketType::Command);

        let mut payload = Vec::new();
        // Bounded by the length check in ReadingHeader
        let _ = payload.extend_from_slice(&self.buffer[DATA_OFFSET..end]);

        Ok(Frame {
            packet_type,
            device_id,
            payload,
        })
    }
}
