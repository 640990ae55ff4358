//! RS30X Serial Servo Protocol
//!
//! This crate defines the wire format spoken by Futaba RS30X command-type
//! servos on a shared half-duplex UART bus. It is pure encoding and decoding:
//! no I/O, no timing, no allocation.
//!
//! # Packet Overview
//!
//! ```text
//! ┌──────────┬────┬───────┬─────────┬────────┬───────┬──────────┬──────────┐
//! │ HEADER   │ ID │ FLAGS │ ADDRESS │ LENGTH │ COUNT │ DATA     │ CHECKSUM │
//! │ 2B       │ 1B │ 1B    │ 1B      │ 1B     │ 1B    │ 0–56B    │ 1B       │
//! └──────────┴────┴───────┴─────────┴────────┴───────┴──────────┴──────────┘
//! ```
//!
//! Commands start with `FA AF`, servo replies with `FD DF`. The checksum is the
//! XOR of every byte from ID up to the last data byte. On a half-duplex bus the
//! transceiver echoes every command back, so the receiver must recognise (and
//! discard) command-headed packets as well as responses.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod batch;
pub mod checksum;
pub mod command;
pub mod framer;
pub mod packet;
pub mod status;

pub use batch::{encode_angles, encode_angles_in_time, BatchEntry, MAX_BATCH_ENTRIES};
pub use checksum::{checksum, verify};
pub use command::{
    batch_angle_raw, goal_time_raw, single_angle_raw, Command, CommandKind, Rotation, TorqueMode,
};
pub use framer::{Frame, FrameError, PacketFramer, RxState};
pub use packet::{
    encode_response, PacketBuilder, PacketBuf, PacketError, PacketType, Payload, BROADCAST_ID,
    MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, RX_BUFFER_SIZE,
};
pub use status::{Status, StatusError, STATUS_ADDRESS, STATUS_PAYLOAD_LEN};
