//! Packet and Message Structures
//!
//! A packet is three signed 32-bit header fields (sequence number,
//! acknowledgment number, checksum) followed by a fixed-size payload. Data
//! packets leave `acknum` unused; pure acknowledgments leave `seqnum` unused.
//!
//! The header fields stay raw `i32` values rather than typed sequence numbers:
//! a corrupting channel may write anything into them, and the checksum must
//! be computed over exactly what arrived.

use crate::checksum;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use thiserror::Error;

/// Payload length of every message and packet, in bytes
pub const MSG_LEN: usize = 20;

/// Sentinel for header fields a packet does not use
pub const NOT_IN_USE: i32 = -1;

/// Size of the packet header in bytes (3 fields × 4 bytes each)
pub const HEADER_SIZE: usize = 12;

/// Size of an encoded packet
pub const WIRE_SIZE: usize = HEADER_SIZE + MSG_LEN;

/// Byte offset of the payload inside an encoded packet
pub const PAYLOAD_OFFSET: usize = HEADER_SIZE;

/// Filler byte for acknowledgment payloads
const ACK_FILL: u8 = b'0';

/// Packet errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PacketError {
    #[error("Packet too short: {0} bytes (expected {expected})", expected = WIRE_SIZE)]
    TooShort(usize),

    #[error("Packet too long: {0} bytes (expected {expected})", expected = WIRE_SIZE)]
    TooLong(usize),
}

/// An application-layer message
///
/// Exactly [`MSG_LEN`] bytes, opaque to the protocol.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Message([u8; MSG_LEN]);

impl Message {
    /// Wrap a full payload
    pub fn new(data: [u8; MSG_LEN]) -> Self {
        Message(data)
    }

    /// A message consisting of one repeated byte
    pub fn filled(byte: u8) -> Self {
        Message([byte; MSG_LEN])
    }

    /// Build a message from a slice, zero-padding or truncating to [`MSG_LEN`]
    pub fn from_slice(data: &[u8]) -> Self {
        let mut buf = [0u8; MSG_LEN];
        let len = data.len().min(MSG_LEN);
        buf[..len].copy_from_slice(&data[..len]);
        Message(buf)
    }

    /// Raw message bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8; MSG_LEN] {
        &self.0
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl From<[u8; MSG_LEN]> for Message {
    fn from(data: [u8; MSG_LEN]) -> Self {
        Message(data)
    }
}

/// A packet as exchanged over the channel
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Packet {
    /// Sequence number, or [`NOT_IN_USE`] for a pure acknowledgment
    pub seqnum: i32,
    /// Acknowledged sequence number, or [`NOT_IN_USE`] for a data packet
    pub acknum: i32,
    /// Integrity value computed by [`checksum::compute`]
    pub checksum: i32,
    /// Payload bytes
    pub payload: [u8; MSG_LEN],
}

impl Packet {
    /// Create a data packet carrying `message` with sequence number `seq`
    pub fn data(seq: u32, message: &Message) -> Self {
        Self::sealed(seq as i32, NOT_IN_USE, *message.as_bytes())
    }

    /// Create a pure acknowledgment for sequence number `ack`
    pub fn ack(ack: u32) -> Self {
        Self::sealed(NOT_IN_USE, ack as i32, [ACK_FILL; MSG_LEN])
    }

    fn sealed(seqnum: i32, acknum: i32, payload: [u8; MSG_LEN]) -> Self {
        let mut packet = Packet {
            seqnum,
            acknum,
            checksum: 0,
            payload,
        };
        packet.checksum = checksum::compute(&packet);
        packet
    }

    /// The payload as an application message
    #[inline]
    pub fn message(&self) -> Message {
        Message(self.payload)
    }

    /// Check whether the packet failed its integrity check
    #[inline]
    pub fn is_corrupted(&self) -> bool {
        checksum::is_corrupted(self)
    }

    /// Serialize the packet to bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(WIRE_SIZE);
        buf.put_i32(self.seqnum);
        buf.put_i32(self.acknum);
        buf.put_i32(self.checksum);
        buf.put_slice(&self.payload);
        buf.freeze()
    }

    /// Deserialize a packet from bytes
    ///
    /// Decoding never validates the checksum; that is the receiving engine's
    /// job.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PacketError> {
        if bytes.len() < WIRE_SIZE {
            return Err(PacketError::TooShort(bytes.len()));
        }
        if bytes.len() > WIRE_SIZE {
            return Err(PacketError::TooLong(bytes.len()));
        }

        let mut buf = bytes;
        let seqnum = buf.get_i32();
        let acknum = buf.get_i32();
        let checksum = buf.get_i32();
        let mut payload = [0u8; MSG_LEN];
        buf.copy_to_slice(&mut payload);

        Ok(Packet {
            seqnum,
            acknum,
            checksum,
            payload,
        })
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("seqnum", &self.seqnum)
            .field("acknum", &self.acknum)
            .field("checksum", &self.checksum)
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .finish()
    }
}
