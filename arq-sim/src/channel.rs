//! Unreliable in-process channel
//!
//! Models the network layer between the two endpoints. Packets travel as
//! encoded frames and may be lost, corrupted or duplicated, but frames
//! heading to the same endpoint always arrive in the order they were sent.
//!
//! Random behaviour follows the classic ARQ emulator:
//! - a frame is lost with probability `loss`;
//! - otherwise it is corrupted with probability `corrupt`: three times in
//!   four the first payload byte becomes `'Z'`, otherwise the sequence or
//!   acknowledgment field is overwritten with 999999;
//! - it arrives `min_delay + (max_delay - min_delay) × U(0,1)` time units
//!   after the later of now and the previous arrival at that endpoint.
//!
//! Scripted [`Fault`]s take precedence over the random model and make
//! individual scenarios reproducible.

use crate::time;
use arq_protocol::packet::{Packet, PAYLOAD_OFFSET};
use arq_protocol::NOT_IN_USE;
use bytes::{Bytes, BytesMut};
use rand::Rng;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::trace;

/// Value the channel writes into a corrupted header field
pub const CORRUPT_FIELD: i32 = 999_999;

/// Byte written over the first payload byte of a corrupted frame
pub const CORRUPT_BYTE: u8 = b'Z';

/// Channel configuration errors
#[derive(Error, Debug, PartialEq)]
pub enum ChannelError {
    #[error("Probability {name} must be within 0.0..=1.0, got {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Delay range {min}..{max} is invalid")]
    InvalidDelay { min: f64, max: f64 },
}

/// One of the two endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The sending endpoint
    A,
    /// The receiving endpoint
    B,
}

impl Side {
    /// The endpoint at the other end of the channel
    pub fn peer(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// Random impairment parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    /// Probability a frame is lost
    pub loss: f64,
    /// Probability a surviving frame is corrupted
    pub corrupt: f64,
    /// Probability a surviving frame is delivered twice
    pub duplicate: f64,
    /// Shortest one-way delay, in time units
    pub min_delay: f64,
    /// Longest one-way delay, in time units
    pub max_delay: f64,
}

impl ChannelConfig {
    /// A channel that never loses, corrupts or duplicates
    pub fn reliable() -> Self {
        ChannelConfig {
            loss: 0.0,
            corrupt: 0.0,
            duplicate: 0.0,
            ..Self::default()
        }
    }

    /// Fixed one-way delay, handy for scenarios with exact timing
    pub fn with_fixed_delay(mut self, delay: f64) -> Self {
        self.min_delay = delay;
        self.max_delay = delay;
        self
    }

    /// Check probabilities and delay bounds
    pub fn validate(&self) -> Result<(), ChannelError> {
        for (name, value) in [
            ("loss", self.loss),
            ("corrupt", self.corrupt),
            ("duplicate", self.duplicate),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ChannelError::InvalidProbability { name, value });
            }
        }
        if !(self.min_delay.is_finite() && self.max_delay.is_finite())
            || self.min_delay < 0.0
            || self.max_delay < self.min_delay
            || time::try_from_units(self.max_delay).is_none()
        {
            return Err(ChannelError::InvalidDelay {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            loss: 0.0,
            corrupt: 0.0,
            duplicate: 0.0,
            min_delay: 1.0,
            max_delay: 10.0,
        }
    }
}

/// Which stream of packets a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Data packets from A to B, matched by sequence number
    Data,
    /// Acknowledgments from B to A, matched by acknowledgment number
    Ack,
}

/// What to do to a matching frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Lose the frame
    Drop,
    /// Overwrite the first payload byte
    Corrupt,
    /// Deliver the frame twice
    Duplicate,
}

/// A scripted impairment of one specific transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// Stream the fault applies to
    pub direction: Direction,
    /// Sequence number (data) or acknowledgment number (ACK) to match
    pub number: u32,
    /// 1-based count of matching transmissions; the fault hits this one
    pub occurrence: u32,
    /// Impairment to apply
    pub action: FaultAction,
}

impl Fault {
    /// Lose the first transmission of data packet `seq`
    pub fn drop_data(seq: u32) -> Self {
        Self::first(Direction::Data, seq, FaultAction::Drop)
    }

    /// Lose the first ACK for `ack`
    pub fn drop_ack(ack: u32) -> Self {
        Self::first(Direction::Ack, ack, FaultAction::Drop)
    }

    /// Corrupt the first transmission of data packet `seq`
    pub fn corrupt_data(seq: u32) -> Self {
        Self::first(Direction::Data, seq, FaultAction::Corrupt)
    }

    /// Corrupt the first ACK for `ack`
    pub fn corrupt_ack(ack: u32) -> Self {
        Self::first(Direction::Ack, ack, FaultAction::Corrupt)
    }

    /// Deliver the first transmission of data packet `seq` twice
    pub fn duplicate_data(seq: u32) -> Self {
        Self::first(Direction::Data, seq, FaultAction::Duplicate)
    }

    /// Deliver the first ACK for `ack` twice
    pub fn duplicate_ack(ack: u32) -> Self {
        Self::first(Direction::Ack, ack, FaultAction::Duplicate)
    }

    /// Apply to the `n`-th matching transmission instead of the first
    pub fn nth(mut self, n: u32) -> Self {
        self.occurrence = n;
        self
    }

    fn first(direction: Direction, number: u32, action: FaultAction) -> Self {
        Fault {
            direction,
            number,
            occurrence: 1,
            action,
        }
    }
}

/// Channel statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelStats {
    /// Frames handed to the channel
    pub frames_sent: u64,
    /// Frames lost
    pub lost: u64,
    /// Frames corrupted
    pub corrupted: u64,
    /// Extra copies injected
    pub duplicated: u64,
}

/// A frame on its way to an endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    /// Destination endpoint
    pub to: Side,
    /// Arrival time
    pub at: Duration,
    /// Encoded packet as it will arrive
    pub frame: Bytes,
}

/// Unreliable, order-preserving channel between A and B
pub struct Channel {
    config: ChannelConfig,
    faults: Vec<Fault>,
    /// Transmissions seen so far per (direction, number)
    seen: HashMap<(Direction, u32), u32>,
    /// Latest scheduled arrival per destination
    last_arrival: [Duration; 2],
    stats: ChannelStats,
}

impl Channel {
    /// Create a channel
    pub fn new(config: ChannelConfig, faults: Vec<Fault>) -> Result<Self, ChannelError> {
        config.validate()?;
        Ok(Channel {
            config,
            faults,
            seen: HashMap::new(),
            last_arrival: [Duration::ZERO; 2],
            stats: ChannelStats::default(),
        })
    }

    /// Send a packet from `from` at time `now`
    ///
    /// Returns the copies that will arrive, in arrival order. An empty
    /// vector means the packet was lost.
    pub fn transmit<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        from: Side,
        now: Duration,
        packet: &Packet,
    ) -> Vec<InFlight> {
        self.stats.frames_sent += 1;
        let fault = self.scripted_fault(from, packet);

        let lost = match fault {
            Some(FaultAction::Drop) => true,
            Some(_) => false,
            None => rng.gen_bool(self.config.loss),
        };
        if lost {
            self.stats.lost += 1;
            trace!(%from, seqnum = packet.seqnum, acknum = packet.acknum, "channel lost packet");
            return Vec::new();
        }

        let mut frame = BytesMut::from(&packet.to_bytes()[..]);
        let corrupt = match fault {
            Some(FaultAction::Corrupt) => true,
            Some(_) => false,
            None => rng.gen_bool(self.config.corrupt),
        };
        if corrupt {
            self.stats.corrupted += 1;
            let roll: f64 = if fault.is_some() { 0.0 } else { rng.gen() };
            Self::corrupt_frame(&mut frame, roll);
            trace!(%from, "channel corrupted packet");
        }
        let frame = frame.freeze();

        let duplicate = match fault {
            Some(FaultAction::Duplicate) => true,
            Some(_) => false,
            None => rng.gen_bool(self.config.duplicate),
        };
        let copies = if duplicate {
            self.stats.duplicated += 1;
            trace!(%from, "channel duplicated packet");
            2
        } else {
            1
        };

        let to = from.peer();
        (0..copies)
            .map(|_| {
                let at = self.schedule_arrival(&mut *rng, to, now);
                InFlight {
                    to,
                    at,
                    frame: frame.clone(),
                }
            })
            .collect()
    }

    fn scripted_fault(&mut self, from: Side, packet: &Packet) -> Option<FaultAction> {
        let (direction, raw) = match from {
            Side::A => (Direction::Data, packet.seqnum),
            Side::B => (Direction::Ack, packet.acknum),
        };
        if raw == NOT_IN_USE {
            return None;
        }
        let number = u32::try_from(raw).ok()?;
        let count = self.seen.entry((direction, number)).or_insert(0);
        *count += 1;
        let count = *count;

        self.faults
            .iter()
            .find(|f| f.direction == direction && f.number == number && f.occurrence == count)
            .map(|f| f.action)
    }

    /// Overwrite part of an encoded frame, picking the target by `roll`
    fn corrupt_frame(frame: &mut BytesMut, roll: f64) {
        if roll < 0.75 {
            frame[PAYLOAD_OFFSET] = CORRUPT_BYTE;
        } else if roll < 0.875 {
            frame[0..4].copy_from_slice(&CORRUPT_FIELD.to_be_bytes());
        } else {
            frame[4..8].copy_from_slice(&CORRUPT_FIELD.to_be_bytes());
        }
    }

    fn schedule_arrival<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        to: Side,
        now: Duration,
    ) -> Duration {
        let spread = self.config.max_delay - self.config.min_delay;
        let delay = self.config.min_delay + spread * rng.gen::<f64>();
        let slot = &mut self.last_arrival[to.index()];
        let at = now.max(*slot).saturating_add(time::from_units(delay));
        *slot = at;
        at
    }

    /// Channel statistics
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// Channel configuration
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }
}
