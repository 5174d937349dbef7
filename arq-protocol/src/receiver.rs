//! Receiver engine (endpoint B)
//!
//! Purely reactive: every inbound data packet is checked, possibly buffered
//! or delivered, and answered with an acknowledgment. The receiver never arms
//! a timer and never retransmits on its own.
//!
//! Go-Back-N accepts only the packet at `expected` and answers everything
//! else with its most recent ACK. Selective Repeat accepts anything inside
//! the `window_size`-wide receive window, buffers it, acknowledges it
//! individually and delivers the contiguous run starting at `expected`.

use crate::config::{ArqConfig, ArqMode, ConfigError};
use crate::endpoint::{Endpoint, Environment, Stimulus};
use crate::packet::{Message, Packet};
use crate::sequence::SeqSpace;
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Result of processing an inbound data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOutcome {
    /// Checksum mismatch
    Corrupted,
    /// Newly accepted; `delivered` messages reached the sink
    Accepted { delivered: usize },
    /// Already buffered or already delivered
    Duplicate,
    /// Outside the receive window
    OutOfWindow,
}

/// Receiver statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Data packets received, corrupted or not
    pub packets_received: u64,
    /// Packets failing the checksum
    pub corrupted: u64,
    /// Packets already buffered or delivered
    pub duplicates: u64,
    /// Packets outside the receive window
    pub out_of_window: u64,
    /// Messages handed to the sink
    pub delivered: u64,
    /// Acknowledgments sent
    pub acks_sent: u64,
}

/// Receiver engine for one endpoint
pub struct Receiver {
    config: ArqConfig,
    ring: SeqSpace,
    /// Next sequence number to deliver
    expected: u32,
    /// Most recent cumulative ACK value (Go-Back-N)
    last_ack: u32,
    /// Reorder buffer keyed by sequence number, only ever holding the
    /// receive window
    buffer: HashMap<u32, Message>,
    stats: ReceiverStats,
}

impl Receiver {
    /// Create a receiver expecting sequence number 0
    pub fn new(config: ArqConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let ring = config.ring();
        Ok(Receiver {
            config,
            ring,
            expected: 0,
            last_ack: ring.prev(0),
            buffer: HashMap::new(),
            stats: ReceiverStats::default(),
        })
    }

    /// Return to the initial state
    pub fn reset(&mut self) {
        self.expected = 0;
        self.last_ack = self.ring.prev(0);
        self.buffer.clear();
        self.stats = ReceiverStats::default();
    }

    /// Process a data packet from the sender
    pub fn on_data<E>(&mut self, env: &mut E, packet: &Packet) -> DataOutcome
    where
        E: Environment + ?Sized,
    {
        self.stats.packets_received += 1;

        if packet.is_corrupted() {
            self.stats.corrupted += 1;
            trace!("corrupted packet received");
            if self.config.mode == ArqMode::GoBackN {
                self.send_ack(env, self.last_ack);
            }
            return DataOutcome::Corrupted;
        }

        match self.config.mode {
            ArqMode::GoBackN => self.on_data_in_order(env, packet),
            ArqMode::SelectiveRepeat => self.on_data_selective(env, packet),
        }
    }

    fn on_data_in_order<E>(&mut self, env: &mut E, packet: &Packet) -> DataOutcome
    where
        E: Environment + ?Sized,
    {
        let seq = self.ring.checked(packet.seqnum);

        if seq == Some(self.expected) {
            trace!(seq = self.expected, "packet received in order");
            env.deliver(packet.message());
            self.stats.delivered += 1;
            self.last_ack = self.expected;
            self.expected = self.ring.next(self.expected);
            self.send_ack(env, self.last_ack);
            return DataOutcome::Accepted { delivered: 1 };
        }

        let outcome = if seq == Some(self.last_ack) {
            self.stats.duplicates += 1;
            DataOutcome::Duplicate
        } else {
            self.stats.out_of_window += 1;
            DataOutcome::OutOfWindow
        };
        debug!(
            seqnum = packet.seqnum,
            expected = self.expected,
            "packet out of order, repeating last ACK"
        );
        self.send_ack(env, self.last_ack);
        outcome
    }

    fn on_data_selective<E>(&mut self, env: &mut E, packet: &Packet) -> DataOutcome
    where
        E: Environment + ?Sized,
    {
        let window = self.config.window_size;
        let Some(seq) = self.ring.checked(packet.seqnum) else {
            self.stats.out_of_window += 1;
            warn!(seqnum = packet.seqnum, "packet with invalid sequence number");
            return DataOutcome::OutOfWindow;
        };

        if self.ring.in_window(seq, self.expected, window) {
            self.send_ack(env, seq);

            if self.buffer.contains_key(&seq) {
                self.stats.duplicates += 1;
                trace!(seq, "duplicate packet already buffered");
                return DataOutcome::Duplicate;
            }
            trace!(seq, "buffering packet");
            self.buffer.insert(seq, packet.message());

            let delivered = self.deliver_ready(env);
            return DataOutcome::Accepted { delivered };
        }

        // Previous window: delivered already, but its ACK may have been lost
        let previous_base = self.ring.sub(self.expected, window as u32);
        if self.ring.in_window(seq, previous_base, window) {
            self.stats.duplicates += 1;
            trace!(seq, "re-acknowledging delivered packet");
            self.send_ack(env, seq);
            return DataOutcome::Duplicate;
        }

        self.stats.out_of_window += 1;
        debug!(seq, expected = self.expected, "packet out of window, ignoring");
        DataOutcome::OutOfWindow
    }

    /// Deliver the contiguous run of buffered packets starting at `expected`
    fn deliver_ready<E>(&mut self, env: &mut E) -> usize
    where
        E: Environment + ?Sized,
    {
        let mut delivered = 0;
        while let Some(message) = self.buffer.remove(&self.expected) {
            trace!(seq = self.expected, "delivering packet");
            env.deliver(message);
            self.expected = self.ring.next(self.expected);
            delivered += 1;
        }
        self.stats.delivered += delivered as u64;
        if delivered > 0 {
            debug!(delivered, expected = self.expected, "receive window slid");
        }
        delivered
    }

    fn send_ack<E>(&mut self, env: &mut E, ack: u32)
    where
        E: Environment + ?Sized,
    {
        trace!(ack, "sending ACK");
        env.transmit(Packet::ack(ack));
        self.stats.acks_sent += 1;
    }

    /// Next sequence number to deliver
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Number of packets held in the reorder buffer
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Statistics collected since the last reset
    pub fn stats(&self) -> &ReceiverStats {
        &self.stats
    }

    /// Window parameters
    pub fn config(&self) -> &ArqConfig {
        &self.config
    }
}

impl Endpoint for Receiver {
    fn handle(&mut self, env: &mut dyn Environment, stimulus: Stimulus) {
        match stimulus {
            Stimulus::Packet(packet) => {
                self.on_data(env, &packet);
            }
            Stimulus::Submit(_) => {
                warn!("receiver does not send application data, message dropped");
            }
            Stimulus::TimerFired => {
                warn!("receiver has no timer, ignoring expiry");
            }
        }
    }

    fn reset(&mut self, _env: &mut dyn Environment) {
        Receiver::reset(self);
    }
}
