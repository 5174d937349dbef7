//! Sender engine (endpoint A)
//!
//! Owns the send window: at most `window_size` outstanding packets ordered
//! from oldest to newest, each with an acknowledged flag and its own
//! retransmission deadline.
//!
//! # Window layout
//!
//! ```text
//!   base                        next_seq
//!    │                             │
//!  ──┼─────────────────────────────┼──────────────▶ sequence ring
//!    │ <── outstanding (≤ N) ────▶ │ <── free ──▶
//! ```
//!
//! The release policy depends on [`ArqMode`]:
//! - Go-Back-N treats an ACK as cumulative and releases every slot from
//!   `base` through the acknowledged sequence number.
//! - Selective Repeat marks the one slot and releases only the contiguous
//!   run of acknowledged slots starting at `base`.

use crate::config::{ArqConfig, ArqMode, ConfigError};
use crate::endpoint::{Endpoint, Environment, Stimulus};
use crate::packet::{Message, Packet};
use crate::sequence::SeqSpace;
use crate::timer::RetransmitTimer;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Sender state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderState {
    /// Nothing outstanding, timer inactive
    Idle,
    /// At least one packet outstanding, timer active
    Sending,
}

/// Result of offering a message to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The message was sent with this sequence number
    Sent(u32),
    /// The window was full and the message was dropped
    WindowFull,
}

/// Result of processing an inbound acknowledgment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Checksum mismatch; ignored
    Corrupted,
    /// Acknowledges nothing currently outstanding; ignored
    OutOfWindow,
    /// Acknowledges a slot that was already acknowledged
    Duplicate,
    /// Newly acknowledged; `released` slots left the window
    Accepted { released: usize },
}

/// Sender statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SenderStats {
    /// Messages accepted into the window
    pub messages_sent: u64,
    /// Messages dropped because the window was full
    pub window_full: u64,
    /// First transmissions
    pub packets_sent: u64,
    /// Retransmissions
    pub packets_resent: u64,
    /// Uncorrupted ACKs received
    pub acks_received: u64,
    /// ACKs that acknowledged a new slot
    pub new_acks: u64,
    /// ACKs for slots already acknowledged
    pub duplicate_acks: u64,
    /// ACKs failing the checksum
    pub corrupted_acks: u64,
    /// ACKs outside the outstanding range
    pub out_of_window_acks: u64,
    /// Timer expiries handled
    pub timeouts: u64,
}

/// Outstanding packet with retransmission metadata
#[derive(Debug, Clone)]
struct Slot {
    /// Sequence number
    seq: u32,
    /// The packet as first sent
    packet: Packet,
    /// Whether an ACK for this slot has arrived
    acknowledged: bool,
    /// When this packet times out
    deadline: Duration,
    /// Number of times this packet has been transmitted
    send_count: u32,
}

/// Sender engine for one endpoint
pub struct Sender {
    config: ArqConfig,
    ring: SeqSpace,
    /// Next sequence number to assign
    next_seq: u32,
    /// Outstanding packets, oldest first
    window: VecDeque<Slot>,
    timer: RetransmitTimer,
    stats: SenderStats,
}

impl Sender {
    /// Create a sender in the `Idle` state
    pub fn new(config: ArqConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Sender {
            config,
            ring: config.ring(),
            next_seq: 0,
            window: VecDeque::new(),
            timer: RetransmitTimer::new(),
            stats: SenderStats::default(),
        })
    }

    /// Return to the initial state, disarming the timer if needed
    pub fn reset<E>(&mut self, env: &mut E)
    where
        E: Environment + ?Sized,
    {
        self.timer.cancel(env);
        self.next_seq = 0;
        self.window.clear();
        self.stats = SenderStats::default();
    }

    /// Offer an application message for transmission
    ///
    /// A full window drops the message; there is no backpressure signal.
    pub fn submit<E>(&mut self, env: &mut E, message: Message) -> SubmitOutcome
    where
        E: Environment + ?Sized,
    {
        if !self.can_send() {
            self.stats.window_full += 1;
            debug!(outstanding = self.window.len(), "send window full, dropping message");
            return SubmitOutcome::WindowFull;
        }

        let seq = self.next_seq;
        let packet = Packet::data(seq, &message);
        self.next_seq = self.ring.next(seq);

        self.window.push_back(Slot {
            seq,
            packet,
            acknowledged: false,
            deadline: env.now().saturating_add(self.config.rtt),
            send_count: 1,
        });
        self.stats.messages_sent += 1;
        self.stats.packets_sent += 1;

        trace!(seq, "sending packet");
        env.transmit(packet);
        self.timer.schedule(env, self.next_deadline());

        SubmitOutcome::Sent(seq)
    }

    /// Process an acknowledgment from the receiver
    pub fn on_ack<E>(&mut self, env: &mut E, packet: &Packet) -> AckOutcome
    where
        E: Environment + ?Sized,
    {
        if packet.is_corrupted() {
            self.stats.corrupted_acks += 1;
            trace!("corrupted ACK dropped");
            return AckOutcome::Corrupted;
        }
        self.stats.acks_received += 1;

        let Some(offset) = self.window_offset(packet.acknum) else {
            self.stats.out_of_window_acks += 1;
            debug!(
                acknum = packet.acknum,
                base = self.base(),
                "ACK out of window, ignoring"
            );
            return AckOutcome::OutOfWindow;
        };

        let slot = &mut self.window[offset];
        if slot.acknowledged {
            self.stats.duplicate_acks += 1;
            trace!(seq = slot.seq, "duplicate ACK");
            return AckOutcome::Duplicate;
        }
        slot.acknowledged = true;
        self.stats.new_acks += 1;
        trace!(seq = slot.seq, "ACK received");

        let released = match self.config.mode {
            ArqMode::GoBackN => self.window.drain(..=offset).count(),
            ArqMode::SelectiveRepeat => self.release_acknowledged_prefix(),
        };
        if released > 0 {
            debug!(released, base = self.base(), "window slid");
        }

        self.timer.schedule(env, self.next_deadline());
        AckOutcome::Accepted { released }
    }

    /// Handle expiry of the retransmission timer
    ///
    /// Returns the number of packets retransmitted.
    pub fn on_timeout<E>(&mut self, env: &mut E) -> usize
    where
        E: Environment + ?Sized,
    {
        self.timer.fired();
        self.stats.timeouts += 1;

        if self.window.is_empty() {
            warn!("retransmission timer fired with nothing outstanding");
            return 0;
        }

        let now = env.now();
        let deadline = now.saturating_add(self.config.rtt);
        let mut resent = 0;

        match self.config.mode {
            ArqMode::GoBackN => {
                for slot in self.window.iter_mut() {
                    Self::retransmit(env, slot, deadline);
                    resent += 1;
                }
            }
            ArqMode::SelectiveRepeat => {
                for slot in self
                    .window
                    .iter_mut()
                    .filter(|slot| !slot.acknowledged && slot.deadline <= now)
                {
                    Self::retransmit(env, slot, deadline);
                    resent += 1;
                }
                // Host alarm ran slightly early; resend what it was armed for
                if resent == 0 {
                    if let Some(slot) = self
                        .window
                        .iter_mut()
                        .filter(|slot| !slot.acknowledged)
                        .min_by_key(|slot| slot.deadline)
                    {
                        Self::retransmit(env, slot, deadline);
                        resent += 1;
                    }
                }
            }
        }

        self.stats.packets_resent += resent as u64;
        debug!(resent, base = self.base(), "timeout handled");

        self.timer.schedule(env, self.next_deadline());
        resent
    }

    fn retransmit<E>(env: &mut E, slot: &mut Slot, deadline: Duration)
    where
        E: Environment + ?Sized,
    {
        trace!(seq = slot.seq, attempt = slot.send_count + 1, "resending packet");
        env.transmit(slot.packet);
        slot.send_count += 1;
        slot.deadline = deadline;
    }

    /// Map a raw acknum to its slot index, if it names an outstanding packet
    fn window_offset(&self, acknum: i32) -> Option<usize> {
        let base = self.window.front()?.seq;
        let ack = self.ring.checked(acknum)?;
        if !self.ring.in_window(ack, base, self.config.window_size) {
            return None;
        }
        // In the window but not yet sent
        let offset = self.ring.distance(ack, base) as usize;
        (offset < self.window.len()).then_some(offset)
    }

    fn release_acknowledged_prefix(&mut self) -> usize {
        let mut released = 0;
        while self.window.front().is_some_and(|slot| slot.acknowledged) {
            self.window.pop_front();
            released += 1;
        }
        released
    }

    /// Earliest deadline among unacknowledged outstanding packets
    fn next_deadline(&self) -> Option<Duration> {
        self.window
            .iter()
            .filter(|slot| !slot.acknowledged)
            .map(|slot| slot.deadline)
            .min()
    }

    /// Current state
    pub fn state(&self) -> SenderState {
        if self.window.is_empty() {
            SenderState::Idle
        } else {
            SenderState::Sending
        }
    }

    /// `true` when there is room for at least one more outstanding packet
    pub fn can_send(&self) -> bool {
        self.window.len() < self.config.window_size
    }

    /// Number of packets awaiting release
    pub fn outstanding(&self) -> usize {
        self.window.len()
    }

    /// Oldest unreleased sequence number (`next_seq` when idle)
    pub fn base(&self) -> u32 {
        self.window.front().map_or(self.next_seq, |slot| slot.seq)
    }

    /// Sequence number the next admitted message will use
    pub fn next_seq(&self) -> u32 {
        self.next_seq
    }

    /// Acknowledged flag of an outstanding sequence number
    pub fn is_acknowledged(&self, seq: u32) -> Option<bool> {
        self.window
            .iter()
            .find(|slot| slot.seq == seq)
            .map(|slot| slot.acknowledged)
    }

    /// Times an outstanding sequence number has been transmitted
    pub fn send_count(&self, seq: u32) -> Option<u32> {
        self.window
            .iter()
            .find(|slot| slot.seq == seq)
            .map(|slot| slot.send_count)
    }

    /// Whether the retransmission timer is armed
    pub fn timer_active(&self) -> bool {
        self.timer.is_active()
    }

    /// Statistics collected since the last reset
    pub fn stats(&self) -> &SenderStats {
        &self.stats
    }

    /// Window parameters
    pub fn config(&self) -> &ArqConfig {
        &self.config
    }
}

impl Endpoint for Sender {
    fn handle(&mut self, env: &mut dyn Environment, stimulus: Stimulus) {
        match stimulus {
            Stimulus::Submit(message) => {
                self.submit(env, message);
            }
            Stimulus::Packet(packet) => {
                self.on_ack(env, &packet);
            }
            Stimulus::TimerFired => {
                self.on_timeout(env);
            }
        }
    }

    fn reset(&mut self, env: &mut dyn Environment) {
        Sender::reset(self, env);
    }
}
