//! Discrete-event ARQ emulator
//!
//! Runs a [`Sender`] at endpoint A and a [`Receiver`] at endpoint B over a
//! [`Channel`], driving both through the same [`Environment`] interface a
//! real host would provide. Every run is reproducible from its seed.
//!
//! # Example
//!
//! ```
//! use arq_protocol::ArqConfig;
//! use arq_sim::{ChannelConfig, SimConfig, Simulator};
//!
//! let config = SimConfig {
//!     arq: ArqConfig::go_back_n(),
//!     channel: ChannelConfig { loss: 0.2, ..ChannelConfig::default() },
//!     messages: 20,
//!     mean_interval: 50.0,
//!     ..SimConfig::default()
//! };
//! let report = Simulator::new(config).unwrap().run();
//! assert!(report.finished);
//! assert!(report.is_consistent());
//! ```

use crate::channel::{Channel, ChannelConfig, ChannelError, ChannelStats, Fault, Side};
use crate::event::{Event, EventQueue};
use crate::time::{self, SimClock};
use arq_protocol::{
    ArqConfig, ConfigError, Environment, Message, Packet, Receiver, ReceiverStats, Sender,
    SenderStats, SubmitOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Default cap on simulated time, in time units
pub const DEFAULT_MAX_TIME: f64 = 1_000_000.0;

/// Simulator setup errors
#[derive(Error, Debug, PartialEq)]
pub enum SimError {
    #[error("Invalid protocol configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid channel configuration: {0}")]
    Channel(#[from] ChannelError),

    #[error("Mean message interval must be a non-negative, representable time, got {0}")]
    InvalidInterval(f64),
}

/// Emulation parameters
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Protocol parameters shared by both endpoints
    pub arq: ArqConfig,
    /// Random impairments
    pub channel: ChannelConfig,
    /// Scripted impairments, applied before the random ones
    pub faults: Vec<Fault>,
    /// Number of messages the application generates
    pub messages: u64,
    /// Mean time between messages, in time units
    pub mean_interval: f64,
    /// RNG seed
    pub seed: u64,
    /// Events after this time are not processed
    pub max_time: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            arq: ArqConfig::default(),
            channel: ChannelConfig::default(),
            faults: Vec::new(),
            messages: 10,
            mean_interval: 1000.0,
            seed: 1234,
            max_time: time::from_units(DEFAULT_MAX_TIME),
        }
    }
}

/// One packet handed to the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRecord {
    /// Send time
    pub at: Duration,
    /// Sending endpoint
    pub from: Side,
    /// The packet as the endpoint sent it
    pub packet: Packet,
}

/// Outcome of a run
#[derive(Debug, Clone)]
pub struct SimReport {
    /// Messages the application generated
    pub messages_generated: u64,
    /// Sender counters
    pub sender: SenderStats,
    /// Receiver counters
    pub receiver: ReceiverStats,
    /// Channel counters
    pub channel: ChannelStats,
    /// Messages the sender accepted, in order
    pub accepted: Vec<Message>,
    /// Messages handed to B's application, in order
    pub delivered: Vec<Message>,
    /// Every packet either endpoint transmitted
    pub transmissions: Vec<TxRecord>,
    /// Alarm misuse observed (arm while armed, disarm while idle)
    pub timer_warnings: u64,
    /// Time of the last processed event
    pub end_time: Duration,
    /// The event queue drained before the time limit
    pub finished: bool,
}

impl SimReport {
    /// Whether B received exactly what A accepted, in the same order
    pub fn is_consistent(&self) -> bool {
        self.accepted == self.delivered
    }

    /// Data packets A transmitted with sequence number `seq`
    pub fn data_transmissions(&self, seq: u32) -> usize {
        self.transmissions
            .iter()
            .filter(|tx| tx.from == Side::A && tx.packet.seqnum == seq as i32)
            .count()
    }

    /// Sequence numbers of A's transmissions, in send order
    pub fn data_sequence(&self) -> Vec<i32> {
        self.transmissions
            .iter()
            .filter(|tx| tx.from == Side::A)
            .map(|tx| tx.packet.seqnum)
            .collect()
    }

    /// Acknowledgment numbers of B's transmissions, in send order
    pub fn ack_sequence(&self) -> Vec<i32> {
        self.transmissions
            .iter()
            .filter(|tx| tx.from == Side::B)
            .map(|tx| tx.packet.acknum)
            .collect()
    }
}

/// One endpoint's alarm
#[derive(Debug, Default, Clone, Copy)]
struct Alarm {
    /// Generation of the pending expiry, if armed
    armed: Option<u64>,
    generation: u64,
}

/// Everything outside the two endpoints
struct Network {
    clock: SimClock,
    rng: StdRng,
    channel: Channel,
    queue: EventQueue,
    alarms: [Alarm; 2],
    delivered: Vec<Message>,
    transmissions: Vec<TxRecord>,
    timer_warnings: u64,
}

impl Network {
    fn port(&mut self, side: Side) -> Port<'_> {
        Port { side, net: self }
    }
}

/// The network as seen by one endpoint
struct Port<'a> {
    side: Side,
    net: &'a mut Network,
}

impl Environment for Port<'_> {
    fn now(&self) -> Duration {
        self.net.clock.now()
    }

    fn transmit(&mut self, packet: Packet) {
        let now = self.net.clock.now();
        self.net.transmissions.push(TxRecord {
            at: now,
            from: self.side,
            packet,
        });
        let copies = self
            .net
            .channel
            .transmit(&mut self.net.rng, self.side, now, &packet);
        for copy in copies {
            self.net.queue.push(
                copy.at,
                Event::Arrival {
                    to: copy.to,
                    frame: copy.frame,
                },
            );
        }
    }

    fn deliver(&mut self, message: Message) {
        trace!(side = %self.side, ?message, "delivering to application");
        self.net.delivered.push(message);
    }

    fn arm_timer(&mut self, after: Duration) {
        let alarm = &mut self.net.alarms[self.side.index()];
        if alarm.armed.is_some() {
            warn!(side = %self.side, "attempt to start a timer that is already started");
            self.net.timer_warnings += 1;
            return;
        }
        alarm.generation += 1;
        alarm.armed = Some(alarm.generation);
        let event = Event::TimerExpiry {
            side: self.side,
            generation: alarm.generation,
        };
        self.net.queue.push(self.net.clock.now().saturating_add(after), event);
    }

    fn disarm_timer(&mut self) {
        let alarm = &mut self.net.alarms[self.side.index()];
        if alarm.armed.take().is_none() {
            warn!(side = %self.side, "unable to cancel timer, it was not running");
            self.net.timer_warnings += 1;
        }
    }
}

/// Emulator for one sender/receiver pair
pub struct Simulator {
    config: SimConfig,
    net: Network,
    sender: Sender,
    receiver: Receiver,
    generated: u64,
    accepted: Vec<Message>,
}

impl Simulator {
    /// Validate the configuration and set up both endpoints
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        // Gaps are drawn from 0..2 * mean_interval
        if time::try_from_units(2.0 * config.mean_interval).is_none() {
            return Err(SimError::InvalidInterval(config.mean_interval));
        }
        let sender = Sender::new(config.arq)?;
        let receiver = Receiver::new(config.arq)?;
        let channel = Channel::new(config.channel, config.faults.clone())?;

        let mut sim = Simulator {
            net: Network {
                clock: SimClock::new(),
                rng: StdRng::seed_from_u64(config.seed),
                channel,
                queue: EventQueue::new(),
                alarms: [Alarm::default(); 2],
                delivered: Vec::new(),
                transmissions: Vec::new(),
                timer_warnings: 0,
            },
            sender,
            receiver,
            generated: 0,
            accepted: Vec::new(),
            config,
        };
        if sim.config.messages > 0 {
            sim.schedule_next_message();
        }
        Ok(sim)
    }

    /// Message number `n` of the traffic pattern: 20 copies of one letter
    pub fn message(n: u64) -> Message {
        Message::filled(b'a' + (n % 26) as u8)
    }

    /// Process events until the queue drains or the time limit is hit
    pub fn run(mut self) -> SimReport {
        info!(
            mode = %self.config.arq.mode,
            window = self.config.arq.window_size,
            seq_space = self.config.arq.seq_space,
            messages = self.config.messages,
            "starting emulation"
        );

        let mut finished = true;
        while let Some(at) = self.net.queue.peek_time() {
            if at > self.config.max_time {
                warn!(at = ?at, "time limit reached with events pending");
                finished = false;
                break;
            }
            if !self.step() {
                break;
            }
        }

        let report = SimReport {
            messages_generated: self.generated,
            sender: self.sender.stats().clone(),
            receiver: self.receiver.stats().clone(),
            channel: self.net.channel.stats().clone(),
            accepted: self.accepted,
            delivered: self.net.delivered,
            transmissions: self.net.transmissions,
            timer_warnings: self.net.timer_warnings,
            end_time: self.net.clock.now(),
            finished,
        };
        info!(
            delivered = report.delivered.len(),
            end_time = time::as_units(report.end_time),
            "emulation finished"
        );
        report
    }

    /// Process the next event; returns `false` when nothing is pending
    pub fn step(&mut self) -> bool {
        let Some((at, event)) = self.net.queue.pop() else {
            return false;
        };
        if let Event::TimerExpiry { side, generation } = event {
            if self.net.alarms[side.index()].armed != Some(generation) {
                trace!(%side, generation, "stale timer event ignored");
                return true;
            }
        }
        self.net.clock.advance_to(at);

        match event {
            Event::FromApplication => self.on_application(),
            Event::Arrival { to, frame } => match Packet::from_bytes(&frame) {
                Ok(packet) => {
                    trace!(%to, seqnum = packet.seqnum, acknum = packet.acknum, "packet arrived");
                    let mut port = self.net.port(to);
                    match to {
                        Side::A => {
                            self.sender.on_ack(&mut port, &packet);
                        }
                        Side::B => {
                            self.receiver.on_data(&mut port, &packet);
                        }
                    }
                }
                Err(e) => warn!(%to, error = %e, "undecodable frame dropped"),
            },
            Event::TimerExpiry { side, .. } => {
                self.net.alarms[side.index()].armed = None;
                debug!(%side, "timer expired");
                let mut port = self.net.port(side);
                match side {
                    Side::A => {
                        self.sender.on_timeout(&mut port);
                    }
                    Side::B => warn!("receiver has no timer, expiry ignored"),
                }
            }
        }
        true
    }

    fn on_application(&mut self) {
        let message = Self::message(self.generated);
        self.generated += 1;

        let mut port = self.net.port(Side::A);
        if let SubmitOutcome::Sent(_) = self.sender.submit(&mut port, message) {
            self.accepted.push(message);
        }

        if self.generated < self.config.messages {
            self.schedule_next_message();
        }
    }

    fn schedule_next_message(&mut self) {
        let spread = 2.0 * self.config.mean_interval * self.net.rng.gen::<f64>();
        let at = self.net.clock.now().saturating_add(time::from_units(spread));
        self.net.queue.push(at, Event::FromApplication);
    }

    /// Current simulated time
    pub fn now(&self) -> Duration {
        self.net.clock.now()
    }

    /// The sending endpoint
    pub fn sender(&self) -> &Sender {
        &self.sender
    }

    /// The receiving endpoint
    pub fn receiver(&self) -> &Receiver {
        &self.receiver
    }

    /// Emulation parameters
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}
