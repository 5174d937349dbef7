//! Boundary between an endpoint and its host
//!
//! The engines never touch a channel, clock or alarm directly. Everything
//! they need from the outside world goes through [`Environment`], and
//! everything the outside world feeds them arrives as a [`Stimulus`].

use crate::packet::{Message, Packet};
use std::time::Duration;

/// Services the host provides to one endpoint
pub trait Environment {
    /// Current time, measured from an arbitrary fixed origin
    fn now(&self) -> Duration;

    /// Hand a packet to the channel; no delivery guarantee
    fn transmit(&mut self, packet: Packet);

    /// Hand an in-order payload to the application sink
    fn deliver(&mut self, message: Message);

    /// Start the endpoint's single-shot alarm
    fn arm_timer(&mut self, after: Duration);

    /// Cancel the endpoint's alarm
    fn disarm_timer(&mut self);
}

/// An external event delivered to an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stimulus {
    /// The application asks for a message to be sent
    Submit(Message),
    /// A packet arrived from the channel
    Packet(Packet),
    /// The endpoint's alarm expired
    TimerFired,
}

/// A protocol endpoint driven one stimulus at a time
pub trait Endpoint {
    /// Process a stimulus to completion
    fn handle(&mut self, env: &mut dyn Environment, stimulus: Stimulus);

    /// Return to the freshly initialised state
    fn reset(&mut self, env: &mut dyn Environment);
}

/// An [`Environment`] that records every interaction
///
/// Time only moves when [`advance`](Self::advance) is called. Useful for
/// driving an endpoint by hand in tests and benchmarks.
#[derive(Debug, Default, Clone)]
pub struct RecordingEnvironment {
    /// Current time
    pub now: Duration,
    /// Every packet handed to the channel, in order
    pub transmitted: Vec<Packet>,
    /// Every message handed to the sink, in order
    pub delivered: Vec<Message>,
    /// Absolute expiry time of the armed alarm, if any
    pub timer: Option<Duration>,
    /// Number of `arm_timer` calls
    pub arm_count: usize,
    /// Number of `disarm_timer` calls
    pub disarm_count: usize,
}

impl RecordingEnvironment {
    /// Create an environment at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward
    pub fn advance(&mut self, by: Duration) {
        self.now = self.now.saturating_add(by);
    }

    /// Move the clock to the armed alarm's expiry and consume the alarm
    ///
    /// Returns `false` when no alarm is armed.
    pub fn expire_timer(&mut self) -> bool {
        match self.timer.take() {
            Some(at) => {
                self.now = self.now.max(at);
                true
            }
            None => false,
        }
    }

    /// Take the packets transmitted since the last call
    pub fn take_transmitted(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.transmitted)
    }
}

impl Environment for RecordingEnvironment {
    fn now(&self) -> Duration {
        self.now
    }

    fn transmit(&mut self, packet: Packet) {
        self.transmitted.push(packet);
    }

    fn deliver(&mut self, message: Message) {
        self.delivered.push(message);
    }

    fn arm_timer(&mut self, after: Duration) {
        self.timer = Some(self.now.saturating_add(after));
        self.arm_count += 1;
    }

    fn disarm_timer(&mut self) {
        self.timer = None;
        self.disarm_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_timer() {
        let mut env = RecordingEnvironment::new();
        env.advance(Duration::from_millis(5));
        env.arm_timer(Duration::from_millis(16));
        assert_eq!(env.timer, Some(Duration::from_millis(21)));

        assert!(env.expire_timer());
        assert_eq!(env.now, Duration::from_millis(21));
        assert!(!env.expire_timer());
    }

    #[test]
    fn test_take_transmitted() {
        let mut env = RecordingEnvironment::new();
        env.transmit(Packet::ack(1));
        env.transmit(Packet::ack(2));

        assert_eq!(env.take_transmitted().len(), 2);
        assert!(env.transmitted.is_empty());
    }
}
