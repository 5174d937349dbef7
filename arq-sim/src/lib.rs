//! ARQ network emulator
//!
//! A deterministic discrete-event harness for the engines in
//! `arq-protocol`: a lossy, corrupting, duplicating but order-preserving
//! channel, an event queue, simulated time and a driver that runs a sender
//! and receiver against each other.

pub mod channel;
pub mod event;
pub mod simulator;
pub mod time;

pub use channel::{
    Channel, ChannelConfig, ChannelError, ChannelStats, Direction, Fault, FaultAction, Side,
};
pub use event::{Event, EventQueue};
pub use simulator::{SimConfig, SimError, SimReport, Simulator, TxRecord};
pub use time::{SimClock, TIME_UNIT};
