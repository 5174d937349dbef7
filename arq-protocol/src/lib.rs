//! ARQ Protocol Core Implementation
//!
//! This crate implements the reliable-delivery engines of a one-directional
//! ARQ link: packet and checksum handling, sequence-ring arithmetic, the
//! windowed sender with its retransmission timer policy, and the in-order
//! receiver. Both Go-Back-N and Selective Repeat are supported behind one
//! interface, selected by [`ArqMode`].
//!
//! The engines are sans-I/O. A host supplies time, the channel, the sink and
//! the alarm through [`Environment`] and feeds events in as [`Stimulus`]
//! values.

pub mod checksum;
pub mod config;
pub mod endpoint;
pub mod packet;
pub mod receiver;
pub mod sender;
pub mod sequence;
pub mod shared;
pub mod timer;

pub use config::{ArqConfig, ArqMode, ConfigError};
pub use endpoint::{Endpoint, Environment, RecordingEnvironment, Stimulus};
pub use packet::{Message, Packet, PacketError, MSG_LEN, NOT_IN_USE};
pub use receiver::{DataOutcome, Receiver, ReceiverStats};
pub use sender::{AckOutcome, Sender, SenderState, SenderStats, SubmitOutcome};
pub use sequence::SeqSpace;
pub use shared::{Mailbox, MailboxError, SharedEndpoint};
pub use timer::RetransmitTimer;
