//! Hosting an endpoint on more than one thread
//!
//! The engines assume their three stimulus handlers never overlap. A
//! multi-threaded host must serialize them; this module offers two ways:
//!
//! - [`SharedEndpoint`]: the endpoint behind one mutex, locked for the whole
//!   handler.
//! - [`Mailbox`]: a worker thread that owns the endpoint and drains a queue
//!   of stimuli strictly in arrival order.

use crate::endpoint::{Endpoint, Environment, Stimulus};
use crossbeam::channel::{self, Sender as ChannelSender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::debug;

/// Mailbox errors
#[derive(Error, Debug)]
pub enum MailboxError {
    #[error("Mailbox worker has stopped")]
    Closed,

    #[error("Mailbox worker panicked")]
    WorkerPanicked,
}

/// An endpoint shared between threads behind a single lock
pub struct SharedEndpoint<E> {
    inner: Arc<Mutex<E>>,
}

impl<E> Clone for SharedEndpoint<E> {
    fn clone(&self) -> Self {
        SharedEndpoint {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Endpoint> SharedEndpoint<E> {
    /// Wrap an endpoint
    pub fn new(endpoint: E) -> Self {
        SharedEndpoint {
            inner: Arc::new(Mutex::new(endpoint)),
        }
    }

    /// Handle a stimulus while holding the lock
    pub fn handle(&self, env: &mut dyn Environment, stimulus: Stimulus) {
        self.inner.lock().handle(env, stimulus);
    }

    /// Inspect the endpoint while holding the lock
    pub fn with<R>(&self, f: impl FnOnce(&E) -> R) -> R {
        f(&self.inner.lock())
    }
}

/// A worker thread owning one endpoint and its environment
pub struct Mailbox<E, V> {
    tx: ChannelSender<Stimulus>,
    worker: JoinHandle<(E, V)>,
}

impl<E, V> Mailbox<E, V>
where
    E: Endpoint + Send + 'static,
    V: Environment + Send + 'static,
{
    /// Start the worker
    pub fn spawn(mut endpoint: E, mut env: V) -> Self {
        let (tx, rx) = channel::unbounded::<Stimulus>();
        let worker = thread::spawn(move || {
            for stimulus in rx {
                endpoint.handle(&mut env, stimulus);
            }
            debug!("mailbox drained, worker exiting");
            (endpoint, env)
        });
        Mailbox { tx, worker }
    }

    /// Queue a stimulus for the worker
    pub fn post(&self, stimulus: Stimulus) -> Result<(), MailboxError> {
        self.tx.send(stimulus).map_err(|_| MailboxError::Closed)
    }

    /// Stop accepting stimuli, wait for the queue to drain and hand back
    /// the endpoint and its environment
    pub fn shutdown(self) -> Result<(E, V), MailboxError> {
        drop(self.tx);
        self.worker.join().map_err(|_| MailboxError::WorkerPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArqConfig;
    use crate::endpoint::RecordingEnvironment;
    use crate::packet::{Message, Packet};
    use crate::receiver::Receiver;
    use crate::sender::Sender;

    #[test]
    fn test_shared_endpoint_across_threads() {
        let shared = SharedEndpoint::new(Receiver::new(ArqConfig::selective_repeat()).unwrap());

        let handles: Vec<_> = (0..4u32)
            .map(|seq| {
                let shared = shared.clone();
                std::thread::spawn(move || {
                    let mut env = RecordingEnvironment::new();
                    let packet = Packet::data(seq, &Message::filled(b'a'));
                    shared.handle(&mut env, Stimulus::Packet(packet));
                    env.transmitted.len()
                })
            })
            .collect();

        let acks: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(acks, 4);
        assert_eq!(shared.with(|rx| rx.expected()), 4);
    }

    #[test]
    fn test_mailbox_preserves_order() {
        let sender = Sender::new(ArqConfig::go_back_n()).unwrap();
        let mailbox = Mailbox::spawn(sender, RecordingEnvironment::new());

        for n in 0..3u8 {
            mailbox.post(Stimulus::Submit(Message::filled(b'a' + n))).unwrap();
        }
        mailbox.post(Stimulus::Packet(Packet::ack(1))).unwrap();

        let (sender, env) = mailbox.shutdown().unwrap();
        let sent: Vec<i32> = env.transmitted.iter().map(|p| p.seqnum).collect();
        assert_eq!(sent, vec![0, 1, 2]);
        assert_eq!(sender.base(), 2);
        assert_eq!(sender.outstanding(), 1);
    }
}
