//! Retransmission timer policy
//!
//! Each endpoint owns exactly one single-shot alarm, but every outstanding
//! packet has its own deadline. [`RetransmitTimer`] keeps the alarm pointed
//! at the earliest pending deadline: the sender hands it that deadline after
//! every change to its outstanding set and the policy arms, re-arms or
//! disarms the hardware alarm accordingly.

use crate::endpoint::Environment;
use std::time::Duration;
use tracing::trace;

/// Single alarm multiplexed over many per-packet deadlines
#[derive(Debug, Default, Clone)]
pub struct RetransmitTimer {
    /// Absolute deadline the alarm is currently armed for
    armed_for: Option<Duration>,
}

impl RetransmitTimer {
    /// Create an inactive timer
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the alarm is currently armed
    #[inline]
    pub fn is_active(&self) -> bool {
        self.armed_for.is_some()
    }

    /// Absolute deadline of the armed alarm
    #[inline]
    pub fn deadline(&self) -> Option<Duration> {
        self.armed_for
    }

    /// Point the alarm at `next_deadline`
    ///
    /// `None` means nothing is outstanding and the alarm is disarmed. An
    /// alarm already armed for the same deadline is left alone; any other
    /// armed alarm is disarmed before the new one is started, so the host
    /// never sees two pending alarms for this endpoint.
    pub fn schedule<E>(&mut self, env: &mut E, next_deadline: Option<Duration>)
    where
        E: Environment + ?Sized,
    {
        match next_deadline {
            Some(deadline) if self.armed_for == Some(deadline) => {}
            Some(deadline) => {
                if self.armed_for.is_some() {
                    env.disarm_timer();
                }
                let after = deadline.saturating_sub(env.now());
                trace!(?after, "arming retransmission timer");
                env.arm_timer(after);
                self.armed_for = Some(deadline);
            }
            None => self.cancel(env),
        }
    }

    /// Disarm the alarm if it is armed
    pub fn cancel<E>(&mut self, env: &mut E)
    where
        E: Environment + ?Sized,
    {
        if self.armed_for.take().is_some() {
            trace!("disarming retransmission timer");
            env.disarm_timer();
        }
    }

    /// Record that the host alarm went off and is no longer pending
    #[inline]
    pub fn fired(&mut self) {
        self.armed_for = None;
    }
}
