//! Window parameters and protocol mode selection

use crate::sequence::{SeqSpace, MAX_SEQ_SPACE};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default number of packets the sender may have outstanding
pub const DEFAULT_WINDOW_SIZE: usize = 6;

/// Default retransmission timeout (16 simulated time units)
pub const DEFAULT_RTT: Duration = Duration::from_millis(16);

/// Acknowledgment and release policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArqMode {
    /// Cumulative ACKs, in-order receiver, retransmit everything on timeout
    GoBackN,
    /// Per-packet ACKs, buffering receiver, retransmit only expired packets
    SelectiveRepeat,
}

impl ArqMode {
    /// Smallest sequence space that keeps old and new packets apart
    ///
    /// Saturates at `u64::MAX`, which no valid ring reaches.
    pub fn min_seq_space(self, window_size: usize) -> u64 {
        let window = u64::try_from(window_size).unwrap_or(u64::MAX);
        let required = match self {
            ArqMode::GoBackN => window.checked_add(1),
            ArqMode::SelectiveRepeat => window.checked_mul(2),
        };
        required.unwrap_or(u64::MAX)
    }
}

impl fmt::Display for ArqMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArqMode::GoBackN => write!(f, "Go-Back-N"),
            ArqMode::SelectiveRepeat => write!(f, "Selective Repeat"),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Window size must be at least 1")]
    ZeroWindow,

    #[error(
        "{mode} with window {window_size} needs a sequence space of at least {required}, \
         got {seq_space}"
    )]
    SeqSpaceTooSmall {
        mode: ArqMode,
        window_size: usize,
        seq_space: u32,
        required: u64,
    },

    #[error("Sequence space {0} does not fit the packet header (max {max})", max = MAX_SEQ_SPACE)]
    SeqSpaceTooLarge(u32),

    #[error("Retransmission timeout must be non-zero")]
    ZeroRtt,
}

/// Window parameters shared by both endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArqConfig {
    /// Release and retransmission policy
    pub mode: ArqMode,
    /// Maximum number of outstanding (or buffered) packets
    pub window_size: usize,
    /// Size of the sequence-number ring
    pub seq_space: u32,
    /// Retransmission timeout
    pub rtt: Duration,
}

impl ArqConfig {
    /// Create a validated configuration
    pub fn new(
        mode: ArqMode,
        window_size: usize,
        seq_space: u32,
        rtt: Duration,
    ) -> Result<Self, ConfigError> {
        let config = ArqConfig {
            mode,
            window_size,
            seq_space,
            rtt,
        };
        config.validate()?;
        Ok(config)
    }

    /// Go-Back-N with window 6 over a ring of 7
    pub fn go_back_n() -> Self {
        ArqConfig {
            mode: ArqMode::GoBackN,
            window_size: DEFAULT_WINDOW_SIZE,
            seq_space: DEFAULT_WINDOW_SIZE as u32 + 1,
            rtt: DEFAULT_RTT,
        }
    }

    /// Selective Repeat with window 6 over a ring of 12
    pub fn selective_repeat() -> Self {
        ArqConfig {
            mode: ArqMode::SelectiveRepeat,
            window_size: DEFAULT_WINDOW_SIZE,
            seq_space: 2 * DEFAULT_WINDOW_SIZE as u32,
            rtt: DEFAULT_RTT,
        }
    }

    /// Check the window bounds for the selected mode
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.seq_space > MAX_SEQ_SPACE {
            return Err(ConfigError::SeqSpaceTooLarge(self.seq_space));
        }
        let required = self.mode.min_seq_space(self.window_size);
        if u64::from(self.seq_space) < required {
            return Err(ConfigError::SeqSpaceTooSmall {
                mode: self.mode,
                window_size: self.window_size,
                seq_space: self.seq_space,
                required,
            });
        }
        if self.rtt.is_zero() {
            return Err(ConfigError::ZeroRtt);
        }
        Ok(())
    }

    /// The sequence-number ring for these parameters
    pub fn ring(&self) -> SeqSpace {
        SeqSpace::new(self.seq_space)
    }
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self::selective_repeat()
    }
}
