//! Configuration file support for the emulator
//!
//! Every table and field is optional; anything left out falls back to the
//! emulator defaults, and command-line flags override the file.

use arq_protocol::{ArqConfig, ArqMode};
use arq_sim::{ChannelConfig, SimConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Protocol variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Go-Back-N
    Gbn,
    /// Selective Repeat
    Sr,
}

impl From<Mode> for ArqMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Gbn => ArqMode::GoBackN,
            Mode::Sr => ArqMode::SelectiveRepeat,
        }
    }
}

impl Mode {
    /// Window size and sequence space used when none are given
    fn preset(self) -> ArqConfig {
        match self {
            Mode::Gbn => ArqConfig::go_back_n(),
            Mode::Sr => ArqConfig::selective_repeat(),
        }
    }
}

/// `[protocol]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSection {
    /// Protocol variant
    #[serde(default = "default_mode")]
    pub mode: Mode,
    /// Window size; the mode's preset when absent
    pub window_size: Option<usize>,
    /// Sequence space; the mode's preset when absent
    pub seq_space: Option<u32>,
    /// Retransmission timeout in time units
    #[serde(default = "default_rtt")]
    pub rtt: f64,
}

fn default_mode() -> Mode {
    Mode::Sr
}

fn default_rtt() -> f64 {
    16.0
}

impl Default for ProtocolSection {
    fn default() -> Self {
        ProtocolSection {
            mode: default_mode(),
            window_size: None,
            seq_space: None,
            rtt: default_rtt(),
        }
    }
}

/// `[channel]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSection {
    /// Loss probability
    pub loss: f64,
    /// Corruption probability
    pub corrupt: f64,
    /// Duplication probability
    pub duplicate: f64,
    /// Shortest one-way delay in time units
    pub min_delay: f64,
    /// Longest one-way delay in time units
    pub max_delay: f64,
}

impl Default for ChannelSection {
    fn default() -> Self {
        let channel = ChannelConfig::default();
        ChannelSection {
            loss: channel.loss,
            corrupt: channel.corrupt,
            duplicate: channel.duplicate,
            min_delay: channel.min_delay,
            max_delay: channel.max_delay,
        }
    }
}

/// `[traffic]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficSection {
    /// Number of messages to generate
    pub messages: u64,
    /// Mean time between messages in time units
    pub mean_interval: f64,
    /// RNG seed
    pub seed: u64,
    /// Simulated time limit in time units
    pub max_time: f64,
}

impl Default for TrafficSection {
    fn default() -> Self {
        TrafficSection {
            messages: 10,
            mean_interval: 1000.0,
            seed: 1234,
            max_time: arq_sim::simulator::DEFAULT_MAX_TIME,
        }
    }
}

/// Emulator configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Protocol parameters
    pub protocol: ProtocolSection,
    /// Channel impairments
    pub channel: ChannelSection,
    /// Traffic pattern
    pub traffic: TrafficSection,
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigFileError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigFileError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigFileError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Example configuration: Go-Back-N over a moderately bad channel
    pub fn example() -> Self {
        Config {
            protocol: ProtocolSection {
                mode: Mode::Gbn,
                window_size: Some(6),
                seq_space: Some(7),
                rtt: 16.0,
            },
            channel: ChannelSection {
                loss: 0.1,
                corrupt: 0.1,
                duplicate: 0.05,
                ..ChannelSection::default()
            },
            traffic: TrafficSection {
                messages: 100,
                mean_interval: 10.0,
                ..TrafficSection::default()
            },
        }
    }

    /// Validated protocol parameters
    pub fn arq_config(&self) -> Result<ArqConfig, ConfigFileError> {
        let preset = self.protocol.mode.preset();
        let rtt = match arq_sim::time::try_from_units(self.protocol.rtt) {
            Some(rtt) if self.protocol.rtt > 0.0 => rtt,
            _ => {
                return Err(ConfigFileError::Invalid(format!(
                    "rtt must be a positive, representable time, got {}",
                    self.protocol.rtt
                )))
            }
        };
        let config = ArqConfig::new(
            self.protocol.mode.into(),
            self.protocol.window_size.unwrap_or(preset.window_size),
            self.protocol.seq_space.unwrap_or(preset.seq_space),
            rtt,
        )?;
        Ok(config)
    }

    /// Full emulator setup
    pub fn sim_config(&self) -> Result<SimConfig, ConfigFileError> {
        let max_time = arq_sim::time::try_from_units(self.traffic.max_time).ok_or_else(|| {
            ConfigFileError::Invalid(format!(
                "max_time must be a non-negative, representable time, got {}",
                self.traffic.max_time
            ))
        })?;
        Ok(SimConfig {
            arq: self.arq_config()?,
            channel: ChannelConfig {
                loss: self.channel.loss,
                corrupt: self.channel.corrupt,
                duplicate: self.channel.duplicate,
                min_delay: self.channel.min_delay,
                max_delay: self.channel.max_delay,
            },
            faults: Vec::new(),
            messages: self.traffic.messages,
            mean_interval: self.traffic.mean_interval,
            seed: self.traffic.seed,
            max_time,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid protocol settings: {0}")]
    Protocol(#[from] arq_protocol::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
