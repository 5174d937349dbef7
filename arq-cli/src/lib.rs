//! ARQ CLI Library
//!
//! Shared functionality for the emulator command-line tool.

pub mod config;
pub mod stats;

pub use config::{ChannelSection, Config, ConfigFileError, Mode, ProtocolSection, TrafficSection};
pub use stats::{display_report, format_time_units, render_report};
