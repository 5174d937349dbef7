//! Shared helpers for the cross-crate ARQ tests

use arq_protocol::ArqConfig;
use arq_sim::{ChannelConfig, Fault, SimConfig, SimReport, Simulator};

/// One-way delay used by scripted scenarios, in time units
pub const SCENARIO_DELAY: f64 = 2.0;

/// A run where every message is offered at time zero over a channel with a
/// fixed delay and only the given scripted faults
pub fn scripted(arq: ArqConfig, messages: u64, faults: Vec<Fault>) -> SimConfig {
    SimConfig {
        arq,
        channel: ChannelConfig::reliable().with_fixed_delay(SCENARIO_DELAY),
        faults,
        messages,
        mean_interval: 0.0,
        ..SimConfig::default()
    }
}

/// Run a scripted scenario to completion
pub fn run_scripted(arq: ArqConfig, messages: u64, faults: Vec<Fault>) -> SimReport {
    match Simulator::new(scripted(arq, messages, faults)) {
        Ok(sim) => sim.run(),
        Err(e) => panic!("invalid scenario setup: {}", e),
    }
}

/// Run a randomised emulation to completion
pub fn run(config: SimConfig) -> SimReport {
    match Simulator::new(config) {
        Ok(sim) => sim.run(),
        Err(e) => panic!("invalid emulation setup: {}", e),
    }
}

/// The first `n` messages of the emulator traffic pattern
pub fn expected_messages(n: u64) -> Vec<arq_protocol::Message> {
    (0..n).map(Simulator::message).collect()
}
