//! ARQ Emulator - Go-Back-N / Selective Repeat over a simulated lossy link
//!
//! Runs the sender and receiver engines against each other and prints the
//! run statistics. Exits with an error if the receiving application did not
//! get exactly the messages the sender accepted, in order.

use anyhow::Context;
use arq_cli::{display_report, Config, Mode};
use arq_sim::Simulator;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "arq-emulator")]
#[command(about = "Go-Back-N / Selective Repeat network emulator", long_about = None)]
struct Args {
    /// TOML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Protocol variant
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Window size
    #[arg(short, long)]
    window: Option<usize>,

    /// Sequence number space
    #[arg(long)]
    seq_space: Option<u32>,

    /// Retransmission timeout in time units
    #[arg(long)]
    rtt: Option<f64>,

    /// Number of messages to simulate
    #[arg(short = 'n', long)]
    messages: Option<u64>,

    /// Packet loss probability
    #[arg(long)]
    loss: Option<f64>,

    /// Packet corruption probability
    #[arg(long)]
    corrupt: Option<f64>,

    /// Packet duplication probability
    #[arg(long)]
    duplicate: Option<f64>,

    /// Mean time between messages from the application, in time units
    #[arg(short, long)]
    interval: Option<f64>,

    /// Random seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Trace level: 0 warnings only, 1 protocol events, 2 every packet
    #[arg(short, long, default_value = "0")]
    trace: u8,

    /// Write an example configuration file and exit
    #[arg(long, value_name = "PATH")]
    write_example: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(mode) = self.mode {
            // Preset window and ring follow the mode unless given explicitly
            if mode != config.protocol.mode {
                config.protocol.window_size = None;
                config.protocol.seq_space = None;
            }
            config.protocol.mode = mode;
        }
        if let Some(window) = self.window {
            config.protocol.window_size = Some(window);
        }
        if let Some(seq_space) = self.seq_space {
            config.protocol.seq_space = Some(seq_space);
        }
        if let Some(rtt) = self.rtt {
            config.protocol.rtt = rtt;
        }
        if let Some(messages) = self.messages {
            config.traffic.messages = messages;
        }
        if let Some(loss) = self.loss {
            config.channel.loss = loss;
        }
        if let Some(corrupt) = self.corrupt {
            config.channel.corrupt = corrupt;
        }
        if let Some(duplicate) = self.duplicate {
            config.channel.duplicate = duplicate;
        }
        if let Some(interval) = self.interval {
            config.traffic.mean_interval = interval;
        }
        if let Some(seed) = self.seed {
            config.traffic.seed = seed;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.trace {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(path) = &args.write_example {
        Config::example()
            .to_file(path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Example configuration written to {}", path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Config::default(),
    };
    args.apply(&mut config);

    let sim_config = config.sim_config()?;
    tracing::info!(
        mode = %sim_config.arq.mode,
        window = sim_config.arq.window_size,
        seq_space = sim_config.arq.seq_space,
        loss = sim_config.channel.loss,
        corrupt = sim_config.channel.corrupt,
        duplicate = sim_config.channel.duplicate,
        "ARQ emulator starting"
    );

    let report = Simulator::new(sim_config)?.run();
    display_report(&report);

    if !report.is_consistent() {
        anyhow::bail!(
            "delivered stream differs from accepted stream ({} accepted, {} delivered)",
            report.accepted.len(),
            report.delivered.len()
        );
    }
    if !report.finished {
        tracing::warn!("time limit reached before all traffic completed");
    }

    Ok(())
}
