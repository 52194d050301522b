//! Entry point for `two-layer-sim`.
//!
//! Parses CLI arguments, builds the [`SimConfig`] and runs the default
//! two-connection scenario.  All protocol work is delegated to library
//! modules; `main.rs` owns only process setup (logging, Ctrl-C handling,
//! argument parsing).

use anyhow::Result;
use clap::{Parser, ValueEnum};
use tokio::sync::watch;

use two_layer_sim::{configure, simulation, SimConfig, Transcript};

/// Bidirectional multi-message network simulation between four processes
/// on two nodes.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Put each layer to sleep briefly so the exchange can be followed.
    #[arg(
        short = 'd',
        long,
        value_enum,
        default_value_t = Toggle::Off,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "on"
    )]
    layers_delays: Toggle,

    /// Let the channel occasionally flip a bit, closing the affected connection.
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value_t = Toggle::Off,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "on"
    )]
    channel_faults: Toggle,

    /// Seed the channels' RNGs for a reproducible fault pattern.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Toggle {
    On,
    Off,
}

impl Cli {
    fn config(&self) -> SimConfig {
        let config = configure(
            self.layers_delays == Toggle::On,
            self.channel_faults == Toggle::On,
        );
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise env_logger; set RUST_LOG to control verbosity.
    env_logger::init();

    let cli = Cli::parse();
    let config = cli.config();
    log::info!(
        "delays {}, faults {}",
        if config.delays_enabled() { "on" } else { "off" },
        if config.faults_enabled { "on" } else { "off" }
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Ctrl-C received, stopping connections");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => log::warn!("cannot listen for Ctrl-C: {e}"),
        }
    });

    let outcomes = simulation::run(config, Transcript::stdout(), shutdown_rx).await;
    for outcome in &outcomes {
        log::debug!("{outcome:?}");
    }
    Ok(())
}
