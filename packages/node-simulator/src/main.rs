//! main.rs — room sensor node simulator entry point
//!
//! Simulates the per-room BLE scanner nodes feeding a pettrack backend:
//! every reporting interval each simulated node opens one TCP connection,
//! writes its window's tag sightings in the line wire format, and closes.
//! Ground truth stays available in the logs so localization quality can be
//! eyeballed against what the backend publishes.

mod pet_sim;
mod tcp_tx;

use clap::Parser;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use pet_sim::{PetSim, SimConfig};
use tcp_tx::TcpReporter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "node-sim", about = "Pettrack room sensor node simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Backend ingest address
    #[arg(long, default_value = "127.0.0.1:12345")]
    backend: String,
    /// Reporting interval in seconds
    #[arg(long, default_value = "10")]
    interval_secs: u64,
    /// Stop after this many windows (0 = run forever)
    #[arg(long, default_value = "0")]
    windows: u64,
    /// RNG seed for repeatable runs (default: entropy)
    #[arg(long)]
    seed: Option<u64>,
}

// ── Main ──────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "node_simulator=info".into()),
        )
        .init();

    let args = Args::parse();

    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let cfg: SimConfig = toml::from_str(&config_str).expect("Invalid config.toml");

    info!(
        "🛰  Node simulator starting — {} rooms, {} pets, every {}s → {}",
        cfg.rooms,
        cfg.pets.len(),
        args.interval_secs,
        args.backend
    );

    let mut sim = PetSim::new(cfg, args.seed);
    let reporter = TcpReporter::new(&args.backend);

    let mut ticker = interval(Duration::from_secs(args.interval_secs));
    let mut sent = 0u64;
    loop {
        ticker.tick().await;
        let per_room = sim.step();
        debug!("ground truth: {:?}", sim.ground_truth());
        reporter.send_window(&per_room).await;
        sent += 1;
        if args.windows > 0 && sent >= args.windows {
            break;
        }
    }
    info!("node-sim: sent {sent} windows, done");
}
