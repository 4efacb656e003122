//! replay.rs — offline evaluation over recorded averaged-RSSI captures
//!
//! Replays per-window, per-room averaged RSSI recordings through the same
//! instantaneous localizer and HMM smoother the backend runs, and scores
//! both against a fixed ground-truth room per pet. Recording format, one
//! window per set of R room blocks:
//!
//! ```text
//! 0
//! c8:a0:f1:69:d0:9c,-52.5
//! c9:f2:08:ec:88:19,-78.0
//! 1
//! c9:f2:08:ec:88:19,-60.25
//! ...
//! ```
//!
//! A bare integer line opens that room's block; `addr,rssi` lines belong
//! to the open block; a room id at or below the previous one starts the
//! next window.

use std::collections::HashMap;

use clap::Parser;
use rssi_types::analysis::locate_instant;
use rssi_types::config::SystemConfig;
use rssi_types::tracker::PetTracker;

#[derive(Parser, Debug)]
#[command(
    name = "replay-eval",
    about = "Score recorded RSSI captures against ground truth"
)]
struct Args {
    /// Backend deployment config (tables + HMM model)
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// Ground-truth room per pet, comma-separated (e.g. "0,3")
    #[arg(long)]
    truth: String,
    /// Recorded averaged-RSSI capture files
    #[arg(required = true)]
    files: Vec<String>,
}

fn main() {
    let args = Args::parse();

    let raw = std::fs::read_to_string(&args.config).expect("could not read config");
    let cfg = toml::from_str::<SystemConfig>(&raw)
        .expect("invalid config TOML")
        .validate()
        .expect("invalid configuration");

    let truth: Vec<usize> = args
        .truth
        .split(',')
        .map(|t| t.trim().parse().expect("bad --truth entry"))
        .collect();
    assert_eq!(
        truth.len(),
        cfg.pet_count,
        "--truth needs one room per pet"
    );

    let mut tracker = PetTracker::new(
        cfg.model.clone(),
        cfg.room_count,
        cfg.pet_count,
        cfg.history_cap,
    );
    let mut instant_hits = vec![0u64; cfg.pet_count];
    let mut smoothed_hits = vec![0u64; cfg.pet_count];
    let mut windows = 0u64;

    for file in &args.files {
        let text =
            std::fs::read_to_string(file).unwrap_or_else(|e| panic!("could not read {file}: {e}"));
        for window in parse_recording(&text, cfg.room_count) {
            let instant = locate_instant(&window, &cfg.tags, cfg.pet_count);
            let smoothed = tracker.observe(&instant);
            windows += 1;
            for pet in 0..cfg.pet_count {
                if instant[pet] == truth[pet] {
                    instant_hits[pet] += 1;
                }
                if smoothed[pet] == truth[pet] {
                    smoothed_hits[pet] += 1;
                }
            }
        }
    }

    if windows == 0 {
        println!("no windows found in {} file(s)", args.files.len());
        return;
    }

    let pct = |hits: u64| 100.0 * hits as f64 / windows as f64;
    println!("{windows} windows replayed");
    for pet in 0..cfg.pet_count {
        println!(
            "pet {pet} (truth: room {}): instantaneous {:>5.1}%  smoothed {:>5.1}%",
            truth[pet],
            pct(instant_hits[pet]),
            pct(smoothed_hits[pet])
        );
    }
    let mean = |hits: &[u64]| hits.iter().map(|&h| pct(h)).sum::<f64>() / hits.len() as f64;
    println!(
        "mean: instantaneous {:>5.1}%  smoothed {:>5.1}%",
        mean(&instant_hits),
        mean(&smoothed_hits)
    );
}

/// Parse a capture into per-window, per-room tag → averaged-RSSI maps.
/// Unparseable reading lines are skipped; room ids outside the configured
/// range drop their block.
fn parse_recording(text: &str, room_count: usize) -> Vec<Vec<HashMap<String, f64>>> {
    let mut windows = Vec::new();
    let mut current: Vec<HashMap<String, f64>> = vec![HashMap::new(); room_count];
    // Split tracking is separate from the open block: a dropped
    // out-of-range block must not hide the wrap to the next window.
    let mut last_id: Option<usize> = None;
    let mut open_room: Option<usize> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Ok(room) = line.parse::<usize>() {
            if last_id.is_some_and(|prev| room <= prev) {
                windows.push(std::mem::replace(
                    &mut current,
                    vec![HashMap::new(); room_count],
                ));
            }
            last_id = Some(room);
            open_room = (room < room_count).then_some(room);
        } else if let Some(room) = open_room {
            let Some((addr, rssi)) = line.split_once(',') else {
                continue;
            };
            if let Ok(rssi) = rssi.trim().parse::<f64>() {
                current[room].insert(addr.trim().to_string(), rssi);
            }
        }
    }
    if last_id.is_some() {
        windows.push(current);
    }
    windows
}
