mod analyzer;
mod config;
mod error;
mod handlers;
mod rssi_hub;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tokio::sync::{mpsc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use handlers::{now_ms, SharedSnapshot};
use rssi_types::tracker::PetTracker;

// ─── Main ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pettrack_backend=info".into()),
        )
        .init();

    info!("🐾 Pettrack backend starting...");

    // Configuration errors are the only fatal errors — fail fast here.
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("configuration error: {e:#}");
            std::process::exit(1);
        }
    };
    info!(
        "Loaded config: {} rooms ({:?}), {} pets, {:?}, history cap {}",
        cfg.room_count, cfg.room_names, cfg.pet_count, cfg.policy, cfg.history_cap
    );

    let tracker = PetTracker::new(
        cfg.model.clone(),
        cfg.room_count,
        cfg.pet_count,
        cfg.history_cap,
    );
    // Publish the sentinel snapshot so the dashboard has something to read
    // before the first window completes.
    let published: SharedSnapshot = Arc::new(RwLock::new(tracker.snapshot(now_ms())));

    // Listener → coordinator → analyzer plumbing. The window channel is
    // shallow on purpose: if analysis falls behind, windows are dropped at
    // the hub rather than queued without bound.
    let (report_tx, report_rx) = mpsc::channel(256);
    let (window_tx, window_rx) = mpsc::channel(4);

    let ingest = tokio::net::TcpListener::bind(&cfg.ingest_addr)
        .await
        .unwrap();
    tokio::spawn(rssi_hub::run_listener(
        ingest,
        Arc::new(cfg.node_rooms.clone()),
        report_tx,
    ));
    tokio::spawn(rssi_hub::run_coordinator(
        cfg.room_count,
        cfg.policy,
        report_rx,
        window_tx,
    ));
    tokio::spawn(analyzer::run_analyzer(
        window_rx,
        tracker,
        Arc::new(cfg.tags.clone()),
        published.clone(),
    ));

    // CORS — allow all origins so the dashboard can be served from anywhere
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/snapshot", get(handlers::get_snapshot))
        .route("/health", get(handlers::health))
        .with_state(published)
        .layer(cors);

    info!("🚀 Snapshot API listening on {}", cfg.http_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.http_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
