//! # rssi_hub
//!
//! RSSI ingestion hub — accepts report connections from the room sensor
//! nodes, batches them into collection windows, and hands each closed
//! window to the analyzer task.
//!
//! ## Architecture
//! Two cooperating tasks, both spawned from `main`:
//!   1. Listener: accepts TCP connections, resolves the peer IP to a room
//!      via the node table, reads the payload to EOF (a node may write in
//!      several chunks; the connection close is the message boundary),
//!      parses it, and forwards a `RoomReport` over an mpsc channel.
//!   2. Coordinator: sole owner of the open `CollectionWindow`. Appends
//!      each report to its room slot and decides completion per the
//!      configured policy, then swaps in a fresh window and hands the
//!      closed one to the analyzer.
//!
//! ## Invariants
//! - Connection-level failures (unknown source, resets, malformed entries)
//!   never crash the accept loop or touch other rooms' data.
//! - Only the coordinator task mutates the open window, so the
//!   swap-on-close is a single atomic step relative to appends: a report
//!   is either wholly in the old window or wholly in the new one.
//! - A slow analyzer never blocks ingestion: closed windows are handed
//!   off with `try_send` and dropped with a warning when the channel is
//!   full.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use rssi_types::config::WindowPolicy;
use rssi_types::wire::{parse_report, RawReading};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::HubError;

/// One parsed report attributed to a room, on its way to the coordinator.
#[derive(Debug)]
pub struct RoomReport {
    pub room: usize,
    pub readings: Vec<RawReading>,
}

/// A closed collection window: every reading received per room while it
/// was open, plus which rooms reported at all (a room can report an empty
/// scan — that still counts as reporting).
#[derive(Debug)]
pub struct ClosedWindow {
    pub rooms: Vec<Vec<RawReading>>,
    pub reported: Vec<bool>,
}

impl ClosedWindow {
    pub fn reporting_rooms(&self) -> usize {
        self.reported.iter().filter(|&&r| r).count()
    }
}

// ── Listener ──────────────────────────────────────────────────────────────────

/// Accept loop. Runs until the process exits; accept errors are logged and
/// skipped, never fatal.
pub async fn run_listener(
    listener: TcpListener,
    node_rooms: Arc<HashMap<IpAddr, usize>>,
    report_tx: mpsc::Sender<RoomReport>,
) {
    if let Ok(addr) = listener.local_addr() {
        info!("📡 RSSI hub listening on {addr}");
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let node_rooms = node_rooms.clone();
                let report_tx = report_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, peer, &node_rooms, &report_tx).await {
                        warn!("RSSI: dropped connection from {peer}: {e}");
                    }
                });
            }
            Err(e) => warn!("RSSI: accept error: {e}"),
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    node_rooms: &HashMap<IpAddr, usize>,
    report_tx: &mpsc::Sender<RoomReport>,
) -> Result<(), HubError> {
    let room = *node_rooms
        .get(&peer.ip())
        .ok_or(HubError::UnknownSource(peer.ip()))?;

    // A single read is not the whole message — nodes batch several scan
    // lines per connection. EOF (peer close) ends the payload.
    let mut payload = Vec::new();
    stream.read_to_end(&mut payload).await?;

    let (readings, malformed) = parse_report(&payload);
    for entry in &malformed {
        warn!(
            "RSSI: room {room}: skipped entry {:?}: {}",
            entry.raw, entry.reason
        );
    }
    debug!(
        "RSSI: room {room} reported {} readings ({} skipped)",
        readings.len(),
        malformed.len()
    );

    // An empty scan still marks the room as reported for this window.
    let _ = report_tx.send(RoomReport { room, readings }).await;
    Ok(())
}

// ── Coordinator ───────────────────────────────────────────────────────────────

/// The open aggregation window. Owned exclusively by the coordinator task.
struct OpenWindow {
    rooms: Vec<Vec<RawReading>>,
    reported: Vec<bool>,
}

impl OpenWindow {
    fn new(room_count: usize) -> Self {
        Self {
            rooms: vec![Vec::new(); room_count],
            reported: vec![false; room_count],
        }
    }

    /// Append — never overwrite. A room may legitimately report more than
    /// once per window; all of its readings are kept.
    fn append(&mut self, report: RoomReport) {
        self.reported[report.room] = true;
        self.rooms[report.room].extend(report.readings);
    }

    fn all_rooms_reported(&self) -> bool {
        self.reported.iter().all(|&r| r)
    }

    /// Swap in a fresh window, returning the closed contents.
    fn take(&mut self) -> ClosedWindow {
        let room_count = self.rooms.len();
        let fresh = Self::new(room_count);
        let old = std::mem::replace(self, fresh);
        ClosedWindow {
            rooms: old.rooms,
            reported: old.reported,
        }
    }
}

/// Window coordinator. Exits when every listener-side sender is gone.
pub async fn run_coordinator(
    room_count: usize,
    policy: WindowPolicy,
    mut report_rx: mpsc::Receiver<RoomReport>,
    window_tx: mpsc::Sender<ClosedWindow>,
) {
    let mut window = OpenWindow::new(room_count);

    // The ticker only drives the time-based policy; the select guard keeps
    // it from ever firing under count-based. First tick one full period
    // out, not immediately.
    let period = match policy {
        WindowPolicy::TimeBased { period } => period,
        WindowPolicy::CountBased => Duration::from_secs(3600),
    };
    let mut ticker = interval_at(Instant::now() + period, period);

    loop {
        tokio::select! {
            maybe_report = report_rx.recv() => {
                let Some(report) = maybe_report else {
                    info!("RSSI hub: report channel closed, coordinator stopping");
                    return;
                };
                window.append(report);
                if policy == WindowPolicy::CountBased && window.all_rooms_reported() {
                    close_window(&mut window, &window_tx);
                }
            }
            _ = ticker.tick(), if matches!(policy, WindowPolicy::TimeBased { .. }) => {
                close_window(&mut window, &window_tx);
            }
        }
    }
}

fn close_window(window: &mut OpenWindow, window_tx: &mpsc::Sender<ClosedWindow>) {
    let closed = window.take();
    let reporting = closed.reporting_rooms();
    let room_count = closed.rooms.len();
    if reporting < room_count {
        debug!("RSSI hub: partial window, {reporting}/{room_count} rooms reported");
    }
    if window_tx.try_send(closed).is_err() {
        warn!("RSSI hub: analyzer lagging, dropped a closed window");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::time::timeout;

    fn reading(tag: &str, rssi: i32) -> RawReading {
        RawReading {
            tag: tag.to_string(),
            rssi,
        }
    }

    fn report(room: usize, tags: &[(&str, i32)]) -> RoomReport {
        RoomReport {
            room,
            readings: tags.iter().map(|&(t, r)| reading(t, r)).collect(),
        }
    }

    async fn recv_window(rx: &mut mpsc::Receiver<ClosedWindow>) -> ClosedWindow {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for a closed window")
            .expect("window channel closed")
    }

    #[tokio::test]
    async fn count_based_waits_for_every_room() {
        let (report_tx, report_rx) = mpsc::channel(64);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        tokio::spawn(run_coordinator(
            3,
            WindowPolicy::CountBased,
            report_rx,
            window_tx,
        ));

        report_tx.send(report(0, &[("aa", -40)])).await.unwrap();
        report_tx.send(report(1, &[("aa", -60)])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(window_rx.try_recv().is_err());

        report_tx.send(report(2, &[])).await.unwrap();
        let window = recv_window(&mut window_rx).await;
        assert_eq!(window.reporting_rooms(), 3);
        assert_eq!(window.rooms[0], vec![reading("aa", -40)]);
        assert_eq!(window.rooms[2], Vec::<RawReading>::new());
    }

    #[tokio::test]
    async fn concurrent_reports_from_distinct_rooms_all_land() {
        let (report_tx, report_rx) = mpsc::channel(64);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        tokio::spawn(run_coordinator(
            4,
            WindowPolicy::CountBased,
            report_rx,
            window_tx,
        ));

        // Two reports per room for rooms 0..3, sent from concurrent tasks;
        // room 3 is withheld so the window cannot close underneath them.
        let mut handles = Vec::new();
        for room in 0..3 {
            for batch in 0..2 {
                let tx = report_tx.clone();
                handles.push(tokio::spawn(async move {
                    let tag = format!("tag-{room}-{batch}");
                    tx.send(report(room, &[(&tag, -40 - batch)])).await.unwrap();
                }));
            }
        }
        for handle in handles {
            handle.await.unwrap();
        }
        report_tx.send(report(3, &[("last", -70)])).await.unwrap();

        let window = recv_window(&mut window_rx).await;
        for room in 0..3 {
            let mut tags: Vec<String> =
                window.rooms[room].iter().map(|r| r.tag.clone()).collect();
            tags.sort_unstable();
            assert_eq!(
                tags,
                vec![format!("tag-{room}-0"), format!("tag-{room}-1")],
                "room {room} lost or duplicated a report"
            );
        }
        assert_eq!(window.rooms[3], vec![reading("last", -70)]);
    }

    #[tokio::test]
    async fn repeat_reports_append_not_overwrite() {
        let (report_tx, report_rx) = mpsc::channel(64);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        tokio::spawn(run_coordinator(
            2,
            WindowPolicy::CountBased,
            report_rx,
            window_tx,
        ));

        report_tx.send(report(0, &[("aa", -50)])).await.unwrap();
        report_tx.send(report(0, &[("aa", -52)])).await.unwrap();
        report_tx.send(report(1, &[("bb", -60)])).await.unwrap();

        let window = recv_window(&mut window_rx).await;
        assert_eq!(window.rooms[0], vec![reading("aa", -50), reading("aa", -52)]);
    }

    #[tokio::test]
    async fn swap_installs_a_fresh_independent_window() {
        let (report_tx, report_rx) = mpsc::channel(64);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        tokio::spawn(run_coordinator(
            1,
            WindowPolicy::CountBased,
            report_rx,
            window_tx,
        ));

        report_tx.send(report(0, &[("first", -40)])).await.unwrap();
        let first = recv_window(&mut window_rx).await;
        report_tx.send(report(0, &[("second", -45)])).await.unwrap();
        let second = recv_window(&mut window_rx).await;

        assert_eq!(first.rooms[0], vec![reading("first", -40)]);
        assert_eq!(second.rooms[0], vec![reading("second", -45)]);
    }

    #[tokio::test(start_paused = true)]
    async fn time_based_closes_partial_windows() {
        let (report_tx, report_rx) = mpsc::channel(64);
        let (window_tx, mut window_rx) = mpsc::channel(4);
        // Period shorter than the recv timeout so the paused clock hits the
        // window tick first.
        tokio::spawn(run_coordinator(
            4,
            WindowPolicy::TimeBased {
                period: Duration::from_secs(1),
            },
            report_rx,
            window_tx,
        ));

        report_tx.send(report(1, &[("aa", -48)])).await.unwrap();
        let window = recv_window(&mut window_rx).await;
        assert_eq!(window.reporting_rooms(), 1);
        assert_eq!(window.rooms[1], vec![reading("aa", -48)]);
        assert!(window.rooms[0].is_empty());
    }

    #[tokio::test]
    async fn tcp_report_reaches_the_coordinator_channel() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let table: HashMap<IpAddr, usize> = HashMap::from([("127.0.0.1".parse().unwrap(), 0)]);
        let (report_tx, mut report_rx) = mpsc::channel(64);
        tokio::spawn(run_listener(listener, Arc::new(table), report_tx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"aa:bb, -40;").await.unwrap();
        stream.write_all(b"cc:dd, -55;\n").await.unwrap();
        drop(stream);

        let report = timeout(Duration::from_secs(2), report_rx.recv())
            .await
            .expect("timed out")
            .expect("listener dropped the channel");
        assert_eq!(report.room, 0);
        assert_eq!(
            report.readings,
            vec![reading("aa:bb", -40), reading("cc:dd", -55)]
        );
    }

    #[tokio::test]
    async fn unregistered_source_contributes_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Empty node table: every source is unknown.
        let (report_tx, mut report_rx) = mpsc::channel(64);
        tokio::spawn(run_listener(listener, Arc::new(HashMap::new()), report_tx));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"aa:bb, -40;").await.unwrap();
        drop(stream);

        let got = timeout(Duration::from_millis(200), report_rx.recv()).await;
        assert!(got.is_err(), "unknown source must be dropped");
    }
}
