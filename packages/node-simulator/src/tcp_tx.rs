//! tcp_tx.rs — TCP report transmitter
//!
//! One connection per room per window, matching the real nodes: connect,
//! write the whole report, close. The backend tells nodes apart by source
//! IP, so each simulated node binds its own loopback address
//! (127.0.0.1 for room 0, 127.0.0.2 for room 1, ...) — point the
//! backend's `[nodes]` table at those.
//!
//! Send errors are logged and skipped; a dead backend never crashes the
//! sim.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use rssi_types::wire::RawReading;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpSocket;
use tracing::{debug, warn};

pub struct TcpReporter {
    backend_addr: SocketAddr,
}

impl TcpReporter {
    pub fn new(backend_addr: &str) -> Self {
        let backend_addr = backend_addr.parse().expect("invalid backend address");
        Self { backend_addr }
    }

    /// Loopback source address for a room's simulated node.
    fn source_addr(room: usize) -> SocketAddr {
        let ip = Ipv4Addr::new(127, 0, 0, (room + 1) as u8);
        SocketAddr::new(IpAddr::V4(ip), 0)
    }

    /// Send one window's readings, one report per room. A room with no
    /// readings still reports — an empty scan is a valid report.
    pub async fn send_window(&self, per_room: &[Vec<RawReading>]) {
        for (room, readings) in per_room.iter().enumerate() {
            if let Err(e) = self.send_report(room, readings).await {
                warn!("TCP: room {room} report failed: {e}");
            }
        }
    }

    async fn send_report(&self, room: usize, readings: &[RawReading]) -> std::io::Result<()> {
        let socket = TcpSocket::new_v4()?;
        socket.bind(Self::source_addr(room))?;
        let mut stream = socket.connect(self.backend_addr).await?;
        stream.write_all(encode_report(readings).as_bytes()).await?;
        stream.shutdown().await?;
        debug!(
            "TCP → {} room {room}: {} readings",
            self.backend_addr,
            readings.len()
        );
        Ok(())
    }
}

/// Wire encoding: one `"tag, rssi;"` entry per reading, newline-terminated.
pub fn encode_report(readings: &[RawReading]) -> String {
    let mut out = String::new();
    for r in readings {
        out.push_str(&r.tag);
        out.push_str(", ");
        out.push_str(&r.rssi.to_string());
        out.push(';');
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rssi_types::wire::parse_report;

    #[test]
    fn encoded_reports_parse_back_unchanged() {
        let readings = vec![
            RawReading {
                tag: "c8:a0:f1:69:d0:9c".to_string(),
                rssi: -50,
            },
            RawReading {
                tag: "c9:f2:08:ec:88:19".to_string(),
                rssi: -71,
            },
        ];
        let (parsed, malformed) = parse_report(encode_report(&readings).as_bytes());
        assert_eq!(parsed, readings);
        assert!(malformed.is_empty());
    }

    #[test]
    fn empty_report_is_a_bare_newline() {
        assert_eq!(encode_report(&[]), "\n");
        let (parsed, malformed) = parse_report(b"\n");
        assert!(parsed.is_empty());
        assert!(malformed.is_empty());
    }
}
