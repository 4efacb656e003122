//! Report wire format.
//!
//! Sensor nodes batch their BLE scan results and push them over one
//! short-lived TCP connection per reporting interval: connect, write, close.
//! The payload is plain text — zero or more `;`-terminated entries of the
//! form `"<tag-address>, <signed-int-rssi>"`, optionally spread across
//! several newline-separated lines.
//!
//! Parsing is lenient per entry and never fails a whole payload: malformed
//! entries come back as diagnostics and are skipped, the rest of the payload
//! is kept.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One tag sighting reported by a sensor node: which beacon, how loud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReading {
    /// Tag hardware address, e.g. `c8:a0:f1:69:d0:9c`
    pub tag: String,
    /// Received signal strength in dBm (less negative = closer)
    pub rssi: i32,
}

/// Why a single payload entry was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("missing ',' separator")]
    MissingSeparator,
    #[error("RSSI is not an integer: {0:?}")]
    BadRssi(String),
}

/// A skipped entry plus the reason, surfaced so the ingest side can log it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedEntry {
    pub raw: String,
    pub reason: EntryError,
}

/// Parse one connection's full payload into readings.
///
/// Splits on newlines, discards blank lines, then splits each line on `;`.
/// Whitespace and line-ending noise around every field is trimmed; entries
/// that are empty after trimming are skipped silently, so a trailing or
/// missing `;` never drops a valid entry.
pub fn parse_report(payload: &[u8]) -> (Vec<RawReading>, Vec<MalformedEntry>) {
    let text = String::from_utf8_lossy(payload);
    let mut readings = Vec::new();
    let mut malformed = Vec::new();

    for line in text.lines() {
        for entry in line.split(';') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            match parse_entry(entry) {
                Ok(reading) => readings.push(reading),
                Err(reason) => malformed.push(MalformedEntry {
                    raw: entry.to_string(),
                    reason,
                }),
            }
        }
    }

    (readings, malformed)
}

fn parse_entry(entry: &str) -> Result<RawReading, EntryError> {
    let (addr, rssi) = entry.split_once(',').ok_or(EntryError::MissingSeparator)?;
    let rssi = rssi.trim();
    let rssi: i32 = rssi
        .parse()
        .map_err(|_| EntryError::BadRssi(rssi.to_string()))?;
    Ok(RawReading {
        tag: addr.trim().to_string(),
        rssi,
    })
}
