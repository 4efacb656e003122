//! Deployment configuration schema and validation.
//!
//! The whole table set is immutable and loaded exactly once at startup:
//! sensor-node IP → room, tag address → pet, the HMM parameters, and the
//! window-completion policy. Validation is the only place configuration
//! errors can surface — they are fatal there, and nothing downstream has
//! to re-check.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::analysis::TagTable;
use crate::hmm::{HmmModel, ModelError};

/// Histories longer than this underflow the unnormalized forward pass.
pub const MAX_HISTORY_CAP: usize = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no sensor nodes configured")]
    NoNodes,
    #[error("no pet tags configured")]
    NoPets,
    #[error("sensor node key {0:?} is not an IP address")]
    BadNodeAddress(String),
    #[error("room ids must densely cover 0..{rooms}, but no node maps to room {missing}")]
    SparseRooms { rooms: usize, missing: usize },
    #[error("pet ids must densely cover 0..{pets}, but no tag maps to pet {missing}")]
    SparsePets { pets: usize, missing: usize },
    #[error("room_names must have one entry per room ({rooms}), got {got}")]
    BadRoomNames { rooms: usize, got: usize },
    #[error("unknown window policy {0:?} (expected \"time\" or \"count\")")]
    UnknownPolicy(String),
    #[error("time-based window policy needs period_secs >= 1")]
    ZeroPeriod,
    #[error("history_cap must be 1..={MAX_HISTORY_CAP} (unnormalized filter underflows past that), got {0}")]
    BadHistoryCap(usize),
    #[error(transparent)]
    Model(#[from] ModelError),
}

// ── Raw TOML schema ───────────────────────────────────────────────────────────

/// Top-level deployment config as written in `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub server: ServerSection,
    pub window: WindowSection,
    pub tracking: TrackingSection,
    /// Sensor node source IP → room id.
    pub nodes: HashMap<String, usize>,
    /// Tag hardware address → pet id.
    pub pets: HashMap<String, usize>,
    pub hmm: HmmSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// TCP endpoint the sensor nodes push reports to.
    pub ingest_addr: String,
    /// HTTP endpoint the dashboard polls for snapshots.
    pub http_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSection {
    /// `"time"` closes every `period_secs` regardless of who reported;
    /// `"count"` waits until every room has reported at least once.
    pub policy: String,
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,
}

fn default_period_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackingSection {
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,
    /// Optional display names, one per room.
    #[serde(default)]
    pub room_names: Vec<String>,
}

fn default_history_cap() -> usize {
    MAX_HISTORY_CAP
}

#[derive(Debug, Clone, Deserialize)]
pub struct HmmSection {
    pub transition: Vec<Vec<f64>>,
    pub emission: Vec<Vec<f64>>,
    pub initial: Vec<f64>,
}

// ── Validated runtime form ────────────────────────────────────────────────────

/// How the coordinator decides a collection window is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Close once every room has contributed at least one report. Stalls
    /// indefinitely if a node goes dark — prefer `TimeBased` when nodes
    /// can die unattended.
    CountBased,
    /// Close every `period` of wall clock regardless of coverage; rooms
    /// that have not reported contribute no readings.
    TimeBased { period: Duration },
}

/// Everything the running system needs, fully validated.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub ingest_addr: String,
    pub http_addr: String,
    pub node_rooms: HashMap<IpAddr, usize>,
    pub room_count: usize,
    pub room_names: Vec<String>,
    pub tags: TagTable,
    pub pet_count: usize,
    pub model: HmmModel,
    pub history_cap: usize,
    pub policy: WindowPolicy,
}

impl SystemConfig {
    /// Validate every table and cross-check the model shape. Any error
    /// here is fatal at startup; a passing config can't fail later.
    pub fn validate(self) -> Result<RuntimeConfig, ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if self.pets.is_empty() {
            return Err(ConfigError::NoPets);
        }

        let mut node_rooms = HashMap::with_capacity(self.nodes.len());
        for (addr, room) in &self.nodes {
            let ip: IpAddr = addr
                .parse()
                .map_err(|_| ConfigError::BadNodeAddress(addr.clone()))?;
            node_rooms.insert(ip, *room);
        }

        let room_count = dense_id_count(self.nodes.values().copied())
            .map_err(|missing| ConfigError::SparseRooms {
                rooms: self.nodes.values().max().map_or(0, |&m| m + 1),
                missing,
            })?;
        let pet_count = dense_id_count(self.pets.values().copied())
            .map_err(|missing| ConfigError::SparsePets {
                pets: self.pets.values().max().map_or(0, |&m| m + 1),
                missing,
            })?;

        let room_names = if self.tracking.room_names.is_empty() {
            (0..room_count).map(|r| format!("room-{r}")).collect()
        } else if self.tracking.room_names.len() == room_count {
            self.tracking.room_names
        } else {
            return Err(ConfigError::BadRoomNames {
                rooms: room_count,
                got: self.tracking.room_names.len(),
            });
        };

        let policy = match self.window.policy.as_str() {
            "count" => WindowPolicy::CountBased,
            "time" => {
                if self.window.period_secs == 0 {
                    return Err(ConfigError::ZeroPeriod);
                }
                WindowPolicy::TimeBased {
                    period: Duration::from_secs(self.window.period_secs),
                }
            }
            other => return Err(ConfigError::UnknownPolicy(other.to_string())),
        };

        let history_cap = self.tracking.history_cap;
        if history_cap == 0 || history_cap > MAX_HISTORY_CAP {
            return Err(ConfigError::BadHistoryCap(history_cap));
        }

        // Model spans rooms + the outside pseudo-state; HmmModel::new
        // enforces squareness and row-stochasticity.
        let model = HmmModel::new(self.hmm.transition, self.hmm.emission, self.hmm.initial)?;
        if model.state_count() != room_count + 1 {
            return Err(ModelError::BadShape {
                matrix: "transition matrix",
                expected: room_count + 1,
                rows: model.state_count(),
                cols: model.state_count(),
            }
            .into());
        }

        Ok(RuntimeConfig {
            ingest_addr: self.server.ingest_addr,
            http_addr: self.server.http_addr,
            node_rooms,
            room_count,
            room_names,
            tags: self.pets,
            pet_count,
            model,
            history_cap,
            policy,
        })
    }
}

/// Ids must densely cover `0..n`. Returns `n`, or the first missing id.
fn dense_id_count(ids: impl Iterator<Item = usize> + Clone) -> Result<usize, usize> {
    let count = ids.clone().max().map_or(0, |max| max + 1);
    for id in 0..count {
        if !ids.clone().any(|have| have == id) {
            return Err(id);
        }
    }
    Ok(count)
}
