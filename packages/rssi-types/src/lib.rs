//! # rssi-types
//!
//! Shared domain types and analysis core for the Pettrack suite.
//!
//! These types are used by:
//! - `backend-rust`: parsing sensor reports, locating pets, publishing snapshots
//! - `node-simulator`: producing wire-format reports and replaying recordings
//!
//! ## State space
//!
//! Rooms carry dense integer ids `0..R-1`; the hidden-state space of the
//! location filter is `R + 1` states, with the trailing state the "outside"
//! pseudo-room used when no node hears a tag.
//!
//! ## Pipeline
//!
//! ```text
//! payload bytes ─wire──▶ RawReadings ─analysis──▶ per-room averages
//!              ─analysis──▶ instantaneous location ─tracker/hmm──▶
//!              smoothed location + occupancy ─snapshot──▶ published result
//! ```

pub mod analysis;
pub mod config;
pub mod hmm;
pub mod snapshot;
pub mod tracker;
pub mod wire;

pub use analysis::{average_by_tag, locate_instant, TagTable};
pub use config::{RuntimeConfig, SystemConfig, WindowPolicy};
pub use hmm::HmmModel;
pub use snapshot::{PetSnapshot, Snapshot};
pub use tracker::PetTracker;
pub use wire::{parse_report, MalformedEntry, RawReading};
