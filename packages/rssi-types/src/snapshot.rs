//! Published analysis result.
//!
//! One `Snapshot` is built per completed collection window and replaced
//! wholesale in the store — never mutated in place — so the presentation
//! layer can poll it at any moment without seeing a half-built value.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-pet view of the most recently completed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetSnapshot {
    /// Room the pet was last smoothed into, or -1 when unknown/outside.
    pub room_located: i32,
    /// Fraction of elapsed windows spent in each real room (length = room
    /// count). Windows spent outside stay in the denominator, so the vector
    /// can sum below 1.0. All entries are the -1.0 sentinel before the
    /// first window completes.
    pub time_spent_percentage: Vec<f64>,
}

/// The externally queryable result. Pet ids serialize as stringified map
/// keys, matching what the dashboard consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub pets: BTreeMap<usize, PetSnapshot>,
    /// Completed windows folded into the statistics so far.
    pub windows_analyzed: u64,
    /// Publisher wall-clock, unix milliseconds. Lets pull-style consumers
    /// detect a stalled pipeline.
    pub generated_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pet_ids_serialize_as_string_keys() {
        let snapshot = Snapshot {
            pets: BTreeMap::from([(
                0,
                PetSnapshot {
                    room_located: 2,
                    time_spent_percentage: vec![0.25, 0.0, 0.75, 0.0],
                },
            )]),
            windows_analyzed: 4,
            generated_at_ms: 1_700_000_000_000,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["pets"]["0"]["room_located"], 2);
        assert_eq!(json["pets"]["0"]["time_spent_percentage"][2], 0.75);
        assert_eq!(json["windows_analyzed"], 4);
    }
}
