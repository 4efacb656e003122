//! Per-pet temporal smoothing and occupancy accounting.
//!
//! The tracker owns everything that persists across windows: one capped
//! observation history per pet, the visit counters, and the total-window
//! count. Each completed window feeds it one instantaneous location per
//! pet; it answers with the HMM-smoothed location and can render the
//! current `Snapshot` at any point.
//!
//! Outside windows are counted in their own slot and stay in the
//! percentage denominator, so room percentages reflect true elapsed time;
//! the published vector itself covers real rooms only.

use std::collections::{BTreeMap, VecDeque};

use crate::hmm::HmmModel;
use crate::snapshot::{PetSnapshot, Snapshot};

pub struct PetTracker {
    model: HmmModel,
    room_count: usize,
    history_cap: usize,
    /// Most recent instantaneous locations per pet, oldest first.
    histories: Vec<VecDeque<usize>>,
    /// Visit counters per pet per state (rooms + trailing outside slot).
    counts: Vec<Vec<u64>>,
    /// Last smoothed state per pet; None before the first window.
    located: Vec<Option<usize>>,
    total_windows: u64,
}

impl PetTracker {
    /// `model` must span `room_count + 1` states (rooms + outside).
    pub fn new(model: HmmModel, room_count: usize, pet_count: usize, history_cap: usize) -> Self {
        debug_assert_eq!(model.state_count(), room_count + 1);
        let states = model.state_count();
        Self {
            model,
            room_count,
            history_cap,
            histories: vec![VecDeque::with_capacity(history_cap); pet_count],
            counts: vec![vec![0; states]; pet_count],
            located: vec![None; pet_count],
            total_windows: 0,
        }
    }

    pub fn pet_count(&self) -> usize {
        self.histories.len()
    }

    /// Fold one completed window into the statistics.
    ///
    /// `instant` holds one instantaneous location per pet (the outside
    /// state when no room heard it). Appends each to that pet's history,
    /// truncates to the cap, runs the forward filter over the truncated
    /// history, and bumps the visit counters. Returns the smoothed state
    /// per pet.
    pub fn observe(&mut self, instant: &[usize]) -> Vec<usize> {
        debug_assert_eq!(instant.len(), self.pet_count());
        let outside = self.room_count;
        self.total_windows += 1;

        let mut smoothed = Vec::with_capacity(instant.len());
        for (pet, &observation) in instant.iter().enumerate() {
            // Anything out of range is indistinguishable from "not heard".
            let observation = observation.min(outside);

            let history = &mut self.histories[pet];
            history.push_back(observation);
            while history.len() > self.history_cap {
                history.pop_front();
            }

            let state = self.model.most_likely_state(history.make_contiguous());
            self.counts[pet][state] += 1;
            self.located[pet] = Some(state);
            smoothed.push(state);
        }
        smoothed
    }

    /// Render the current published view. `generated_at_ms` is the
    /// publisher's wall-clock stamp.
    pub fn snapshot(&self, generated_at_ms: u64) -> Snapshot {
        let pets = (0..self.pet_count())
            .map(|pet| (pet, self.pet_snapshot(pet)))
            .collect::<BTreeMap<_, _>>();
        Snapshot {
            pets,
            windows_analyzed: self.total_windows,
            generated_at_ms,
        }
    }

    fn pet_snapshot(&self, pet: usize) -> PetSnapshot {
        let room_located = match self.located[pet] {
            Some(state) if state < self.room_count => state as i32,
            _ => -1,
        };
        // Undefined before the first window — sentinel, never 0/0.
        let time_spent_percentage = if self.total_windows == 0 {
            vec![-1.0; self.room_count]
        } else {
            self.counts[pet][..self.room_count]
                .iter()
                .map(|&visits| visits as f64 / self.total_windows as f64)
                .collect()
        };
        PetSnapshot {
            room_located,
            time_spent_percentage,
        }
    }
}
