//! pet_sim.rs — scripted pet movement and RSSI measurement model
//!
//! Ground truth: each pet occupies one room (or is outside) and wanders
//! between windows with configured probabilities. Measurement model per
//! window: the occupied room's node hears the tag loud (Gaussian around
//! `present_mean`), every other room only sometimes hears it at all, and
//! then faint. A pet that slipped outside is heard by nobody.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rssi_types::wire::RawReading;
use serde::Deserialize;

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    pub rooms: usize,
    pub pets: Vec<PetSpec>,
    pub signal: SignalModel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PetSpec {
    pub tag: String,
    pub start_room: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalModel {
    /// dBm heard by the occupied room's node
    pub present_mean: f64,
    pub present_std: f64,
    /// dBm heard by other rooms when they pick the tag up at all
    pub leak_mean: f64,
    pub leak_std: f64,
    /// probability a non-occupied room hears the tag in one window
    pub leak_prob: f64,
    /// probability the pet wanders to a different room between windows
    pub move_prob: f64,
    /// probability the pet slips outside for a window
    pub outside_prob: f64,
    /// BLE scan passes per window; each heard tag yields this many readings
    pub scans_per_window: u32,
}

// ── Simulation ────────────────────────────────────────────────────────────────

pub struct PetSim {
    config: SimConfig,
    rng: StdRng,
    /// Ground-truth room per pet; None = outside.
    locations: Vec<Option<usize>>,
}

impl PetSim {
    /// `seed` makes a run repeatable; pass None for an entropy seed.
    pub fn new(config: SimConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let locations = config
            .pets
            .iter()
            .map(|pet| Some(pet.start_room.min(config.rooms - 1)))
            .collect();
        Self {
            config,
            rng,
            locations,
        }
    }

    pub fn ground_truth(&self) -> &[Option<usize>] {
        &self.locations
    }

    /// Advance one window: move the pets, then draw what every room's node
    /// hears. Returns one reading list per room.
    pub fn step(&mut self) -> Vec<Vec<RawReading>> {
        self.wander();

        let mut per_room: Vec<Vec<RawReading>> = vec![Vec::new(); self.config.rooms];
        let present = Normal::new(
            self.config.signal.present_mean,
            self.config.signal.present_std,
        )
        .expect("present_std must be finite and non-negative");
        let leak = Normal::new(self.config.signal.leak_mean, self.config.signal.leak_std)
            .expect("leak_std must be finite and non-negative");

        for (pet, location) in self.locations.iter().enumerate() {
            let Some(occupied) = *location else { continue };
            let tag = &self.config.pets[pet].tag;
            for (room, readings) in per_room.iter_mut().enumerate() {
                let heard = room == occupied || self.rng.gen_bool(self.config.signal.leak_prob);
                if !heard {
                    continue;
                }
                let dist = if room == occupied { &present } else { &leak };
                for _ in 0..self.config.signal.scans_per_window {
                    readings.push(RawReading {
                        tag: tag.clone(),
                        rssi: dist.sample(&mut self.rng).round() as i32,
                    });
                }
            }
        }

        per_room
    }

    fn wander(&mut self) {
        for pet in 0..self.locations.len() {
            if self.rng.gen_bool(self.config.signal.outside_prob) {
                self.locations[pet] = None;
                continue;
            }
            let moved = match self.locations[pet] {
                // Coming back inside always picks a room.
                None => true,
                Some(_) => self.rng.gen_bool(self.config.signal.move_prob),
            };
            if moved {
                self.locations[pet] = Some(self.rng.gen_range(0..self.config.rooms));
            }
        }
    }
}
