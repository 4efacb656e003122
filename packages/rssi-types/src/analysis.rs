//! Per-window analysis: signal averaging and instantaneous localization.
//!
//! Both steps are pure functions of a closed collection window, so the
//! replay harness can drive them with recorded data exactly as the live
//! backend does.

use std::collections::HashMap;

use crate::wire::RawReading;

/// Tag hardware address → pet id (dense `0..P-1`). Immutable, from config.
pub type TagTable = HashMap<String, usize>;

/// Mean RSSI per tag over one room's readings in a closed window.
///
/// A tag absent from the room's readings is absent from the result — no
/// zero-fill, so a silent room never looks like a weak sighting.
pub fn average_by_tag(readings: &[RawReading]) -> HashMap<String, f64> {
    let mut sums: HashMap<&str, (f64, u32)> = HashMap::new();
    for r in readings {
        let entry = sums.entry(&r.tag).or_insert((0.0, 0));
        entry.0 += f64::from(r.rssi);
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(tag, (sum, n))| (tag.to_string(), sum / f64::from(n)))
        .collect()
}

/// For each pet, the room whose node heard its tag loudest this window.
///
/// Rooms are scanned in increasing id order with a strict `>`, so the first
/// room seen keeps priority on an exact tie. Tags not in the table are
/// ignored. A pet no room reported maps to the outside pseudo-state
/// (`room_averages.len()`).
pub fn locate_instant(
    room_averages: &[HashMap<String, f64>],
    tags: &TagTable,
    pet_count: usize,
) -> Vec<usize> {
    let outside = room_averages.len();
    let mut locations = vec![outside; pet_count];
    let mut loudest = vec![f64::NEG_INFINITY; pet_count];

    for (room, averages) in room_averages.iter().enumerate() {
        for (tag, &avg) in averages {
            let Some(&pet) = tags.get(tag) else { continue };
            if avg > loudest[pet] {
                loudest[pet] = avg;
                locations[pet] = room;
            }
        }
    }

    locations
}
