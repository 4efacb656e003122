//! # analyzer
//!
//! Analysis task: consumes closed collection windows and publishes
//! snapshots. Runs apart from ingestion so a slow pass never delays
//! accepting reports for the next window.
//!
//! Per window: per-room averaging → cross-room argmax → HMM forward
//! smoothing → occupancy accounting → wholesale snapshot publish. The
//! task is the snapshot store's single writer.

use std::collections::HashMap;
use std::sync::Arc;

use rssi_types::analysis::{average_by_tag, locate_instant, TagTable};
use rssi_types::tracker::PetTracker;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::handlers::{now_ms, SharedSnapshot};
use crate::rssi_hub::ClosedWindow;

pub async fn run_analyzer(
    mut window_rx: mpsc::Receiver<ClosedWindow>,
    mut tracker: PetTracker,
    tags: Arc<TagTable>,
    published: SharedSnapshot,
) {
    while let Some(window) = window_rx.recv().await {
        let averages: Vec<HashMap<String, f64>> =
            window.rooms.iter().map(|room| average_by_tag(room)).collect();
        let instant = locate_instant(&averages, &tags, tracker.pet_count());
        let smoothed = tracker.observe(&instant);
        debug!("analyzer: instant locations {instant:?} smoothed to {smoothed:?}");

        let snapshot = tracker.snapshot(now_ms());
        info!(
            "🐾 window {} analyzed ({} rooms reported), located: {:?}",
            snapshot.windows_analyzed,
            window.reporting_rooms(),
            smoothed
        );
        *published.write().await = snapshot;
    }
    info!("analyzer: window channel closed, stopping");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rssi_types::hmm::HmmModel;
    use rssi_types::wire::RawReading;
    use tokio::sync::RwLock;
    use tokio::time::{sleep, timeout, Duration};

    fn home_model() -> HmmModel {
        HmmModel::new(
            vec![
                vec![0.8, 0.12, 0.03, 0.045, 0.005],
                vec![0.12, 0.8, 0.03, 0.045, 0.005],
                vec![0.23, 0.14, 0.5, 0.11, 0.02],
                vec![0.4, 0.24, 0.05, 0.3, 0.01],
                vec![0.15, 0.02, 0.02, 0.01, 0.8],
            ],
            vec![
                vec![0.85, 0.02, 0.02, 0.1, 0.01],
                vec![0.15, 0.8, 0.0, 0.05, 0.0],
                vec![0.0625, 0.0, 0.9, 0.0375, 0.0],
                vec![0.025, 0.0, 0.013, 0.95, 0.012],
                vec![0.05, 0.0, 0.05, 0.0, 0.9],
            ],
            vec![0.4, 0.4, 0.09, 0.1, 0.01],
        )
        .unwrap()
    }

    fn reading(tag: &str, rssi: i32) -> RawReading {
        RawReading {
            tag: tag.to_string(),
            rssi,
        }
    }

    /// The loudest room wins end to end: room 0 at -40 beats room 1 at
    /// -60, rooms 2–3 silent; after one window the snapshot locates the
    /// pet in room 0 with all its time there.
    #[tokio::test]
    async fn one_window_flows_through_to_the_snapshot() {
        let tracker = PetTracker::new(home_model(), 4, 1, 30);
        let tags: TagTable = TagTable::from([("p0".to_string(), 0)]);
        let published: SharedSnapshot = Arc::new(RwLock::new(tracker.snapshot(0)));

        let (window_tx, window_rx) = mpsc::channel(4);
        tokio::spawn(run_analyzer(
            window_rx,
            tracker,
            Arc::new(tags),
            published.clone(),
        ));

        window_tx
            .send(ClosedWindow {
                rooms: vec![
                    vec![reading("p0", -40)],
                    vec![reading("p0", -60)],
                    vec![],
                    vec![],
                ],
                reported: vec![true, true, false, false],
            })
            .await
            .unwrap();

        timeout(Duration::from_secs(2), async {
            loop {
                if published.read().await.windows_analyzed == 1 {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("snapshot was never published");

        let snap = published.read().await.clone();
        assert_eq!(snap.pets[&0].room_located, 0);
        assert_eq!(snap.pets[&0].time_spent_percentage, vec![1.0, 0.0, 0.0, 0.0]);
    }
}
