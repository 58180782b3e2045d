//! Notification log properties
//!
//! - Repeated events inside the window collapse to one record per key
//! - Local ids stay unique and newest-first
//! - Acknowledged keys are accepted again

use std::collections::HashSet;

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use pocket_farm_client::channel::{DedupKey, NotificationLog};

const KINDS: [&str; 4] = ["heavy_rain", "strong_wind", "high_temperature", "watering_reminder"];

fn key(index: usize) -> DedupKey {
    DedupKey {
        kind: KINDS[index].to_string(),
        message: format!("{} message", KINDS[index]),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// One record per distinct key within the window
    #[test]
    fn prop_duplicates_collapse(
        events in proptest::collection::vec((0usize..4, 0i64..600), 1..40),
    ) {
        let start = Utc.with_ymd_and_hms(2024, 5, 4, 6, 0, 0).unwrap();
        let mut log = NotificationLog::new(Duration::minutes(30));
        let mut offsets: Vec<i64> = events.iter().map(|(_, s)| *s).collect();
        offsets.sort_unstable();

        for ((index, _), offset) in events.iter().zip(offsets) {
            let k = key(*index);
            let message = k.message.clone();
            log.append(k, message, start + Duration::seconds(offset));
        }

        let distinct: HashSet<usize> = events.iter().map(|(i, _)| *i).collect();
        prop_assert_eq!(log.len(), distinct.len());
        prop_assert_eq!(log.unread_count(), distinct.len());

        let ids = log.all_ids();
        prop_assert!(ids.windows(2).all(|w| w[0] > w[1]));
    }

    /// Marking everything read lets every key through again
    #[test]
    fn prop_acknowledged_keys_reappear(indices in proptest::collection::vec(0usize..4, 1..10)) {
        let now = Utc.with_ymd_and_hms(2024, 5, 4, 6, 0, 0).unwrap();
        let mut log = NotificationLog::new(Duration::minutes(30));

        for index in &indices {
            let k = key(*index);
            let message = k.message.clone();
            log.append(k, message, now);
        }
        let unread = log.unread_ids();
        log.mark_read(&unread);
        prop_assert_eq!(log.unread_count(), 0);

        for index in &indices {
            let k = key(*index);
            let message = k.message.clone();
            log.append(k, message, now);
        }
        let distinct: HashSet<usize> = indices.iter().copied().collect();
        prop_assert_eq!(log.unread_count(), distinct.len());
    }
}
