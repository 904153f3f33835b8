//! Visit segmentation and dwell-time estimation
//!
//! The timestamps of one coordinate are sorted and split into visits wherever
//! two consecutive sightings are more than the gap threshold apart. A visit's
//! duration is the sum of its internal gaps, which equals last minus first.
//! The average dwell of a coordinate is the total duration over the number of
//! visits, so a coordinate sighted once has an average dwell of zero.

use crate::types::{CoordinateKey, LocationDwell};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// A maximal run of sightings with no internal gap above the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub sightings: u32,
}

impl Visit {
    fn starting_at(ts: DateTime<Utc>) -> Self {
        Self {
            start: ts,
            end: ts,
            sightings: 1,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_secs(&self) -> f64 {
        duration_secs(self.duration())
    }
}

/// Split timestamps into visits. Input order does not matter.
///
/// A gap equal to `max_gap` continues the current visit; anything longer
/// starts a new one.
pub fn segment_visits(timestamps: &[DateTime<Utc>], max_gap: Duration) -> Vec<Visit> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut visits = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return visits;
    };

    let mut current = Visit::starting_at(first);
    for ts in iter {
        let gap = ts - current.end;
        trace!(gap_secs = duration_secs(gap), "sighting gap");

        if gap <= max_gap {
            current.end = ts;
            current.sightings += 1;
        } else {
            visits.push(current);
            current = Visit::starting_at(ts);
        }
    }
    visits.push(current);

    visits
}

/// Average visit duration in seconds, 0 when there are no visits
pub fn average_dwell_secs(visits: &[Visit]) -> f64 {
    if visits.is_empty() {
        return 0.0;
    }
    duration_secs(total_duration(visits)) / visits.len() as f64
}

/// Dwell breakdown for one coordinate, `None` for an empty slice
pub(crate) fn summarize_location(
    coordinates: CoordinateKey,
    timestamps: &[DateTime<Utc>],
    max_gap: Duration,
) -> Option<LocationDwell> {
    let visits = segment_visits(timestamps, max_gap);
    let first_seen = visits.first()?.start;
    let last_seen = visits.last()?.end;

    let total = total_duration(&visits);

    trace!(
        coordinates = %coordinates,
        visits = visits.len(),
        total_dwell_secs = duration_secs(total),
        "segmented location"
    );

    Some(LocationDwell {
        coordinates,
        sightings: timestamps.len() as u32,
        visit_count: visits.len() as u32,
        total_dwell_secs: duration_secs(total),
        average_dwell_secs: average_dwell_secs(&visits),
        first_seen,
        last_seen,
    })
}

fn total_duration(visits: &[Visit]) -> Duration {
    visits
        .iter()
        .fold(Duration::zero(), |acc, v| acc + v.duration())
}

fn duration_secs(d: Duration) -> f64 {
    d.num_seconds() as f64 + f64::from(d.subsec_nanos()) / 1e9
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const GAP: i64 = 900;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000 + ms).unwrap()
    }

    fn at_secs(s: i64) -> DateTime<Utc> {
        at_millis(s * 1000)
    }

    #[test]
    fn test_empty_timestamps() {
        let visits = segment_visits(&[], Duration::seconds(GAP));
        assert!(visits.is_empty());
        assert_eq!(average_dwell_secs(&visits), 0.0);
    }

    #[test]
    fn test_single_timestamp_zero_dwell() {
        let visits = segment_visits(&[at_secs(0)], Duration::seconds(GAP));
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].duration_secs(), 0.0);
        assert_eq!(average_dwell_secs(&visits), 0.0);
    }

    #[test]
    fn test_gap_at_threshold_merges() {
        let visits = segment_visits(&[at_secs(0), at_secs(900)], Duration::seconds(GAP));
        assert_eq!(visits.len(), 1);
        assert_eq!(average_dwell_secs(&visits), 900.0);
    }

    #[test]
    fn test_gap_just_over_threshold_splits() {
        let visits = segment_visits(&[at_millis(0), at_millis(900_001)], Duration::seconds(GAP));
        assert_eq!(visits.len(), 2);
        assert_eq!(average_dwell_secs(&visits), 0.0);
    }

    #[test]
    fn test_two_visit_average() {
        let visits = segment_visits(
            &[at_secs(0), at_secs(600), at_secs(20_000)],
            Duration::seconds(GAP),
        );
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].sightings, 2);
        assert_eq!(visits[1].sightings, 1);
        assert_eq!(average_dwell_secs(&visits), 300.0);
    }

    #[test]
    fn test_unsorted_input() {
        let visits = segment_visits(
            &[at_secs(20_000), at_secs(600), at_secs(0)],
            Duration::seconds(GAP),
        );
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].start, at_secs(0));
        assert_eq!(visits[0].end, at_secs(600));
        assert_eq!(average_dwell_secs(&visits), 300.0);
    }

    #[test]
    fn test_chained_gaps_sum_within_visit() {
        // Each gap is under the threshold even though the span is not
        let visits = segment_visits(
            &[at_secs(0), at_secs(800), at_secs(1600), at_secs(2400)],
            Duration::seconds(GAP),
        );
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].duration_secs(), 2400.0);
    }

    #[test]
    fn test_duplicate_timestamps() {
        let visits = segment_visits(&[at_secs(5), at_secs(5)], Duration::seconds(GAP));
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].sightings, 2);
        assert_eq!(average_dwell_secs(&visits), 0.0);
    }

    #[test]
    fn test_subsecond_precision() {
        let visits = segment_visits(&[at_millis(0), at_millis(1_500)], Duration::seconds(GAP));
        assert_eq!(average_dwell_secs(&visits), 1.5);
    }

    #[test]
    fn test_summarize_location() {
        let key = CoordinateKey::from(crate::types::Coordinates::new(1.0, 2.0));
        let dwell = summarize_location(
            key.clone(),
            &[at_secs(20_000), at_secs(0), at_secs(600)],
            Duration::seconds(GAP),
        )
        .unwrap();

        assert_eq!(dwell.coordinates, key);
        assert_eq!(dwell.sightings, 3);
        assert_eq!(dwell.visit_count, 2);
        assert_eq!(dwell.total_dwell_secs, 600.0);
        assert_eq!(dwell.average_dwell_secs, 300.0);
        assert_eq!(dwell.first_seen, at_secs(0));
        assert_eq!(dwell.last_seen, at_secs(20_000));
    }
}
