//! # Matcher Module
//!
//! Finds scene pairs: two records from the same satellite and strip,
//! acquired moments apart, whose footprints overlap.
//!
//! ## How It Works
//! 1. Bucket records by [`PairCriteria::bucket_key`] (satellite id, strip id)
//! 2. Sort each bucket by acquisition time
//! 3. Compare only records inside the time window
//! 4. Apply the full [`PairCriteria`] predicate
//!
//! The result equals an exhaustive scan over every `i < j` pair: pairs are
//! ordered by the first member's input position, and within a pair the
//! member that came first in the input comes first. Matching is not
//! exclusive, a record overlapping several neighbours appears in several
//! pairs. Records without a timestamp or footprint never match.

mod traits;

pub use traits::{PairCriteria, StripCriteria};

use crate::core::catalog::ImageRecord;
use crate::events::{null_sender, Event, EventSender, MatchEvent};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Two records satisfying the pair criteria
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePair {
    pub first: ImageRecord,
    pub second: ImageRecord,
    /// Input position of `first`
    pub first_index: usize,
    /// Input position of `second`
    pub second_index: usize,
    /// Absolute acquisition difference in seconds
    pub time_delta_secs: f64,
}

impl ImagePair {
    /// Output basename for the pair's artifacts
    pub fn basename(&self) -> String {
        format!("{}__{}", self.first.id, self.second.id)
    }
}

/// Check a single pair of records
pub fn is_pair(a: &ImageRecord, b: &ImageRecord, criteria: &dyn PairCriteria) -> bool {
    criteria.is_pair(a, b)
}

/// Find every pair in `records`
pub fn find_pairs(records: &[ImageRecord], criteria: &dyn PairCriteria) -> Vec<ImagePair> {
    find_pairs_with_events(records, criteria, &null_sender())
}

/// Find every pair in `records`, reporting progress
pub fn find_pairs_with_events(
    records: &[ImageRecord],
    criteria: &dyn PairCriteria,
    events: &EventSender,
) -> Vec<ImagePair> {
    events.send(Event::Match(MatchEvent::Started {
        total_records: records.len(),
    }));

    let mut buckets: HashMap<(&str, &str), Vec<(DateTime<Utc>, usize)>> = HashMap::new();
    for (index, record) in records.iter().enumerate() {
        let (Some(acquired), Some(_)) = (record.acquired, &record.footprint) else {
            tracing::debug!(id = %record.id, "excluded from matching: missing time or footprint");
            continue;
        };
        buckets
            .entry(criteria.bucket_key(record))
            .or_default()
            .push((acquired, index));
    }

    let window = criteria.max_time_delta();
    let mut found: Vec<(usize, usize)> = Vec::new();

    for members in buckets.values_mut() {
        members.sort_unstable();

        for (k, &(t_i, i)) in members.iter().enumerate() {
            for &(t_j, j) in &members[k + 1..] {
                if t_j - t_i > window {
                    break;
                }
                let (a, b) = if i < j { (i, j) } else { (j, i) };
                if criteria.is_pair(&records[a], &records[b]) {
                    found.push((a, b));
                }
            }
        }
    }

    found.sort_unstable();

    let pairs: Vec<ImagePair> = found
        .into_iter()
        .map(|(a, b)| {
            let first = &records[a];
            let second = &records[b];
            let time_delta_secs = match (first.acquired, second.acquired) {
                (Some(ta), Some(tb)) => (ta - tb).abs().num_microseconds().unwrap_or(i64::MAX)
                    as f64
                    / 1_000_000.0,
                _ => 0.0,
            };

            events.send(Event::Match(MatchEvent::PairFound {
                first: first.id.clone(),
                second: second.id.clone(),
            }));

            ImagePair {
                first: first.clone(),
                second: second.clone(),
                first_index: a,
                second_index: b,
                time_delta_secs,
            }
        })
        .collect();

    tracing::info!(
        records = records.len(),
        pairs = pairs.len(),
        "pair matching complete"
    );

    events.send(Event::Match(MatchEvent::Completed {
        total_pairs: pairs.len(),
    }));

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventChannel;
    use chrono::{TimeDelta, TimeZone};
    use geo::{polygon, Polygon};

    fn square(x: f64, size: f64) -> Polygon<f64> {
        polygon![
            (x: x, y: 0.0),
            (x: x + size, y: 0.0),
            (x: x + size, y: size),
            (x: x, y: size),
            (x: x, y: 0.0),
        ]
    }

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2017, 3, 12, 18, 43, 0).unwrap() + TimeDelta::milliseconds(millis)
    }

    fn scene(id: &str, millis: i64, x: f64) -> ImageRecord {
        ImageRecord::new(id, "0c22", "419561")
            .with_acquired(at(millis))
            .with_footprint(square(x, 1.0))
    }

    fn ids(pairs: &[ImagePair]) -> Vec<(&str, &str)> {
        pairs
            .iter()
            .map(|p| (p.first.id.as_str(), p.second.id.as_str()))
            .collect()
    }

    #[test]
    fn empty_and_single_inputs_have_no_pairs() {
        let criteria = StripCriteria::new();
        assert!(find_pairs(&[], &criteria).is_empty());
        assert!(find_pairs(&[scene("a", 0, 0.0)], &criteria).is_empty());
    }

    #[test]
    fn chain_without_transitive_pair() {
        // a-b and b-c overlap in space and time, a-c do not overlap in space
        let records = vec![
            scene("a", 0, 0.0),
            scene("b", 1000, 0.6),
            scene("c", 2000, 1.2),
        ];
        let pairs = find_pairs(&records, &StripCriteria::new());
        assert_eq!(ids(&pairs), vec![("a", "b"), ("b", "c")]);
    }

    #[test]
    fn mismatched_satellite_or_strip_never_pairs() {
        let mut other_sat = scene("b", 500, 0.5);
        other_sat.satellite_id = "0e19".to_string();
        let mut other_strip = scene("c", 500, 0.5);
        other_strip.strip_id = "419562".to_string();

        let records = vec![scene("a", 0, 0.0), other_sat, other_strip];
        assert!(find_pairs(&records, &StripCriteria::new()).is_empty());
    }

    #[test]
    fn two_seconds_apart_never_pairs() {
        let records = vec![scene("a", 0, 0.0), scene("b", 2000, 0.5)];
        assert!(find_pairs(&records, &StripCriteria::new()).is_empty());

        let records = vec![scene("a", 0, 0.0), scene("b", 1999, 0.5)];
        assert_eq!(find_pairs(&records, &StripCriteria::new()).len(), 1);
    }

    #[test]
    fn disjoint_footprints_never_pair() {
        let records = vec![scene("a", 0, 0.0), scene("b", 500, 5.0)];
        assert!(find_pairs(&records, &StripCriteria::new()).is_empty());
    }

    #[test]
    fn incomplete_records_are_skipped() {
        let no_time = ImageRecord::new("no_time", "0c22", "419561").with_footprint(square(0.0, 1.0));
        let no_geometry = ImageRecord::new("no_geometry", "0c22", "419561").with_acquired(at(100));
        let records = vec![scene("a", 0, 0.0), no_time, no_geometry, scene("b", 200, 0.2)];

        let pairs = find_pairs(&records, &StripCriteria::new());
        assert_eq!(ids(&pairs), vec![("a", "b")]);
        assert_eq!((pairs[0].first_index, pairs[0].second_index), (0, 3));
    }

    #[test]
    fn order_follows_input_not_time() {
        // Input order is reversed relative to acquisition order
        let records = vec![
            scene("late", 1500, 0.0),
            scene("early", 0, 0.3),
            scene("middle", 700, 0.6),
        ];
        let pairs = find_pairs(&records, &StripCriteria::new());
        assert_eq!(
            ids(&pairs),
            vec![("late", "early"), ("late", "middle"), ("early", "middle")]
        );
    }

    #[test]
    fn matches_exhaustive_scan() {
        let criteria = StripCriteria::new();
        let records: Vec<ImageRecord> = (0..30)
            .map(|i| {
                let mut r = scene(&format!("s{}", i), (i * 37 % 11) as i64 * 400, (i % 7) as f64 * 0.4);
                r.strip_id = format!("{}", i % 3);
                r
            })
            .collect();

        let mut expected = Vec::new();
        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                if criteria.is_pair(&records[i], &records[j]) {
                    expected.push((i, j));
                }
            }
        }

        let found: Vec<(usize, usize)> = find_pairs(&records, &criteria)
            .iter()
            .map(|p| (p.first_index, p.second_index))
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn pair_reports_time_delta_and_basename() {
        let records = vec![scene("a", 0, 0.0), scene("b", 1250, 0.5)];
        let pairs = find_pairs(&records, &StripCriteria::new());
        assert!((pairs[0].time_delta_secs - 1.25).abs() < 1e-9);
        assert_eq!(pairs[0].basename(), "a__b");
    }

    #[test]
    fn find_pairs_with_events_reports_pairs() {
        let (sender, receiver) = EventChannel::new();
        let records = vec![scene("a", 0, 0.0), scene("b", 500, 0.5)];

        let _ = find_pairs_with_events(&records, &StripCriteria::new(), &sender);
        drop(sender);

        let events: Vec<_> = receiver.iter().collect();
        assert!(matches!(
            events.first(),
            Some(Event::Match(MatchEvent::Started { total_records: 2 }))
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Match(MatchEvent::PairFound { .. }))));
        assert!(matches!(
            events.last(),
            Some(Event::Match(MatchEvent::Completed { total_pairs: 1 }))
        ));
    }

    /// Pairs any overlapping scenes of one satellite, whatever the strip
    struct SatelliteCriteria;

    impl PairCriteria for SatelliteCriteria {
        fn max_time_delta(&self) -> TimeDelta {
            TimeDelta::seconds(2)
        }

        fn bucket_key<'a>(&self, record: &'a ImageRecord) -> (&'a str, &'a str) {
            (record.satellite_id.as_str(), "")
        }

        fn is_pair(&self, a: &ImageRecord, b: &ImageRecord) -> bool {
            a.satellite_id == b.satellite_id
        }

        fn description(&self) -> String {
            "same satellite".to_string()
        }
    }

    #[test]
    fn custom_bucket_key_pairs_across_strips() {
        let mut other_strip = scene("b", 500, 0.5);
        other_strip.strip_id = "419562".to_string();
        let records = vec![scene("a", 0, 0.0), other_strip];

        assert!(find_pairs(&records, &StripCriteria::new()).is_empty());
        assert_eq!(
            ids(&find_pairs(&records, &SatelliteCriteria)),
            vec![("a", "b")]
        );
    }
}
