//! Pair criteria definitions.

use crate::core::catalog::ImageRecord;
use chrono::TimeDelta;
use geo::{Area, BooleanOps, CoordsIter, Intersects, Polygon};

/// Decides whether two records form a pair.
///
/// The pair finder only calls [`is_pair`](PairCriteria::is_pair) on records
/// that share a [`bucket_key`](PairCriteria::bucket_key), both carry an
/// acquisition time and a footprint, and were acquired at most
/// [`max_time_delta`](PairCriteria::max_time_delta) apart. Criteria that
/// pair across satellites or strips must override `bucket_key`.
pub trait PairCriteria: Send + Sync {
    /// Records acquired farther apart than this are never compared
    fn max_time_delta(&self) -> TimeDelta;

    /// Records with different keys are never compared.
    ///
    /// Defaults to `(satellite_id, strip_id)`.
    fn bucket_key<'a>(&self, record: &'a ImageRecord) -> (&'a str, &'a str) {
        (record.satellite_id.as_str(), record.strip_id.as_str())
    }

    /// Full pair predicate
    fn is_pair(&self, a: &ImageRecord, b: &ImageRecord) -> bool;

    /// Human-readable description of the criteria
    fn description(&self) -> String;
}

/// Same satellite, same strip, acquired within the time window, and
/// overlapping footprints
#[derive(Debug, Clone)]
pub struct StripCriteria {
    max_delta: TimeDelta,
}

impl StripCriteria {
    /// Two-second window
    pub fn new() -> Self {
        Self {
            max_delta: TimeDelta::seconds(2),
        }
    }

    /// Override the acquisition window (exclusive bound)
    pub fn with_max_delta(mut self, max_delta: TimeDelta) -> Self {
        self.max_delta = max_delta;
        self
    }
}

/// A closed ring of finite coordinates enclosing some area
fn is_usable_footprint(footprint: &Polygon<f64>) -> bool {
    footprint.exterior().0.len() >= 4
        && footprint
            .coords_iter()
            .all(|c| c.x.is_finite() && c.y.is_finite())
        && footprint.unsigned_area() > 0.0
}

impl Default for StripCriteria {
    fn default() -> Self {
        Self::new()
    }
}

impl PairCriteria for StripCriteria {
    fn max_time_delta(&self) -> TimeDelta {
        self.max_delta
    }

    fn is_pair(&self, a: &ImageRecord, b: &ImageRecord) -> bool {
        if a.satellite_id != b.satellite_id || a.strip_id != b.strip_id {
            return false;
        }

        if let (Some(pa), Some(pb)) = (&a.provider, &b.provider) {
            if pa != pb {
                return false;
            }
        }

        let (Some(ta), Some(tb)) = (a.acquired, b.acquired) else {
            return false;
        };
        if (ta - tb).abs() >= self.max_delta {
            return false;
        }

        let (Some(fa), Some(fb)) = (&a.footprint, &b.footprint) else {
            return false;
        };
        if !is_usable_footprint(fa) || !is_usable_footprint(fb) {
            return false;
        }
        fa.intersects(fb) && fa.intersection(fb).unsigned_area() > 0.0
    }

    fn description(&self) -> String {
        format!(
            "Same satellite and strip, acquired less than {} ms apart, overlapping footprints",
            self.max_delta.num_milliseconds()
        )
    }
}
