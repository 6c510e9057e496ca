//! Per-record rating aggregates.

use dashmap::DashMap;

/// Cumulative rating state for one record.
#[derive(Clone, Copy, Debug, Default)]
struct Aggregate {
    count: u32,
    sum: f64,
}

/// Accumulates rating scores and exposes the running count and average.
///
/// Aggregates are keyed by record identifier and never deleted. All additions
/// for the same key serialize under the map's per-shard entry lock, so the
/// sequence of returned (count, average) pairs is consistent with a total
/// order of the individual additions: no two callers observe the same count
/// and no update is lost.
#[derive(Default)]
pub struct RatingStore {
    ratings: DashMap<String, Aggregate>,
}

impl RatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one score and returns the updated count and average as of the
    /// moment this call was applied.
    pub fn add(&self, laptop_id: &str, score: f64) -> (u32, f64) {
        let mut entry = self
            .ratings
            .entry(laptop_id.to_string())
            .or_insert_with(Aggregate::default);

        entry.count += 1;
        entry.sum += score;

        (entry.count, entry.sum / f64::from(entry.count))
    }
}
