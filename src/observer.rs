use std::collections::BTreeMap;

use crate::edit::EditShape;

/// Receives notifications about what a [`ScriptVersionCache`](crate::ScriptVersionCache) does.
/// The observer is owned by the cache, so its lifetime is the editing session's.
pub trait CacheObserver {
    fn on_edit(&mut self, _shape: EditShape, _version: u64) {}

    fn on_evict(&mut self, _version: u64) {}

    /// Called for every lookup of a specific version; `hit` is false when the version was not
    /// retained.
    fn on_snapshot_lookup(&mut self, _hit: bool) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {}

/// Counts edits per shape, evictions and snapshot lookups.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EditStats {
    edits: BTreeMap<EditShape, usize>,
    pub evictions: usize,
    pub lookup_hits: usize,
    pub lookup_misses: usize,
}

impl EditStats {
    pub fn edits(&self, shape: EditShape) -> usize {
        self.edits.get(&shape).copied().unwrap_or(0)
    }

    pub fn total_edits(&self) -> usize {
        self.edits.values().sum()
    }

    /// Percentage of snapshot lookups that found their version.
    pub fn hit_rate(&self) -> f64 {
        let total = self.lookup_hits + self.lookup_misses;
        if total == 0 {
            0.0
        } else {
            (self.lookup_hits as f64 / total as f64) * 100.0
        }
    }
}

impl CacheObserver for EditStats {
    fn on_edit(&mut self, shape: EditShape, _version: u64) {
        *self.edits.entry(shape).or_default() += 1;
    }

    fn on_evict(&mut self, _version: u64) {
        self.evictions += 1;
    }

    fn on_snapshot_lookup(&mut self, hit: bool) {
        if hit {
            self.lookup_hits += 1;
        } else {
            self.lookup_misses += 1;
        }
    }
}

impl std::fmt::Display for EditStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "edits: {}", self.total_edits())?;
        for (shape, count) in &self.edits {
            write!(f, ", {shape:?}: {count}")?;
        }
        write!(
            f,
            ", evictions: {}, lookup hit rate: {:.1}%",
            self.evictions,
            self.hit_rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_stats() {
        let mut stats = EditStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.on_edit(EditShape::SplitLine, 1);
        stats.on_edit(EditShape::SplitLine, 2);
        stats.on_edit(EditShape::Boundary, 3);
        assert_eq!(stats.edits(EditShape::SplitLine), 2);
        assert_eq!(stats.edits(EditShape::WithinLine), 0);
        assert_eq!(stats.total_edits(), 3);

        stats.on_snapshot_lookup(true);
        stats.on_snapshot_lookup(true);
        stats.on_snapshot_lookup(true);
        stats.on_snapshot_lookup(false);
        assert!((stats.hit_rate() - 75.0).abs() < 0.001);

        assert_eq!(
            stats.to_string(),
            "edits: 3, SplitLine: 2, Boundary: 1, evictions: 0, lookup hit rate: 75.0%"
        );
    }
}
