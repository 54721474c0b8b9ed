//! Biome reference counting and the residency revision counter.

use std::sync::{Mutex, MutexGuard, PoisonError};

use rustc_hash::FxHashMap;

use crate::catalog::BiomeId;

/// Address of a terrain tile that referenced a biome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Level of detail.
    pub lod: u32,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl TileKey {
    /// Creates a tile key.
    pub fn new(lod: u32, x: u32, y: u32) -> Self {
        Self { lod, x, y }
    }
}

/// Immutable partition of every known biome taken under the reference lock.
///
/// Passed from the reference stage to the residency stage so neither lock
/// is held while the other is taken.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceSnapshot {
    /// Revision at the time of the snapshot.
    pub revision: u64,
    /// Biomes with a positive count.
    pub active: Vec<BiomeId>,
    /// Known biomes whose count is zero.
    pub inactive: Vec<BiomeId>,
}

#[derive(Debug, Default)]
struct ReferenceTable {
    // Zero-count entries stay so a biome flickering in and out of view
    // doesn't churn the map.
    counts: FxHashMap<BiomeId, u32>,
    revision: u64,
}

/// Thread-safe per-biome reference counts plus a monotonic revision.
///
/// The revision moves exactly once per 0→1 or 1→0 transition, once per
/// [`reset`](Self::reset) and once per [`bump_revision`](Self::bump_revision).
#[derive(Debug, Default)]
pub struct ReferenceTracker {
    table: Mutex<ReferenceTable>,
}

impl ReferenceTracker {
    /// Creates an empty tracker at revision 0.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ReferenceTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increments the count for `biome`. Returns `true` if the biome just became active.
    pub fn ref_biome(&self, biome: BiomeId) -> bool {
        let mut table = self.lock();
        let count = table.counts.entry(biome).or_insert(0);
        *count += 1;
        let activated = *count == 1;
        if activated {
            table.revision += 1;
        }
        activated
    }

    /// Decrements the count for `biome`. Returns `true` if the biome just became inactive.
    ///
    /// Unknown biomes and biomes already at zero are ignored.
    pub fn unref_biome(&self, biome: BiomeId) -> bool {
        let mut table = self.lock();
        let Some(count) = table.counts.get_mut(&biome) else {
            return false;
        };
        if *count == 0 {
            return false;
        }
        *count -= 1;
        let deactivated = *count == 0;
        if deactivated {
            table.revision += 1;
        }
        deactivated
    }

    /// Zeroes every count and bumps the revision once.
    /// Returns the biomes that were active, sorted.
    pub fn reset(&self) -> Vec<BiomeId> {
        let mut table = self.lock();
        let mut was_active = Vec::new();
        for (biome, count) in table.counts.iter_mut() {
            if *count > 0 {
                was_active.push(*biome);
            }
            *count = 0;
        }
        table.revision += 1;
        was_active.sort_unstable();
        was_active
    }

    /// Bumps the revision without touching counts. Returns the new revision.
    pub fn bump_revision(&self) -> u64 {
        let mut table = self.lock();
        table.revision += 1;
        table.revision
    }

    /// Current revision.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Current count for `biome` (0 if never referenced).
    pub fn count(&self, biome: BiomeId) -> u32 {
        self.lock().counts.get(&biome).copied().unwrap_or(0)
    }

    /// Every biome with a positive count, sorted.
    pub fn active_biomes(&self) -> Vec<BiomeId> {
        let table = self.lock();
        let mut active: Vec<_> = table
            .counts
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(biome, _)| *biome)
            .collect();
        active.sort_unstable();
        active
    }

    /// Partitions every known biome into active and inactive, sorted.
    pub fn snapshot(&self) -> ReferenceSnapshot {
        let table = self.lock();
        let mut snapshot = ReferenceSnapshot {
            revision: table.revision,
            ..Default::default()
        };
        for (biome, count) in &table.counts {
            if *count > 0 {
                snapshot.active.push(*biome);
            } else {
                snapshot.inactive.push(*biome);
            }
        }
        snapshot.active.sort_unstable();
        snapshot.inactive.sort_unstable();
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: BiomeId = BiomeId(0);
    const B: BiomeId = BiomeId(1);

    #[test]
    fn test_revision_moves_on_transitions_only() {
        let tracker = ReferenceTracker::new();
        assert!(tracker.ref_biome(A));
        assert_eq!(tracker.revision(), 1);
        assert!(!tracker.ref_biome(A));
        assert_eq!(tracker.revision(), 1);
        assert!(!tracker.unref_biome(A));
        assert_eq!(tracker.revision(), 1);
        assert!(tracker.unref_biome(A));
        assert_eq!(tracker.revision(), 2);
    }

    #[test]
    fn test_unref_below_zero_is_noop() {
        let tracker = ReferenceTracker::new();
        assert!(!tracker.unref_biome(A));
        tracker.ref_biome(A);
        tracker.unref_biome(A);
        assert!(!tracker.unref_biome(A));
        assert_eq!(tracker.count(A), 0);
        assert_eq!(tracker.revision(), 2);
    }

    #[test]
    fn test_reset_zeroes_and_bumps_once() {
        let tracker = ReferenceTracker::new();
        tracker.ref_biome(A);
        tracker.ref_biome(A);
        tracker.ref_biome(B);
        let before = tracker.revision();

        assert_eq!(tracker.reset(), vec![A, B]);
        assert_eq!(tracker.revision(), before + 1);
        assert!(tracker.active_biomes().is_empty());

        // Entries survive a reset as zero counts.
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.inactive, vec![A, B]);
    }

    #[test]
    fn test_snapshot_partitions_known_biomes() {
        let tracker = ReferenceTracker::new();
        tracker.ref_biome(A);
        tracker.ref_biome(B);
        tracker.unref_biome(B);

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.active, vec![A]);
        assert_eq!(snapshot.inactive, vec![B]);
        assert_eq!(snapshot.revision, tracker.revision());
    }

    #[test]
    fn test_bump_revision() {
        let tracker = ReferenceTracker::new();
        assert_eq!(tracker.bump_revision(), 1);
        assert_eq!(tracker.revision(), 1);
    }
}
