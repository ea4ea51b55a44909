//! Lazily computed L2 norms for corpus vectors.

use once_cell::sync::OnceCell;
use rayon::prelude::*;

use super::index::CorpusEntry;
use super::vector::Vector;

/// Write-once norm slots keyed by corpus index.
///
/// Each slot is filled at most once; concurrent first callers block on the
/// same initialisation and observe the same value.
pub struct NormCache {
    slots: Vec<OnceCell<f32>>,
}

impl NormCache {
    /// Create a cache with one slot per corpus entry.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| OnceCell::new()).collect(),
        }
    }

    /// Norm of `vector`, cached under `index`.
    ///
    /// Panics if `index` is outside the corpus the cache was sized for.
    pub fn get_norm(&self, index: usize, vector: &Vector) -> f32 {
        *self.slots[index].get_or_init(|| vector.l2_norm())
    }

    /// Fill every slot up front. Used for static corpora at startup.
    pub fn warm(&self, entries: &[CorpusEntry]) {
        self.slots
            .par_iter()
            .zip(entries.par_iter())
            .for_each(|(slot, entry)| {
                slot.get_or_init(|| entry.vector.l2_norm());
            });
    }

    /// Number of slots holding a value.
    pub fn cached_len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }
}
