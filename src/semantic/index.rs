//! In-memory product corpus with top-K cosine similarity ranking.
//!
//! The corpus is fixed at startup and never mutated. Ranking keeps only the
//! K best candidates in a bounded min-heap, so auxiliary memory is O(K)
//! instead of materialising and sorting a score for every entry.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::embeddings::embed;
use super::heap::BoundedHeap;
use super::norms::NormCache;
use super::vector::{cosine_with_norms, Vector};

/// A single corpus entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusEntry {
    pub id: u64,
    pub name: String,
    pub vector: Vector,
}

/// Ranked result produced by [`Corpus::rank`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredItem {
    /// Position of the entry in the corpus
    pub index: usize,
    pub id: u64,
    pub name: String,
    /// Cosine similarity score (-1.0 to 1.0)
    pub score: f32,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    score: f32,
}

/// Higher score ranks above; equal scores rank the lower corpus index above.
fn candidate_order(a: &Candidate, b: &Candidate) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.index.cmp(&a.index))
}

/// Immutable, ordered product corpus.
pub struct Corpus {
    entries: Vec<CorpusEntry>,
    norms: NormCache,
}

impl Corpus {
    /// Create a corpus from entries, rejecting duplicate ids.
    pub fn new(entries: Vec<CorpusEntry>) -> Result<Self, CorpusError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(CorpusError::DuplicateId(entry.id));
            }
        }

        let norms = NormCache::with_capacity(entries.len());
        Ok(Self { entries, norms })
    }

    /// Generate a deterministic corpus of `count` products.
    ///
    /// Entry `n` (1-based) is named `Product {n}` and embedded from its name.
    pub fn generate(count: usize) -> Self {
        let entries: Vec<CorpusEntry> = (1..=count)
            .into_par_iter()
            .map(|n| {
                let id = n as u64;
                let name = format!("Product {id}");
                let vector = embed(&name);
                CorpusEntry { id, name, vector }
            })
            .collect();

        let norms = NormCache::with_capacity(entries.len());
        Self { entries, norms }
    }

    /// Load a corpus from a JSON array of `{id, name, vector}` records.
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let data = std::fs::read(path)?;
        let entries: Vec<CorpusEntry> = serde_json::from_slice(&data)?;
        log::debug!("loaded {} corpus entries from {}", entries.len(), path.display());
        Self::new(entries)
    }

    /// Write the corpus as a JSON array.
    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let data = serde_json::to_vec(&self.entries)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn norms(&self) -> &NormCache {
        &self.norms
    }

    /// Precompute every corpus norm.
    pub fn warm_norms(&self) {
        self.norms.warm(&self.entries);
    }

    /// Top-`limit` entries by cosine similarity to `query`, best first.
    ///
    /// Returns `min(limit, len)` items. Equal scores are ordered by
    /// ascending corpus index.
    pub fn rank(&self, query: &Vector, limit: usize) -> Vec<ScoredItem> {
        if limit == 0 || self.entries.is_empty() {
            return Vec::new();
        }

        let query_norm = query.l2_norm();
        let mut heap = BoundedHeap::new(limit.min(self.entries.len()), candidate_order);

        for index in 0..self.entries.len() {
            heap.offer(Candidate {
                index,
                score: self.score(index, query, query_norm),
            });
        }

        heap.into_sorted_desc()
            .into_iter()
            .map(|candidate| self.scored(candidate))
            .collect()
    }

    /// Reference ranking: score everything, sort, truncate.
    ///
    /// Same output as [`Corpus::rank`] with O(N) extra memory.
    pub fn rank_full_sort(&self, query: &Vector, limit: usize) -> Vec<ScoredItem> {
        let query_norm = query.l2_norm();
        let mut candidates: Vec<Candidate> = (0..self.entries.len())
            .map(|index| Candidate {
                index,
                score: self.score(index, query, query_norm),
            })
            .collect();

        candidates.sort_by(|a, b| candidate_order(b, a));
        candidates.truncate(limit);

        candidates
            .into_iter()
            .map(|candidate| self.scored(candidate))
            .collect()
    }

    fn score(&self, index: usize, query: &Vector, query_norm: f32) -> f32 {
        let entry = &self.entries[index];
        let norm = self.norms.get_norm(index, &entry.vector);
        cosine_with_norms(query, query_norm, &entry.vector, norm)
    }

    fn scored(&self, candidate: Candidate) -> ScoredItem {
        let entry = &self.entries[candidate.index];
        ScoredItem {
            index: candidate.index,
            id: entry.id,
            name: entry.name.clone(),
            score: candidate.score,
        }
    }
}

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Errors that can occur while loading or saving a corpus.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed corpus: {0}")]
    Json(#[from] serde_json::Error),

    #[error("duplicate corpus id {0}")]
    DuplicateId(u64),
}
