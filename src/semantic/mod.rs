//! Vector similarity search over the static product corpus.
//!
//! # Architecture
//!
//! - `embeddings`: Deterministic text to vector mapping
//! - `vector`: Fixed-dimension vectors and cosine similarity
//! - `norms`: Write-once cache of corpus vector norms
//! - `heap`: Capacity-bounded min-heap used for top-K selection
//! - `index`: The corpus and its ranking entry points

pub mod embeddings;
mod heap;
mod index;
mod norms;
mod vector;

pub use embeddings::embed;
pub use heap::BoundedHeap;
pub use index::{Corpus, CorpusEntry, CorpusError, IndexError, ScoredItem};
pub use norms::NormCache;
pub use vector::{cosine_similarity, Vector, DIMENSIONS};
