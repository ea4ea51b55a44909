//! Enrichment of ranked items with product details and stock.
//!
//! - `pipeline`: bounded worker pool with per-job timeouts and
//!   order-preserving collection
//! - `recommend`: best-effort single-item recommendation run alongside it
//! - `pool`: record reuse for the workers
//! - `cancel`: cooperative cancellation shared with the workers

mod cancel;
mod pipeline;
mod pool;
mod recommend;

use std::fmt::Write as _;

use serde::Serialize;

use crate::providers::Detail;

pub use cancel::{CancelSignal, Cancellation};
pub use pipeline::{EnrichmentPipeline, PipelineOptions, PipelineReport};
pub use pool::ObjectPool;
pub use recommend::{PickStrategy, RecommendationSidecar};

/// A ranked item joined with its details and stock.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnrichedItem {
    pub id: u64,
    pub name: String,
    pub description: String,
    pub price: String,
    pub score: f32,
    pub stock: u32,
}

impl EnrichedItem {
    /// Build a fresh record from lookup results.
    pub fn from_lookup(detail: &Detail, score: f32, stock: u32) -> Self {
        let mut item = Self::default();
        item.overwrite(detail, score, stock);
        item
    }

    /// Replace every field, reusing the existing string buffers.
    pub fn overwrite(&mut self, detail: &Detail, score: f32, stock: u32) {
        self.id = detail.id;
        self.name.clear();
        self.name.push_str(&detail.name);
        self.description.clear();
        self.description.push_str(&detail.description);
        self.price.clear();
        let _ = write!(self.price, "{:.2}₺", detail.price);
        self.score = score;
        self.stock = stock;
    }

    /// Copy every field of `other`, reusing the existing string buffers.
    pub fn copy_from(&mut self, other: &EnrichedItem) {
        self.id = other.id;
        self.name.clone_from(&other.name);
        self.description.clone_from(&other.description);
        self.price.clone_from(&other.price);
        self.score = other.score;
        self.stock = other.stock;
    }
}
