//! Deterministic query embedding.
//!
//! Maps text to a vector without any model or I/O: the text is hashed with
//! xxh64 and the hash is split into 16-bit lanes, one per dimension, each
//! rescaled into [-1, 1).

use xxhash_rust::xxh64::xxh64;

use super::vector::{Vector, DIMENSIONS};

const LANE_BITS: usize = 16;
const LANE_MASK: u64 = 0xFFFF;
const LANE_SCALE: f32 = 65536.0;

const _: () = assert!(DIMENSIONS * LANE_BITS <= 64, "hash has too few bits for DIMENSIONS");

/// Embed text into a fixed-dimension vector.
///
/// Same text always yields the same vector.
pub fn embed(text: &str) -> Vector {
    let hash = xxh64(text.as_bytes(), 0);

    let mut lanes = [0.0f32; DIMENSIONS];
    for (i, lane) in lanes.iter_mut().enumerate() {
        let bits = (hash >> (i * LANE_BITS)) & LANE_MASK;
        *lane = bits as f32 / LANE_SCALE * 2.0 - 1.0;
    }

    Vector::new(lanes)
}
