//! Fixed-dimension vectors and cosine similarity.

use serde::{Deserialize, Serialize};

use super::index::IndexError;

/// Dimensionality shared by the query embedder and the corpus loader.
pub const DIMENSIONS: usize = 4;

/// An immutable, fixed-dimension vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct Vector([f32; DIMENSIONS]);

impl Vector {
    pub const fn new(values: [f32; DIMENSIONS]) -> Self {
        Self(values)
    }

    pub const fn zero() -> Self {
        Self([0.0; DIMENSIONS])
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn dot(&self, other: &Vector) -> f32 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// Compute L2 norm of the vector.
    pub fn l2_norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }
}

impl TryFrom<&[f32]> for Vector {
    type Error = IndexError;

    fn try_from(values: &[f32]) -> Result<Self, Self::Error> {
        let values: [f32; DIMENSIONS] =
            values.try_into().map_err(|_| IndexError::DimensionMismatch {
                expected: DIMENSIONS,
                got: values.len(),
            })?;
        Ok(Self(values))
    }
}

impl TryFrom<Vec<f32>> for Vector {
    type Error = IndexError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::try_from(values.as_slice())
    }
}

impl From<Vector> for Vec<f32> {
    fn from(vector: Vector) -> Self {
        vector.0.to_vec()
    }
}

/// Cosine similarity between two vectors, computing both norms.
pub fn cosine_similarity(a: &Vector, b: &Vector) -> f32 {
    cosine_with_norms(a, a.l2_norm(), b, b.l2_norm())
}

/// Cosine similarity with precomputed norms.
///
/// Zero-norm vectors score 0 against anything. The result is clamped to
/// [-1, 1] so rounding never leaks outside the cosine range.
pub fn cosine_with_norms(a: &Vector, a_norm: f32, b: &Vector, b_norm: f32) -> f32 {
    if a_norm < f32::EPSILON || b_norm < f32::EPSILON {
        return 0.0;
    }

    (a.dot(b) / (a_norm * b_norm)).clamp(-1.0, 1.0)
}
