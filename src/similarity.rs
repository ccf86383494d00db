//! Similarity functions for dense vectors.
//!
//! Scores are higher-is-better and bounded so that exact and approximate
//! (ADC) scoring paths agree on ordering: euclidean maps through
//! `1 / (1 + d²)`, dot product and cosine through `(1 + x) / 2`.

use serde::{Deserialize, Serialize};

/// Similarity measure used by rerankers and approximate scorers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Similarity {
    /// `1 / (1 + ‖a-b‖²)`.
    Euclidean,
    /// `(1 + a·b) / 2`.
    DotProduct,
    /// `(1 + cos(a,b)) / 2`; zero-norm inputs score as orthogonal.
    Cosine,
}

impl Similarity {
    /// Score two vectors of equal dimension.
    #[inline]
    #[must_use]
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len());
        match self {
            Similarity::Euclidean => 1.0 / (1.0 + l2_squared(a, b)),
            Similarity::DotProduct => (1.0 + dot(a, b)) / 2.0,
            Similarity::Cosine => {
                let (d, na, nb) = dot_and_norms(a, b);
                if na == 0.0 || nb == 0.0 {
                    0.5
                } else {
                    (1.0 + d / (na * nb)) / 2.0
                }
            }
        }
    }
}

#[inline]
pub(crate) fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[inline]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[inline]
fn dot_and_norms(a: &[f32], b: &[f32]) -> (f32, f32, f32) {
    let mut d = 0.0;
    let mut na = 0.0;
    let mut nb = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        d += x * y;
        na += x * x;
        nb += y * y;
    }
    (d, na.sqrt(), nb.sqrt())
}
