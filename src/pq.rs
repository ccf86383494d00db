//! Product quantization for fused neighbor codes.
//!
//! Vectors are split into S subspaces and each subvector is mapped to the
//! nearest of a fixed 32-entry codebook, giving S code bytes per vector.
//! Codebooks come from the caller or from a deliberately small k-means
//! refinement; this crate only cares about the on-wire encoding.

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};
use crate::similarity::l2_squared;

/// Clusters per subspace. Fixed by the on-disk format.
pub const CLUSTERS: usize = 32;

/// Product quantizer: per-subspace codebooks over a fixed cluster count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductQuantizer {
    dimension: usize,
    subspaces: usize,
    sub_dim: usize,
    /// Flat `[subspace][cluster][sub_dim]` centroid storage.
    centroids: Vec<f32>,
}

impl ProductQuantizer {
    /// Build from explicit centroids, `subspaces * 32 * (dimension / subspaces)`
    /// floats in subspace-major order.
    pub fn from_centroids(dimension: usize, subspaces: usize, centroids: Vec<f32>) -> Result<Self> {
        if dimension == 0 || subspaces == 0 || dimension % subspaces != 0 {
            return Err(IndexError::Precondition(format!(
                "dimension {dimension} not divisible into {subspaces} subspaces"
            )));
        }
        let sub_dim = dimension / subspaces;
        let expected = subspaces * CLUSTERS * sub_dim;
        if centroids.len() != expected {
            return Err(IndexError::Precondition(format!(
                "expected {expected} centroid floats, got {}",
                centroids.len()
            )));
        }
        Ok(Self {
            dimension,
            subspaces,
            sub_dim,
            centroids,
        })
    }

    /// Fit codebooks on sample vectors (flat row-major, any count ≥ 1).
    ///
    /// Strided initialization plus a few Lloyd iterations per subspace.
    /// Enough to produce usable codes for tests and small corpora; serious
    /// training belongs upstream.
    pub fn fit(dimension: usize, subspaces: usize, samples: &[f32]) -> Result<Self> {
        if dimension == 0 || samples.len() % dimension != 0 || samples.is_empty() {
            return Err(IndexError::Precondition(
                "samples must be a non-empty multiple of dimension".to_string(),
            ));
        }
        let n = samples.len() / dimension;
        let mut pq = Self::from_centroids(
            dimension,
            subspaces,
            vec![0.0; subspaces * CLUSTERS * (dimension / subspaces)],
        )?;
        let sub_dim = pq.sub_dim;

        for s in 0..subspaces {
            // strided picks seed the codebook
            for c in 0..CLUSTERS {
                let src = (c * n) / CLUSTERS;
                let from = src * dimension + s * sub_dim;
                let to = (s * CLUSTERS + c) * sub_dim;
                pq.centroids[to..to + sub_dim].copy_from_slice(&samples[from..from + sub_dim]);
            }

            let mut assign = vec![0usize; n];
            for _ in 0..8 {
                let mut changed = false;
                for (i, slot) in assign.iter_mut().enumerate() {
                    let v = &samples[i * dimension + s * sub_dim..][..sub_dim];
                    let best = pq.nearest_in_subspace(s, v);
                    if best != *slot {
                        *slot = best;
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }

                let mut sums = vec![0.0f32; CLUSTERS * sub_dim];
                let mut counts = [0usize; CLUSTERS];
                for (i, &c) in assign.iter().enumerate() {
                    counts[c] += 1;
                    let v = &samples[i * dimension + s * sub_dim..][..sub_dim];
                    for (acc, x) in sums[c * sub_dim..c * sub_dim + sub_dim].iter_mut().zip(v) {
                        *acc += x;
                    }
                }
                for c in 0..CLUSTERS {
                    if counts[c] == 0 {
                        continue;
                    }
                    let to = (s * CLUSTERS + c) * sub_dim;
                    for d in 0..sub_dim {
                        pq.centroids[to + d] = sums[c * sub_dim + d] / counts[c] as f32;
                    }
                }
            }
        }
        Ok(pq)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn subspaces(&self) -> usize {
        self.subspaces
    }

    pub fn sub_dim(&self) -> usize {
        self.sub_dim
    }

    /// Centroid `c` of subspace `s`.
    pub fn centroid(&self, s: usize, c: usize) -> &[f32] {
        let start = (s * CLUSTERS + c) * self.sub_dim;
        &self.centroids[start..start + self.sub_dim]
    }

    pub(crate) fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    fn nearest_in_subspace(&self, s: usize, sub: &[f32]) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for c in 0..CLUSTERS {
            let dist = l2_squared(sub, self.centroid(s, c));
            if dist < best_dist {
                best_dist = dist;
                best = c;
            }
        }
        best
    }

    /// Encode a vector into `subspaces` code bytes.
    pub fn encode_into(&self, vector: &[f32], out: &mut [u8]) {
        debug_assert_eq!(vector.len(), self.dimension);
        debug_assert_eq!(out.len(), self.subspaces);
        for s in 0..self.subspaces {
            let sub = &vector[s * self.sub_dim..(s + 1) * self.sub_dim];
            out[s] = self.nearest_in_subspace(s, sub) as u8;
        }
    }

    pub fn encode(&self, vector: &[f32]) -> Vec<u8> {
        let mut codes = vec![0u8; self.subspaces];
        self.encode_into(vector, &mut codes);
        codes
    }

    /// Reconstruct the centroid approximation of a code word.
    pub fn decode_into(&self, codes: &[u8], out: &mut [f32]) {
        debug_assert_eq!(codes.len(), self.subspaces);
        debug_assert_eq!(out.len(), self.dimension);
        for (s, &c) in codes.iter().enumerate() {
            out[s * self.sub_dim..(s + 1) * self.sub_dim]
                .copy_from_slice(self.centroid(s, c as usize));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Codebook where centroid c of every subspace is the constant vector c.
    fn constant_codebook(dimension: usize, subspaces: usize) -> ProductQuantizer {
        let sub_dim = dimension / subspaces;
        let mut centroids = Vec::with_capacity(subspaces * CLUSTERS * sub_dim);
        for _s in 0..subspaces {
            for c in 0..CLUSTERS {
                centroids.extend(std::iter::repeat_n(c as f32, sub_dim));
            }
        }
        ProductQuantizer::from_centroids(dimension, subspaces, centroids).unwrap()
    }

    #[test]
    fn encode_picks_nearest_centroid() {
        let pq = constant_codebook(8, 2);
        let mut v = vec![3.1f32; 4];
        v.extend(vec![7.9f32; 4]);
        assert_eq!(pq.encode(&v), vec![3, 8]);
    }

    #[test]
    fn decode_reconstructs_centroids() {
        let pq = constant_codebook(4, 2);
        let mut out = [0.0f32; 4];
        pq.decode_into(&[5, 9], &mut out);
        assert_eq!(out, [5.0, 5.0, 9.0, 9.0]);
    }

    #[test]
    fn from_centroids_validates_shape() {
        assert!(ProductQuantizer::from_centroids(7, 2, vec![]).is_err());
        assert!(ProductQuantizer::from_centroids(8, 2, vec![0.0; 10]).is_err());
    }

    #[test]
    fn fit_yields_in_range_codes() {
        let samples: Vec<f32> = (0..64 * 16).map(|i| (i % 97) as f32 / 97.0).collect();
        let pq = ProductQuantizer::fit(16, 4, &samples).unwrap();
        let codes = pq.encode(&samples[..16]);
        assert_eq!(codes.len(), 4);
        assert!(codes.iter().all(|&c| (c as usize) < CLUSTERS));
    }
}
