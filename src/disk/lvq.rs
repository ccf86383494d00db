//! Locally-adaptive vector quantization.
//!
//! The header block carries one global f32 mean per dimension. Each node's
//! inline record is its own (bias, scale) pair followed by 8-bit codes of
//! the mean-centered residual, zero-padded to a 64-byte multiple:
//!
//! ```text
//! f32 bias | f32 scale | ⌈D/64⌉·64 code bytes
//! ```
//!
//! Dequantization of dimension d is `mean[d] + bias + scale * code[d]`.
//! The record layout is private to this module; the writer only sees
//! `inline_size`.

use std::io::Write;

use crate::disk::feature::{FeatureId, FeatureWriter};
use crate::disk::header::CommonHeader;
use crate::error::{IndexError, Result};
use crate::graph::{SourceGraph, VectorSource};
use crate::io::{RandomAccessReader, WriteBytesBe};

/// Code bytes are padded to this multiple.
const CODE_ALIGNMENT: usize = 64;

fn padded_codes(dimension: usize) -> usize {
    dimension.div_ceil(CODE_ALIGNMENT) * CODE_ALIGNMENT
}

/// Read-side state for the LVQ feature: the global per-dimension means.
#[derive(Debug, Clone)]
pub struct Lvq {
    means: Vec<f32>,
}

impl Lvq {
    pub fn new(means: Vec<f32>) -> Self {
        Self { means }
    }

    /// Compute global means over the live nodes of `graph`.
    pub fn fit(graph: &impl SourceGraph, source: &impl VectorSource) -> Self {
        let dimension = source.dimension();
        let mut means = vec![0.0f32; dimension];
        let mut count = 0usize;
        for id in 0..graph.id_upper_bound() {
            if !graph.contains_node(id) {
                continue;
            }
            for (m, x) in means.iter_mut().zip(source.vector(id)) {
                *m += x;
            }
            count += 1;
        }
        if count > 0 {
            for m in &mut means {
                *m /= count as f32;
            }
        }
        Self { means }
    }

    pub fn load(common: &CommonHeader, reader: &mut impl RandomAccessReader) -> Result<Self> {
        let mut means = vec![0.0f32; common.dimension];
        reader.read_f32_into(&mut means)?;
        Ok(Self { means })
    }

    pub fn dimension(&self) -> usize {
        self.means.len()
    }

    pub fn header_size(&self) -> usize {
        4 * self.means.len()
    }

    pub fn inline_size(&self) -> usize {
        padded_codes(self.means.len()) + 8
    }

    /// Quantize the residual of `vector` against the global means.
    /// Returns (bias, scale); `codes` must be `inline_size() - 8` long and
    /// its tail past D is zeroed.
    pub fn encode_into(&self, vector: &[f32], codes: &mut [u8]) -> (f32, f32) {
        debug_assert_eq!(vector.len(), self.means.len());
        debug_assert_eq!(codes.len(), padded_codes(self.means.len()));

        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for (x, m) in vector.iter().zip(&self.means) {
            let r = x - m;
            lo = lo.min(r);
            hi = hi.max(r);
        }
        if !lo.is_finite() {
            lo = 0.0;
            hi = 0.0;
        }
        let scale = if hi > lo { (hi - lo) / 255.0 } else { 0.0 };

        codes.fill(0);
        for (slot, (x, m)) in codes.iter_mut().zip(vector.iter().zip(&self.means)) {
            let r = x - m;
            *slot = if scale > 0.0 {
                ((r - lo) / scale).round().clamp(0.0, 255.0) as u8
            } else {
                0
            };
        }
        (lo, scale)
    }

    /// Reconstruct an approximate vector from one node's record.
    pub fn decode_into(&self, bias: f32, scale: f32, codes: &[u8], out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.means.len());
        for (d, o) in out.iter_mut().enumerate() {
            *o = self.means[d] + bias + scale * codes[d] as f32;
        }
    }
}

/// Writes each node's LVQ record from the raw vector source.
pub struct LvqWriter<'a, V: VectorSource> {
    lvq: Lvq,
    source: &'a V,
}

impl<'a, V: VectorSource> LvqWriter<'a, V> {
    pub fn new(lvq: Lvq, source: &'a V) -> Result<Self> {
        if lvq.dimension() != source.dimension() {
            return Err(IndexError::Precondition(format!(
                "LVQ means dimension {} does not match vector dimension {}",
                lvq.dimension(),
                source.dimension()
            )));
        }
        Ok(Self { lvq, source })
    }
}

impl<V: VectorSource> FeatureWriter for LvqWriter<'_, V> {
    fn id(&self) -> FeatureId {
        FeatureId::Lvq
    }

    fn header_size(&self) -> usize {
        self.lvq.header_size()
    }

    fn inline_size(&self) -> usize {
        self.lvq.inline_size()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.lvq.dimension())
    }

    fn write_header(&self, out: &mut dyn Write) -> Result<()> {
        for &m in &self.lvq.means {
            out.write_f32_be(m)?;
        }
        Ok(())
    }

    fn write_inline(&self, node: i32, out: &mut dyn Write) -> Result<()> {
        let mut codes = vec![0u8; padded_codes(self.lvq.dimension())];
        let (bias, scale) = self.lvq.encode_into(self.source.vector(node), &mut codes);
        out.write_f32_be(bias)?;
        out.write_f32_be(scale)?;
        out.write_all(&codes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_are_64_byte_aligned() {
        assert_eq!(Lvq::new(vec![0.0; 2]).inline_size(), 64 + 8);
        assert_eq!(Lvq::new(vec![0.0; 64]).inline_size(), 64 + 8);
        assert_eq!(Lvq::new(vec![0.0; 65]).inline_size(), 128 + 8);
    }

    #[test]
    fn encode_decode_error_bounded_by_scale() {
        let means = vec![1.0f32, -2.0, 0.5, 3.0];
        let lvq = Lvq::new(means);
        let v = [1.7f32, -2.9, 4.5, 3.0];

        let mut codes = vec![0u8; padded_codes(4)];
        let (bias, scale) = lvq.encode_into(&v, &mut codes);

        let mut out = [0.0f32; 4];
        lvq.decode_into(bias, scale, &codes, &mut out);
        for (orig, approx) in v.iter().zip(&out) {
            assert!(
                (orig - approx).abs() <= scale / 2.0 + 1e-6,
                "{orig} vs {approx} (scale {scale})"
            );
        }
    }

    #[test]
    fn constant_residual_collapses_to_zero_scale() {
        let lvq = Lvq::new(vec![0.0f32; 3]);
        let mut codes = vec![0u8; padded_codes(3)];
        let (bias, scale) = lvq.encode_into(&[2.0, 2.0, 2.0], &mut codes);
        assert_eq!(bias, 2.0);
        assert_eq!(scale, 0.0);

        let mut out = [0.0f32; 3];
        lvq.decode_into(bias, scale, &codes, &mut out);
        assert_eq!(out, [2.0, 2.0, 2.0]);
    }
}
