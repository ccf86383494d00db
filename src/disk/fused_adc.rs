//! Fused ADC: product-quantization codes of a node's neighbors, stored
//! with the node itself.
//!
//! The header block carries the PQ codebook (subspace count S, then
//! S·32·(D/S) f32 centroids). Each node's inline record is M·S code bytes
//! in subspace-major order: subspace s holds M contiguous bytes, one per
//! neighbor slot, so scoring a query against all M neighbors is S
//! lookup-add passes over contiguous memory. Padding slots carry
//! arbitrary bytes; consumers gate by the recorded neighbor list.

use std::io::Write;

use crate::disk::feature::{FeatureId, FeatureWriter};
use crate::disk::header::CommonHeader;
use crate::error::{IndexError, Result};
use crate::graph::{SourceGraph, VectorSource};
use crate::io::{RandomAccessReader, WriteBytesBe};
use crate::pq::{CLUSTERS, ProductQuantizer};
use crate::similarity::{Similarity, dot, l2_squared};

/// Read-side state for the FUSED_ADC feature: codebook plus the record
/// geometry fixed by the common header.
#[derive(Debug, Clone)]
pub struct FusedAdc {
    pq: ProductQuantizer,
    max_degree: usize,
}

impl FusedAdc {
    pub fn new(pq: ProductQuantizer, max_degree: usize) -> Self {
        Self { pq, max_degree }
    }

    pub fn load(common: &CommonHeader, reader: &mut impl RandomAccessReader) -> Result<Self> {
        if common.dimension == 0 {
            return Err(IndexError::Format(
                "fused ADC requires a nonzero dimension".to_string(),
            ));
        }
        let subspaces = reader.read_i32()?;
        if subspaces <= 0 || common.dimension % subspaces as usize != 0 {
            return Err(IndexError::Format(format!(
                "fused ADC subspace count {subspaces} does not divide dimension {}",
                common.dimension
            )));
        }
        let subspaces = subspaces as usize;
        let mut centroids = vec![0.0f32; CLUSTERS * common.dimension];
        reader.read_f32_into(&mut centroids)?;
        let pq = ProductQuantizer::from_centroids(common.dimension, subspaces, centroids)?;
        Ok(Self::new(pq, common.max_degree))
    }

    pub fn subspaces(&self) -> usize {
        self.pq.subspaces()
    }

    pub fn header_size(&self) -> usize {
        4 + 4 * CLUSTERS * self.pq.dimension()
    }

    pub fn inline_size(&self) -> usize {
        self.max_degree * self.pq.subspaces()
    }

    /// Precompute the query-dependent S·32 lookup table.
    pub fn lookup_table(&self, query: &[f32], similarity: Similarity) -> AdcTable {
        let s = self.pq.subspaces();
        let sub_dim = self.pq.sub_dim();
        let mut partials = vec![0.0f32; s * CLUSTERS];
        let mut magnitudes = Vec::new();

        match similarity {
            Similarity::Euclidean => {
                for (i, p) in partials.iter_mut().enumerate() {
                    let (sub, c) = (i / CLUSTERS, i % CLUSTERS);
                    let q = &query[sub * sub_dim..(sub + 1) * sub_dim];
                    *p = l2_squared(q, self.pq.centroid(sub, c));
                }
            }
            Similarity::DotProduct => {
                for (i, p) in partials.iter_mut().enumerate() {
                    let (sub, c) = (i / CLUSTERS, i % CLUSTERS);
                    let q = &query[sub * sub_dim..(sub + 1) * sub_dim];
                    *p = dot(q, self.pq.centroid(sub, c));
                }
            }
            Similarity::Cosine => {
                magnitudes = vec![0.0f32; s * CLUSTERS];
                for i in 0..partials.len() {
                    let (sub, c) = (i / CLUSTERS, i % CLUSTERS);
                    let q = &query[sub * sub_dim..(sub + 1) * sub_dim];
                    let centroid = self.pq.centroid(sub, c);
                    partials[i] = dot(q, centroid);
                    magnitudes[i] = dot(centroid, centroid);
                }
            }
        }

        AdcTable {
            similarity,
            partials,
            magnitudes,
            query_norm: dot(query, query).sqrt(),
        }
    }

    /// Score every neighbor slot of one node's code block.
    ///
    /// `block` is the node's `M·S` inline record; `scores` receives M
    /// values. Padding slots produce garbage scores the caller must gate
    /// by the neighbor count.
    pub fn score_block(&self, table: &AdcTable, block: &[u8], scores: &mut [f32]) {
        let m = self.max_degree;
        let s = self.pq.subspaces();
        debug_assert_eq!(block.len(), m * s);
        debug_assert_eq!(scores.len(), m);

        scores.fill(0.0);
        for sub in 0..s {
            let codes = &block[sub * m..(sub + 1) * m];
            let row = &table.partials[sub * CLUSTERS..(sub + 1) * CLUSTERS];
            for (score, &code) in scores.iter_mut().zip(codes) {
                *score += row[code as usize];
            }
        }

        match table.similarity {
            Similarity::Euclidean => {
                for score in scores.iter_mut() {
                    *score = 1.0 / (1.0 + *score);
                }
            }
            Similarity::DotProduct => {
                for score in scores.iter_mut() {
                    *score = (1.0 + *score) / 2.0;
                }
            }
            Similarity::Cosine => {
                for (j, score) in scores.iter_mut().enumerate() {
                    let mut mag = 0.0;
                    for sub in 0..s {
                        let code = block[sub * m + j] as usize;
                        mag += table.magnitudes[sub * CLUSTERS + code];
                    }
                    let denom = table.query_norm * mag.sqrt();
                    *score = if denom == 0.0 {
                        0.5
                    } else {
                        (1.0 + *score / denom) / 2.0
                    };
                }
            }
        }
    }
}

/// Query-dependent lookup table: one partial accumulator per
/// subspace×cluster, plus centroid magnitude partials for cosine.
#[derive(Debug, Clone)]
pub struct AdcTable {
    similarity: Similarity,
    partials: Vec<f32>,
    /// Per-centroid squared-magnitude partials; populated for cosine only.
    magnitudes: Vec<f32>,
    query_norm: f32,
}

/// Writes each node's fused neighbor-code block.
pub struct FusedAdcWriter<'a, G: SourceGraph, V: VectorSource> {
    pq: ProductQuantizer,
    graph: &'a G,
    source: &'a V,
}

impl<'a, G: SourceGraph, V: VectorSource> FusedAdcWriter<'a, G, V> {
    pub fn new(pq: ProductQuantizer, graph: &'a G, source: &'a V) -> Result<Self> {
        if pq.dimension() != source.dimension() {
            return Err(IndexError::Precondition(format!(
                "PQ dimension {} does not match vector dimension {}",
                pq.dimension(),
                source.dimension()
            )));
        }
        Ok(Self { pq, graph, source })
    }
}

impl<G: SourceGraph, V: VectorSource> FeatureWriter for FusedAdcWriter<'_, G, V> {
    fn id(&self) -> FeatureId {
        FeatureId::FusedAdc
    }

    fn header_size(&self) -> usize {
        4 + 4 * CLUSTERS * self.pq.dimension()
    }

    fn inline_size(&self) -> usize {
        self.graph.max_degree() * self.pq.subspaces()
    }

    fn write_header(&self, out: &mut dyn Write) -> Result<()> {
        out.write_i32_be(self.pq.subspaces() as i32)?;
        for &c in self.pq.centroids() {
            out.write_f32_be(c)?;
        }
        Ok(())
    }

    fn write_inline(&self, node: i32, out: &mut dyn Write) -> Result<()> {
        let m = self.graph.max_degree();
        let s = self.pq.subspaces();
        let mut block = vec![0u8; m * s];
        let mut codes = vec![0u8; s];
        for (j, &neighbor) in self.graph.neighbors(node).iter().enumerate() {
            self.pq.encode_into(self.source.vector(neighbor), &mut codes);
            for (sub, &code) in codes.iter().enumerate() {
                block[sub * m + j] = code;
            }
        }
        out.write_all(&block)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ListGraph, SliceVectors};

    fn identity_ish_pq(dimension: usize, subspaces: usize) -> ProductQuantizer {
        let sub_dim = dimension / subspaces;
        let mut centroids = Vec::new();
        for _sub in 0..subspaces {
            for c in 0..CLUSTERS {
                centroids.extend(std::iter::repeat_n(c as f32 / CLUSTERS as f32, sub_dim));
            }
        }
        ProductQuantizer::from_centroids(dimension, subspaces, centroids).unwrap()
    }

    #[test]
    fn inline_block_is_subspace_major() {
        let pq = identity_ish_pq(4, 2);
        let mut graph = ListGraph::new(3);
        let mut vectors = SliceVectors::new(4);
        // node 0 -> neighbors 1, 2
        graph.add_node(&[1, 2]).unwrap();
        graph.add_node(&[]).unwrap();
        graph.add_node(&[]).unwrap();
        vectors.push(&[0.0; 4]);
        vectors.push(&[5.0 / 32.0, 5.0 / 32.0, 9.0 / 32.0, 9.0 / 32.0]);
        vectors.push(&[1.0 / 32.0, 1.0 / 32.0, 2.0 / 32.0, 2.0 / 32.0]);

        let writer = FusedAdcWriter::new(pq, &graph, &vectors).unwrap();
        let mut block = Vec::new();
        writer.write_inline(0, &mut block).unwrap();

        // M=3, S=2: subspace 0 row then subspace 1 row, slot 2 padded
        assert_eq!(block, vec![5, 1, 0, 9, 2, 0]);
    }

    #[test]
    fn bulk_scores_match_per_neighbor_scoring() {
        let pq = identity_ish_pq(4, 2);
        let fused = FusedAdc::new(pq.clone(), 2);
        let query = [0.3f32, 0.1, 0.7, 0.2];

        // two neighbor code words
        let words = [[3u8, 17], [25, 4]];
        // transposed block: subspace-major
        let block = vec![words[0][0], words[1][0], words[0][1], words[1][1]];

        for similarity in [
            Similarity::Euclidean,
            Similarity::DotProduct,
            Similarity::Cosine,
        ] {
            let table = fused.lookup_table(&query, similarity);
            let mut scores = [0.0f32; 2];
            fused.score_block(&table, &block, &mut scores);

            let mut decoded = [0.0f32; 4];
            for (j, word) in words.iter().enumerate() {
                pq.decode_into(word, &mut decoded);
                let expected = similarity.score(&query, &decoded);
                assert!(
                    (scores[j] - expected).abs() < 1e-5,
                    "{similarity:?} slot {j}: {} vs {expected}",
                    scores[j]
                );
            }
        }
    }
}
