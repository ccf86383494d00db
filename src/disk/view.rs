//! Random-access read side: the parsed artifact handle and its views.
//!
//! [`OnDiskGraphIndex`] parses the header once and precomputes record
//! geometry; it is a cheap immutable handle. Each [`OnDiskView`] owns an
//! independent cursor minted from the reader factory plus a preallocated
//! M-slot neighbor buffer, so views are strictly single-reader and a
//! search driver gives each worker its own.

use std::path::Path;

use tracing::debug;

use crate::disk::feature::{Feature, FeatureId, FeatureSet};
use crate::disk::fused_adc::{AdcTable, FusedAdc};
use crate::disk::header::Header;
use crate::disk::lvq::Lvq;
use crate::error::{IndexError, Result};
use crate::io::{MappedReader, RandomAccessReader, ReaderFactory};
use crate::similarity::Similarity;

/// Immutable handle over a persisted artifact: parsed header, reader
/// factory, record geometry.
pub struct OnDiskGraphIndex<F: ReaderFactory> {
    factory: F,
    header: Header,
    record_base: u64,
    record_size: u64,
    /// Per-feature inline-slot offsets within a record, past the leading
    /// sanity ordinal.
    inline_offsets: Vec<(FeatureId, usize)>,
    inline_total: usize,
}

impl OnDiskGraphIndex<MappedReader> {
    /// Map an artifact file and load it from offset 0.
    pub fn open(path: &Path) -> Result<Self> {
        Self::load(MappedReader::from_path(path)?, 0)
    }
}

impl<F: ReaderFactory> OnDiskGraphIndex<F> {
    /// Parse the header found at `offset` and keep `factory` for minting
    /// view cursors.
    pub fn load(factory: F, offset: u64) -> Result<Self> {
        let mut reader = factory.duplicate()?;
        let header = Header::load(&mut reader, offset)?;
        let record_base = reader.position();

        let mut inline_offsets = Vec::with_capacity(header.features().len());
        let mut acc = 4usize; // past the sanity ordinal
        for feature in header.features() {
            inline_offsets.push((feature.id(), acc));
            acc += feature.inline_size();
        }
        let inline_total = header.inline_total();
        let record_size = (4 + inline_total + 4 + 4 * header.common.max_degree) as u64;

        debug!(
            nodes = header.common.size,
            stride = record_size,
            base = record_base,
            "graph.load"
        );
        Ok(Self {
            factory,
            header,
            record_base,
            record_size,
            inline_offsets,
            inline_total,
        })
    }

    pub fn size(&self) -> usize {
        self.header.common.size
    }

    pub fn dimension(&self) -> usize {
        self.header.common.dimension
    }

    pub fn max_degree(&self) -> usize {
        self.header.common.max_degree
    }

    pub fn entry_node(&self) -> i32 {
        self.header.common.entry_node
    }

    pub fn version(&self) -> u32 {
        self.header.common.version
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.header.feature_set()
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Constant record stride in bytes.
    pub fn record_size(&self) -> u64 {
        self.record_size
    }

    fn check_node(&self, node: i32) -> Result<()> {
        if node < 0 || node as usize >= self.size() {
            return Err(IndexError::Format(format!(
                "node id {node} outside [0, {})",
                self.size()
            )));
        }
        Ok(())
    }

    fn record_offset(&self, node: i32) -> u64 {
        self.record_base + node as u64 * self.record_size
    }

    fn neighbors_offset(&self, node: i32) -> u64 {
        self.record_offset(node) + 4 + self.inline_total as u64
    }

    fn inline_offset(&self, id: FeatureId) -> Option<usize> {
        self.inline_offsets
            .iter()
            .find(|(fid, _)| *fid == id)
            .map(|&(_, off)| off)
    }

    /// Open a view with its own cursor and scratch buffer.
    pub fn view(&self) -> Result<OnDiskView<'_, F>> {
        Ok(OnDiskView {
            index: self,
            reader: Some(self.factory.duplicate()?),
            neighbors: vec![0; self.max_degree()],
        })
    }

    /// Exact score function over the artifact's inline vectors, falling
    /// back to LVQ dequantization. Owns an independent cursor.
    pub fn reranker(&self, query: &[f32], similarity: Similarity) -> Result<Reranker<'_, F>> {
        if query.len() != self.dimension() {
            return Err(IndexError::Precondition(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension()
            )));
        }
        let source = if let Some(offset) = self.inline_offset(FeatureId::InlineVectors) {
            RerankSource::Inline { offset }
        } else if let (Some(Feature::Lvq(lvq)), Some(offset)) =
            (self.header.feature(FeatureId::Lvq), self.inline_offset(FeatureId::Lvq))
        {
            RerankSource::Lvq {
                feature: lvq,
                offset,
                codes: vec![0; lvq.inline_size() - 8],
            }
        } else {
            return Err(IndexError::Unsupported(
                "artifact has no exact score source".to_string(),
            ));
        };
        Ok(Reranker {
            index: self,
            reader: self.factory.duplicate()?,
            query: query.to_vec(),
            similarity,
            source,
            decoded: vec![0.0; self.dimension()],
        })
    }

    /// Bulk approximate score function over fused neighbor PQ codes.
    /// Owns an independent cursor.
    pub fn approx_scorer(
        &self,
        query: &[f32],
        similarity: Similarity,
    ) -> Result<ApproxScorer<'_, F>> {
        if query.len() != self.dimension() {
            return Err(IndexError::Precondition(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension()
            )));
        }
        let (Some(Feature::FusedAdc(fused)), Some(offset)) = (
            self.header.feature(FeatureId::FusedAdc),
            self.inline_offset(FeatureId::FusedAdc),
        ) else {
            return Err(IndexError::Unsupported(
                "artifact has no fused ADC feature".to_string(),
            ));
        };
        let table = fused.lookup_table(query, similarity);
        Ok(ApproxScorer {
            index: self,
            feature: fused,
            offset,
            reader: self.factory.duplicate()?,
            table,
            block: vec![0; fused.inline_size()],
            scores: vec![0.0; self.max_degree()],
        })
    }
}

/// Stateful single-reader cursor over one artifact (Open → Closed).
pub struct OnDiskView<'a, F: ReaderFactory> {
    index: &'a OnDiskGraphIndex<F>,
    reader: Option<F::Reader>,
    neighbors: Vec<i32>,
}

impl<'a, F: ReaderFactory> OnDiskView<'a, F> {
    pub fn size(&self) -> usize {
        self.index.size()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn max_degree(&self) -> usize {
        self.index.max_degree()
    }

    pub fn entry_node(&self) -> i32 {
        self.index.entry_node()
    }

    fn reader(&mut self) -> Result<&mut F::Reader> {
        self.reader
            .as_mut()
            .ok_or_else(|| IndexError::InvalidState("view is closed".to_string()))
    }

    /// The live neighbors of `node`, valid until the next read.
    pub fn neighbors(&mut self, node: i32) -> Result<&[i32]> {
        self.index.check_node(node)?;
        let offset = self.index.neighbors_offset(node);
        let size = self.index.size();
        let max_degree = self.index.max_degree();

        // field-level borrows: the cursor and the scratch buffer are
        // disjoint pieces of this view
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| IndexError::InvalidState("view is closed".to_string()))?;
        reader.seek(offset)?;
        let count = reader.read_i32()?;
        if count < 0 || count as usize > max_degree {
            return Err(IndexError::Format(format!(
                "node {node} neighbor count {count} > M {max_degree}"
            )));
        }
        let count = count as usize;
        reader.read_i32_into(&mut self.neighbors[..count])?;
        for &neighbor in &self.neighbors[..count] {
            if neighbor < 0 || neighbor as usize >= size {
                return Err(IndexError::Format(format!(
                    "node {node} references neighbor {neighbor} outside [0, {size})"
                )));
            }
        }
        Ok(&self.neighbors[..count])
    }

    /// Decode node `node`'s inline vector into `out`.
    pub fn vector_into(&mut self, node: i32, out: &mut [f32]) -> Result<()> {
        let Some(inline) = self.index.inline_offset(FeatureId::InlineVectors) else {
            return Err(IndexError::Unsupported(
                "artifact has no inline vectors".to_string(),
            ));
        };
        self.index.check_node(node)?;
        if out.len() != self.index.dimension() {
            return Err(IndexError::Precondition(format!(
                "output length {} does not match dimension {}",
                out.len(),
                self.index.dimension()
            )));
        }
        let offset = self.index.record_offset(node) + inline as u64;
        let reader = self.reader()?;
        reader.seek(offset)?;
        reader.read_f32_into(out)?;
        Ok(())
    }

    pub fn vector(&mut self, node: i32) -> Result<Vec<f32>> {
        let mut out = vec![0.0; self.index.dimension()];
        self.vector_into(node, &mut out)?;
        Ok(out)
    }

    /// Verify the leading sanity ordinal of `node`'s record.
    pub fn validate_record(&mut self, node: i32) -> Result<()> {
        self.index.check_node(node)?;
        let offset = self.index.record_offset(node);
        let reader = self.reader()?;
        reader.seek(offset)?;
        let ordinal = reader.read_i32()?;
        if ordinal != node {
            return Err(IndexError::Format(format!(
                "record {node} starts with ordinal {ordinal}"
            )));
        }
        Ok(())
    }

    /// Exact reranker bound to the same artifact; see
    /// [`OnDiskGraphIndex::reranker`].
    pub fn reranker(&self, query: &[f32], similarity: Similarity) -> Result<Reranker<'a, F>> {
        self.index.reranker(query, similarity)
    }

    /// Bulk approximate scorer; see [`OnDiskGraphIndex::approx_scorer`].
    pub fn approx_scorer(
        &self,
        query: &[f32],
        similarity: Similarity,
    ) -> Result<ApproxScorer<'a, F>> {
        self.index.approx_scorer(query, similarity)
    }

    /// Release the cursor. Idempotent; subsequent reads fail with
    /// `InvalidState`.
    pub fn close(&mut self) {
        self.reader = None;
    }

    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

enum RerankSource<'a> {
    Inline { offset: usize },
    Lvq {
        feature: &'a Lvq,
        offset: usize,
        codes: Vec<u8>,
    },
}

/// Exact score function closing over an exact-source feature.
pub struct Reranker<'a, F: ReaderFactory> {
    index: &'a OnDiskGraphIndex<F>,
    reader: F::Reader,
    query: Vec<f32>,
    similarity: Similarity,
    source: RerankSource<'a>,
    decoded: Vec<f32>,
}

impl<F: ReaderFactory> Reranker<'_, F> {
    /// Exact similarity of `node`'s stored vector against the query.
    pub fn score(&mut self, node: i32) -> Result<f32> {
        self.index.check_node(node)?;
        let record = self.index.record_offset(node);
        match &mut self.source {
            RerankSource::Inline { offset } => {
                self.reader.seek(record + *offset as u64)?;
                self.reader.read_f32_into(&mut self.decoded)?;
            }
            RerankSource::Lvq {
                feature,
                offset,
                codes,
            } => {
                self.reader.seek(record + *offset as u64)?;
                let bias = self.reader.read_f32()?;
                let scale = self.reader.read_f32()?;
                self.reader.read_fully(codes)?;
                feature.decode_into(bias, scale, codes, &mut self.decoded);
            }
        }
        Ok(self.similarity.score(&self.query, &self.decoded))
    }
}

/// Approximate score function over one node's fused neighbor-code block.
pub struct ApproxScorer<'a, F: ReaderFactory> {
    index: &'a OnDiskGraphIndex<F>,
    feature: &'a FusedAdc,
    offset: usize,
    reader: F::Reader,
    table: AdcTable,
    block: Vec<u8>,
    scores: Vec<f32>,
}

impl<F: ReaderFactory> ApproxScorer<'_, F> {
    /// Score all M neighbor slots of `node` in one pass. The first c
    /// entries (c = recorded neighbor count) are meaningful; the caller
    /// gates by the neighbor list.
    pub fn score_neighbors(&mut self, node: i32) -> Result<&[f32]> {
        self.index.check_node(node)?;
        self.reader
            .seek(self.index.record_offset(node) + self.offset as u64)?;
        self.reader.read_fully(&mut self.block)?;
        self.feature
            .score_block(&self.table, &self.block, &mut self.scores);
        Ok(&self.scores)
    }
}
