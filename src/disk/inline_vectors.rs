//! Uncompressed inline vectors: 4·D bytes per node, no file-level header.
//!
//! The declared dimension lives in the common header, so this feature
//! contributes no header block of its own.

use std::io::Write;

use crate::disk::feature::{FeatureId, FeatureWriter};
use crate::disk::header::CommonHeader;
use crate::error::Result;
use crate::graph::VectorSource;
use crate::io::{RandomAccessReader, WriteBytesBe};

/// Read-side state for the INLINE_VECTORS feature.
#[derive(Debug, Clone)]
pub struct InlineVectors {
    dimension: usize,
}

impl InlineVectors {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn load(common: &CommonHeader, _reader: &mut impl RandomAccessReader) -> Result<Self> {
        Ok(Self::new(common.dimension))
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn header_size(&self) -> usize {
        0
    }

    pub fn inline_size(&self) -> usize {
        4 * self.dimension
    }
}

/// Writes each node's raw vector inline.
pub struct InlineVectorsWriter<'a, V: VectorSource> {
    feature: InlineVectors,
    source: &'a V,
}

impl<'a, V: VectorSource> InlineVectorsWriter<'a, V> {
    pub fn new(source: &'a V) -> Self {
        Self {
            feature: InlineVectors::new(source.dimension()),
            source,
        }
    }
}

impl<V: VectorSource> FeatureWriter for InlineVectorsWriter<'_, V> {
    fn id(&self) -> FeatureId {
        FeatureId::InlineVectors
    }

    fn header_size(&self) -> usize {
        self.feature.header_size()
    }

    fn inline_size(&self) -> usize {
        self.feature.inline_size()
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.feature.dimension())
    }

    fn write_header(&self, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    fn write_inline(&self, node: i32, out: &mut dyn Write) -> Result<()> {
        for &x in self.source.vector(node) {
            out.write_f32_be(x)?;
        }
        Ok(())
    }
}
