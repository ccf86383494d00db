//! Writer: turns an in-memory graph plus a feature set into a sealed
//! artifact.
//!
//! The write is one forward pass over a pure streaming sink: header,
//! then N fixed-stride records. Every precondition is proven before the
//! first byte so a failed write leaves the sink untouched.

use std::io::Write;

use tracing::debug;

use crate::disk::feature::{FeatureId, FeatureSet, FeatureWriter};
use crate::disk::header::{CURRENT_VERSION, CommonHeader};
use crate::disk::ordinal::OrdinalMap;
use crate::error::{IndexError, Result};
use crate::graph::SourceGraph;
use crate::io::WriteBytesBe;

/// Configures an [`OnDiskWriter`]: graph, ordinal mapping, features.
pub struct OnDiskWriterBuilder<'a, G: SourceGraph> {
    graph: &'a G,
    mapping: Option<OrdinalMap>,
    features: Vec<Box<dyn FeatureWriter + 'a>>,
}

impl<'a, G: SourceGraph> OnDiskWriterBuilder<'a, G> {
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            mapping: None,
            features: Vec::new(),
        }
    }

    /// Add a feature; a second writer with the same id replaces the first.
    pub fn with(mut self, feature: Box<dyn FeatureWriter + 'a>) -> Self {
        self.features.retain(|f| f.id() != feature.id());
        self.features.push(feature);
        self
    }

    /// Use a caller-supplied mapping instead of sequential renumbering.
    pub fn with_mapping(mut self, mapping: OrdinalMap) -> Self {
        self.mapping = Some(mapping);
        self
    }

    pub fn build(self) -> Result<OnDiskWriter<'a, G>> {
        let set: FeatureSet = self.features.iter().map(|f| f.id()).collect();
        if set.contains(FeatureId::FusedAdc)
            && !(set.contains(FeatureId::InlineVectors) || set.contains(FeatureId::Lvq))
        {
            return Err(IndexError::Precondition(
                "fused ADC requires an exact score source".to_string(),
            ));
        }
        let mut features = self.features;
        features.sort_by_key(|f| f.id().bitshift());
        let mapping = self
            .mapping
            .unwrap_or_else(|| OrdinalMap::sequential(self.graph));
        Ok(OnDiskWriter {
            graph: self.graph,
            mapping,
            features,
            written: false,
        })
    }
}

/// Single-use artifact writer (Configured → Written).
pub struct OnDiskWriter<'a, G: SourceGraph> {
    graph: &'a G,
    mapping: OrdinalMap,
    features: Vec<Box<dyn FeatureWriter + 'a>>,
    written: bool,
}

impl<G: SourceGraph> OnDiskWriter<'_, G> {
    /// Fixed per-node record stride: sanity ordinal + inline payloads +
    /// neighbor count + M neighbor slots.
    pub fn record_size(&self) -> usize {
        let inline: usize = self.features.iter().map(|f| f.inline_size()).sum();
        4 + inline + 4 + 4 * self.graph.max_degree()
    }

    /// Emit the artifact. Preconditions fail before any output byte; the
    /// writer is spent once this returns Ok.
    pub fn write(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.written {
            return Err(IndexError::InvalidState(
                "writer already produced its artifact".to_string(),
            ));
        }

        if self.graph.tombstone_count() > 0 {
            return Err(IndexError::Precondition(
                "graph has tombstoned nodes; run cleanup before writing".to_string(),
            ));
        }
        let n = self.graph.size();
        if self.mapping.len() != n {
            return Err(IndexError::Precondition(format!(
                "mapping size {} does not match graph size {n}",
                self.mapping.len()
            )));
        }
        let inversion = self.mapping.invert(n)?;

        let m = self.graph.max_degree();
        for &old in &inversion {
            if !self.graph.contains_node(old) {
                return Err(IndexError::Precondition(format!(
                    "mapping covers node {old}, which is not in the graph"
                )));
            }
            let neighbors = self.graph.neighbors(old);
            if neighbors.len() > m {
                return Err(IndexError::Precondition(format!(
                    "node {old} has {} neighbors, more than max degree {m}",
                    neighbors.len()
                )));
            }
            for &neighbor in neighbors {
                if self.mapping.get(neighbor).is_none() {
                    return Err(IndexError::Precondition(format!(
                        "neighbor {neighbor} of node {old} has no ordinal"
                    )));
                }
            }
        }

        let dimension = self
            .features
            .iter()
            .find_map(|f| f.dimension())
            .unwrap_or(0);
        let entry_node = if n == 0 {
            0
        } else {
            self.mapping
                .get(self.graph.entry_node())
                .ok_or_else(|| {
                    IndexError::Precondition(format!(
                        "entry node {} has no ordinal",
                        self.graph.entry_node()
                    ))
                })?
        };

        debug!(
            nodes = n,
            dimension,
            max_degree = m,
            features = self.features.len(),
            stride = self.record_size(),
            "graph.write.start"
        );

        let common = CommonHeader {
            version: CURRENT_VERSION,
            size: n,
            dimension,
            entry_node,
            max_degree: m,
        };
        common.write(out)?;
        let set: FeatureSet = self.features.iter().map(|f| f.id()).collect();
        out.write_i32_be(set.serialize() as i32)?;
        for feature in &self.features {
            feature.write_header(out)?;
        }

        for (new, &old) in inversion.iter().enumerate() {
            out.write_i32_be(new as i32)?;
            for feature in &self.features {
                feature.write_inline(old, out)?;
            }
            let neighbors = self.graph.neighbors(old);
            out.write_i32_be(neighbors.len() as i32)?;
            for &neighbor in neighbors {
                let mapped = self.mapping.get(neighbor).ok_or_else(|| {
                    IndexError::Precondition(format!("neighbor {neighbor} has no ordinal"))
                })?;
                out.write_i32_be(mapped)?;
            }
            for _ in neighbors.len()..m {
                out.write_i32_be(-1)?;
            }
        }

        self.written = true;
        debug!(nodes = n, "graph.write.done");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::disk::inline_vectors::InlineVectorsWriter;
    use crate::graph::{ListGraph, SliceVectors};

    fn pair() -> (ListGraph, SliceVectors) {
        let mut graph = ListGraph::new(2);
        graph.add_node(&[1]).unwrap();
        graph.add_node(&[0]).unwrap();
        let mut vectors = SliceVectors::new(2);
        vectors.push(&[1.0, 0.0]);
        vectors.push(&[0.0, 1.0]);
        (graph, vectors)
    }

    #[test]
    fn tombstones_fail_before_any_output() {
        let (mut graph, vectors) = pair();
        graph.mark_deleted(1);
        let mut writer = OnDiskWriterBuilder::new(&graph)
            .with(Box::new(InlineVectorsWriter::new(&vectors)))
            .build()
            .unwrap();
        let mut sink = Vec::new();
        let err = writer.write(&mut sink).unwrap_err();
        assert!(matches!(err, IndexError::Precondition(_)), "{err}");
        assert!(sink.is_empty(), "precondition failure wrote bytes");
    }

    #[test]
    fn mapping_size_mismatch_rejected() {
        let (graph, vectors) = pair();
        let short = OrdinalMap::from_map(HashMap::from([(0, 0)]));
        let mut writer = OnDiskWriterBuilder::new(&graph)
            .with(Box::new(InlineVectorsWriter::new(&vectors)))
            .with_mapping(short)
            .build()
            .unwrap();
        let mut sink = Vec::new();
        assert!(writer.write(&mut sink).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn non_surjective_mapping_rejected() {
        let (graph, vectors) = pair();
        let gapped = OrdinalMap::from_map(HashMap::from([(0, 0), (1, 2)]));
        let mut writer = OnDiskWriterBuilder::new(&graph)
            .with(Box::new(InlineVectorsWriter::new(&vectors)))
            .with_mapping(gapped)
            .build()
            .unwrap();
        let mut sink = Vec::new();
        assert!(writer.write(&mut sink).is_err());
        assert!(sink.is_empty());
    }

    #[test]
    fn writer_is_single_use() {
        let (graph, vectors) = pair();
        let mut writer = OnDiskWriterBuilder::new(&graph)
            .with(Box::new(InlineVectorsWriter::new(&vectors)))
            .build()
            .unwrap();
        let mut sink = Vec::new();
        writer.write(&mut sink).unwrap();
        let err = writer.write(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, IndexError::InvalidState(_)), "{err}");
    }

    #[test]
    fn record_stride_accounts_for_every_slot() {
        let (graph, vectors) = pair();
        let mut writer = OnDiskWriterBuilder::new(&graph)
            .with(Box::new(InlineVectorsWriter::new(&vectors)))
            .build()
            .unwrap();
        // ordinal + 2 f32 + count + 2 neighbor slots
        assert_eq!(writer.record_size(), 4 + 8 + 4 + 8);
        let mut sink = Vec::new();
        writer.write(&mut sink).unwrap();
        assert_eq!(sink.len(), 28 + 2 * 24);
    }
}
