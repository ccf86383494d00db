//! proxima: on-disk Vamana-style proximity graph indexes.
//!
//! A directed proximity graph over N vector points, persisted as a single
//! self-describing binary artifact built for random-access traversal from
//! secondary storage. Per-node "feature" payloads live inline with each
//! node's adjacency list, so one record fetch serves a whole traversal
//! step:
//!
//! | Feature | Payload per node | Used for |
//! |---------|------------------|----------|
//! | [`disk::InlineVectors`] | raw f32·D | exact scoring, reranking |
//! | [`disk::Lvq`] | 8-bit codes + bias/scale | compact exact-ish scoring |
//! | [`disk::FusedAdc`] | PQ codes of the node's neighbors, transposed | bulk approximate scoring during traversal |
//!
//! # Write once, read many
//!
//! The writer consumes an in-memory [`graph::SourceGraph`] (cleaned of
//! tombstones), renumbers node ids onto dense ordinals, and streams a
//! fixed-stride artifact in a single pass. The read side parses the
//! header once into an [`disk::OnDiskGraphIndex`] handle; each searcher
//! thread opens its own [`disk::OnDiskView`] cursor over the shared
//! immutable bytes.
//!
//! ```no_run
//! use proxima::disk::{InlineVectorsWriter, OnDiskGraphIndex, OnDiskWriterBuilder};
//! use proxima::graph::{ListGraph, SliceVectors};
//! use proxima::similarity::Similarity;
//!
//! # fn main() -> proxima::Result<()> {
//! # let (graph, vectors): (ListGraph, SliceVectors) = unimplemented!();
//! let mut writer = OnDiskWriterBuilder::new(&graph)
//!     .with(Box::new(InlineVectorsWriter::new(&vectors)))
//!     .build()?;
//! let mut artifact = Vec::new();
//! writer.write(&mut artifact)?;
//!
//! let index = OnDiskGraphIndex::load(proxima::io::MappedReader::new(artifact), 0)?;
//! let mut view = index.view()?;
//! let entry = view.entry_node();
//! let neighbors = view.neighbors(entry)?.to_vec();
//! let mut reranker = index.reranker(&[0.0; 2], Similarity::Cosine)?;
//! let _score = reranker.score(entry)?;
//! # Ok(())
//! # }
//! ```
//!
//! Search itself (beam search, candidate queues) and graph construction
//! are external collaborators; this crate specifies what they consume and
//! produce at the file boundary.

pub mod disk;
pub mod error;
pub mod graph;
pub mod io;
pub mod pq;
pub mod similarity;

pub use error::{IndexError, Result};
