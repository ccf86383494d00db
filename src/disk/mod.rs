//! On-disk index subsystem: container format, feature payloads, writer,
//! and random-access views.
//!
//! An artifact is a header followed by N fixed-stride node records; each
//! record co-locates a node's enabled feature payloads with its padded
//! adjacency list, so one seek fetches everything a traversal step needs:
//!
//! ```text
//! Header | Record[0] | Record[1] | ... | Record[N-1]
//!
//! Record[k]:
//!   i32 k                      sanity ordinal
//!   per feature (ascending bitshift): inline payload
//!   i32 neighborCount
//!   i32 neighbor[0..c)         new ordinals
//!   i32 -1 × (M - c)           padding
//! ```
//!
//! Artifacts are write-once: the writer seals the byte image, views read
//! it immutably, and there is no in-place mutation path.

pub mod cache;
pub mod feature;
pub mod fused_adc;
pub mod header;
pub mod inline_vectors;
pub mod lvq;
pub mod ordinal;
pub mod view;
pub mod writer;

pub use cache::{CachedNode, CachingView, GraphCache};
pub use feature::{Feature, FeatureId, FeatureSet, FeatureWriter};
pub use fused_adc::{FusedAdc, FusedAdcWriter};
pub use header::{CURRENT_VERSION, CommonHeader, Header, MAGIC};
pub use inline_vectors::{InlineVectors, InlineVectorsWriter};
pub use lvq::{Lvq, LvqWriter};
pub use ordinal::OrdinalMap;
pub use view::{ApproxScorer, OnDiskGraphIndex, OnDiskView, Reranker};
pub use writer::{OnDiskWriter, OnDiskWriterBuilder};
