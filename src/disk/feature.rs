//! Feature registry: the closed catalog of per-node payload kinds.
//!
//! Each kind owns a stable bitshift; the bitshift order is the single
//! source of truth for on-disk ordering of both feature header blocks and
//! per-node inline payloads.

use std::io::Write;

use crate::disk::fused_adc::FusedAdc;
use crate::disk::header::CommonHeader;
use crate::disk::inline_vectors::InlineVectors;
use crate::disk::lvq::Lvq;
use crate::error::{IndexError, Result};
use crate::io::RandomAccessReader;

/// Kinds of per-node payload co-located with the adjacency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureId {
    /// Raw f32 vectors inline with each node.
    InlineVectors,
    /// Product-quantization codes of a node's neighbors, transposed for
    /// vectorized asymmetric-distance scoring.
    FusedAdc,
    /// Locally-adaptive scalar quantization: 8-bit codes plus per-node
    /// bias and scale.
    Lvq,
}

impl FeatureId {
    /// All kinds in ascending bitshift order.
    pub const ALL: [FeatureId; 3] = [FeatureId::InlineVectors, FeatureId::FusedAdc, FeatureId::Lvq];

    pub const fn bitshift(self) -> u32 {
        match self {
            FeatureId::InlineVectors => 0,
            FeatureId::FusedAdc => 1,
            FeatureId::Lvq => 2,
        }
    }
}

/// A set of [`FeatureId`], stored as the same bitmask the artifact uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet(u32);

impl FeatureSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn of(ids: &[FeatureId]) -> Self {
        let mut set = Self::empty();
        for &id in ids {
            set.insert(id);
        }
        set
    }

    pub fn insert(&mut self, id: FeatureId) {
        self.0 |= 1 << id.bitshift();
    }

    pub const fn contains(self, id: FeatureId) -> bool {
        self.0 & (1 << id.bitshift()) != 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The on-disk bitmask: bit b set iff the kind with bitshift b is present.
    pub const fn serialize(self) -> u32 {
        self.0
    }

    /// Parse a bitmask, rejecting bits outside the closed kind list.
    pub fn deserialize(bits: u32) -> Result<Self> {
        let known: u32 = FeatureId::ALL
            .iter()
            .fold(0, |acc, id| acc | 1 << id.bitshift());
        if bits & !known != 0 {
            return Err(IndexError::Format(format!(
                "unknown feature bits in mask {bits:#x}"
            )));
        }
        Ok(Self(bits))
    }

    /// Members in ascending bitshift order.
    pub fn iter(self) -> impl Iterator<Item = FeatureId> {
        FeatureId::ALL.into_iter().filter(move |id| self.contains(*id))
    }
}

impl FromIterator<FeatureId> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = FeatureId>>(iter: T) -> Self {
        let mut set = Self::empty();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// Read-side feature state parsed from an artifact header.
#[derive(Debug, Clone)]
pub enum Feature {
    InlineVectors(InlineVectors),
    FusedAdc(FusedAdc),
    Lvq(Lvq),
}

impl Feature {
    /// Parse the header block for `id` at the reader's current position.
    pub fn load(
        id: FeatureId,
        common: &CommonHeader,
        reader: &mut impl RandomAccessReader,
    ) -> Result<Feature> {
        match id {
            FeatureId::InlineVectors => {
                InlineVectors::load(common, reader).map(Feature::InlineVectors)
            }
            FeatureId::FusedAdc => FusedAdc::load(common, reader).map(Feature::FusedAdc),
            FeatureId::Lvq => Lvq::load(common, reader).map(Feature::Lvq),
        }
    }

    pub fn id(&self) -> FeatureId {
        match self {
            Feature::InlineVectors(_) => FeatureId::InlineVectors,
            Feature::FusedAdc(_) => FeatureId::FusedAdc,
            Feature::Lvq(_) => FeatureId::Lvq,
        }
    }

    /// Size of this feature's header block in bytes.
    pub fn header_size(&self) -> usize {
        match self {
            Feature::InlineVectors(f) => f.header_size(),
            Feature::FusedAdc(f) => f.header_size(),
            Feature::Lvq(f) => f.header_size(),
        }
    }

    /// Size of this feature's per-node inline record, constant over the
    /// life of the file.
    pub fn inline_size(&self) -> usize {
        match self {
            Feature::InlineVectors(f) => f.inline_size(),
            Feature::FusedAdc(f) => f.inline_size(),
            Feature::Lvq(f) => f.inline_size(),
        }
    }
}

/// Write-side counterpart of [`Feature`]: bound to the data sources it
/// serializes from.
pub trait FeatureWriter {
    fn id(&self) -> FeatureId;

    fn header_size(&self) -> usize;

    fn inline_size(&self) -> usize;

    /// Vector dimension this feature declares, if it is an exact source.
    fn dimension(&self) -> Option<usize> {
        None
    }

    fn write_header(&self, out: &mut dyn Write) -> Result<()>;

    /// Emit the inline record for the node with source id `node`.
    fn write_inline(&self, node: i32, out: &mut dyn Write) -> Result<()>;
}
