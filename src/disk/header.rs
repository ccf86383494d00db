//! File-global header: common fields plus per-feature header blocks.
//!
//! Versioned layout, all big-endian:
//!
//! ```text
//! i32 magic    (absent in v0)
//! i32 version  (absent in v0; implied 0)
//! i32 N
//! i32 D
//! i32 entryNode
//! i32 M
//! i32 featureBitmask (absent in v0; implied {INLINE_VECTORS})
//! per feature, ascending bitshift: its header block
//! ```
//!
//! Version 0 artifacts start directly with N, which is non-negative, so a
//! probe of the first i32 at the caller-supplied offset distinguishes the
//! layouts unambiguously: the magic's 0xFFFF high half makes it negative.

use tracing::debug;

use crate::disk::feature::{Feature, FeatureId, FeatureSet};
use crate::error::{IndexError, Result};
use crate::io::{RandomAccessReader, WriteBytesBe};

/// Leading magic of versioned artifacts ("ODGI" tag under a negative
/// sentinel half).
pub const MAGIC: i32 = 0xFFFF0D61_u32 as i32;

/// Highest artifact version this build reads; the version writers emit.
pub const CURRENT_VERSION: u32 = 1;

/// File-global metadata shared by every feature.
#[derive(Debug, Clone)]
pub struct CommonHeader {
    pub version: u32,
    /// Node count N.
    pub size: usize,
    /// Vector dimension D; 0 when no exact-vector feature is present.
    pub dimension: usize,
    /// Entry-point ordinal, in `[0, N)` when N > 0.
    pub entry_node: i32,
    /// Max degree M.
    pub max_degree: usize,
}

impl CommonHeader {
    /// Emit the current-version common prelude (magic through M).
    pub fn write(&self, out: &mut dyn std::io::Write) -> Result<()> {
        out.write_i32_be(MAGIC)?;
        out.write_i32_be(CURRENT_VERSION as i32)?;
        out.write_i32_be(self.size as i32)?;
        out.write_i32_be(self.dimension as i32)?;
        out.write_i32_be(self.entry_node)?;
        out.write_i32_be(self.max_degree as i32)?;
        Ok(())
    }
}

/// Parsed header: common fields plus the loaded feature states in
/// ascending bitshift order.
#[derive(Debug, Clone)]
pub struct Header {
    pub common: CommonHeader,
    features: Vec<Feature>,
}

impl Header {
    /// Parse a header at `offset`, probing for the magic to detect
    /// version-0 artifacts.
    pub fn load(reader: &mut impl RandomAccessReader, offset: u64) -> Result<Header> {
        reader.seek(offset)?;
        let probe = reader.read_i32()?;
        let version = if probe == MAGIC {
            let v = reader.read_i32()?;
            if v < 0 || v as u32 > CURRENT_VERSION {
                return Err(IndexError::Format(format!("unsupported version {v}")));
            }
            v as u32
        } else {
            reader.seek(offset)?;
            0
        };

        let size = reader.read_i32()?;
        if size < 0 {
            return Err(IndexError::Format(format!("negative node count {size}")));
        }
        let dimension = reader.read_i32()?;
        if dimension < 0 {
            return Err(IndexError::Format(format!("negative dimension {dimension}")));
        }
        let entry_node = reader.read_i32()?;
        let max_degree = reader.read_i32()?;
        if max_degree < 0 {
            return Err(IndexError::Format(format!("negative max degree {max_degree}")));
        }
        if size > 0 && !(0..size).contains(&entry_node) {
            return Err(IndexError::Format(format!(
                "entry node {entry_node} outside [0, {size})"
            )));
        }

        let set = if version == 0 {
            FeatureSet::of(&[FeatureId::InlineVectors])
        } else {
            FeatureSet::deserialize(reader.read_i32()? as u32)?
        };
        if set.contains(FeatureId::FusedAdc)
            && !(set.contains(FeatureId::InlineVectors) || set.contains(FeatureId::Lvq))
        {
            return Err(IndexError::Format(
                "fused ADC present without an exact score source".to_string(),
            ));
        }

        let common = CommonHeader {
            version,
            size: size as usize,
            dimension: dimension as usize,
            entry_node,
            max_degree: max_degree as usize,
        };
        let mut features = Vec::with_capacity(set.len());
        for id in set.iter() {
            features.push(Feature::load(id, &common, reader)?);
        }

        debug!(
            version,
            nodes = common.size,
            dimension = common.dimension,
            max_degree = common.max_degree,
            features = set.len(),
            "header.load"
        );
        Ok(Header { common, features })
    }

    /// Loaded feature states, ascending bitshift.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature_set(&self) -> FeatureSet {
        self.features.iter().map(Feature::id).collect()
    }

    pub fn feature(&self, id: FeatureId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id() == id)
    }

    /// Total header size in bytes, version-dependent.
    pub fn byte_size(&self) -> usize {
        let common = if self.common.version == 0 { 16 } else { 28 };
        common + self.features.iter().map(Feature::header_size).sum::<usize>()
    }

    /// Sum of per-node inline payload sizes, ascending bitshift.
    pub fn inline_total(&self) -> usize {
        self.features.iter().map(Feature::inline_size).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MappedReader;

    fn v1_prelude(size: i32, dimension: i32, entry: i32, m: i32, bits: i32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_i32_be(MAGIC).unwrap();
        buf.write_i32_be(1).unwrap();
        buf.write_i32_be(size).unwrap();
        buf.write_i32_be(dimension).unwrap();
        buf.write_i32_be(entry).unwrap();
        buf.write_i32_be(m).unwrap();
        buf.write_i32_be(bits).unwrap();
        buf
    }

    #[test]
    fn versioned_header_roundtrip() {
        let buf = v1_prelude(10, 4, 3, 8, 0b001);
        let mut r = MappedReader::new(buf);
        let header = Header::load(&mut r, 0).unwrap();
        assert_eq!(header.common.version, 1);
        assert_eq!(header.common.size, 10);
        assert_eq!(header.common.dimension, 4);
        assert_eq!(header.common.entry_node, 3);
        assert_eq!(header.common.max_degree, 8);
        assert!(header.feature_set().contains(FeatureId::InlineVectors));
        assert_eq!(header.byte_size(), 28);
        assert_eq!(header.inline_total(), 16);
    }

    #[test]
    fn v0_header_implies_inline_vectors() {
        let mut buf = Vec::new();
        buf.write_i32_be(5).unwrap(); // N: non-negative, fails the magic probe
        buf.write_i32_be(2).unwrap();
        buf.write_i32_be(1).unwrap();
        buf.write_i32_be(3).unwrap();
        let mut r = MappedReader::new(buf);
        let header = Header::load(&mut r, 0).unwrap();
        assert_eq!(header.common.version, 0);
        assert_eq!(header.feature_set(), FeatureSet::of(&[FeatureId::InlineVectors]));
        assert_eq!(header.byte_size(), 16);
    }

    #[test]
    fn future_version_rejected() {
        let mut buf = Vec::new();
        buf.write_i32_be(MAGIC).unwrap();
        buf.write_i32_be(CURRENT_VERSION as i32 + 1).unwrap();
        for _ in 0..5 {
            buf.write_i32_be(0).unwrap();
        }
        let mut r = MappedReader::new(buf);
        assert!(matches!(
            Header::load(&mut r, 0),
            Err(IndexError::Format(_))
        ));
    }

    #[test]
    fn fused_adc_alone_rejected_on_read() {
        let buf = v1_prelude(1, 4, 0, 2, 0b010);
        let mut r = MappedReader::new(buf);
        let err = Header::load(&mut r, 0).unwrap_err();
        assert!(matches!(err, IndexError::Format(_)), "{err}");
    }

    #[test]
    fn entry_node_out_of_range_rejected() {
        let buf = v1_prelude(4, 2, 4, 2, 0b001);
        let mut r = MappedReader::new(buf);
        assert!(Header::load(&mut r, 0).is_err());
    }
}
