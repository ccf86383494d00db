//! Binary codec over seekable byte streams.
//!
//! Every multi-byte value in an artifact is big-endian, width as declared
//! (i32, i64, f32). The read side is a stateful cursor: `seek` then read.
//! Cursors over the same artifact are minted through a [`ReaderFactory`],
//! which shares the immutable backing bytes but never file-pointer state,
//! so each view owns its own position.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::error::{IndexError, Result};

/// A seekable big-endian reader over an immutable byte image.
pub trait RandomAccessReader {
    /// Move the cursor to an absolute byte offset.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Current absolute byte offset.
    fn position(&self) -> u64;

    fn read_i32(&mut self) -> Result<i32>;

    fn read_i64(&mut self) -> Result<i64>;

    fn read_f32(&mut self) -> Result<f32>;

    /// Bulk-read `dst.len()` big-endian i32 values.
    fn read_i32_into(&mut self, dst: &mut [i32]) -> Result<()>;

    /// Bulk-read `dst.len()` big-endian f32 values.
    fn read_f32_into(&mut self, dst: &mut [f32]) -> Result<()>;

    /// Fill `dst` with raw bytes.
    fn read_fully(&mut self, dst: &mut [u8]) -> Result<()>;
}

/// Mints independent cursors into one shared byte image.
pub trait ReaderFactory {
    type Reader: RandomAccessReader;

    /// A fresh cursor positioned at offset 0. Backing bytes are shared,
    /// position is not.
    fn duplicate(&self) -> Result<Self::Reader>;
}

/// In-memory byte image with a cursor, the moral equivalent of a memory
/// map. `duplicate()` is a cheap Arc clone.
#[derive(Debug, Clone)]
pub struct MappedReader {
    bytes: Arc<[u8]>,
    pos: usize,
}

impl MappedReader {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            bytes: bytes.into(),
            pos: 0,
        }
    }

    /// Map a whole artifact file into memory.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes))
    }

    /// Total length of the backing image.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&[u8]> {
        let end = self.pos.checked_add(n).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(IndexError::Format(format!(
                "short read: {} bytes at offset {} (image is {} bytes)",
                n,
                self.pos,
                self.bytes.len()
            ))),
        }
    }
}

impl RandomAccessReader for MappedReader {
    fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.bytes.len() as u64 {
            return Err(IndexError::Format(format!(
                "seek to {} past end of {}-byte image",
                offset,
                self.bytes.len()
            )));
        }
        self.pos = offset as usize;
        Ok(())
    }

    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn read_i32(&mut self) -> Result<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let b = self.take(8)?;
        Ok(i64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_i32_into(&mut self, dst: &mut [i32]) -> Result<()> {
        let raw = self.take(dst.len() * 4)?;
        for (i, out) in dst.iter_mut().enumerate() {
            let b = &raw[i * 4..i * 4 + 4];
            *out = i32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        }
        Ok(())
    }

    fn read_f32_into(&mut self, dst: &mut [f32]) -> Result<()> {
        let raw = self.take(dst.len() * 4)?;
        for (i, out) in dst.iter_mut().enumerate() {
            let b = &raw[i * 4..i * 4 + 4];
            *out = f32::from_be_bytes([b[0], b[1], b[2], b[3]]);
        }
        Ok(())
    }

    fn read_fully(&mut self, dst: &mut [u8]) -> Result<()> {
        let raw = self.take(dst.len())?;
        dst.copy_from_slice(raw);
        Ok(())
    }
}

impl ReaderFactory for MappedReader {
    type Reader = MappedReader;

    fn duplicate(&self) -> Result<MappedReader> {
        Ok(MappedReader {
            bytes: Arc::clone(&self.bytes),
            pos: 0,
        })
    }
}

/// Big-endian write helpers for any byte sink.
pub trait WriteBytesBe: Write {
    fn write_i32_be(&mut self, v: i32) -> std::io::Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    fn write_i64_be(&mut self, v: i64) -> std::io::Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    fn write_f32_be(&mut self, v: f32) -> std::io::Result<()> {
        self.write_all(&v.to_be_bytes())
    }
}

impl<W: Write + ?Sized> WriteBytesBe for W {}
