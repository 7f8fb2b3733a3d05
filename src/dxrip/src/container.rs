//! DXBC container format parsing (`DXBC`)
//!
//! DXBC containers are self-describing: a fixed magic followed by a header
//! that declares the total container size. They sit at arbitrary offsets
//! inside decompressed shader chunks, so they are located by scanning.

use memchr::memmem;

use crate::{Error, Result, DXBC_MAGIC, SIZE_OFFSET};

/// Header size in bytes (magic + checksum + version fields + size field)
pub const HEADER_SIZE: usize = 28;

/// Default lower sanity bound on a declared container size
pub const DEFAULT_MIN_SIZE: usize = 32;

/// Default upper sanity bound on a declared container size (10 MiB)
pub const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;

// Header field offsets
const CHECKSUM_OFFSET: usize = 4;
const VERSION_OFFSET: usize = 20;

/// DXBC container header (28 bytes)
#[derive(Debug, Clone, Copy)]
pub struct Header {
    /// 16-byte checksum (opaque, not validated)
    pub checksum: [u8; 16],
    /// Major version field
    pub version_major: u16,
    /// Minor version field
    pub version_minor: u16,
    /// Total container size in bytes, header included
    pub container_size: u32,
}

impl Header {
    /// Parse a DXBC header directly from a slice (zero-copy)
    #[inline]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::DataTooShort {
                needed: HEADER_SIZE,
                actual: data.len(),
            });
        }

        if data[0..4] != DXBC_MAGIC {
            return Err(Error::InvalidMagic(data[0], data[1], data[2], data[3]));
        }

        let mut checksum = [0u8; 16];
        checksum.copy_from_slice(&data[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 16]);

        Ok(Self {
            checksum,
            version_major: u16::from_le_bytes([data[VERSION_OFFSET], data[VERSION_OFFSET + 1]]),
            version_minor: u16::from_le_bytes([data[VERSION_OFFSET + 2], data[VERSION_OFFSET + 3]]),
            container_size: u32::from_le_bytes([
                data[SIZE_OFFSET],
                data[SIZE_OFFSET + 1],
                data[SIZE_OFFSET + 2],
                data[SIZE_OFFSET + 3],
            ]),
        })
    }
}

/// A validated container location within a decompressed buffer
///
/// Invariant: `offset + size <= buffer.len()` for the buffer it was
/// scanned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobSpan {
    /// Byte offset of the container magic
    pub offset: usize,
    /// Declared total container size
    pub size: usize,
}

impl BlobSpan {
    /// The container bytes within the buffer this span was scanned from
    #[inline]
    pub fn slice<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.offset..self.offset + self.size]
    }
}

/// Sanity bounds applied to the declared container size during scanning
///
/// The defaults match the sizes observed in Unity shader data. They are
/// heuristics, not format guarantees, so they stay adjustable.
#[derive(Debug, Clone, Copy)]
pub struct ScanLimits {
    /// Smallest acceptable declared size
    pub min_size: usize,
    /// Largest acceptable declared size
    pub max_size: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_size: DEFAULT_MAX_SIZE,
        }
    }
}

/// Scan a decompressed buffer for DXBC containers
///
/// Finds each occurrence of the magic, validates that the declared size
/// field is inside the buffer and within `limits`, and that the whole
/// container fits. Rejected occurrences are treated as stray magic bytes
/// inside payload data: the cursor moves one byte past them and the scan
/// continues. Accepted spans are non-overlapping, so the cursor jumps to
/// the end of each accepted container.
///
/// Spans are returned in ascending offset order.
pub fn scan(data: &[u8], limits: &ScanLimits) -> Vec<BlobSpan> {
    let finder = memmem::Finder::new(&DXBC_MAGIC);
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let Some(rel) = finder.find(&data[pos..]) else {
            break;
        };
        let idx = pos + rel;

        // Size field must be fully inside the buffer
        if idx + SIZE_OFFSET + 4 > data.len() {
            pos = idx + 1;
            continue;
        }

        let size = u32::from_le_bytes([
            data[idx + SIZE_OFFSET],
            data[idx + SIZE_OFFSET + 1],
            data[idx + SIZE_OFFSET + 2],
            data[idx + SIZE_OFFSET + 3],
        ]) as usize;

        if size < limits.min_size || size > limits.max_size || idx + size > data.len() {
            pos = idx + 1;
            continue;
        }

        spans.push(BlobSpan { offset: idx, size });
        pos = idx + size;
    }

    spans
}
