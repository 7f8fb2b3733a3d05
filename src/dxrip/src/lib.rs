//! DXBC shader blob extractor for Unity asset bundles
//!
//! Unity stores compiled shader programs as an LZ4-compressed blob on the
//! Shader object, split into independently compressed chunks. Each chunk
//! decompresses into data that embeds zero or more DXBC containers — the
//! Direct3D shader bytecode format.
//!
//! # Format Overview
//!
//! ## Compressed blob
//!
//! The Shader object carries a contiguous compressed blob plus two parallel
//! length lists (`compressedLengths` / `decompressedLengths`). Chunk N
//! occupies the next `compressedLengths[N]` bytes of the blob and inflates
//! to exactly `decompressedLengths[N]` bytes via LZ4 block decompression.
//!
//! ## DXBC container (`DXBC`)
//!
//! Self-describing bytecode records inside the decompressed chunks:
//! - Bytes 0-3: "DXBC" magic
//! - Bytes 4-19: 16-byte checksum (opaque)
//! - Bytes 20-21: major version
//! - Bytes 22-23: minor version
//! - Bytes 24-27: total container size in bytes, header included (LE)
//!
//! Containers are located by scanning for the magic and validating the
//! declared size; stray magic bytes inside payload data are filtered by
//! bounds and size sanity checks.

pub mod bundle;
pub mod chunk;
pub mod container;
pub mod extract;
pub mod tool;

// Re-export main types
pub use bundle::{DumpReader, ShaderSource};
pub use chunk::{decompress as decompress_chunk, pair_lengths, ChunkDescriptor};
pub use container::{scan as scan_for_blobs, BlobSpan, Header as DxbcHeader, ScanLimits};
pub use extract::{extract_blobs, write_blobs, ChunkFailure, Extraction};
pub use tool::{Disassembler, RunReport, ToolError};

use std::path::PathBuf;

/// Magic bytes for a DXBC container: "DXBC"
pub const DXBC_MAGIC: [u8; 4] = [0x44, 0x58, 0x42, 0x43];

/// Byte offset of the container size field within the header
pub const SIZE_OFFSET: usize = 24;

/// Header size in bytes (magic + checksum + version fields + size field)
pub const HEADER_SIZE: usize = container::HEADER_SIZE;

/// Errors from blob extraction
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid DXBC magic: expected 'DXBC', got {0:02x} {1:02x} {2:02x} {3:02x}")]
    InvalidMagic(u8, u8, u8, u8),

    #[error("Data too short: need {needed} bytes, got {actual}")]
    DataTooShort { needed: usize, actual: usize },

    #[error("LZ4 decompression error: {0}")]
    Lz4(#[from] lz4_flex::block::DecompressError),

    #[error("Decompression size mismatch: expected {expected}, got {actual}")]
    DecompressionSize { expected: usize, actual: usize },

    #[error("Chunk length lists disagree: {compressed} compressed vs {decompressed} decompressed")]
    ChunkCountMismatch {
        compressed: usize,
        decompressed: usize,
    },

    #[error("Shader source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Shader object '{0}' has no chunk length metadata")]
    MissingChunkMetadata(String),

    #[error("Invalid dump metadata in {path}: {reason}")]
    BadMetadata { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Check if data starts with the DXBC container magic
pub fn is_dxbc(data: &[u8]) -> bool {
    data.len() >= 4 && data[0..4] == DXBC_MAGIC
}
