//! Blob extraction pipeline
//!
//! Walks the object's chunk descriptors over the compressed blob,
//! decompresses each chunk, scans it for DXBC containers, and carves the
//! accepted spans out as owned artifacts. One bad chunk never aborts the
//! rest of the object.

use std::fs;
use std::path::{Path, PathBuf};

use crate::chunk::{decompress, ChunkDescriptor};
use crate::container::{scan, ScanLimits};
use crate::{Error, Result};

/// A chunk that could not be decompressed
#[derive(Debug)]
pub struct ChunkFailure {
    /// Index of the chunk in descriptor order
    pub chunk_index: usize,
    /// What went wrong
    pub error: Error,
}

/// Result of extracting one shader object
#[derive(Debug, Default)]
pub struct Extraction {
    /// Carved container bytes, numbered by discovery order across chunks
    pub blobs: Vec<Vec<u8>>,
    /// Chunks that were skipped, with the reason
    pub chunk_failures: Vec<ChunkFailure>,
}

/// Extract all DXBC containers from one object's compressed blob
///
/// Chunks are consumed in descriptor order; the running offset into the
/// blob advances by `compressed_len` after each chunk whether or not it
/// decompressed. Failures are recorded and the remaining chunks still get
/// processed. Blob numbering is discovery order and does not reset per
/// chunk.
pub fn extract_blobs(
    descriptors: &[ChunkDescriptor],
    blob: &[u8],
    limits: &ScanLimits,
) -> Extraction {
    let mut result = Extraction::default();
    let mut offset = 0usize;

    for (chunk_index, descriptor) in descriptors.iter().enumerate() {
        let compressed_len = descriptor.compressed_len as usize;
        let start = offset;
        offset += compressed_len;

        if offset > blob.len() {
            result.chunk_failures.push(ChunkFailure {
                chunk_index,
                error: Error::DataTooShort {
                    needed: offset,
                    actual: blob.len(),
                },
            });
            continue;
        }

        let chunk = &blob[start..offset];
        let decompressed = match decompress(chunk, descriptor.decompressed_len as usize) {
            Ok(data) => data,
            Err(error) => {
                result.chunk_failures.push(ChunkFailure { chunk_index, error });
                continue;
            }
        };

        for span in scan(&decompressed, limits) {
            result.blobs.push(span.slice(&decompressed).to_vec());
        }
    }

    result
}

/// Write extracted blobs as `{basename}_{NNN}.dxbc` files
///
/// Creates the output directory if absent; each file holds the container
/// bytes exactly as carved, no re-encoding.
pub fn write_blobs(dir: &Path, basename: &str, blobs: &[Vec<u8>]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(blobs.len());
    for (i, blob) in blobs.iter().enumerate() {
        let path = dir.join(format!("{}_{:03}.dxbc", basename, i));
        fs::write(&path, blob)?;
        paths.push(path);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::pair_lengths;
    use crate::container::HEADER_SIZE;

    /// Build a valid container of `size` bytes
    fn make_container(size: usize, fill: u8) -> Vec<u8> {
        assert!(size >= HEADER_SIZE);
        let mut c = Vec::with_capacity(size);
        c.extend_from_slice(b"DXBC");
        c.extend_from_slice(&[0xCD; 16]);
        c.extend_from_slice(&1u16.to_le_bytes());
        c.extend_from_slice(&0u16.to_le_bytes());
        c.extend_from_slice(&(size as u32).to_le_bytes());
        c.resize(size, fill);
        c
    }

    /// A 200-byte chunk payload holding one 60-byte container at offset 10
    fn chunk_with_container() -> (Vec<u8>, Vec<u8>) {
        let container = make_container(60, 0x5A);
        let mut payload = vec![0x01u8; 200];
        payload[10..70].copy_from_slice(&container);
        (payload, container)
    }

    #[test]
    fn one_good_chunk_one_bad_chunk() {
        let (payload, container) = chunk_with_container();
        let chunk1 = lz4_flex::compress(&payload);
        let chunk2 = vec![0xFFu8; 50]; // does not decompress

        let mut blob = chunk1.clone();
        blob.extend_from_slice(&chunk2);

        let descriptors = pair_lengths(
            &[chunk1.len() as u32, chunk2.len() as u32],
            &[200, 80],
        )
        .expect("pair");

        let result = extract_blobs(&descriptors, &blob, &ScanLimits::default());
        assert_eq!(result.blobs.len(), 1);
        assert_eq!(result.blobs[0], container);
        assert_eq!(result.chunk_failures.len(), 1);
        assert_eq!(result.chunk_failures[0].chunk_index, 1);
    }

    #[test]
    fn blobs_number_across_chunks() {
        let (payload1, container1) = chunk_with_container();
        let container2 = make_container(40, 0x77);
        let mut payload2 = vec![0x02u8; 120];
        payload2[50..90].copy_from_slice(&container2);

        let chunk1 = lz4_flex::compress(&payload1);
        let chunk2 = lz4_flex::compress(&payload2);

        let mut blob = chunk1.clone();
        blob.extend_from_slice(&chunk2);

        let descriptors = pair_lengths(
            &[chunk1.len() as u32, chunk2.len() as u32],
            &[payload1.len() as u32, payload2.len() as u32],
        )
        .expect("pair");

        let result = extract_blobs(&descriptors, &blob, &ScanLimits::default());
        assert!(result.chunk_failures.is_empty());
        assert_eq!(result.blobs.len(), 2);
        assert_eq!(result.blobs[0], container1);
        assert_eq!(result.blobs[1], container2);
    }

    #[test]
    fn no_containers_yields_empty() {
        let payload = vec![0x03u8; 256];
        let chunk = lz4_flex::compress(&payload);
        let descriptors = pair_lengths(&[chunk.len() as u32], &[256]).expect("pair");

        let result = extract_blobs(&descriptors, &chunk, &ScanLimits::default());
        assert!(result.blobs.is_empty());
        assert!(result.chunk_failures.is_empty());
    }

    #[test]
    fn truncated_blob_is_a_recorded_failure() {
        let (payload, _) = chunk_with_container();
        let chunk = lz4_flex::compress(&payload);

        // Descriptor claims more compressed bytes than the blob holds
        let descriptors = pair_lengths(&[chunk.len() as u32 + 100], &[200]).expect("pair");

        let result = extract_blobs(&descriptors, &chunk, &ScanLimits::default());
        assert!(result.blobs.is_empty());
        assert_eq!(result.chunk_failures.len(), 1);
        assert!(matches!(
            result.chunk_failures[0].error,
            Error::DataTooShort { .. }
        ));
    }

    #[test]
    fn write_blobs_roundtrip() {
        let blobs = vec![make_container(48, 0x10), make_container(100, 0x20)];
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().join("out");

        let paths = write_blobs(&out, "Heightmap", &blobs).expect("write");
        assert_eq!(paths.len(), 2);
        assert_eq!(
            paths[0].file_name().unwrap().to_string_lossy(),
            "Heightmap_000.dxbc"
        );
        assert_eq!(
            paths[1].file_name().unwrap().to_string_lossy(),
            "Heightmap_001.dxbc"
        );

        for (path, blob) in paths.iter().zip(blobs.iter()) {
            let on_disk = std::fs::read(path).expect("read back");
            assert_eq!(&on_disk, blob);
        }
    }
}
