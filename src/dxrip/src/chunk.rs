//! Compressed chunk handling
//!
//! Unity splits the shader blob into independently LZ4-compressed chunks.
//! LZ4 block data is not self-terminating, so the decompressed size from
//! the object metadata must be supplied to the decoder up front.

use crate::{Error, Result};

/// One chunk of the compressed shader blob
///
/// Produced pairwise from the object's parallel length lists; chunk N's
/// compressed bytes immediately follow chunk N-1's in the source blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkDescriptor {
    /// Length of the compressed chunk within the blob
    pub compressed_len: u32,
    /// Exact length the chunk decompresses to
    pub decompressed_len: u32,
}

/// Pair the parallel length lists into chunk descriptors
///
/// The lists must have equal length; they are consumed pairwise in order.
pub fn pair_lengths(compressed: &[u32], decompressed: &[u32]) -> Result<Vec<ChunkDescriptor>> {
    if compressed.len() != decompressed.len() {
        return Err(Error::ChunkCountMismatch {
            compressed: compressed.len(),
            decompressed: decompressed.len(),
        });
    }

    Ok(compressed
        .iter()
        .zip(decompressed.iter())
        .map(|(&c, &d)| ChunkDescriptor {
            compressed_len: c,
            decompressed_len: d,
        })
        .collect())
}

/// Decompress one LZ4 block chunk to exactly `decompressed_len` bytes
pub fn decompress(chunk: &[u8], decompressed_len: usize) -> Result<Vec<u8>> {
    let output = lz4_flex::decompress(chunk, decompressed_len)?;

    if output.len() != decompressed_len {
        return Err(Error::DecompressionSize {
            expected: decompressed_len,
            actual: output.len(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_lengths_zips_in_order() {
        let descriptors = pair_lengths(&[100, 50], &[200, 80]).expect("pair");
        assert_eq!(
            descriptors,
            vec![
                ChunkDescriptor {
                    compressed_len: 100,
                    decompressed_len: 200,
                },
                ChunkDescriptor {
                    compressed_len: 50,
                    decompressed_len: 80,
                },
            ]
        );
    }

    #[test]
    fn pair_lengths_rejects_mismatch() {
        assert!(matches!(
            pair_lengths(&[100, 50], &[200]),
            Err(Error::ChunkCountMismatch {
                compressed: 2,
                decompressed: 1,
            })
        ));
    }

    #[test]
    fn pair_lengths_empty() {
        assert!(pair_lengths(&[], &[]).expect("pair").is_empty());
    }

    #[test]
    fn decompress_roundtrip() {
        let original: Vec<u8> = (0..200u16).map(|i| (i % 7) as u8).collect();
        let compressed = lz4_flex::compress(&original);
        let output = decompress(&compressed, original.len()).expect("decompress");
        assert_eq!(output, original);
    }

    #[test]
    fn decompress_rejects_garbage() {
        let garbage = [0xFFu8; 50];
        assert!(decompress(&garbage, 80).is_err());
    }

    #[test]
    fn decompress_rejects_wrong_size() {
        let original = vec![0x42u8; 64];
        let compressed = lz4_flex::compress(&original);
        // Asking for more than the stream produces must not succeed silently
        assert!(decompress(&compressed, 128).is_err());
    }
}
