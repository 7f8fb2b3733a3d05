//! Shader object sources
//!
//! The asset-bundle reader is an external collaborator: anything that can
//! hand over a shader object's compressed blob and its chunk length
//! metadata can drive the pipeline. `DumpReader` is the shipped adapter,
//! consuming a per-object dump (raw blob + JSON sidecar) as produced by
//! the usual bundle-dumping tools.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::chunk::{pair_lengths, ChunkDescriptor};
use crate::{Error, Result};

/// A shader object that can feed the extraction pipeline
pub trait ShaderSource {
    /// Name of the shader object (used for artifact filenames)
    fn object_name(&self) -> &str;

    /// The object's raw compressed blob
    fn compressed_blob(&self) -> &[u8];

    /// The object's chunk descriptors, paired and in order
    fn chunk_descriptors(&self) -> Result<Vec<ChunkDescriptor>>;
}

/// Sidecar metadata as dumped alongside the blob
///
/// Dumpers with generic field typing emit the length lists either flat
/// (`[100, 50]`) or as nested single-element lists (`[[100], [50]]`);
/// both shapes are accepted here and flattened before anything else sees
/// them.
#[derive(Debug, Deserialize)]
struct DumpMeta {
    #[serde(rename = "compressedLengths", default)]
    compressed_lengths: Vec<Value>,
    #[serde(rename = "decompressedLengths", default)]
    decompressed_lengths: Vec<Value>,
}

/// Reader for a dumped shader object: `<name>.blob` + `<name>.json`
pub struct DumpReader {
    name: String,
    blob: Vec<u8>,
    meta: DumpMeta,
    meta_path: PathBuf,
}

impl DumpReader {
    /// Open one dumped object by name from a dump directory
    pub fn open<P: AsRef<Path>>(dir: P, name: &str) -> Result<Self> {
        let dir = dir.as_ref();

        let blob_path = dir.join(format!("{}.blob", name));
        if !blob_path.exists() {
            return Err(Error::SourceNotFound(blob_path));
        }
        let meta_path = dir.join(format!("{}.json", name));
        if !meta_path.exists() {
            return Err(Error::SourceNotFound(meta_path));
        }

        let blob = std::fs::read(&blob_path)?;
        let meta_raw = std::fs::read_to_string(&meta_path)?;
        let meta: DumpMeta =
            serde_json::from_str(&meta_raw).map_err(|e| Error::BadMetadata {
                path: meta_path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            blob,
            meta,
            meta_path,
        })
    }

    /// List object names in a dump directory that have a blob/json pair
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::SourceNotFound(dir.to_path_buf()));
        }

        let mut names = Vec::new();
        for entry in walkdir::WalkDir::new(dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "blob") {
                if let Some(stem) = path.file_stem() {
                    if path.with_extension("json").exists() {
                        names.push(stem.to_string_lossy().to_string());
                    }
                }
            }
        }

        names.sort();
        Ok(names)
    }

    fn lengths(&self, values: &[Value], meta_field: &str) -> Result<Vec<u32>> {
        values
            .iter()
            .map(|v| {
                flatten_length(v).ok_or_else(|| Error::BadMetadata {
                    path: self.meta_path.clone(),
                    reason: format!("non-numeric entry in {}: {}", meta_field, v),
                })
            })
            .collect()
    }
}

impl ShaderSource for DumpReader {
    fn object_name(&self) -> &str {
        &self.name
    }

    fn compressed_blob(&self) -> &[u8] {
        &self.blob
    }

    fn chunk_descriptors(&self) -> Result<Vec<ChunkDescriptor>> {
        if self.meta.compressed_lengths.is_empty() || self.meta.decompressed_lengths.is_empty() {
            return Err(Error::MissingChunkMetadata(self.name.clone()));
        }

        let compressed = self.lengths(&self.meta.compressed_lengths, "compressedLengths")?;
        let decompressed = self.lengths(&self.meta.decompressed_lengths, "decompressedLengths")?;
        pair_lengths(&compressed, &decompressed)
    }
}

/// Unwrap nested single-element arrays down to a scalar length
fn flatten_length(value: &Value) -> Option<u32> {
    let mut current = value;
    while let Some(arr) = current.as_array() {
        current = arr.first()?;
    }
    current.as_u64().and_then(|n| u32::try_from(n).ok())
}
