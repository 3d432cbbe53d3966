//! Persistent index store.
//!
//! The index lives in a single `index.json` manifest inside the configured
//! directory: embedding model identifier, dimensionality, build timestamp,
//! and one entry per chunk (document id, ordinal, text, SHA-256 hash, and
//! the vector as base64 of little-endian f32 bytes). [`save`] writes to a
//! uniquely named temp file in the same directory and renames it over the
//! manifest, so a save either lands whole or leaves the previous index
//! untouched, so concurrent last-writer-wins saves never corrupt the store.
//!
//! [`exists`] checks specifically for the manifest file. A directory that
//! holds only housekeeping artifacts such as a `.gitkeep` placeholder does
//! not count as a persisted index.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;
use uuid::Uuid;

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::error::IndexError;
use crate::models::{IndexedChunk, VectorIndex};

/// Manifest file name inside the index directory.
pub const MANIFEST_FILE: &str = "index.json";

/// Bumped whenever the manifest layout changes; loads reject other versions.
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredIndex {
    version: u32,
    embedding_model: String,
    dims: usize,
    built_at: i64,
    chunks: Vec<StoredChunk>,
}

#[derive(Serialize, Deserialize)]
struct StoredChunk {
    id: String,
    document_id: String,
    ordinal: i64,
    text: String,
    hash: String,
    /// base64 of little-endian f32 bytes.
    vector: String,
}

/// True iff `location` holds a previously persisted index.
pub fn exists(location: &Path) -> bool {
    location.join(MANIFEST_FILE).is_file()
}

/// Restore a persisted index, verifying structure, vector dimensionality,
/// and chunk text hashes.
pub fn load(location: &Path, embedding_dims: usize) -> Result<VectorIndex, IndexError> {
    let manifest_path = location.join(MANIFEST_FILE);
    let corrupt = |reason: String| IndexError::Corrupt {
        location: location.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(&manifest_path)
        .map_err(|e| corrupt(format!("cannot read {}: {}", MANIFEST_FILE, e)))?;

    let stored: StoredIndex = serde_json::from_str(&content)
        .map_err(|e| corrupt(format!("malformed manifest: {}", e)))?;

    if stored.version != FORMAT_VERSION {
        return Err(corrupt(format!(
            "unsupported manifest version {} (expected {})",
            stored.version, FORMAT_VERSION
        )));
    }

    if stored.dims != embedding_dims {
        return Err(corrupt(format!(
            "stored vectors have {} dimensions, embedding provider produces {}",
            stored.dims, embedding_dims
        )));
    }

    let mut chunks = Vec::with_capacity(stored.chunks.len());
    for stored_chunk in stored.chunks {
        let blob = BASE64
            .decode(&stored_chunk.vector)
            .map_err(|e| corrupt(format!("chunk {}: invalid vector encoding: {}", stored_chunk.id, e)))?;
        let vector = blob_to_vec(&blob);

        if vector.len() != stored.dims {
            return Err(corrupt(format!(
                "chunk {} has a {}-dimension vector, manifest declares {}",
                stored_chunk.id,
                vector.len(),
                stored.dims
            )));
        }

        if hash_text(&stored_chunk.text) != stored_chunk.hash {
            return Err(corrupt(format!(
                "chunk {} text does not match its stored hash",
                stored_chunk.id
            )));
        }

        chunks.push(IndexedChunk {
            id: stored_chunk.id,
            document_id: stored_chunk.document_id,
            ordinal: stored_chunk.ordinal,
            text: stored_chunk.text,
            hash: stored_chunk.hash,
            vector,
        });
    }

    Ok(VectorIndex {
        embedding_model: stored.embedding_model,
        dims: stored.dims,
        built_at: stored.built_at,
        chunks,
    })
}

/// Persist the index atomically. Safe to call repeatedly; an existing
/// manifest is replaced whole.
pub fn save(index: &VectorIndex, location: &Path) -> Result<(), IndexError> {
    std::fs::create_dir_all(location)?;

    let stored = StoredIndex {
        version: FORMAT_VERSION,
        embedding_model: index.embedding_model.clone(),
        dims: index.dims,
        built_at: index.built_at,
        chunks: index
            .chunks
            .iter()
            .map(|chunk| StoredChunk {
                id: chunk.id.clone(),
                document_id: chunk.document_id.clone(),
                ordinal: chunk.ordinal,
                text: chunk.text.clone(),
                hash: chunk.hash.clone(),
                vector: BASE64.encode(vec_to_blob(&chunk.vector)),
            })
            .collect(),
    };

    let json = serde_json::to_string_pretty(&stored).map_err(|e| IndexError::Corrupt {
        location: location.to_path_buf(),
        reason: format!("cannot serialize manifest: {}", e),
    })?;

    // Unique temp name so racing builders never clobber each other's
    // half-written file; the rename is atomic within the directory.
    let tmp_path = location.join(format!("{}.{}.tmp", MANIFEST_FILE, Uuid::new_v4()));
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, location.join(MANIFEST_FILE))?;

    Ok(())
}

fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
