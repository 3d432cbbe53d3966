//! Index builder/loader: cache-or-compute over the persisted store.
//!
//! [`get_or_build`] prefers a persisted index unconditionally; embedding a
//! whole corpus is the expensive operation this module exists to avoid, so
//! when [`store::exists`] reports one, the corpus is never scanned and the
//! embedding provider is never called. There is no staleness check; a
//! rebuild requires removing the persisted index first (`podrag index
//! build --force`).
//!
//! Two builders racing on the same empty location may both build and both
//! persist. The store's atomic save makes that a benign last-writer-wins
//! race rather than corruption; exactly-once build is not guaranteed.

use tracing::info;

use std::path::Path;

use crate::chunk::chunk_text;
use crate::config::{ChunkingConfig, CorpusConfig};
use crate::corpus::scan_corpus;
use crate::embedding::EmbeddingProvider;
use crate::error::IndexError;
use crate::models::{IndexedChunk, VectorIndex};
use crate::store;

/// Load the persisted index at `location`, or build it from the corpus,
/// persist it, and return it.
pub async fn get_or_build(
    location: &Path,
    corpus: &CorpusConfig,
    chunking: &ChunkingConfig,
    batch_size: usize,
    provider: &dyn EmbeddingProvider,
) -> Result<VectorIndex, IndexError> {
    if store::exists(location) {
        let index = store::load(location, provider.dims())?;
        info!(
            chunks = index.chunks.len(),
            model = %index.embedding_model,
            "loaded persisted index"
        );
        return Ok(index);
    }

    let index = build(corpus, chunking, batch_size, provider, location).await?;
    store::save(&index, location)?;
    info!(
        chunks = index.chunks.len(),
        documents = index.document_count(),
        "built and persisted index"
    );
    Ok(index)
}

/// Read the corpus, chunk every document, embed every chunk, and assemble
/// a fresh index. Does not persist.
async fn build(
    corpus: &CorpusConfig,
    chunking: &ChunkingConfig,
    batch_size: usize,
    provider: &dyn EmbeddingProvider,
    location: &Path,
) -> Result<VectorIndex, IndexError> {
    let documents = scan_corpus(corpus).map_err(IndexError::Corpus)?;

    if documents.is_empty() {
        return Err(IndexError::CorpusEmpty {
            root: corpus.root.clone(),
            location: location.to_path_buf(),
        });
    }

    // Documents come back sorted by source_id; chunk ordinals preserve
    // position within each document. This is the corpus insertion order
    // retrieval ties break on.
    let mut chunks: Vec<IndexedChunk> = Vec::new();
    for doc in &documents {
        chunks.extend(chunk_text(&doc.source_id, &doc.body, chunking.max_tokens));
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size) {
        let batch_vectors = provider
            .embed_batch(batch)
            .await
            .map_err(IndexError::Embedding)?;

        if batch_vectors.len() != batch.len() {
            return Err(IndexError::Embedding(anyhow::anyhow!(
                "provider returned {} vectors for {} texts",
                batch_vectors.len(),
                batch.len()
            )));
        }
        vectors.extend(batch_vectors);
    }

    for (chunk, vector) in chunks.iter_mut().zip(vectors) {
        if vector.len() != provider.dims() {
            return Err(IndexError::Embedding(anyhow::anyhow!(
                "provider returned a {}-dimension vector, expected {}",
                vector.len(),
                provider.dims()
            )));
        }
        chunk.vector = vector;
    }

    Ok(VectorIndex {
        embedding_model: provider.model_name().to_string(),
        dims: provider.dims(),
        built_at: chrono::Utc::now().timestamp(),
        chunks,
    })
}
