//! Error types for the podrag core.
//!
//! The index lifecycle and the query path have distinct failure taxonomies:
//! [`IndexError`] covers building, persisting, and restoring the vector
//! index; [`QueryError`] covers a single question's embed → retrieve →
//! generate pipeline. Both are surfaced unchanged to the caller; the core
//! never retries generation (token billing is not idempotent) and never
//! swallows a load failure.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the index build/load/persist lifecycle.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The corpus root yielded zero documents and no persisted index exists,
    /// so there is nothing to build from and nothing to load.
    #[error("no documents found under {root} and no persisted index at {location}")]
    CorpusEmpty {
        /// Corpus root that was scanned.
        root: PathBuf,
        /// Index location that was probed.
        location: PathBuf,
    },

    /// Persisted index data is unreadable or inconsistent. Recoverable by
    /// deleting the index directory and rebuilding.
    #[error("persisted index at {location} is corrupt: {reason}")]
    Corrupt {
        /// Index location that failed to load.
        location: PathBuf,
        /// What was wrong with the stored data.
        reason: String,
    },

    /// Scanning the corpus root failed (unreadable root, bad glob).
    #[error("corpus scan failed: {0}")]
    Corpus(#[source] anyhow::Error),

    /// The embedding provider failed while building the index.
    #[error("embedding failed during index build: {0}")]
    Embedding(#[source] anyhow::Error),

    /// Filesystem failure reading the corpus or writing the index.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors from answering a single query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The query-time embedding model does not match the model the index
    /// was built with. Mixing vectors from two models is never tolerated.
    #[error("embedding model mismatch: index built with '{index_model}', query uses '{query_model}'")]
    ModelMismatch {
        /// Model recorded in the index manifest.
        index_model: String,
        /// Model of the provider handling this query.
        query_model: String,
    },

    /// The index contains no chunks, so retrieval cannot produce context.
    /// An empty-result condition, not a crash.
    #[error("index contains no chunks to retrieve from")]
    RetrievalEmpty,

    /// Embedding the query text failed.
    #[error("failed to embed query: {0}")]
    Embedding(#[source] anyhow::Error),

    /// The generative provider failed. Not retried here; the host may
    /// retry with backoff if it chooses.
    #[error("generation failed: {0}")]
    Generation(#[source] anyhow::Error),
}
