//! Core data models used throughout podrag.
//!
//! These types represent the transcripts, chunks, and answers that flow
//! through the indexing and query pipeline.

use futures::stream::BoxStream;

/// A transcript loaded from the corpus root, immutable once read.
#[derive(Debug, Clone)]
pub struct Document {
    /// Path relative to the corpus root; the document's stable identity.
    pub source_id: String,
    /// Full transcript text.
    pub body: String,
    /// Last-modified time (unix seconds) of the backing file, shown by
    /// `podrag corpus`.
    pub modified_at: i64,
}

/// A retrieval-sized slice of a document, with its embedding vector.
/// Created during index build; never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub id: String,
    /// `source_id` of the parent [`Document`].
    pub document_id: String,
    /// Position of this chunk within its document, starting at 0.
    pub ordinal: i64,
    pub text: String,
    /// SHA-256 of `text`, for integrity checks across save/load.
    pub hash: String,
    pub vector: Vec<f32>,
}

/// The persisted, queryable index: every chunk plus the embedding-model
/// identity they were all built with.
///
/// Immutable once built or loaded; concurrent queries share it behind an
/// `Arc` without locking. Replaced wholesale on rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    /// Embedding model every vector in `chunks` was produced by.
    pub embedding_model: String,
    /// Dimensionality of every vector in `chunks`.
    pub dims: usize,
    /// Unix timestamp of the build.
    pub built_at: i64,
    /// Chunks in corpus insertion order (documents sorted by `source_id`,
    /// chunks by ordinal). Retrieval ties break on this order.
    pub chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct documents represented in the index.
    pub fn document_count(&self) -> usize {
        let mut last: Option<&str> = None;
        let mut count = 0;
        for chunk in &self.chunks {
            if last != Some(chunk.document_id.as_str()) {
                count += 1;
                last = Some(chunk.document_id.as_str());
            }
        }
        count
    }
}

/// A user question plus its generation parameters. Ephemeral.
#[derive(Debug, Clone)]
pub struct Query {
    pub text: String,
    /// Cap on generated tokens; falls back to the configured default.
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// One retrieved chunk with its relevance score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// Position of the chunk in the index (insertion order).
    pub index: usize,
    pub score: f32,
}

/// A lazy, one-shot, finite sequence of answer fragments in generation
/// order. Dropping the stream cancels the in-flight generation call.
pub type FragmentStream = BoxStream<'static, Result<String, crate::error::QueryError>>;

/// The answer to a query: complete text, or a stream of fragments whose
/// concatenation equals the complete text.
pub enum Answer {
    Complete(String),
    Streaming(FragmentStream),
}

impl Answer {
    /// Drain the answer into a single string, whichever form it took.
    pub async fn collect(self) -> Result<String, crate::error::QueryError> {
        use futures::StreamExt;
        match self {
            Answer::Complete(text) => Ok(text),
            Answer::Streaming(mut stream) => {
                let mut out = String::new();
                while let Some(fragment) = stream.next().await {
                    out.push_str(&fragment?);
                }
                Ok(out)
            }
        }
    }
}
