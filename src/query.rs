//! Query engine: embed → retrieve → assemble prompt → generate.
//!
//! The engine owns an immutable [`VectorIndex`] handed to it at
//! construction (the host builds or loads it at startup), so concurrent
//! queries share the index without locking and the engine is trivially
//! testable with a substitute index. Within one query the steps run
//! strictly in order; across queries nothing is ordered.
//!
//! Retrieval ranks chunks by cosine similarity, breaking score ties by
//! corpus insertion order so a fixed index and query vector always produce
//! the same context in the same order.

use futures::StreamExt;
use std::sync::Arc;

use crate::config::{GenerationConfig, RetrievalConfig};
use crate::embedding::{self, cosine_similarity, EmbeddingProvider};
use crate::error::QueryError;
use crate::generation::{CompletionRequest, GenerativeProvider};
use crate::models::{Answer, Query, ScoredChunk, VectorIndex};

/// Answers questions against one loaded index.
pub struct QueryEngine {
    index: Arc<VectorIndex>,
    top_k: usize,
    system_prompt: String,
    default_max_tokens: u32,
    default_temperature: f32,
}

impl QueryEngine {
    pub fn new(
        index: Arc<VectorIndex>,
        retrieval: &RetrievalConfig,
        generation: &GenerationConfig,
    ) -> Self {
        Self {
            index,
            top_k: retrieval.top_k,
            system_prompt: generation.system_prompt.clone(),
            default_max_tokens: generation.max_tokens,
            default_temperature: generation.temperature,
        }
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Number of chunks retrieved per query.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer a query. With `stream` the answer is a lazy fragment stream;
    /// dropping it cancels the in-flight generation call.
    pub async fn answer(
        &self,
        query: &Query,
        embedder: &dyn EmbeddingProvider,
        generator: &dyn GenerativeProvider,
        stream: bool,
    ) -> Result<Answer, QueryError> {
        // Precondition, not silently tolerated: the query must be embedded
        // by the same model the index was built with.
        if embedder.model_name() != self.index.embedding_model {
            return Err(QueryError::ModelMismatch {
                index_model: self.index.embedding_model.clone(),
                query_model: embedder.model_name().to_string(),
            });
        }

        let query_vector = embedding::embed_query(embedder, &query.text)
            .await
            .map_err(QueryError::Embedding)?;

        let retrieved = self.retrieve(&query_vector)?;
        let prompt = self.assemble_prompt(&retrieved, &query.text);

        let request = CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            user_message: prompt,
            max_tokens: query.max_tokens.unwrap_or(self.default_max_tokens),
            temperature: query.temperature.unwrap_or(self.default_temperature),
        };

        if stream {
            let fragments = generator
                .complete_stream(&request)
                .await
                .map_err(QueryError::Generation)?;
            Ok(Answer::Streaming(Box::pin(
                fragments.map(|f| f.map_err(QueryError::Generation)),
            )))
        } else {
            let text = generator
                .complete(&request)
                .await
                .map_err(QueryError::Generation)?;
            Ok(Answer::Complete(text))
        }
    }

    /// Rank all chunks against the query vector and keep the top K.
    ///
    /// The sort is stable and the input is in corpus insertion order, so
    /// equal scores keep that order.
    pub fn retrieve(&self, query_vector: &[f32]) -> Result<Vec<ScoredChunk>, QueryError> {
        if self.index.is_empty() {
            return Err(QueryError::RetrievalEmpty);
        }

        let mut scored: Vec<ScoredChunk> = self
            .index
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ScoredChunk {
                index: i,
                score: cosine_similarity(query_vector, &chunk.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.top_k);

        Ok(scored)
    }

    /// Fixed instruction plus retrieved chunk texts in descending relevance
    /// order, then the question.
    fn assemble_prompt(&self, retrieved: &[ScoredChunk], question: &str) -> String {
        let context = retrieved
            .iter()
            .map(|sc| self.index.chunks[sc.index].text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Context information is below.\n\
             ---------------------\n\
             {context}\n\
             ---------------------\n\
             Given the context information and not prior knowledge, \
             answer the query.\n\
             Query: {question}\n\
             Answer:"
        )
    }
}
