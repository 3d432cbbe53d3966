//! HTTP inference server.
//!
//! Loads (or builds) the vector index once at startup, then serves
//! questions against it. The index is owned by the shared [`AppState`]
//! behind an `Arc`; it is immutable for the life of the process, so
//! handlers query it concurrently without locking.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/inference/batch` | Full answer as JSON |
//! | `POST` | `/inference/stream` | Answer fragments as a chunked body |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses carry a machine-readable code and a message:
//!
//! ```json
//! { "error": { "code": "model_mismatch", "message": "..." } }
//! ```
//!
//! Codes: `bad_request` (400), `model_mismatch` (400), `embedding_failed`
//! (502), `generation_failed` (502), `internal` (500). An empty index is
//! an empty-result condition, not an error: batch answers come back empty
//! with `retrieved: 0`.
//!
//! On the streaming path, errors after the first fragment has been sent
//! cannot change the status code; the body simply ends early. A client
//! disconnect drops the fragment stream, which cancels the in-flight
//! generation call.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::embedding::{EmbeddingProvider, OpenAiEmbeddingProvider};
use crate::error::QueryError;
use crate::generation::{GenerativeProvider, OpenAiChatProvider};
use crate::index;
use crate::models::{Answer, Query};
use crate::query::QueryEngine;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    engine: Arc<QueryEngine>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn GenerativeProvider>,
}

/// Start the inference server: build or load the index, then bind and
/// serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let embedder = Arc::new(OpenAiEmbeddingProvider::new(&config.embedding)?);
    let generator = Arc::new(OpenAiChatProvider::new(&config.generation)?);

    let vector_index = index::get_or_build(
        &config.index.dir,
        &config.corpus,
        &config.chunking,
        config.embedding.batch_size,
        embedder.as_ref(),
    )
    .await?;

    info!(
        chunks = vector_index.chunks.len(),
        documents = vector_index.document_count(),
        "index ready"
    );

    let engine = Arc::new(QueryEngine::new(
        Arc::new(vector_index),
        &config.retrieval,
        &config.generation,
    ));

    let state = AppState {
        engine,
        embedder,
        generator,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/inference/batch", post(handle_batch))
        .route("/inference/stream", post(handle_stream))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    let bind_addr = &config.server.bind;
    info!(bind = %bind_addr, "inference server listening");

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: code.to_string(),
        message: message.into(),
    }
}

/// Map query failures to transport-level responses. Empty retrieval is
/// handled by the callers, not here. It is a result, not a failure.
fn classify_query_error(err: QueryError) -> AppError {
    match &err {
        QueryError::ModelMismatch { .. } => bad_request("model_mismatch", err.to_string()),
        QueryError::RetrievalEmpty => AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: err.to_string(),
        },
        QueryError::Embedding(_) => AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "embedding_failed".to_string(),
            message: err.to_string(),
        },
        QueryError::Generation(_) => AppError {
            status: StatusCode::BAD_GATEWAY,
            code: "generation_failed".to_string(),
            message: err.to_string(),
        },
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    indexed_chunks: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        indexed_chunks: state.engine.index().chunks.len(),
    })
}

// ============ POST /inference/batch ============

/// Request body for both inference endpoints.
#[derive(Deserialize)]
struct ChatInput {
    user_message: String,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct BatchResponse {
    answer: String,
    retrieved: usize,
}

async fn handle_batch(
    State(state): State<AppState>,
    Json(input): Json<ChatInput>,
) -> Result<Json<BatchResponse>, AppError> {
    if input.user_message.trim().is_empty() {
        return Err(bad_request("bad_request", "user_message must not be empty"));
    }

    let query = Query {
        text: input.user_message,
        max_tokens: input.max_tokens,
        temperature: None,
    };

    let result = state
        .engine
        .answer(&query, state.embedder.as_ref(), state.generator.as_ref(), false)
        .await;

    match result {
        Ok(answer) => {
            let text = answer.collect().await.map_err(classify_query_error)?;
            let retrieved = state.engine.top_k().min(state.engine.index().chunks.len());
            Ok(Json(BatchResponse {
                answer: text,
                retrieved,
            }))
        }
        // Nothing indexed: surface as an empty result, not a server error.
        Err(QueryError::RetrievalEmpty) => Ok(Json(BatchResponse {
            answer: String::new(),
            retrieved: 0,
        })),
        Err(err) => Err(classify_query_error(err)),
    }
}

// ============ POST /inference/stream ============

async fn handle_stream(
    State(state): State<AppState>,
    Json(input): Json<ChatInput>,
) -> Result<Response, AppError> {
    if input.user_message.trim().is_empty() {
        return Err(bad_request("bad_request", "user_message must not be empty"));
    }

    let query = Query {
        text: input.user_message,
        max_tokens: input.max_tokens,
        temperature: None,
    };

    let result = state
        .engine
        .answer(&query, state.embedder.as_ref(), state.generator.as_ref(), true)
        .await;

    let answer = match result {
        Ok(answer) => answer,
        Err(QueryError::RetrievalEmpty) => Answer::Complete(String::new()),
        Err(err) => return Err(classify_query_error(err)),
    };

    let body = match answer {
        Answer::Complete(text) => Body::from(text),
        Answer::Streaming(fragments) => Body::from_stream(fragments.map(|f| f.map(Bytes::from))),
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .body(body)
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: e.to_string(),
        })?)
}
