//! # podrag
//!
//! A retrieval-augmented question answering service for podcast transcripts.
//!
//! podrag ingests transcript files from a corpus directory, chunks and
//! embeds them into a persisted vector index, and answers natural-language
//! questions by retrieving the most relevant chunks and conditioning a
//! generative model on them. Answers are available whole or as a token
//! stream, via a CLI and a small HTTP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌───────────────┐   ┌─────────────┐
//! │    Corpus     │──▶│ Chunk + Embed │──▶│ Index Store │
//! │ (transcripts) │   │   (build)     │   │ index.json  │
//! └──────────────┘   └───────────────┘   └──────┬──────┘
//!                                               │ load
//!                                               ▼
//!                      question ──▶ ┌──────────────┐ ──▶ answer / stream
//!                                   │ Query Engine │
//!                                   └──────────────┘
//!                               embed ▲          │ generate
//!                         (same model)│          ▼
//!                            OpenAI-compatible providers
//!                          (hosted API or local llama.cpp)
//! ```
//!
//! A persisted index is always preferred over rebuilding: embedding a
//! corpus is expensive, so `get_or_build` loads whatever is on disk and
//! only scans + embeds when nothing is persisted.
//!
//! ## Quick Start
//!
//! ```bash
//! podrag index build             # embed the corpus, persist the index
//! podrag index status            # what is persisted
//! podrag ask "What is Kevin's favorite budgeting software?"
//! podrag ask --stream "..."      # print fragments as they arrive
//! podrag serve                   # start the HTTP inference server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed index and query errors |
//! | [`corpus`] | Transcript corpus reader |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Generative model provider abstraction |
//! | [`store`] | Index persistence (exists / load / save) |
//! | [`index`] | Cache-or-build index lifecycle |
//! | [`query`] | Retrieval and answer assembly |
//! | [`server`] | HTTP inference server |

pub mod ask;
pub mod chunk;
pub mod config;
pub mod corpus;
pub mod corpus_cmd;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod index;
pub mod index_cmd;
pub mod models;
pub mod query;
pub mod server;
pub mod store;
