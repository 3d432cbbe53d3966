//! `podrag index` subcommands: build (or load) and inspect the persisted
//! vector index.

use anyhow::Result;

use crate::config::Config;
use crate::embedding::OpenAiEmbeddingProvider;
use crate::{index, store};

/// Build the index if none is persisted, otherwise load it. With `force`,
/// delete the persisted manifest first so the corpus is re-embedded.
pub async fn run_build(config: &Config, force: bool) -> Result<()> {
    let location = &config.index.dir;

    if force && store::exists(location) {
        std::fs::remove_file(location.join(store::MANIFEST_FILE))?;
        println!("removed persisted index at {}", location.display());
    }

    let had_persisted = store::exists(location);
    let provider = OpenAiEmbeddingProvider::new(&config.embedding)?;

    let vector_index = index::get_or_build(
        location,
        &config.corpus,
        &config.chunking,
        config.embedding.batch_size,
        &provider,
    )
    .await?;

    println!("index {}", if had_persisted { "load" } else { "build" });
    println!("  documents: {}", vector_index.document_count());
    println!("  chunks: {}", vector_index.chunks.len());
    println!("  model: {}", vector_index.embedding_model);
    println!("  dims: {}", vector_index.dims);
    println!("ok");

    Ok(())
}

/// Print what is persisted at the configured index location.
pub fn run_status(config: &Config) -> Result<()> {
    let location = &config.index.dir;

    if !store::exists(location) {
        println!("index status");
        println!("  no persisted index at {}", location.display());
        return Ok(());
    }

    let vector_index = store::load(location, config.embedding.dims)?;
    let built = chrono::DateTime::from_timestamp(vector_index.built_at, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_default();

    println!("index status");
    println!("  location: {}", location.display());
    println!("  documents: {}", vector_index.document_count());
    println!("  chunks: {}", vector_index.chunks.len());
    println!("  model: {}", vector_index.embedding_model);
    println!("  dims: {}", vector_index.dims);
    println!("  built: {}", built);

    Ok(())
}
