//! `podrag ask` subcommand: answer one question from the CLI.
//!
//! With `--stream`, fragments are printed as they arrive. With `--no-rag`,
//! the model is asked directly without retrieval, for comparing
//! grounded and ungrounded answers on the same question.

use anyhow::Result;
use futures::StreamExt;
use std::io::Write;
use std::sync::Arc;

use crate::config::Config;
use crate::embedding::OpenAiEmbeddingProvider;
use crate::generation::{CompletionRequest, GenerativeProvider, OpenAiChatProvider};
use crate::index;
use crate::models::{Answer, Query};
use crate::query::QueryEngine;

pub async fn run_ask(
    config: &Config,
    question: &str,
    stream: bool,
    max_tokens: Option<u32>,
    no_rag: bool,
) -> Result<()> {
    if question.trim().is_empty() {
        anyhow::bail!("Question must not be empty");
    }

    let generator = OpenAiChatProvider::new(&config.generation)?;

    if no_rag {
        let request = CompletionRequest {
            system_prompt: config.generation.system_prompt.clone(),
            user_message: question.to_string(),
            max_tokens: max_tokens.unwrap_or(config.generation.max_tokens),
            temperature: config.generation.temperature,
        };
        if stream {
            let mut fragments = generator.complete_stream(&request).await?;
            while let Some(fragment) = fragments.next().await {
                print_fragment(&fragment?)?;
            }
            println!();
        } else {
            println!("{}", generator.complete(&request).await?);
        }
        return Ok(());
    }

    let embedder = OpenAiEmbeddingProvider::new(&config.embedding)?;
    let vector_index = index::get_or_build(
        &config.index.dir,
        &config.corpus,
        &config.chunking,
        config.embedding.batch_size,
        &embedder,
    )
    .await?;

    let engine = QueryEngine::new(
        Arc::new(vector_index),
        &config.retrieval,
        &config.generation,
    );

    let query = Query {
        text: question.to_string(),
        max_tokens,
        temperature: None,
    };

    match engine.answer(&query, &embedder, &generator, stream).await? {
        Answer::Complete(text) => println!("{}", text),
        Answer::Streaming(mut fragments) => {
            while let Some(fragment) = fragments.next().await {
                print_fragment(&fragment?)?;
            }
            println!();
        }
    }

    Ok(())
}

fn print_fragment(fragment: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(fragment.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
