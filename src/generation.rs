//! Generative model provider abstraction and the OpenAI-compatible
//! chat-completions implementation.
//!
//! [`GenerativeProvider`] exposes two paths: [`complete`] blocks until the
//! full response is available; [`complete_stream`] returns a lazy stream of
//! text fragments parsed from the server-sent-events body. The same
//! implementation serves a hosted API (OpenAI, Together) or a local
//! llama.cpp server, selected by `base_url`.
//!
//! Generation calls are never retried here: a failed completion may still
//! have billed tokens, so retry policy belongs to the host.
//!
//! [`complete`]: GenerativeProvider::complete
//! [`complete_stream`]: GenerativeProvider::complete_stream

use anyhow::{bail, Context, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::time::Duration;

use crate::config::GenerationConfig;

/// A one-shot stream of completion fragments in generation order.
/// Dropping it closes the underlying HTTP response, cancelling generation.
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Parameters for one completion call, assembled by the query engine.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Produces chat completions, whole or streamed.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Model identifier (e.g. `"mistralai/Mixtral-8x7B-Instruct-v0.1"`).
    fn model_name(&self) -> &str;
    /// Block until the full completion is available.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
    /// Return fragments as the model produces them.
    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TokenStream>;
}

/// Chat completions over the OpenAI wire protocol.
pub struct OpenAiChatProvider {
    model: String,
    base_url: String,
    api_key: Option<String>,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiChatProvider {
    /// Create a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured API key environment variable is
    /// named but not set, or if the HTTP client cannot be built.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = match config.api_key_env.as_deref() {
            Some(var) if !var.is_empty() => match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) => bail!("{} environment variable not set", var),
            },
            _ => None,
        };

        // Only a connect timeout on the shared client; the non-streaming
        // path adds a total timeout per request. A total timeout would cut
        // off long streamed generations mid-answer.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn request_body(&self, request: &CompletionRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_message },
            ],
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": stream,
        })
    }

    async fn send(
        &self,
        body: &serde_json::Value,
        total_timeout: Option<Duration>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        if let Some(timeout) = total_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .context("chat completion request failed")?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Chat completions API error {}: {}", status, body_text);
        }
        Ok(response)
    }
}

#[async_trait]
impl GenerativeProvider for OpenAiChatProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.request_body(request, false);
        let response = self
            .send(&body, Some(Duration::from_secs(self.timeout_secs)))
            .await?;
        let json: serde_json::Value = response.json().await?;
        parse_completion_response(&json)
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TokenStream> {
        let body = self.request_body(request, true);
        let response = self.send(&body, None).await?;

        let stream = try_stream! {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            'outer: while let Some(chunk) = bytes.next().await {
                let chunk = chunk.context("error reading completion stream")?;
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE events are newline-delimited `data: {...}` lines.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(payload) = line.strip_prefix("data:") else {
                        continue;
                    };
                    let payload = payload.trim();

                    if payload == "[DONE]" {
                        break 'outer;
                    }

                    let event: serde_json::Value = serde_json::from_str(payload)
                        .with_context(|| format!("malformed stream event: {}", payload))?;

                    if let Some(fragment) = event
                        .get("choices")
                        .and_then(|c| c.get(0))
                        .and_then(|c| c.get("delta"))
                        .and_then(|d| d.get("content"))
                        .and_then(|c| c.as_str())
                    {
                        if !fragment.is_empty() {
                            yield fragment.to_string();
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// Extract `choices[0].message.content` from a non-streaming completion
/// response, trimmed of surrounding whitespace.
fn parse_completion_response(json: &serde_json::Value) -> Result<String> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid completion response: missing message content"))
}
