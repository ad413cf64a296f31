//! Generation backend client
//!
//! Talks to an Ollama-compatible `/api/generate` endpoint. Streaming
//! responses arrive as newline-delimited JSON chunks; fragments are
//! accumulated (with an optional delta callback for incremental display)
//! and the full text is returned only once the stream reports done.

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Opaque backend state threaded between calls to preserve model context
pub type ContinuationToken = Vec<i64>;

/// Sampling options for one generation call.
///
/// Field names follow the Ollama wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateOptions {
    /// Sampling temperature
    pub temperature: f32,
    /// Generation budget in tokens
    pub num_predict: u32,
    /// Stop sequences
    pub stop: Vec<String>,
    /// Top-k sampling cutoff
    pub top_k: u32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Repetition penalty
    pub repeat_penalty: f32,
    /// Fixed seed for reproducible output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            num_predict: 160,
            stop: vec!["User:".to_string()],
            top_k: 40,
            top_p: 0.9,
            repeat_penalty: 1.1,
            seed: None,
        }
    }
}

/// One `/api/generate` request
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model identifier
    pub model: String,
    /// Full prompt text
    pub prompt: String,
    /// Whether the server should stream NDJSON chunks
    pub stream: bool,
    /// Sampling options
    pub options: GenerateOptions,
    /// Continuation token from the previous call, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ContinuationToken>,
}

/// One NDJSON chunk (or the whole body when not streaming)
#[derive(Debug, Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    context: Option<ContinuationToken>,
}

/// A completed generation
#[derive(Debug, Clone)]
pub struct Generation {
    /// Accumulated raw model output
    pub text: String,
    /// Continuation token for the next call, when the backend provided one
    pub context: Option<ContinuationToken>,
}

/// Seam over the generation backend, for the session and for tests
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run one generation call to completion
    async fn generate(&self, req: GenerateRequest) -> Result<Generation>;
}

/// Client for an Ollama-compatible generation server
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    stream: bool,
}

impl OllamaClient {
    /// Create a client for the server at `base_url`
    #[must_use]
    pub fn new(base_url: &str, stream: bool) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            stream,
        }
    }

    async fn post(&self, req: &GenerateRequest) -> Result<reqwest::Response> {
        let url = format!("{}/api/generate", self.base_url);
        tracing::debug!(
            url = %url,
            model = %req.model,
            stream = req.stream,
            prompt_chars = req.prompt.chars().count(),
            "sending generation request"
        );

        let response = self.client.post(&url).json(req).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "generation backend error");
            return Err(Error::Backend(format!("generate error {status}: {body}")));
        }
        Ok(response)
    }

    /// Single-shot generation (no streaming)
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status, or a
    /// malformed response body.
    pub async fn generate_once(&self, mut req: GenerateRequest) -> Result<Generation> {
        req.stream = false;
        let response = self.post(&req).await?;
        let chunk: GenerateChunk = response.json().await?;
        Ok(Generation {
            text: chunk.response,
            context: chunk.context,
        })
    }

    /// Streaming generation, accumulating NDJSON fragments.
    ///
    /// `on_delta` is invoked with each response fragment as it arrives;
    /// the accumulated text is returned once the stream is done.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure, non-success status, or a
    /// malformed chunk.
    pub async fn generate_streaming(
        &self,
        mut req: GenerateRequest,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Generation> {
        req.stream = true;
        let response = self.post(&req).await?;

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        let mut text = String::new();
        let mut context = None;
        let mut done = false;

        while let Some(bytes) = stream.next().await {
            let bytes = bytes?;
            buf.extend_from_slice(&bytes);
            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                consume_line(&line, on_delta, &mut text, &mut context, &mut done)?;
            }
        }
        // a final chunk may arrive without a trailing newline
        consume_line(&buf, on_delta, &mut text, &mut context, &mut done)?;

        if !done {
            tracing::warn!(chars = text.chars().count(), "stream ended without done marker");
        }
        Ok(Generation { text, context })
    }
}

fn consume_line(
    line: &[u8],
    on_delta: &mut (dyn FnMut(&str) + Send),
    text: &mut String,
    context: &mut Option<ContinuationToken>,
    done: &mut bool,
) -> Result<()> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }
    let chunk: GenerateChunk = serde_json::from_str(line)?;
    if !chunk.response.is_empty() {
        on_delta(&chunk.response);
        text.push_str(&chunk.response);
    }
    if chunk.done {
        *done = true;
        if chunk.context.is_some() {
            *context = chunk.context;
        }
    }
    Ok(())
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, req: GenerateRequest) -> Result<Generation> {
        if self.stream {
            self.generate_streaming(req, &mut |_| {}).await
        } else {
            self.generate_once(req).await
        }
    }
}
