//! Ollama HTTP client for embeddings and answer generation with retry logic

use futures_util::{stream::BoxStream, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{Error, Result};

/// Stream of answer fragments in arrival order
pub type TokenStream = BoxStream<'static, Result<String>>;

/// Sampling options sent with every generation request
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    /// Maximum number of tokens to generate
    pub num_predict: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Ollama API client with automatic retry
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(base_url: &str, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    /// Check if Ollama is reachable
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        self.retry_request(|| async {
            let response = self
                .client
                .post(&url)
                .json(&EmbedRequest { model, prompt: text })
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {} - {}",
                    status, body
                )));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            if embed_response.embedding.is_empty() {
                return Err(Error::embedding(format!("Model '{}' returned an empty embedding", model)));
            }

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate a complete answer in one response
    pub async fn generate(&self, model: &str, prompt: &str, options: GenerateOptions) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        tracing::debug!("Generating answer with model: {}", model);

        self.retry_request(|| async {
            let request = GenerateRequest {
                model,
                prompt,
                stream: false,
                options,
            };

            let response = self
                .client
                .post(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::llm(format!("Generation request failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::llm(format!(
                    "Generation failed: HTTP {} - {}",
                    status, body
                )));
            }

            let generate_response: GenerateResponse = response
                .json()
                .await
                .map_err(|e| Error::llm(format!("Failed to parse generation response: {}", e)))?;

            Ok(generate_response.response)
        })
        .await
    }

    /// Generate a streaming answer.
    ///
    /// The stream yields fragments as Ollama produces them and ends with an
    /// error if the server closes the connection before reporting `done`.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        options: GenerateOptions,
    ) -> Result<TokenStream> {
        let url = format!("{}/api/generate", self.base_url);

        let request = GenerateRequest {
            model,
            prompt,
            stream: true,
            options,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Stream request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("Stream failed: HTTP {} - {}", status, body)));
        }

        Ok(decode_token_stream(response.bytes_stream()))
    }
}

/// Turn a raw NDJSON byte stream into answer fragments.
///
/// Lines that carry no text are skipped. The stream ends after the first error.
pub(crate) fn decode_token_stream<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures_util::stream::unfold(
        (bytes.boxed(), NdjsonDecoder::default(), false),
        |(mut bytes, mut decoder, finished)| async move {
            if finished {
                return None;
            }

            loop {
                match bytes.next().await {
                    Some(Ok(chunk)) => match decoder.push(chunk.as_ref()) {
                        Ok(text) if text.is_empty() => continue,
                        Ok(text) => return Some((Ok(text), (bytes, decoder, false))),
                        Err(e) => return Some((Err(e), (bytes, decoder, true))),
                    },
                    Some(Err(e)) => {
                        let err = Error::llm(format!("Stream error: {}", e));
                        return Some((Err(err), (bytes, decoder, true)));
                    }
                    None => {
                        return match decoder.finish() {
                            Ok(text) if text.is_empty() => None,
                            Ok(text) => Some((Ok(text), (bytes, decoder, true))),
                            Err(e) => Some((Err(e), (bytes, decoder, true))),
                        };
                    }
                }
            }
        },
    )
    .boxed()
}

/// One line of Ollama's NDJSON stream
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Incremental NDJSON decoder that tolerates lines split across network chunks
#[derive(Default)]
pub(crate) struct NdjsonDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl NdjsonDecoder {
    /// Feed bytes, returning the text of every complete line
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<String> {
        self.buffer.extend_from_slice(bytes);

        let mut output = String::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.decode_line(&line, &mut output)?;
        }

        Ok(output)
    }

    /// Flush any trailing line and check the stream completed
    pub(crate) fn finish(&mut self) -> Result<String> {
        let mut output = String::new();
        let rest = std::mem::take(&mut self.buffer);
        self.decode_line(&rest, &mut output)?;

        if !self.done {
            return Err(Error::llm("Stream ended before the answer was complete"));
        }

        Ok(output)
    }

    fn decode_line(&mut self, line: &[u8], output: &mut String) -> Result<()> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() || self.done {
            return Ok(());
        }

        let chunk: StreamChunk = serde_json::from_str(line)
            .map_err(|e| Error::llm(format!("Malformed stream line: {}", e)))?;

        if let Some(error) = chunk.error {
            return Err(Error::llm(error));
        }

        output.push_str(&chunk.response);
        self.done = chunk.done;
        Ok(())
    }
}
