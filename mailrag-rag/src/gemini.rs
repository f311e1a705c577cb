//! Gemini embedding and completion providers over the Generative Language
//! REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::completion::CompletionProvider;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Output size of `text-embedding-004`.
const DEFAULT_DIMENSIONS: usize = 768;

const DEFAULT_COMPLETION_MODEL: &str = "gemini-2.0-flash";

/// `batchEmbedContents` accepts at most this many requests per call.
const MAX_BATCH: usize = 100;

const PROVIDER: &str = "Gemini";

/// Read `GOOGLE_API_KEY`, falling back to `GEMINI_API_KEY`.
fn read_api_key() -> Option<String> {
    ["GOOGLE_API_KEY", "GEMINI_API_KEY"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|key| !key.is_empty())
}

fn missing_key() -> RagError {
    RagError::Config("GOOGLE_API_KEY (or GEMINI_API_KEY) environment variable not set".into())
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))
}

/// Accept both `text-embedding-004` and `models/text-embedding-004`.
fn model_path(model: &str) -> String {
    if model.starts_with("models/") { model.to_string() } else { format!("models/{model}") }
}

fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

/// Gemini distinguishes what an embedding will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalQuery,
    RetrievalDocument,
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn embedding_error(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message }
}

fn generation_error(message: String) -> RagError {
    RagError::Generation { provider: PROVIDER.into(), message }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.trim().is_empty() { None } else { Some(text) }
}

/// POST `body` to `url` and decode the JSON reply, mapping failures with `to_error`.
async fn post_json<B, R>(
    client: &reqwest::Client,
    api_key: &str,
    url: &str,
    body: &B,
    to_error: fn(String) -> RagError,
) -> Result<R>
where
    B: Serialize + ?Sized,
    R: for<'de> Deserialize<'de>,
{
    let response =
        client.post(url).header("x-goog-api-key", api_key).json(body).send().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "request failed");
            to_error(format!("request failed: {e}"))
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        error!(provider = PROVIDER, %status, "API error");
        return Err(to_error(format!("API returned {status}: {}", error_detail(body))));
    }

    response.json().await.map_err(|e| {
        error!(provider = PROVIDER, error = %e, "failed to parse response");
        to_error(format!("failed to parse response: {e}"))
    })
}

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// Queries ([`embed`](EmbeddingProvider::embed)) are sent with
/// [`TaskType::RetrievalQuery`], ingestion batches
/// ([`embed_batch`](EmbeddingProvider::embed_batch)) with
/// [`TaskType::RetrievalDocument`].
///
/// # Example
///
/// ```rust,ignore
/// use mailrag_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::from_env()?;
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), 768);
/// ```
pub struct GeminiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    output_dimensionality: Option<usize>,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider for `text-embedding-004` with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            output_dimensionality: None,
        })
    }

    /// Create a new provider from `GOOGLE_API_KEY` or `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(read_api_key().ok_or_else(missing_key)?)
    }

    /// Set the embedding model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Truncate output vectors to `dims` values.
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    fn request<'a>(&self, model: &'a str, text: &'a str, task_type: TaskType) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model,
            content: Content { role: None, parts: vec![Part { text }] },
            task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let model = model_path(&self.model);
        let url = format!("{}/{model}:embedContent", self.base_url);
        let body = self.request(&model, text, TaskType::RetrievalQuery);

        let response: EmbedContentResponse =
            post_json(&self.client, &self.api_key, &url, &body, embedding_error).await?;
        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let model = model_path(&self.model);
        let url = format!("{}/{model}:batchEmbedContents", self.base_url);

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            let body = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|text| self.request(&model, text, TaskType::RetrievalDocument))
                    .collect(),
            };
            let response: BatchEmbedResponse =
                post_json(&self.client, &self.api_key, &url, &body, embedding_error).await?;

            if response.embeddings.len() != batch.len() {
                error!(provider = PROVIDER, expected = batch.len(), got = response.embeddings.len(), "short batch");
                return Err(embedding_error(format!(
                    "expected {} embeddings, API returned {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// A [`CompletionProvider`] backed by Gemini `generateContent`.
///
/// Defaults to `gemini-2.0-flash` at temperature 0.3.
pub struct GeminiCompletionProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

impl GeminiCompletionProvider {
    /// Default sampling temperature.
    pub const DEFAULT_TEMPERATURE: f32 = 0.3;

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Config("Gemini API key must not be empty".into()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.into(),
            model: DEFAULT_COMPLETION_MODEL.into(),
            temperature: Self::DEFAULT_TEMPERATURE,
        })
    }

    /// Create a new provider from `GOOGLE_API_KEY` or `GEMINI_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(read_api_key().ok_or_else(missing_key)?)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl CompletionProvider for GeminiCompletionProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let url = format!("{}/{}:generateContent", self.base_url, model_path(&self.model));
        let body = GenerateContentRequest {
            contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
            generation_config: GenerationConfig { temperature: self.temperature },
        };

        let response: GenerateContentResponse =
            post_json(&self.client, &self.api_key, &url, &body, generation_error).await?;

        candidate_text(response).ok_or_else(|| {
            error!(provider = PROVIDER, "model returned no text");
            generation_error("model returned no text".to_string())
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
