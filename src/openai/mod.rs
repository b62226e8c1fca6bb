// Client for the hosted OpenAI-compatible API
// Covers the embeddings and chat-completion endpoints behind one credential


use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    base_url: Url,
    api_key: String,
    embedding_model: String,
    embedding_dimension: usize,
    chat_model: String,
    temperature: f32,
    max_tokens: u32,
    batch_size: usize,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

impl OpenAiClient {
    /// Build a client from the API configuration and the resolved
    /// credential. Calls block until the service responds; there is no
    /// caller-side timeout, retry, or cancellation.
    #[inline]
    pub fn new(api: &ApiConfig, api_key: String) -> Result<Self> {
        let base_url = api.url().context("Failed to parse API base URL")?;
        let agent = ureq::Agent::config_builder().build().into();

        Ok(Self {
            base_url,
            api_key,
            embedding_model: api.embedding_model.clone(),
            embedding_dimension: api.embedding_dimension as usize,
            chat_model: api.chat_model.clone(),
            temperature: api.temperature,
            max_tokens: api.max_tokens,
            batch_size: api.batch_size as usize,
            agent,
        })
    }

    #[inline]
    pub fn embedding_dimension(&self) -> usize {
        self.embedding_dimension
    }

    /// Embed a single text, e.g. a user question.
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = vec![text.to_string()];
        let mut vectors = self.request_embeddings(&input)?;
        vectors
            .pop()
            .ok_or_else(|| anyhow!("embeddings response was empty"))
    }

    /// Embed many texts, splitting the request into batches of the
    /// configured size. Output order matches input order.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let batch_vectors = self
                .request_embeddings(batch)
                .with_context(|| format!("Failed to embed batch of {} texts", batch.len()))?;
            vectors.extend(batch_vectors);
        }

        Ok(vectors)
    }

    /// Send a rendered prompt to the chat-completion endpoint and return
    /// the generated text.
    #[inline]
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!(
            "Requesting chat completion (model {}, prompt length {})",
            self.chat_model,
            prompt.len()
        );

        let response_text = self
            .post_json("/v1/chat/completions", &request_json)
            .context("Chat completion request failed")?;

        parse_chat(&response_text)
    }

    fn request_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingsRequest {
            model: &self.embedding_model,
            input: texts,
        };

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embeddings request")?;

        let response_text = self
            .post_json("/v1/embeddings", &request_json)
            .context("Embeddings request failed")?;

        let vectors = parse_embeddings(&response_text, texts.len())?;

        if let Some(first) = vectors.first() {
            if first.len() != self.embedding_dimension {
                return Err(anyhow!(
                    "embedding dimension mismatch: expected {}, got {}",
                    self.embedding_dimension,
                    first.len()
                ));
            }
        }

        Ok(vectors)
    }

    fn post_json(&self, path: &str, body: &str) -> Result<String> {
        let url = self
            .base_url
            .join(path)
            .with_context(|| format!("Failed to build URL for {path}"))?;

        debug!("POST {}", url);

        match self
            .agent
            .post(url.as_str())
            .header("Authorization", &format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send(body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
        {
            Ok(response_text) => Ok(response_text),
            Err(ureq::Error::StatusCode(status)) => {
                Err(anyhow!("service returned HTTP {status}"))
            }
            Err(error) => Err(anyhow!("request failed: {error}")),
        }
    }
}

/// Parse an embeddings response, restoring input order from the per-item
/// index field.
fn parse_embeddings(response_text: &str, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut response: EmbeddingsResponse =
        serde_json::from_str(response_text).context("Failed to parse embeddings response")?;

    if response.data.len() != expected {
        return Err(anyhow!(
            "mismatch between request and response counts: {} vs {}",
            expected,
            response.data.len()
        ));
    }

    response.data.sort_by_key(|item| item.index);
    Ok(response.data.into_iter().map(|item| item.embedding).collect())
}

/// Parse a chat-completion response down to the assistant's text.
fn parse_chat(response_text: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(response_text).context("Failed to parse chat response")?;

    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("chat response contained no choices"))
}
