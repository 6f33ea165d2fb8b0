/// LLM Client — the single point of entry for all model calls in the API.
///
/// ARCHITECTURAL RULE: no other module may call the OpenRouter API directly.
/// All completion and embedding traffic MUST go through this module, behind
/// the `CompletionProvider` trait so services can be tested with stubs.
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";
/// Chat model used for answer generation.
/// Intentionally hardcoded to prevent accidental drift.
pub const CHAT_MODEL: &str = "google/gemma-3-12b-it";
/// Embedding model used for similarity search.
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";
const TEMPERATURE: f64 = 0.7;
const MAX_RETRIES: u32 = 3;
// Provider calls are bounded so a hung upstream lands on the chat
// fallback path instead of stalling the request.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const EMPTY_COMPLETION_FALLBACK: &str = "Could not generate a coherent response.";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// External capability consumed by the message router: text to vector,
/// prompt + question to generated answer.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError>;
    async fn complete(&self, system: &str, question: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
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
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// The single LLM client used by the chat service.
/// Wraps the OpenRouter OpenAI-compatible API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            base_url: OPENROUTER_API_URL.to_string(),
        }
    }

    /// Posts `body` to `{base_url}{path}`, deserializing the JSON response.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    async fn post_with_retry<B, T>(&self, path: &str, body: &B) -> Result<T, LlmError>
    where
        B: Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .header("content-type", "application/json")
                .json(body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f64>, LlmError> {
        let request = EmbeddingRequest {
            model: EMBEDDING_MODEL,
            input: text,
        };

        let mut response: EmbeddingResponse = self.post_with_retry("/embeddings", &request).await?;

        if response.data.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(response.data.swap_remove(0).embedding)
    }

    async fn complete(&self, system: &str, question: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: CHAT_MODEL,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response: ChatResponse = self.post_with_retry("/chat/completions", &request).await?;

        debug!("LLM completion succeeded ({} choices)", response.choices.len());

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| EMPTY_COMPLETION_FALLBACK.to_string());

        Ok(answer)
    }
}
