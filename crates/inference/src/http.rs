use crate::error::{InferenceError, Result};
use crate::service::{parse_keywords, EmbedOutput, InferenceService};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

const SUMMARY_PROMPT: &str = "You summarize documentation. Reply with a concise summary of the \
user's text that keeps every technical term, name and number needed to find it again.";

const DEFAULT_BASE_URL: &str = "http://localhost:8080/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Settings for an OpenAI-compatible inference endpoint.
#[derive(Debug, Clone)]
pub struct HttpInferenceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub chat_model: String,
    /// Requested output dimension, forwarded to models that support it.
    pub dimensions: Option<usize>,
    pub timeout: Duration,
}

impl Default for HttpInferenceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            dimensions: None,
            timeout: Duration::from_secs(120),
        }
    }
}

impl HttpInferenceConfig {
    /// Overlay `DOCTREE_LLM_*` environment variables on the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let var = |name: &str| {
            env::var(name)
                .ok()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            base_url: var("DOCTREE_LLM_BASE_URL").unwrap_or(defaults.base_url),
            api_key: var("DOCTREE_LLM_API_KEY"),
            embedding_model: var("DOCTREE_EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            chat_model: var("DOCTREE_CHAT_MODEL").unwrap_or(defaults.chat_model),
            dimensions: var("DOCTREE_EMBEDDING_DIMENSIONS").and_then(|v| v.parse().ok()),
            timeout: var("DOCTREE_LLM_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }
}

/// Inference over an OpenAI-compatible REST API.
#[derive(Clone)]
pub struct HttpInference {
    client: Client,
    embeddings_url: String,
    chat_url: String,
    config: HttpInferenceConfig,
}

impl HttpInference {
    pub fn new(config: HttpInferenceConfig) -> Result<Self> {
        if config.embedding_model.trim().is_empty() || config.chat_model.trim().is_empty() {
            return Err(InferenceError::config("model names must not be empty"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = config.api_key.as_deref() {
            let auth = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
                .map_err(|_| InferenceError::config("API key is not a valid header value"))?;
            headers.insert(AUTHORIZATION, auth);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        let base = config.base_url.trim_end_matches('/');
        Ok(Self {
            client,
            embeddings_url: format!("{base}/embeddings"),
            chat_url: format!("{base}/chat/completions"),
            config,
        })
    }

    async fn post<B, R>(&self, operation: &'static str, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(InferenceError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|err| InferenceError::malformed(operation, err.to_string()))
    }

    async fn chat(&self, operation: &'static str, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
        };
        let response: ChatResponse = self.post(operation, &self.chat_url, &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| InferenceError::malformed(operation, "no choices returned"))
    }
}

#[async_trait]
impl InferenceService for HttpInference {
    async fn embed(&self, texts: &[String], sparse: bool) -> Result<EmbedOutput> {
        if texts.is_empty() {
            return Ok(EmbedOutput::default());
        }
        if sparse {
            log::debug!("Sparse weights are not served by the OpenAI API; returning dense only");
        }

        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: texts,
            dimensions: self.config.dimensions,
        };
        let mut response: EmbeddingResponse = self
            .post("embedding", &self.embeddings_url, &request)
            .await?;
        response.data.sort_by_key(|entry| entry.index);
        if response.data.len() != texts.len() {
            return Err(InferenceError::malformed(
                "embedding",
                format!(
                    "{} embeddings returned for {} inputs",
                    response.data.len(),
                    texts.len()
                ),
            ));
        }

        log::debug!("Embedded batch of {} texts", texts.len());
        Ok(EmbedOutput {
            dense: response
                .data
                .into_iter()
                .map(|entry| entry.embedding)
                .collect(),
            sparse: None,
        })
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        let summary = self.chat("summary", SUMMARY_PROMPT, text).await?;
        log::debug!("Received summary response ({} bytes)", summary.len());
        Ok(summary)
    }

    async fn extract_keywords(&self, text: &str, max_keywords: usize) -> Result<Vec<String>> {
        let prompt = format!(
            "Extract at most {max_keywords} keywords from the user's text. Reply with the \
             keywords only, separated by commas."
        );
        let raw = self.chat("keywords", &prompt, text).await?;
        log::debug!("Received keywords response");
        Ok(parse_keywords(&raw, max_keywords))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
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
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_joined_without_double_slash() {
        let service = HttpInference::new(HttpInferenceConfig {
            base_url: "http://localhost:9000/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(service.embeddings_url, "http://localhost:9000/v1/embeddings");
        assert_eq!(service.chat_url, "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn empty_model_name_is_rejected() {
        let result = HttpInference::new(HttpInferenceConfig {
            chat_model: " ".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(InferenceError::Config(_))));
    }
}
