//! LiteLLM-compatible inference engine.
//!
//! Sends each prompt as a single user message to an OpenAI-compatible
//! `/chat/completions` endpoint and returns the first choice verbatim.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EngineLoader, GenerationParams, InferenceEngine};
use crate::error::InferenceError;

/// Backoff applied when the endpoint answers HTTP 429.
pub const RATE_LIMIT_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Request timeout for a single generation call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// A message in a conversation with an LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender (e.g., "system", "user", "assistant").
    pub role: String,
    /// Content of the message.
    pub content: String,
}

impl Message {
    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Loader that connects a [`LiteLlmClient`] to a model served behind an
/// OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct LiteLlmLoader {
    api_base: String,
    api_key: Option<String>,
    params: GenerationParams,
    retry_delays: Vec<Duration>,
}

impl LiteLlmLoader {
    /// Create a loader with explicit configuration.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Base URL for the API (e.g., "http://localhost:4000")
    /// * `api_key` - Optional API key for authentication
    pub fn new(api_base: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            params: GenerationParams::default(),
            retry_delays: RATE_LIMIT_DELAYS.to_vec(),
        }
    }

    /// Create a loader from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `LITELLM_API_BASE`: Base URL for the API (required)
    /// - `LITELLM_API_KEY`: API key for authentication (optional)
    ///
    /// # Errors
    ///
    /// Returns `InferenceError::MissingApiBase` if `LITELLM_API_BASE` is not set.
    pub fn from_env() -> Result<Self, InferenceError> {
        let api_base = env::var("LITELLM_API_BASE").map_err(|_| InferenceError::MissingApiBase)?;
        let api_key = env::var("LITELLM_API_KEY").ok();
        Ok(Self::new(api_base, api_key))
    }

    /// Set the sampling parameters used by loaded engines.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// Limit how many rate-limit retries are attempted per call.
    pub fn with_rate_limit_retries(mut self, retries: usize) -> Self {
        let last = RATE_LIMIT_DELAYS.len() - 1;
        self.retry_delays = (0..retries)
            .map(|attempt| RATE_LIMIT_DELAYS[attempt.min(last)])
            .collect();
        self
    }

    /// Replace the rate-limit backoff schedule.
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl EngineLoader for LiteLlmLoader {
    async fn load(&self, model_id: &str) -> Result<Box<dyn InferenceEngine>, InferenceError> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::Load {
                model: model_id.to_string(),
                message: e.to_string(),
            })?;

        debug!(model = model_id, api_base = %self.api_base, "Connected inference engine");

        Ok(Box::new(LiteLlmClient {
            api_base: self.api_base.clone(),
            api_key: self.api_key.clone(),
            model: model_id.to_string(),
            params: self.params,
            retry_delays: self.retry_delays.clone(),
            http_client,
        }))
    }
}

/// Engine handle bound to one model on a LiteLLM-compatible API.
pub struct LiteLlmClient {
    api_base: String,
    api_key: Option<String>,
    model: String,
    params: GenerationParams,
    retry_delays: Vec<Duration>,
    http_client: Client,
}

impl LiteLlmClient {
    /// Issue one chat-completion request without retrying.
    async fn complete(&self, prompt: &str) -> Result<String, InferenceError> {
        let api_request = ApiRequest {
            model: &self.model,
            messages: vec![Message::user(prompt)],
            temperature: self.params.temperature,
            max_tokens: self.params.max_tokens,
        };

        let url = format!("{}/chat/completions", self.api_base);

        let mut http_request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json");

        if let Some(ref api_key) = self.api_key {
            http_request = http_request.header("Authorization", format!("Bearer {}", api_key));
        }

        let http_response = http_request
            .json(&api_request)
            .send()
            .await
            .map_err(|e| InferenceError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(api_error(status_code, error_text));
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| InferenceError::Parse(format!("Failed to parse API response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(InferenceError::EmptyResponse)
    }
}

#[async_trait]
impl InferenceEngine for LiteLlmClient {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(&mut self, prompt: &str) -> Result<String, InferenceError> {
        let mut attempt = 0;
        loop {
            match self.complete(prompt).await {
                Err(InferenceError::RateLimited(message)) => {
                    let Some(delay) = self.retry_delays.get(attempt).copied() else {
                        return Err(InferenceError::RateLimited(message));
                    };
                    warn!(
                        model = %self.model,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

/// Map a non-success HTTP status and body onto an [`InferenceError`].
fn api_error(status_code: u16, body: String) -> InferenceError {
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    if status_code == 429 {
        InferenceError::RateLimited(message)
    } else {
        InferenceError::Api {
            code: status_code,
            message,
        }
    }
}

/// Internal request structure for the OpenAI-compatible API.
#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
}

/// Internal response structure from the OpenAI-compatible API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_new_trims_trailing_slash() {
        let loader = LiteLlmLoader::new("http://localhost:4000/", Some("k".to_string()));
        assert_eq!(loader.api_base(), "http://localhost:4000");
        assert!(loader.has_api_key());

        let loader = LiteLlmLoader::new("http://localhost:4000", None);
        assert!(!loader.has_api_key());
    }

    #[test]
    fn test_rate_limit_retries_schedule() {
        let loader = LiteLlmLoader::new("http://x", None);
        assert_eq!(loader.retry_delays, RATE_LIMIT_DELAYS.to_vec());

        let loader = loader.with_rate_limit_retries(0);
        assert!(loader.retry_delays.is_empty());

        let loader = LiteLlmLoader::new("http://x", None).with_rate_limit_retries(2);
        assert_eq!(
            loader.retry_delays,
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[test]
    fn test_api_request_serialization() {
        let request = ApiRequest {
            model: "Qwen/Qwen2.5-7B-Instruct",
            messages: vec![Message::user("test")],
            temperature: 0.1,
            max_tokens: 1024,
        };

        let json = serde_json::to_string(&request).expect("serialization should succeed");
        assert!(json.contains("\"model\":\"Qwen/Qwen2.5-7B-Instruct\""));
        assert!(json.contains("\"role\":\"user\""));
        assert!(json.contains("\"max_tokens\":1024"));
    }

    #[test]
    fn test_api_error_mapping() {
        let err = api_error(429, r#"{"error":{"message":"slow down"}}"#.to_string());
        assert!(matches!(err, InferenceError::RateLimited(ref m) if m == "slow down"));

        let err = api_error(500, "boom".to_string());
        assert!(matches!(err, InferenceError::Api { code: 500, ref message } if message == "boom"));
    }

    #[test]
    fn test_api_response_null_content() {
        let response: ApiResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(response.choices[0].message.content.is_none());
    }

    #[tokio::test]
    async fn test_generate_connection_error() {
        let loader = LiteLlmLoader::new("http://localhost:65535", None);
        let mut engine = loader.load("gpt-4").await.unwrap();
        assert_eq!(engine.model_id(), "gpt-4");

        let err = engine.generate("test").await.unwrap_err();
        assert!(matches!(err, InferenceError::RequestFailed(_)));
    }

    /// Serves one scripted `(status, body)` response per connection, in order.
    async fn scripted_server(
        responses: Vec<(u16, &'static str)>,
    ) -> (String, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();

                let mut request = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&request);
                    if let Some(end) = text.find("\r\n\r\n") {
                        let content_length = text[..end]
                            .lines()
                            .find_map(|line| {
                                let (name, value) = line.split_once(':')?;
                                if name.eq_ignore_ascii_case("content-length") {
                                    value.trim().parse::<usize>().ok()
                                } else {
                                    None
                                }
                            })
                            .unwrap_or(0);
                        if request.len() >= end + 4 + content_length {
                            break;
                        }
                    }
                }
                counter.fetch_add(1, Ordering::SeqCst);

                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
            }
        });

        (format!("http://{addr}"), hits)
    }

    const RATE_LIMITED: (u16, &str) = (429, r#"{"error":{"message":"slow"}}"#);
    const OK: (u16, &str) = (200, r#"{"choices":[{"message":{"role":"assistant","content":"ok"}}]}"#);

    async fn fast_retry_engine(api_base: &str) -> Box<dyn InferenceEngine> {
        LiteLlmLoader::new(api_base, None)
            .with_retry_delays(vec![Duration::from_millis(1); 3])
            .load("m")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_retries_after_rate_limit() {
        let (api_base, hits) = scripted_server(vec![RATE_LIMITED, RATE_LIMITED, OK]).await;
        let mut engine = fast_retry_engine(&api_base).await;

        assert_eq!(engine.generate("hi").await.unwrap(), "ok");
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_generate_gives_up_after_retries() {
        let (api_base, hits) = scripted_server(vec![RATE_LIMITED; 4]).await;
        let mut engine = fast_retry_engine(&api_base).await;

        let err = engine.generate("hi").await.unwrap_err();
        assert!(matches!(err, InferenceError::RateLimited(ref m) if m == "slow"));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_generate_does_not_retry_other_errors() {
        let (api_base, hits) =
            scripted_server(vec![(500, r#"{"error":{"message":"boom"}}"#), OK]).await;
        let mut engine = fast_retry_engine(&api_base).await;

        let err = engine.generate("hi").await.unwrap_err();
        assert!(matches!(err, InferenceError::Api { code: 500, ref message } if message == "boom"));
        assert_eq!(hits.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
