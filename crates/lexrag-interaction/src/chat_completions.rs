//! ChatCompletionsClient - REST client for OpenAI-compatible chat endpoints.
//!
//! The API key comes from `GROQ_API_KEY` or `LEXRAG_API_KEY`; model,
//! endpoint, temperature and timeout come from `RagConfig`.

use async_trait::async_trait;
use lexrag_core::config::RagConfig;
use lexrag_core::error::{LexragError, Result};
use lexrag_core::llm::LlmClient;
use lexrag_infrastructure::config_storage::{API_KEY_VARS, api_key_from_env};
use regex::Regex;
use reqwest::{Client, StatusCode, header::HeaderValue};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

const STAGE: &str = "calling the model";
const DEFAULT_MAX_RETRIES: u32 = 2;
const MAX_BACKOFF: Duration = Duration::from_secs(30);

static THINK_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").ok());

/// `LlmClient` backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_retries: u32,
}

impl std::fmt::Debug for ChatCompletionsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ChatCompletionsClient {
    /// Creates a client with the given API key and model on the default endpoint.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: lexrag_core::config::DEFAULT_LLM_BASE_URL.to_string(),
            temperature: 0.0,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Builds a client from the configuration and the API key in the environment.
    ///
    /// # Errors
    ///
    /// `LexragError::Config` when no API key is set or the HTTP client
    /// cannot be built.
    pub fn try_from_config(config: &RagConfig) -> Result<Self> {
        let api_key = api_key_from_env().ok_or_else(|| {
            LexragError::config(format!(
                "no API key found; set one of {}",
                API_KEY_VARS.join(", ")
            ))
        })?;

        Self::new(api_key, config.llm_model.clone())
            .with_base_url(config.llm_base_url.clone())
            .with_temperature(config.llm_temperature)
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Retries of retryable failures (429, 5xx, connect, timeout).
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Rebuilds the HTTP client with a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LexragError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    fn build_request(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    async fn send_request(&self, body: &ChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| LexragError::Llm {
                stage: STAGE.to_string(),
                message: format!("request failed: {err}"),
                status_code: None,
                retryable: err.is_connect() || err.is_timeout(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let retry_after = parse_retry_after(response.headers().get("retry-after"));
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(HttpFailure::new(status, &body_text, retry_after).into_error());
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
            LexragError::llm(STAGE, format!("Failed to parse response: {err}"))
        })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl LlmClient for ChatCompletionsClient {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        let request = self.build_request(prompt);
        let mut attempt = 0u32;

        loop {
            match self.send_request(&request).await {
                Ok(text) => return Ok(strip_reasoning(&text)),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = backoff(attempt);
                    tracing::warn!(
                        model = %self.model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Removes `<think>…</think>` reasoning blocks and trims the result.
pub fn strip_reasoning(text: &str) -> String {
    match THINK_BLOCK.as_ref() {
        Some(re) => re.replace_all(text, "").trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500u64.saturating_mul(1 << attempt.min(6))).min(MAX_BACKOFF)
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| LexragError::llm(STAGE, "API returned no content in the response"))
}

struct HttpFailure {
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
}

impl HttpFailure {
    fn new(status: StatusCode, body: &str, retry_after: Option<Duration>) -> Self {
        let message = serde_json::from_str::<ErrorResponse>(body)
            .map(|wrapper| wrapper.error.message)
            .unwrap_or_else(|_| body.to_string());
        Self {
            status,
            message,
            retry_after,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self.status,
            StatusCode::TOO_MANY_REQUESTS
                | StatusCode::INTERNAL_SERVER_ERROR
                | StatusCode::BAD_GATEWAY
                | StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::GATEWAY_TIMEOUT
        )
    }

    fn into_error(self) -> LexragError {
        let retryable = self.is_retryable();
        let message = match self.retry_after {
            Some(delay) => format!("{} (retry after {}s)", self.message, delay.as_secs()),
            None => self.message,
        };
        LexragError::Llm {
            stage: STAGE.to_string(),
            message: format!("HTTP {}: {}", self.status.as_u16(), message),
            status_code: Some(self.status.as_u16()),
            retryable,
        }
    }
}

fn parse_retry_after(header: Option<&HeaderValue>) -> Option<Duration> {
    let value = header?.to_str().ok()?;
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_reasoning_blocks() {
        let raw = "<think>\nLet me weigh clause 4.\n</think>\n\nThe notice period is 30 days.";
        assert_eq!(strip_reasoning(raw), "The notice period is 30 days.");
        assert_eq!(strip_reasoning("plain"), "plain");
    }

    #[test]
    fn http_errors_use_api_message_and_classify_retry() {
        let body = r#"{"error": {"message": "Rate limit reached", "type": "tokens"}}"#;
        let err = HttpFailure::new(StatusCode::TOO_MANY_REQUESTS, body, Some(Duration::from_secs(7)))
            .into_error();
        assert!(err.is_retryable());
        match err {
            LexragError::Llm {
                message,
                status_code,
                ..
            } => {
                assert_eq!(status_code, Some(429));
                assert!(message.contains("Rate limit reached"));
                assert!(message.contains("retry after 7s"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = HttpFailure::new(StatusCode::UNAUTHORIZED, "bad key", None).into_error();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("bad key"));
    }

    #[test]
    fn parses_numeric_retry_after_only() {
        let seconds = HeaderValue::from_static("12");
        assert_eq!(parse_retry_after(Some(&seconds)), Some(Duration::from_secs(12)));
        let date = HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_retry_after(Some(&date)), None);
        assert_eq!(parse_retry_after(None), None);
    }

    #[test]
    fn empty_choices_is_an_error() {
        let response: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(extract_text_response(response).is_err());

        let response: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": "ok"}}]}"#).unwrap();
        assert_eq!(extract_text_response(response).unwrap(), "ok");
    }

    #[test]
    fn request_body_shape() {
        let client = ChatCompletionsClient::new("k", "llama").with_temperature(0.2);
        let body = serde_json::to_value(client.build_request("hello")).unwrap();
        assert_eq!(body["model"], "llama");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn debug_output_redacts_key() {
        let client = ChatCompletionsClient::new("sk-secret-value", "llama");
        let rendered = format!("{client:?}");
        assert!(!rendered.contains("sk-secret-value"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn backoff_grows_and_caps() {
        assert!(backoff(1) < backoff(2));
        assert_eq!(backoff(20), MAX_BACKOFF);
    }
}
