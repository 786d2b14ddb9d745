//! OpenAI-compatible chat-completions provider.
//!
//! Works against any endpoint that speaks the OpenAI chat API (OpenAI
//! itself, Ollama, vLLM, gateways). The session context map is rendered
//! into the system message; the assembled prompt goes in as the user turn.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{GenerateRequest, GuideProvider};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderErrorKind {
    RateLimit,
    ServerError,
    Timeout,
    AuthError,
    InvalidRequest,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError | Self::Timeout)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiCompatProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sorted by key so the rendered system message is stable.
    fn render_system(request: &GenerateRequest) -> String {
        let mut lines = vec![format!(
            "You are a step-by-step guide for a {} activity.",
            request.category.as_str()
        )];
        let mut entries: Vec<_> = request.context.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        for (key, value) in entries {
            lines.push(format!("{key}: {value}"));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl GuideProvider for OpenAiCompatProvider {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let payload = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![
                ApiMessage {
                    role: "system".into(),
                    content: Self::render_system(&request),
                },
                ApiMessage {
                    role: "user".into(),
                    content: request.prompt,
                },
            ],
        };

        let resp = match self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                return Err(anyhow!(
                    "guide api error (timeout) [retryable]: request timed out after {REQUEST_TIMEOUT_SECS}s"
                ));
            }
            Err(e) if e.is_connect() => {
                return Err(anyhow!("guide api error (connect) [retryable]: {e}"));
            }
            Err(e) => return Err(e.into()),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            let kind = ProviderErrorKind::from_status(status);
            let marker = if kind.is_retryable() { " [retryable]" } else { "" };
            let detail = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(anyhow!("guide api error ({status}){marker}: {detail}"));
        }

        let body: ApiResponse = resp.json().await?;
        let reply = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("guide api returned no choices"))?;
        Ok(reply)
    }
}

/// Stock OpenAI endpoint.
pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(api_key, "https://api.openai.com/v1", model)
}

/// Local Ollama endpoint. No API key required, but the header wants a value.
pub fn ollama(model: impl Into<String>) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new("ollama", "http://localhost:11434/v1", model)
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}
