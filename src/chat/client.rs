//! OpenAI-compatible chat completions client.
//!
//! One request per turn, no retries. A turn ends with the completion text or a
//! single terminal [`ChatError`]: HTTP failure, non-success status, timeout, or
//! user cancellation through the caller's token.

use super::scrub::sanitize_api_error;
use crate::config::ApiConfig;
use crate::error::ChatError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub type ChatFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ChatError>> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatTurn>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Anything that can turn a list of turns into one completion.
pub trait ChatClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
        cancel: &'a CancellationToken,
    ) -> ChatFuture<'a>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub(crate) fn build_http_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .unwrap_or_else(|_| Client::new())
}

pub struct OpenAiCompatibleClient {
    api_key: Option<String>,
    chat_url: String,
    timeout_secs: u64,
    client: Client,
}

impl OpenAiCompatibleClient {
    /// Validates `config` first; a missing key is only reported per request.
    pub fn new(config: &ApiConfig) -> Result<Self, ChatError> {
        config.validate()?;
        let base_url = config.base_url.trim_end_matches('/');
        let chat_url = if base_url.ends_with("/chat/completions") {
            base_url.to_string()
        } else {
            format!("{base_url}/chat/completions")
        };

        Ok(Self {
            api_key: config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(ToString::to_string),
            chat_url,
            timeout_secs: config.timeout_secs,
            client: build_http_client(config.timeout_secs),
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    async fn send(&self, request: &CompletionRequest) -> Result<String, ChatError> {
        let api_key = self.api_key.as_deref().ok_or(ChatError::MissingApiKey)?;

        let response = self
            .client
            .post(&self.chat_url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_string());
            return Err(ChatError::Api {
                status: status.as_u16(),
                message: sanitize_api_error(&body, Some(api_key)),
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(&e))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(ChatError::EmptyResponse)
    }

    fn transport_error(&self, error: &reqwest::Error) -> ChatError {
        if error.is_timeout() {
            return ChatError::Timeout {
                secs: self.timeout_secs,
            };
        }
        ChatError::Request {
            message: sanitize_api_error(&error.to_string(), self.api_key.as_deref()),
        }
    }
}

impl ChatClient for OpenAiCompatibleClient {
    fn complete<'a>(
        &'a self,
        request: &'a CompletionRequest,
        cancel: &'a CancellationToken,
    ) -> ChatFuture<'a> {
        Box::pin(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("chat request cancelled");
                    Err(ChatError::Cancelled)
                }
                result = self.send(request) => {
                    if let Err(ChatError::Timeout { secs }) = &result {
                        tracing::warn!("chat request timed out after {secs}s");
                    }
                    result
                }
            }
        })
    }
}
