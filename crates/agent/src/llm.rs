use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use salescast_core::config::LlmConfig;

use crate::auth::{Credentials, TokenError, TokenProvider};

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("no vendor credentials are configured")]
    MissingCredentials,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion endpoint returned HTTP {status}")]
    Status { status: u16 },
    #[error("completion response contained no choices")]
    EmptyChoices,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    #[serde(default)]
    content: String,
}

/// Chat-completion client for the forecasting vendor. Sends the prompt as a
/// single user message and returns the first choice's text.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    tokens: TokenProvider,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    timeout: Duration,
}

impl ChatCompletionClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, CompletionError> {
        let credentials =
            Credentials::from_config(config).ok_or(CompletionError::MissingCredentials)?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            tokens: TokenProvider::new(http.clone(), config, credentials),
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn chat(&self, prompt: &str) -> Result<String, CompletionError> {
        let token = self.tokens.bearer().await?;
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token.expose_secret())
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status { status: status.as_u16() });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(CompletionError::EmptyChoices)
    }
}

#[async_trait]
impl LlmClient for ChatCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(self.chat(prompt).await?)
    }
}
