use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::{ChatMessage, ChatProvider, ChatRequest, ChatResponse, classify_status, classify_transport_error, parse_retry_after};
use crate::errors::ProviderError;

/// Default endpoint when none is configured
const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat-completions endpoints
#[derive(Debug)]
pub struct OpenAI {
    /// Label used in logs
    name: String,
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Model used without an override
    model: String,
}

/// Chat-completions request body
#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl OpenAI {
    /// Create a new client
    pub fn new(
        name: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    fn api_url(&self) -> String {
        let base = if self.endpoint.is_empty() {
            DEFAULT_ENDPOINT
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl ChatProvider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = OpenAIRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(self.api_url())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", self.name, status, error_text);
            return Err(classify_status(status.as_u16(), &error_text, retry_after, &request.model));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Invalid JSON body: {}", e)))?;

        if value.get("choices").is_none() {
            debug!("{} response without choices: {}", self.name, value);
            return Err(ProviderError::MalformedResponse("missing 'choices' field".to_string()));
        }

        serde_json::from_value(value)
            .map_err(|e| ProviderError::MalformedResponse(format!("Unexpected response shape: {}", e)))
    }
}
