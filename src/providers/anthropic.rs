use async_trait::async_trait;
use log::error;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{
    ChatChoice, ChatProvider, ChatRequest, ChatResponse, ResponseMessage, classify_status,
    classify_transport_error, parse_retry_after,
};
use crate::errors::ProviderError;

/// Anthropic requires an explicit output bound
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic client for interacting with Anthropic API
#[derive(Debug)]
pub struct Anthropic {
    /// Label used in logs
    name: String,
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API endpoint URL (optional, defaults to public API)
    endpoint: String,
    /// Model used without an override
    model: String,
}

/// Anthropic message request
#[derive(Debug, Serialize)]
pub struct AnthropicRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<AnthropicMessage>,

    /// System prompt to guide the AI
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    max_tokens: u32,
}

/// Anthropic message format
#[derive(Debug, Serialize, Deserialize)]
pub struct AnthropicMessage {
    /// Role of the message sender (user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Individual content block in an Anthropic response
#[derive(Debug, Deserialize)]
pub struct AnthropicContent {
    /// The type of content
    #[serde(rename = "type")]
    pub content_type: String,

    /// The actual text content
    #[serde(default)]
    pub text: Option<String>,
}

impl AnthropicRequest {
    /// Convert a normalized chat request; system messages move to `system`.
    pub fn from_chat(request: &ChatRequest) -> Self {
        let system: Vec<&str> = request
            .messages
            .iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect();

        Self {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .filter(|m| m.role != "system")
                .map(|m| AnthropicMessage {
                    role: m.role.clone(),
                    content: m.content.clone(),
                })
                .collect(),
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            temperature: Some(request.temperature),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }
}

impl Anthropic {
    /// Create a new Anthropic client
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
        if self.endpoint.is_empty() {
            "https://api.anthropic.com/v1/messages".to_string()
        } else {
            format!("{}/v1/messages", self.endpoint.trim_end_matches('/'))
        }
    }

    /// Normalize a Messages API body into the chat response shape
    pub fn normalize_response(value: &Value) -> Result<ChatResponse, ProviderError> {
        let content = value
            .get("content")
            .ok_or_else(|| ProviderError::MalformedResponse("missing 'content' field".to_string()))?;

        let blocks: Vec<AnthropicContent> = serde_json::from_value(content.clone())
            .map_err(|e| ProviderError::MalformedResponse(format!("Unexpected content shape: {}", e)))?;

        let text: String = blocks
            .iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text.as_deref())
            .collect();

        Ok(ChatResponse {
            choices: vec![ChatChoice {
                message: Some(ResponseMessage {
                    role: Some("assistant".to_string()),
                    content: (!text.is_empty()).then_some(text),
                }),
            }],
        })
    }
}

#[async_trait]
impl ChatProvider for Anthropic {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = AnthropicRequest::from_chat(&request);

        let response = self
            .client
            .post(self.api_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
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
            error!("Anthropic API error ({}): {}", status, error_text);
            return Err(classify_status(status.as_u16(), &error_text, retry_after, &request.model));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(format!("Invalid JSON body: {}", e)))?;

        Self::normalize_response(&value)
    }
}
