/*!
 * Provider implementations for chat-completion services.
 *
 * This module contains client implementations for the supported providers:
 * - OpenAI: any OpenAI-compatible endpoint (OpenAI, Qwen via DashScope, DeepSeek, local servers)
 * - Anthropic: Anthropic Messages API
 * - Mock: deterministic in-process provider for tests
 *
 * Every provider returns the same normalized `ChatResponse` and classifies
 * its failures into `ProviderError` before returning.
 */

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{ProviderKind, SelectedProvider};
use crate::errors::ProviderError;

pub mod anthropic;
pub mod mock;
pub mod openai;

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Provider-independent chat request
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model name
    pub model: String,

    /// Conversation, system message first
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature
    pub temperature: f32,

    /// Upper bound on generated tokens, provider default when absent
    pub max_tokens: Option<u32>,
}

/// Message part of a response choice; both fields may be missing on the wire
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,

    #[serde(default)]
    pub content: Option<String>,
}

/// One choice of a chat response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
}

/// Normalized chat response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatResponse {
    /// Response with a single assistant message
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChatChoice {
                message: Some(ResponseMessage {
                    role: Some("assistant".to_string()),
                    content: Some(content.into()),
                }),
            }],
        }
    }
}

/// Common trait for all chat-completion providers
///
/// Object safe, so the translation client can hold any provider behind
/// `Arc<dyn ChatProvider>`.
#[async_trait]
pub trait ChatProvider: Send + Sync + Debug {
    /// Label used in logs
    fn name(&self) -> &str;

    /// Model used when the caller gives no override
    fn default_model(&self) -> &str;

    /// Complete a chat request
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Build the provider for a selected configuration entry
pub fn create_provider(selected: &SelectedProvider, timeout: Duration) -> Arc<dyn ChatProvider> {
    let config = &selected.config;
    let timeout = config.timeout_secs.map(Duration::from_secs).unwrap_or(timeout);

    match config.provider_type {
        ProviderKind::OpenAI => Arc::new(openai::OpenAI::new(
            &config.name,
            &selected.api_key,
            &config.endpoint,
            &config.model,
            timeout,
        )),
        ProviderKind::Anthropic => Arc::new(anthropic::Anthropic::new(
            &config.name,
            &selected.api_key,
            &config.endpoint,
            &config.model,
            timeout,
        )),
    }
}

/// Read a `Retry-After` header given in seconds
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
}

/// Pull `(code, message)` out of the common error body shapes:
/// `{"error": {"code"|"type", "message"}}` and `{"code", "message"}`.
fn error_details(body: &str) -> (Option<String>, String) {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return (None, body.trim().to_string());
    };

    let scope = value.get("error").filter(|e| e.is_object()).unwrap_or(&value);
    let code = ["code", "type"]
        .iter()
        .filter_map(|field| scope.get(*field).and_then(Value::as_str))
        .find(|code| !code.is_empty() && *code != "error")
        .map(str::to_lowercase);
    let message = scope
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    (code, message)
}

fn classify_code(code: &str, message: &str, retry_after_secs: Option<u64>, model: &str) -> Option<ProviderError> {
    let error = match code {
        "invalid_api_key" | "invalidapikey" | "authentication_error" | "permission_error"
        | "permission_denied" | "unauthorized" => ProviderError::Auth(message.to_string()),
        "rate_limit_exceeded" | "rate_limit_error" | "throttling" | "throttling.ratequota"
        | "overloaded_error" => ProviderError::RateLimited {
            message: message.to_string(),
            retry_after_secs,
        },
        "model_not_found" | "modelnotfound" | "not_found_error" => ProviderError::ModelNotFound {
            model: model.to_string(),
        },
        "timeout" | "request_timeout" => ProviderError::Timeout(message.to_string()),
        _ => return None,
    };
    Some(error)
}

fn classify_message(message: &str, retry_after_secs: Option<u64>, model: &str) -> Option<ProviderError> {
    let lower = message.to_lowercase();

    if lower.contains("unauthorized") || lower.contains("invalid api key") || lower.contains("incorrect api key") {
        Some(ProviderError::Auth(message.to_string()))
    } else if lower.contains("rate limit") || lower.contains("too many requests") {
        Some(ProviderError::RateLimited {
            message: message.to_string(),
            retry_after_secs,
        })
    } else if lower.contains("timed out") || lower.contains("timeout") {
        Some(ProviderError::Timeout(message.to_string()))
    } else if lower.contains("model") && (lower.contains("not found") || lower.contains("does not exist")) {
        Some(ProviderError::ModelNotFound {
            model: model.to_string(),
        })
    } else {
        None
    }
}

/// Classify a non-success HTTP response.
///
/// Order: provider error code, then HTTP status, then message patterns as a
/// last resort.
pub fn classify_status(status: u16, body: &str, retry_after_secs: Option<u64>, model: &str) -> ProviderError {
    let (code, message) = error_details(body);

    if let Some(error) = code
        .as_deref()
        .and_then(|code| classify_code(code, &message, retry_after_secs, model))
    {
        return error;
    }

    match status {
        401 | 403 => ProviderError::Auth(message),
        429 => ProviderError::RateLimited {
            message,
            retry_after_secs,
        },
        408 | 504 => ProviderError::Timeout(message),
        404 => ProviderError::ModelNotFound {
            model: model.to_string(),
        },
        _ => classify_message(&message, retry_after_secs, model)
            .unwrap_or_else(|| ProviderError::Unknown(format!("HTTP {}: {}", status, message))),
    }
}

/// Classify a transport failure (no HTTP response received)
pub fn classify_transport_error(error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout(error.to_string())
    } else {
        ProviderError::Unknown(format!("Failed to send request: {}", error))
    }
}
