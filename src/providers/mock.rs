/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with translated text
 * - `MockProvider::echo()` - Returns the source text unchanged
 * - `MockProvider::failing()` - Always fails with the given error
 * - `MockProvider::fail_when_contains()` - Fails only for matching texts
 * - `MockProvider::empty()` / `missing_message()` - Invalid response shapes
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::errors::ProviderError;
use crate::providers::{ChatChoice, ChatProvider, ChatRequest, ChatResponse};

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with `[TRANSLATED] <text>`
    Working,
    /// Returns the source text unchanged
    Echo,
    /// Always fails with the given error
    Failing(ProviderError),
    /// Fails for texts containing the needle, works otherwise
    FailWhenContains { needle: String, error: ProviderError },
    /// Fails the first `failures` requests, then works
    FailFirst { failures: usize, error: ProviderError },
    /// Returns a whitespace-only message
    Empty,
    /// Returns a choice without a message field
    MissingMessage,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter
    request_count: Arc<AtomicUsize>,
    /// Requests currently in progress
    in_flight: Arc<AtomicUsize>,
    /// Highest number of simultaneous requests seen
    max_in_flight: Arc<AtomicUsize>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a mock that answers with the source text
    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(error: ProviderError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Create a mock that fails for texts containing `needle`
    pub fn fail_when_contains(needle: impl Into<String>, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailWhenContains {
            needle: needle.into(),
            error,
        })
    }

    /// Create a mock that fails the first `failures` requests
    pub fn fail_first(failures: usize, error: ProviderError) -> Self {
        Self::new(MockBehavior::FailFirst { failures, error })
    }

    /// Create a mock that returns empty responses
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock whose responses lack the message field
    pub fn missing_message() -> Self {
        Self::new(MockBehavior::MissingMessage)
    }

    /// Create a mock that sleeps before answering
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were in progress at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn translate(&self, text: &str) -> String {
        match self.custom_response {
            Some(generator) => generator(text),
            None => format!("[TRANSLATED] {}", text),
        }
    }

    async fn respond(&self, count: usize, text: &str) -> Result<ChatResponse, ProviderError> {
        match &self.behavior {
            MockBehavior::Working => Ok(ChatResponse::from_content(self.translate(text))),

            MockBehavior::Echo => Ok(ChatResponse::from_content(text)),

            MockBehavior::Failing(error) => Err(error.clone()),

            MockBehavior::FailWhenContains { needle, error } => {
                if text.contains(needle.as_str()) {
                    Err(error.clone())
                } else {
                    Ok(ChatResponse::from_content(self.translate(text)))
                }
            }

            MockBehavior::FailFirst { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(ChatResponse::from_content(self.translate(text)))
                }
            }

            MockBehavior::Empty => Ok(ChatResponse::from_content("  ")),

            MockBehavior::MissingMessage => Ok(ChatResponse {
                choices: vec![ChatChoice { message: None }],
            }),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(ChatResponse::from_content(self.translate(text)))
            }
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            request_count: Arc::clone(&self.request_count),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let text = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.clone())
            .unwrap_or_default();

        let result = self.respond(count, &text).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
