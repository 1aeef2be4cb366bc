/*!
 * Translation client: one text in, one translation out.
 *
 * Stateless boundary to a chat-completion provider. Builds the
 * format-preserving prompt, applies the request timeout and validates the
 * response. Retrying is left to the caller; retryable failures are marked by
 * `ProviderError::is_retryable`.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::{TranslationCommonConfig, TranslationConfig};
use crate::errors::ProviderError;
use crate::providers::{ChatProvider, ChatRequest, ChatResponse, create_provider};
use crate::translation::cache::truncate_text;
use crate::translation::formatting::FormatPreserver;
use crate::translation::prompts::PromptTemplate;

/// Texts longer than this are logged at debug level
const VERBOSE_LENGTH_CHARS: usize = 500;

/// Result of a translation request that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientOutcome {
    /// The provider produced a translation
    Translated(String),

    /// Empty or whitespace-only input, returned unchanged without a provider call
    Skipped(String),

    /// No provider is configured, so nothing was attempted
    Unconfigured,
}

/// Something that can translate a single text
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target_language`, optionally with another model
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        model_override: Option<&str>,
    ) -> Result<ClientOutcome, ProviderError>;
}

/// Tunables for `LlmTranslator`
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub temperature: f32,
    pub request_timeout: Duration,
    pub length_warning_chars: usize,
    pub slow_request_warning: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from(&TranslationCommonConfig::default())
    }
}

impl From<&TranslationCommonConfig> for ClientOptions {
    fn from(common: &TranslationCommonConfig) -> Self {
        Self {
            temperature: common.temperature,
            request_timeout: Duration::from_secs(common.request_timeout_secs),
            length_warning_chars: common.length_warning_chars,
            slow_request_warning: Duration::from_millis(common.slow_request_warn_ms),
        }
    }
}

/// `Translator` backed by a chat-completion provider
#[derive(Debug, Clone)]
pub struct LlmTranslator {
    provider: Option<Arc<dyn ChatProvider>>,
    prompt: PromptTemplate,
    options: ClientOptions,
}

impl LlmTranslator {
    /// Client for an explicit provider
    pub fn new(provider: Arc<dyn ChatProvider>, options: ClientOptions) -> Self {
        Self {
            provider: Some(provider),
            prompt: PromptTemplate::default(),
            options,
        }
    }

    /// Client without a provider; every request reports `Unconfigured`
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            prompt: PromptTemplate::default(),
            options: ClientOptions::default(),
        }
    }

    /// Client for the first provider in `config` whose credentials resolve
    pub fn from_config(config: &TranslationConfig) -> Self {
        let options = ClientOptions::from(&config.common);

        match config.select_provider() {
            Some(selected) => {
                info!(
                    "Using provider '{}' ({}) with model {}",
                    selected.config.name,
                    selected.config.provider_type.display_name(),
                    selected.config.model
                );
                let provider = create_provider(&selected, options.request_timeout);
                Self::new(provider, options)
            }
            None => {
                warn!("No provider has an API key configured; blocks will be left untranslated");
                Self {
                    options,
                    ..Self::unconfigured()
                }
            }
        }
    }

    /// Replace the prompt template
    pub fn with_prompt(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Whether a provider is available
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }
}

/// Pull the translated text out of a provider response
pub fn extract_content(response: &ChatResponse) -> Result<String, ProviderError> {
    let choice = response.choices.first().ok_or(ProviderError::EmptyResponse)?;

    let message = choice
        .message
        .as_ref()
        .ok_or_else(|| ProviderError::MalformedResponse("missing 'message' field".to_string()))?;

    let content = message.content.as_deref().map(str::trim).unwrap_or_default();
    if content.is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(content.to_string())
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        model_override: Option<&str>,
    ) -> Result<ClientOutcome, ProviderError> {
        if text.trim().is_empty() {
            return Ok(ClientOutcome::Skipped(text.to_string()));
        }

        let Some(provider) = &self.provider else {
            return Ok(ClientOutcome::Unconfigured);
        };

        let model = model_override
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| provider.default_model());

        if text.len() > self.options.length_warning_chars {
            warn!(
                "Text is long ({} bytes) and may exceed the token limit of {}",
                text.len(),
                model
            );
        }
        if text.len() > VERBOSE_LENGTH_CHARS {
            debug!("Calling {} ({}) for {} bytes", provider.name(), model, text.len());
        }

        let request = ChatRequest {
            model: model.to_string(),
            messages: self.prompt.build_messages(text, target_language),
            temperature: self.options.temperature,
            max_tokens: None,
        };

        let start = Instant::now();
        let response = tokio::time::timeout(self.options.request_timeout, provider.complete(request))
            .await
            .map_err(|_| {
                ProviderError::Timeout(format!(
                    "no response from {} within {:?}",
                    provider.name(),
                    self.options.request_timeout
                ))
            })??;

        let elapsed = start.elapsed();
        if elapsed > self.options.slow_request_warning {
            warn!(
                "Slow request: translation took {:.2}s for {} bytes",
                elapsed.as_secs_f64(),
                text.len()
            );
        }

        let translated = extract_content(&response)?;

        if translated == text.trim() {
            warn!(
                "Provider returned the source text unchanged, it may not have been translated: '{}'",
                truncate_text(text, 40)
            );
        }

        let violations = FormatPreserver::check(text, &translated);
        if !violations.is_empty() {
            let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
            warn!(
                "Translation of '{}' may have altered formatting: {}",
                truncate_text(text, 40),
                details.join("; ")
            );
        }
        if text.len() > VERBOSE_LENGTH_CHARS {
            debug!("Translation done: {} -> {} bytes", text.len(), translated.len());
        }

        Ok(ClientOutcome::Translated(translated))
    }
}
