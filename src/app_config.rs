use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

/// Application configuration module
/// This module handles loading, validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Cache config
    #[serde(default)]
    pub cache: CacheConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Wire protocol spoken by a provider
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: any OpenAI-compatible chat-completions endpoint
    #[default]
    OpenAI,
    // @provider: Anthropic Messages API
    Anthropic,
}

impl ProviderKind {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI-compatible",
            Self::Anthropic => "Anthropic",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => f.write_str("openai"),
            Self::Anthropic => f.write_str("anthropic"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// One entry of the ordered provider list
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Label used in logs
    pub name: String,

    // @field: Wire protocol
    #[serde(rename = "type", default)]
    pub provider_type: ProviderKind,

    // @field: Default model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Inline API key (takes precedence over api_key_env)
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Per-request timeout override in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Qwen through the DashScope OpenAI-compatible endpoint
    pub fn qwen() -> Self {
        Self {
            name: "qwen".to_string(),
            provider_type: ProviderKind::OpenAI,
            model: "qwen-plus".to_string(),
            api_key: String::new(),
            api_key_env: Some("QWEN_API_KEY".to_string()),
            endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            timeout_secs: None,
        }
    }

    /// OpenAI
    pub fn openai() -> Self {
        Self {
            name: "openai".to_string(),
            provider_type: ProviderKind::OpenAI,
            model: "gpt-4o-mini".to_string(),
            api_key: String::new(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            endpoint: "https://api.openai.com/v1".to_string(),
            timeout_secs: None,
        }
    }

    /// Anthropic
    pub fn anthropic() -> Self {
        Self {
            name: "anthropic".to_string(),
            provider_type: ProviderKind::Anthropic,
            model: "claude-3-haiku-20240307".to_string(),
            api_key: String::new(),
            api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
            endpoint: "https://api.anthropic.com".to_string(),
            timeout_secs: None,
        }
    }

    /// Resolve the API key: inline value first, then the named variable.
    pub fn resolve_api_key(&self, env: &dyn Fn(&str) -> Option<String>) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.trim().to_string());
        }

        self.api_key_env
            .as_deref()
            .and_then(env)
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }
}

/// Provider chosen by the selection policy, with its resolved key
#[derive(Debug, Clone)]
pub struct SelectedProvider {
    pub config: ProviderConfig,
    pub api_key: String,
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Providers in priority order
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            common: TranslationCommonConfig::default(),
        }
    }
}

impl TranslationConfig {
    /// Select the first provider, in list order, whose credentials resolve.
    pub fn select_provider(&self) -> Option<SelectedProvider> {
        self.select_provider_with(&|name| std::env::var(name).ok())
    }

    /// Selection policy with an explicit environment lookup.
    pub fn select_provider_with(
        &self,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Option<SelectedProvider> {
        self.providers.iter().find_map(|provider| {
            provider.resolve_api_key(env).map(|api_key| SelectedProvider {
                config: provider.clone(),
                api_key,
            })
        })
    }
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Worker pool size for unit translations
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Overall deadline for one document, in seconds
    #[serde(default)]
    pub document_timeout_secs: Option<u64>,

    /// Source length (UTF-8 bytes) above which a warning is logged
    #[serde(default = "default_length_warning_chars")]
    pub length_warning_chars: usize,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Retry count for rate-limited or timed-out requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base backoff for retries in milliseconds, doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Requests slower than this are logged as warnings
    #[serde(default = "default_slow_request_warn_ms")]
    pub slow_request_warn_ms: u64,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            concurrent_requests: default_concurrent_requests(),
            request_timeout_secs: default_request_timeout_secs(),
            document_timeout_secs: None,
            length_warning_chars: default_length_warning_chars(),
            temperature: default_temperature(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            slow_request_warn_ms: default_slow_request_warn_ms(),
        }
    }
}

/// Cache backend selection
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Disabled,
    #[default]
    Memory,
    Sqlite,
}

/// Translation cache settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: CacheBackend,

    /// Entry lifetime in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,

    /// Database file for the sqlite backend (defaults to the user data dir)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            ttl_secs: default_cache_ttl_secs(),
            path: None,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_target_language() -> String {
    "zh".to_string()
}

fn default_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig::qwen(), ProviderConfig::openai()]
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_length_warning_chars() -> usize {
    6000
}

fn default_temperature() -> f32 {
    0.2
}

fn default_retry_count() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_slow_request_warn_ms() -> u64 {
    2000
}

fn default_cache_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Config {
    /// Load a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;

        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        crate::language_utils::validate_language_code(&self.target_language)?;

        if self.translation.common.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }

        if self.translation.common.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be at least 1"));
        }

        if !(0.0..=2.0).contains(&self.translation.common.temperature) {
            return Err(anyhow!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.translation.common.temperature
            ));
        }

        for provider in &self.translation.providers {
            if provider.model.trim().is_empty() {
                return Err(anyhow!("Provider '{}' has no model configured", provider.name));
            }
            if !provider.endpoint.is_empty() {
                url::Url::parse(&provider.endpoint).with_context(|| {
                    format!("Provider '{}' has an invalid endpoint: {}", provider.name, provider.endpoint)
                })?;
            }
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            cache: CacheConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
