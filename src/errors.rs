/*!
 * Error types for the layout-translator crate.
 *
 * Provider failures are classified into actionable kinds before they leave the
 * transport layer. Unit-scoped errors are recorded by the orchestrator and never
 * unwind a document run; only input errors and the all-failed aggregate case
 * reach the caller.
 */

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when talking to a language-model provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Credential rejected by the provider
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Too many requests, the caller may retry later
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Message from the provider
        message: String,
        /// Suggested wait from a `Retry-After` header, if any
        retry_after_secs: Option<u64>,
    },

    /// The request did not complete within the client timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The configured model does not exist on the provider
    #[error("Model not found: {model}")]
    ModelNotFound {
        /// Model name that was requested
        model: String,
    },

    /// The provider answered without any content
    #[error("Provider returned an empty response")]
    EmptyResponse,

    /// The provider answered but the expected message field is missing
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Anything else, with the original message kept
    #[error("Provider request failed: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Whether a caller may retry the same request
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Timeout(_))
    }

    /// Failure kind used for per-unit accounting
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Auth(_) => FailureKind::Auth,
            Self::RateLimited { .. } => FailureKind::RateLimited,
            Self::Timeout(_) => FailureKind::Timeout,
            Self::ModelNotFound { .. } => FailureKind::Config,
            Self::EmptyResponse | Self::MalformedResponse(_) => FailureKind::InvalidResponse,
            Self::Unknown(_) => FailureKind::Unknown,
        }
    }
}

/// Coarse classification of a unit failure, reported in run statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Auth,
    RateLimited,
    Timeout,
    Config,
    InvalidResponse,
    Unconfigured,
    Unknown,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Config => "config",
            Self::InvalidResponse => "invalid_response",
            Self::Unconfigured => "unconfigured",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Errors from a cache backend
///
/// These never fail a run; the orchestrator degrades to a miss.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backend could not be reached or queried
    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during document translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The source document could not be read or parsed
    #[error("Input error: {0}")]
    Input(String),

    /// Every unit of a non-empty document failed
    #[error("All {total} translation units failed")]
    AggregateFailure {
        /// Number of units attempted
        total: usize,
        /// Per-unit failures
        failures: Vec<crate::translation::UnitFailure>,
    },

    /// Error writing the translated document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
