/*!
 * # layout-translator
 *
 * A Rust library for translating parsed PDF layouts with large language models.
 *
 * ## Features
 *
 * - Typed page / block / line document model with lossless JSON round trip
 * - Translation of every text block, preserving LaTeX math, Markdown and code
 * - OpenAI-compatible (OpenAI, Qwen, DeepSeek, ...) and Anthropic providers
 * - Content-keyed translation cache (memory, SQLite or disabled)
 * - Bounded concurrency, per-block failure isolation and an overall deadline
 * - ISO 639-1 and ISO 639-3 target language codes
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management and provider selection
 * - `document`: Document model, JSON loading/saving and layout listing
 * - `translation`: The translation pipeline:
 *   - `translation::extractor`: Translatable text units of a document
 *   - `translation::cache`: Caching mechanisms for translations
 *   - `translation::client`: Single-text translation client
 *   - `translation::formatting`: Math, code and Markdown preservation checks
 *   - `translation::orchestrator`: Concurrent document translation
 * - `providers`: Client implementations for chat-completion providers
 * - `database`: SQLite storage for the persistent cache
 * - `app_controller`: File and folder jobs used by the CLI
 * - `file_utils`: File system operations
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod document;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use document::{Block, BlockKind, BlockRef, Document, Line, Page};
pub use errors::{CacheError, FailureKind, ProviderError, TranslationError};
pub use translation::{DocumentTranslator, TranslationStats, UnitFailure};
