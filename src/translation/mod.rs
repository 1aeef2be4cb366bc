/*!
 * Document block translation.
 *
 * This module contains the pipeline that turns a parsed document into its
 * translated counterpart. It is split into several submodules:
 *
 * - `extractor`: Selects translatable text units from a document
 * - `cache`: Content-keyed translation caching
 * - `prompts`: Format-preserving prompt templates
 * - `formatting`: Checks that math, code and Markdown survived translation
 * - `client`: Single-text translation through a chat provider
 * - `orchestrator`: Concurrent, failure-isolated document translation
 */

// Re-export main types for easier usage
pub use self::cache::{MemoryCache, NoopCache, TranslationCache, cache_key, create_cache};
pub use self::client::{ClientOptions, ClientOutcome, LlmTranslator, Translator};
pub use self::formatting::{FormatPreserver, FormatViolation};
pub use self::extractor::{SpanExtractor, TranslationUnit, extract_units};
pub use self::orchestrator::{
    DocumentTranslator, PipelineOptions, ProgressCallback, TranslationStats, UnitFailure,
};
pub use self::prompts::PromptTemplate;

// Submodules
pub mod cache;
pub mod client;
pub mod extractor;
pub mod formatting;
pub mod orchestrator;
pub mod prompts;
