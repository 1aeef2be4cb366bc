/*!
 * Prompt construction for block translation.
 *
 * This module provides:
 * - The format-preserving system prompt
 * - Chat message assembly for a single block
 */

pub mod templates;

// Re-export main types
pub use templates::PromptTemplate;
