/*!
 * Prompt templates for document block translation.
 *
 * The instructions travel as the system message and the block text as the
 * user message, so the source text is never interpolated into instructions.
 */

use crate::language_utils;
use crate::providers::ChatMessage;

/// System prompt template for format-preserving translation.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for academic paragraph translation.
    pub const DOCUMENT_TRANSLATOR: &'static str = r#"Translate the academic paragraph provided by the user into {target_language}. Keep terminology accurate and the structure intact.

## Requirements
1. Preserve every LaTeX formula exactly as written:
   - inline math delimited by single dollars, e.g. $x = y + z$
   - display math delimited by double dollars, e.g. $$\sum_{i=1}^{n} x_i$$
   - never translate, modify or drop any symbol inside a formula
2. Preserve all Markdown structure and syntax (headings, lists, tables, bold, italics). Do not change any Markdown markers.
3. Preserve code blocks and inline code, including every ` and ``` delimiter and the code inside them.
4. Return only the {target_language} translation. Never keep the source text and never produce bilingual pairs such as "source (translation)" or "translation (source)".
   - Only where necessary (technical terms, names, places) you may add the source-language form in parentheses after the translated term, e.g. "机器学习 (Machine Learning)".
5. Do not add explanations, notes or any surrounding text."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default document translator template.
    pub fn document_translator() -> Self {
        Self::new(Self::DOCUMENT_TRANSLATOR)
    }

    /// Render the template for a target language code.
    pub fn render(&self, target_language: &str) -> String {
        self.template
            .replace("{target_language}", &language_utils::display_name(target_language))
    }

    /// Build the chat messages for one block of text.
    pub fn build_messages(&self, text: &str, target_language: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.render(target_language)),
            ChatMessage::user(text),
        ]
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::document_translator()
    }
}
