/*!
 * Span extraction: turns a document into translation units.
 *
 * A block yields a unit iff it is a text block whose joined line text is
 * non-empty after trimming. Extraction is lazy, performs no I/O and never
 * looks at existing translations, so re-running it after a partial run
 * yields every text block again.
 */

use std::iter::FusedIterator;

use crate::document::{BlockRef, Document};

/// One text block's joined text pending translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationUnit {
    /// Owning block position
    pub block: BlockRef,
    /// Page number as reported by the parser
    pub page_number: u32,
    /// Joined, trimmed line text
    pub source_text: String,
    /// Target language code
    pub target_language: String,
}

/// Lazy iterator over the translation units of a document
///
/// Each call to `extract_units` starts again from the first page.
#[derive(Debug, Clone)]
pub struct SpanExtractor<'a> {
    document: &'a Document,
    target_language: &'a str,
    page_index: usize,
    block_index: usize,
}

/// Extract translation units in page-then-block order.
pub fn extract_units<'a>(document: &'a Document, target_language: &'a str) -> SpanExtractor<'a> {
    SpanExtractor {
        document,
        target_language,
        page_index: 0,
        block_index: 0,
    }
}

impl Iterator for SpanExtractor<'_> {
    type Item = TranslationUnit;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(page) = self.document.pages.get(self.page_index) {
            while let Some(block) = page.blocks.get(self.block_index) {
                let block_ref = BlockRef {
                    page_index: self.page_index,
                    block_index: self.block_index,
                };
                self.block_index += 1;

                if !block.kind.is_text() {
                    continue;
                }

                let source_text = block.joined_text();
                if source_text.is_empty() {
                    continue;
                }

                return Some(TranslationUnit {
                    block: block_ref,
                    page_number: page.page_number,
                    source_text,
                    target_language: self.target_language.to_string(),
                });
            }

            self.page_index += 1;
            self.block_index = 0;
        }

        None
    }
}

impl FusedIterator for SpanExtractor<'_> {}
