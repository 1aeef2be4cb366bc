/*!
 * Flat layout listing of a parsed document.
 *
 * Produces one entry per text block with non-empty text, carrying the page
 * number, bounding box and joined text. Viewers use this to overlay text
 * on the rendered PDF.
 */

use log::info;
use serde::Serialize;

use super::model::{BoundingBox, Document};

/// One text block positioned on a page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutEntry {
    /// Page number as reported by the parser
    pub page: u32,
    /// Block geometry
    pub bbox: BoundingBox,
    /// Joined, trimmed line text
    pub text: String,
    /// Always `"text"`
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// List every non-empty text block in page-then-block order.
pub fn extract_layout(document: &Document) -> Vec<LayoutEntry> {
    let layout: Vec<LayoutEntry> = document
        .pages
        .iter()
        .flat_map(|page| {
            page.blocks
                .iter()
                .filter(|block| block.kind.is_text())
                .filter_map(move |block| {
                    let text = block.joined_text();
                    (!text.is_empty()).then(|| LayoutEntry {
                        page: page.page_number,
                        bbox: block.bounding_box(),
                        text,
                        kind: "text",
                    })
                })
        })
        .collect();

    info!("Layout extracted: {} text blocks", layout.len());
    layout
}
