/*!
 * Core document model types for parsed PDF layouts.
 *
 * A document is a page -> block -> line hierarchy produced by an external
 * layout parser. The types keep every field the parser emitted so that a
 * translated document serializes back to the same structure, with a
 * `translated_text` field added on each translated text block.
 */

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Parsed document: an ordered sequence of pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Pages in source order
    #[serde(default)]
    pub pages: Vec<Page>,

    /// Any other top-level fields emitted by the parser
    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// File the document was loaded from, if any
    #[serde(skip)]
    source: Option<PathBuf>,
}

impl Document {
    /// Create a document from pages.
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages,
            extra: Map::new(),
            source: None,
        }
    }

    /// Attach the source file identity.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Source file the document came from.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Total number of blocks across all pages.
    pub fn block_count(&self) -> usize {
        self.pages.iter().map(|p| p.blocks.len()).sum()
    }

    /// Number of blocks carrying a translation.
    pub fn translated_block_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.blocks.iter())
            .filter(|b| b.translated_text.is_some())
            .count()
    }

    /// Mutable access to a block by its position.
    pub fn block_mut(&mut self, block_ref: BlockRef) -> Option<&mut Block> {
        self.pages
            .get_mut(block_ref.page_index)?
            .blocks
            .get_mut(block_ref.block_index)
    }

    /// Shared access to a block by its position.
    pub fn block(&self, block_ref: BlockRef) -> Option<&Block> {
        self.pages
            .get(block_ref.page_index)?
            .blocks
            .get(block_ref.block_index)
    }
}

/// Position of a block inside a document.
///
/// Page numbers are not required to be unique, so blocks are addressed by
/// page index and block index rather than by page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BlockRef {
    /// Index into `Document::pages`
    pub page_index: usize,
    /// Index into `Page::blocks`
    pub block_index: usize,
}

impl std::fmt::Display for BlockRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "page[{}].block[{}]", self.page_index, self.block_index)
    }
}

/// A single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page number as reported by the parser
    #[serde(rename = "page_no", alias = "page_number", default)]
    pub page_number: u32,

    /// Blocks in reading order
    #[serde(default)]
    pub blocks: Vec<Block>,

    /// Any other page fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Page {
    /// Create a page with the given blocks.
    pub fn new(page_number: u32, blocks: Vec<Block>) -> Self {
        Self {
            page_number,
            blocks,
            extra: Map::new(),
        }
    }
}

/// Block type discriminator.
///
/// Only `Text` blocks take part in translation. Any other tag is kept
/// verbatim so it serializes back unchanged, including a `type` that is not
/// a string at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum BlockKind {
    Text,
    Other(String),
    /// Non-string tag such as `null`
    Untyped(Value),
}

impl BlockKind {
    /// Whether this block should be translated
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text)
    }
}

impl Default for BlockKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for BlockKind {
    fn from(tag: String) -> Self {
        if tag == "text" {
            Self::Text
        } else {
            Self::Other(tag)
        }
    }
}

impl From<Value> for BlockKind {
    fn from(tag: Value) -> Self {
        match tag {
            Value::String(tag) => tag.into(),
            other => Self::Untyped(other),
        }
    }
}

impl From<BlockKind> for Value {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Text => Value::String("text".to_string()),
            BlockKind::Other(tag) => Value::String(tag),
            BlockKind::Untyped(raw) => raw,
        }
    }
}

/// Bounding box as `[x0, y0, x1, y1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox(pub [f64; 4]);

impl BoundingBox {
    /// Read a parser `bbox` value; anything but four numbers is `None`
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        if items.len() != 4 {
            return None;
        }

        let mut coords = [0.0; 4];
        for (coord, item) in coords.iter_mut().zip(items) {
            *coord = item.as_f64()?;
        }
        Some(Self(coords))
    }

    /// Box width (never negative)
    pub fn width(&self) -> f64 {
        (self.0[2] - self.0[0]).max(0.0)
    }

    /// Box height (never negative)
    pub fn height(&self) -> f64 {
        (self.0[3] - self.0[1]).max(0.0)
    }
}

/// Structural document unit: paragraph, title, figure, table...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block type
    #[serde(rename = "type", default)]
    pub kind: BlockKind,

    /// Geometry as emitted, absent or malformed in some parser outputs
    #[serde(rename = "bbox", default, skip_serializing_if = "Option::is_none")]
    bbox: Option<Value>,

    /// Lines in reading order
    #[serde(default)]
    pub lines: Vec<Line>,

    /// Translation attached by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,

    /// Any other block fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Block {
    /// Create a text block from line strings.
    pub fn text<S: AsRef<str>>(lines: &[S]) -> Self {
        Self::new(BlockKind::Text, lines.iter().map(|l| Line::new(l.as_ref())).collect())
    }

    /// Create a block of any kind.
    pub fn new(kind: BlockKind, lines: Vec<Line>) -> Self {
        Self {
            kind,
            bbox: None,
            lines,
            translated_text: None,
            extra: Map::new(),
        }
    }

    /// Set the bounding box.
    pub fn with_bbox(mut self, bbox: [f64; 4]) -> Self {
        self.bbox = Some(Value::from(bbox.to_vec()));
        self
    }

    /// Bounding box, or the zero box when the parser gave none or a malformed one.
    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
            .as_ref()
            .and_then(BoundingBox::from_value)
            .unwrap_or_default()
    }

    /// Line texts joined by single spaces and trimmed.
    ///
    /// Lines that are not JSON objects are skipped entirely.
    pub fn joined_text(&self) -> String {
        self.lines
            .iter()
            .filter(|l| l.is_object())
            .map(Line::text)
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string()
    }
}

/// A line of text.
///
/// The parser value is stored as-is; a line that is not an object or has no
/// string `text` field reads as empty text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub struct Line {
    raw: Value,
}

impl Line {
    /// Create a line holding only text.
    pub fn new(text: &str) -> Self {
        let mut map = Map::new();
        map.insert("text".to_string(), Value::String(text.to_string()));
        Self { raw: Value::Object(map) }
    }

    /// Whether the parser emitted this line as an object
    pub fn is_object(&self) -> bool {
        self.raw.is_object()
    }

    /// Line text, empty for malformed lines.
    pub fn text(&self) -> &str {
        self.raw.get("text").and_then(Value::as_str).unwrap_or("")
    }
}

impl From<Value> for Line {
    fn from(raw: Value) -> Self {
        Self { raw }
    }
}

impl From<Line> for Value {
    fn from(line: Line) -> Self {
        line.raw
    }
}
