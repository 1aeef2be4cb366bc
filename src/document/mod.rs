/*!
 * Document model for parsed PDF layouts.
 *
 * - `model`: page / block / line types with lossless JSON round trip
 * - `layout`: flat listing of translatable text blocks with geometry
 *
 * Loading errors surface as `TranslationError::Input` before any block is
 * processed.
 */

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::TranslationError;

pub mod layout;
pub mod model;

pub use layout::{LayoutEntry, extract_layout};
pub use model::{Block, BlockKind, BlockRef, BoundingBox, Document, Line, Page};

impl Document {
    /// Parse a document from parser JSON.
    pub fn from_json_str(json: &str) -> Result<Self, TranslationError> {
        serde_json::from_str(json)
            .map_err(|e| TranslationError::Input(format!("Invalid document JSON: {}", e)))
    }

    /// Load a document from a parser JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TranslationError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            TranslationError::Input(format!("Failed to read document {:?}: {}", path, e))
        })?;

        let document = Self::from_json_str(&content).map_err(|e| match e {
            TranslationError::Input(msg) => TranslationError::Input(format!("{:?}: {}", path, msg)),
            other => other,
        })?;

        Ok(document.with_source(path))
    }

    /// Serialize to pretty JSON, keeping non-ASCII text as-is.
    pub fn to_json_pretty(&self) -> Result<String, TranslationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TranslationError::Input(format!("Failed to serialize document: {}", e)))
    }

    /// Write the document as pretty JSON, creating parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TranslationError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        fs::write(path, self.to_json_pretty()?)?;
        info!("Translated document saved to {:?}", path);
        Ok(())
    }
}

/// Output path for a translated document: `<stem>_<lang>.json` beside the input.
pub fn translated_output_path<P: AsRef<Path>>(input: P, target_language: &str) -> PathBuf {
    let input = input.as_ref();
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let filename = format!("{}_{}.json", stem, target_language);

    match input.parent() {
        Some(parent) => parent.join(filename),
        None => PathBuf::from(filename),
    }
}
