use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Find files with a specific extension in a directory, sorted by path
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            let matches = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted));
            if path.is_file() && matches {
                result.push(path.to_path_buf());
            }
        }

        result.sort();
        Ok(result)
    }

    // @checks: Whether a file is a translated output (`<stem>_<lang>.json`)
    pub fn is_translated_output<P: AsRef<Path>>(path: P, target_language: &str) -> bool {
        path.as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(&format!("_{}", target_language)))
            .unwrap_or(false)
    }

    /// Parser documents in a directory, excluding translated outputs
    pub fn find_documents<P: AsRef<Path>>(dir: P, target_language: &str) -> Result<Vec<PathBuf>> {
        Ok(Self::find_files(dir, "json")?
            .into_iter()
            .filter(|path| !Self::is_translated_output(path, target_language))
            .collect())
    }
}
