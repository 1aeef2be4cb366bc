use anyhow::{Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::document::translated_output_path;
use crate::file_utils::FileManager;
use crate::translation::{DocumentTranslator, TranslationStats};

// @module: Application controller for document translation jobs

/// Runs file and folder translation jobs for the CLI
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Pipeline built from the configuration
    translator: DocumentTranslator,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let translator = DocumentTranslator::from_config(&config);
        Ok(Self { config, translator })
    }

    /// Controller with an explicit pipeline
    pub fn with_translator(config: Config, translator: DocumentTranslator) -> Self {
        Self { config, translator }
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }

    /// Translate one document file
    ///
    /// Returns `None` when the output exists and `force_overwrite` is off.
    pub async fn run(
        &self,
        input_file: &Path,
        output_file: Option<&Path>,
        model_override: Option<&str>,
        force_overwrite: bool,
    ) -> Result<Option<TranslationStats>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(input_file, output_file, model_override, force_overwrite, &multi_progress)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_file: Option<&Path>,
        model_override: Option<&str>,
        force_overwrite: bool,
        multi_progress: &MultiProgress,
    ) -> Result<Option<TranslationStats>> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let target_language = &self.config.target_language;
        let output_path = output_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| translated_output_path(input_file, target_language));

        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", input_file);
            return Ok(None);
        }

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        progress_bar.set_style(Self::progress_style("blocks"));
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let translator = self.translator.clone_with_progress(Arc::new(move |completed: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(completed as u64);
        }));

        let result = translator
            .translate_file(input_file, Some(&output_path), target_language, model_override)
            .await;
        progress_bar.finish_and_clear();

        let (output_path, stats) = result?;
        for failure in &stats.failures {
            warn!(
                "Block {} (page {}) left untranslated: {} ({})",
                failure.block, failure.page_number, failure.kind, failure.message
            );
        }
        info!(
            "Success: {:?} ({}/{} blocks in {:.2}s)",
            output_path,
            stats.translated_units,
            stats.total_units,
            stats.elapsed.as_secs_f64()
        );

        Ok(Some(stats))
    }

    /// Translate every parser document in a directory, one file at a time.
    /// Translated outputs and already translated documents are skipped.
    pub async fn run_folder(
        &self,
        input_dir: &Path,
        model_override: Option<&str>,
        force_overwrite: bool,
    ) -> Result<FolderSummary> {
        if !FileManager::dir_exists(input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let documents = FileManager::find_documents(input_dir, &self.config.target_language)?;
        if documents.is_empty() {
            return Err(anyhow!("No JSON documents found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(documents.len() as u64));
        folder_pb.set_style(Self::progress_style("files"));

        let mut summary = FolderSummary::default();
        for document in &documents {
            let file_name = document
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            match self
                .run_with_progress(document, None, model_override, force_overwrite, &multi_progress)
                .await
            {
                Ok(Some(_)) => summary.processed.push(document.clone()),
                Ok(None) => summary.skipped.push(document.clone()),
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    summary.failed.push(document.clone());
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors",
            summary.processed.len(),
            summary.skipped.len(),
            summary.failed.len()
        );

        Ok(summary)
    }
}

/// Outcome of a folder job
#[derive(Debug, Default)]
pub struct FolderSummary {
    pub processed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}
