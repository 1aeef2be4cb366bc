/*!
 * Document translation pipeline.
 *
 * Drives extraction, cache lookup, client calls and result attachment for a
 * whole document:
 * - units sharing a source text are translated once and the result fanned out
 * - distinct texts run on a bounded pool (`buffer_unordered`), completion order is free
 * - results are attached by `BlockRef`, so block order never changes
 * - a failing unit is recorded and the run continues
 * - an optional deadline abandons outstanding units and records them as timeouts
 * - a run where every unit failed is reported as `AggregateFailure`
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::Config;
use crate::document::{BlockRef, Document, translated_output_path};
use crate::errors::{FailureKind, ProviderError, TranslationError};
use crate::translation::cache::{DEFAULT_CACHE_TTL, TranslationCache, cache_key, create_cache};
use crate::translation::client::{ClientOutcome, LlmTranslator, Translator};
use crate::translation::extractor::{TranslationUnit, extract_units};

/// Upper bound on a provider-suggested retry wait
const MAX_RETRY_WAIT: Duration = Duration::from_secs(60);

/// Called with `(completed, total)` after each unit finishes
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Pipeline tunables
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Worker pool size; 1 runs units sequentially
    pub concurrency: usize,

    /// Overall deadline for one document
    pub deadline: Option<Duration>,

    /// Lifetime of cache entries written by the run
    pub cache_ttl: Duration,

    /// Retries for retryable provider errors
    pub retry_count: u32,

    /// Base backoff, doubled on each retry
    pub retry_backoff: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            deadline: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            retry_count: 2,
            retry_backoff: Duration::from_millis(1000),
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        let common = &config.translation.common;
        Self {
            concurrency: common.concurrent_requests,
            deadline: common.document_timeout_secs.map(Duration::from_secs),
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            retry_count: common.retry_count,
            retry_backoff: Duration::from_millis(common.retry_backoff_ms),
        }
    }
}

/// A unit that did not receive a translation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitFailure {
    /// Owning block
    pub block: BlockRef,
    /// Page number of the owning page
    pub page_number: u32,
    /// Failure classification
    pub kind: FailureKind,
    /// Human-readable cause
    pub message: String,
}

/// Outcome counters of one document run
#[derive(Debug, Clone, Serialize)]
pub struct TranslationStats {
    /// Identifier used in log lines of this run
    pub run_id: String,
    /// Units extracted from the document
    pub total_units: usize,
    /// Units whose attached result (new or cached) differs from the source
    pub translated_units: usize,
    /// Units answered from the cache
    pub cached_units: usize,
    /// Units whose attached result equals the source text
    pub unchanged_units: usize,
    /// Units left untranslated
    pub failures: Vec<UnitFailure>,
    /// Wall time of the run
    pub elapsed: Duration,
}

impl TranslationStats {
    fn new(total_units: usize) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            total_units,
            translated_units: 0,
            cached_units: 0,
            unchanged_units: 0,
            failures: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Whether every unit received a result
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether any unit failed
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Per-unit result, kept in the order units were extracted
#[derive(Debug, Clone)]
enum UnitResult {
    Cached(String),
    Translated(String),
    Failed(FailureKind, String),
}

/// Units with the same `(source text, target language)` pair
struct UnitGroup<'a> {
    /// Unit sent to the cache and client on behalf of the group
    unit: &'a TranslationUnit,
    /// Extraction indices of every unit sharing the text
    members: Vec<usize>,
}

fn group_units(units: &[TranslationUnit]) -> Vec<UnitGroup<'_>> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<UnitGroup<'_>> = Vec::new();

    for (index, unit) in units.iter().enumerate() {
        let key = cache_key(&unit.source_text, &unit.target_language);
        let slot = *slots.entry(key).or_insert_with(|| {
            groups.push(UnitGroup {
                unit,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(index);
    }

    groups
}

/// Translates documents with an injected client and cache
pub struct DocumentTranslator {
    client: Arc<dyn Translator>,
    cache: Arc<dyn TranslationCache>,
    options: PipelineOptions,
    progress: Option<ProgressCallback>,
}

impl DocumentTranslator {
    pub fn new(
        client: Arc<dyn Translator>,
        cache: Arc<dyn TranslationCache>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            client,
            cache,
            options,
            progress: None,
        }
    }

    /// Build the client and cache described by `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(LlmTranslator::from_config(&config.translation)),
            create_cache(&config.cache),
            PipelineOptions::from_config(config),
        )
    }

    /// Same client, cache and options with another progress callback
    pub fn clone_with_progress(&self, callback: ProgressCallback) -> Self {
        Self {
            client: Arc::clone(&self.client),
            cache: Arc::clone(&self.cache),
            options: self.options.clone(),
            progress: Some(callback),
        }
    }

    /// Translate every text block of `document` into `target_language`.
    ///
    /// Returns the same document with `translated_text` attached to every
    /// block that succeeded, plus run statistics. Fails only when at least one
    /// unit existed and none succeeded.
    pub async fn translate_document(
        &self,
        mut document: Document,
        target_language: &str,
        model_override: Option<&str>,
    ) -> Result<(Document, TranslationStats), TranslationError> {
        let started = Instant::now();
        let units: Vec<TranslationUnit> = extract_units(&document, target_language).collect();
        let total = units.len();
        let mut stats = TranslationStats::new(total);

        if total == 0 {
            info!("[{}] No text blocks to translate", stats.run_id);
            stats.elapsed = started.elapsed();
            return Ok((document, stats));
        }

        let groups = group_units(&units);
        info!(
            "[{}] Translating {} text blocks ({} distinct) of {} into {} ({} workers)",
            stats.run_id,
            total,
            groups.len(),
            document
                .source()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<in-memory document>".to_string()),
            target_language,
            self.options.concurrency.max(1)
        );

        let results = self.run_units(&groups, total, model_override, started).await;

        for (unit, result) in units.iter().zip(results) {
            let result = result.unwrap_or_else(|| {
                UnitResult::Failed(
                    FailureKind::Timeout,
                    "document deadline exceeded before the block was translated".to_string(),
                )
            });

            let translated = match result {
                UnitResult::Cached(text) => {
                    stats.cached_units += 1;
                    text
                }
                UnitResult::Translated(text) => text,
                UnitResult::Failed(kind, message) => {
                    stats.failures.push(UnitFailure {
                        block: unit.block,
                        page_number: unit.page_number,
                        kind,
                        message,
                    });
                    continue;
                }
            };

            if translated == unit.source_text {
                stats.unchanged_units += 1;
            } else {
                stats.translated_units += 1;
            }

            match document.block_mut(unit.block) {
                Some(block) => block.translated_text = Some(translated),
                None => warn!("[{}] Block {} disappeared before attachment", stats.run_id, unit.block),
            }
        }

        stats.elapsed = started.elapsed();
        info!(
            "[{}] Translation finished: {}/{} blocks ({} cached, {} unchanged, {} failed) in {:.2}s",
            stats.run_id,
            stats.translated_units,
            total,
            stats.cached_units,
            stats.unchanged_units,
            stats.failures.len(),
            stats.elapsed.as_secs_f64()
        );

        if stats.failures.len() == total {
            error!("[{}] All {} blocks failed to translate", stats.run_id, total);
            return Err(TranslationError::AggregateFailure {
                total,
                failures: stats.failures,
            });
        }

        Ok((document, stats))
    }

    /// Run one unit per group on the pool and fan each result out to the
    /// group's members; `None` marks a unit abandoned at the deadline.
    async fn run_units(
        &self,
        groups: &[UnitGroup<'_>],
        total: usize,
        model_override: Option<&str>,
        started: Instant,
    ) -> Vec<Option<UnitResult>> {
        let mut results: Vec<Option<UnitResult>> = (0..total).map(|_| None).collect();
        let deadline = self.options.deadline.map(|d| started + d);

        let mut pending = stream::iter(groups)
            .map(|group| async move { (&group.members, self.process_unit(group.unit, model_override).await) })
            .buffer_unordered(self.options.concurrency.max(1));

        let mut completed = 0;
        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, pending.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        warn!(
                            "Document deadline of {:?} exceeded, abandoning {} outstanding blocks",
                            self.options.deadline.unwrap_or_default(),
                            total - completed
                        );
                        break;
                    }
                },
                None => pending.next().await,
            };

            let Some((members, result)) = next else {
                break;
            };

            for &index in members {
                results[index] = Some(result.clone());
                completed += 1;
                if let Some(progress) = &self.progress {
                    progress(completed, total);
                }
            }
        }

        results
    }

    async fn process_unit(&self, unit: &TranslationUnit, model_override: Option<&str>) -> UnitResult {
        match self.cache.lookup(&unit.source_text, &unit.target_language).await {
            Ok(Some(cached)) => {
                debug!("Block {} served from cache", unit.block);
                return UnitResult::Cached(cached);
            }
            Ok(None) => {}
            Err(e) => warn!("Cache lookup failed for block {}, treating as miss: {}", unit.block, e),
        }

        let mut attempt: u32 = 0;
        loop {
            let outcome = self
                .client
                .translate(&unit.source_text, &unit.target_language, model_override)
                .await;

            match outcome {
                Ok(ClientOutcome::Translated(text)) => {
                    if let Err(e) = self
                        .cache
                        .store(&unit.source_text, &unit.target_language, &text, self.options.cache_ttl)
                        .await
                    {
                        warn!("Failed to cache translation for block {}: {}", unit.block, e);
                    }
                    return UnitResult::Translated(text);
                }
                Ok(ClientOutcome::Skipped(text)) => return UnitResult::Translated(text),
                Ok(ClientOutcome::Unconfigured) => {
                    return UnitResult::Failed(
                        FailureKind::Unconfigured,
                        "no translation provider is configured".to_string(),
                    );
                }
                Err(e) if e.is_retryable() && attempt < self.options.retry_count => {
                    let wait = self.retry_wait(&e, attempt);
                    attempt += 1;
                    warn!(
                        "Block {} failed ({}), retry {}/{} in {:?}",
                        unit.block, e, attempt, self.options.retry_count, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    error!("Block {} (page {}) failed: {}", unit.block, unit.page_number, e);
                    return UnitResult::Failed(e.kind(), e.to_string());
                }
            }
        }
    }

    fn retry_wait(&self, error: &ProviderError, attempt: u32) -> Duration {
        if let ProviderError::RateLimited {
            retry_after_secs: Some(secs),
            ..
        } = error
        {
            return Duration::from_secs(*secs).min(MAX_RETRY_WAIT);
        }
        self.options
            .retry_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_RETRY_WAIT)
    }

    /// Translate a parser JSON file and write the result.
    ///
    /// The output defaults to `<stem>_<lang>.json` next to the input.
    pub async fn translate_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        target_language: &str,
        model_override: Option<&str>,
    ) -> Result<(PathBuf, TranslationStats), TranslationError> {
        let document = Document::load(input)?;
        let (document, stats) = self
            .translate_document(document, target_language, model_override)
            .await?;

        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| translated_output_path(input, target_language));
        document.save(&output)?;

        info!(
            "Translated {}/{} blocks of {:?}",
            stats.translated_units, stats.total_units, input
        );
        Ok((output, stats))
    }
}
