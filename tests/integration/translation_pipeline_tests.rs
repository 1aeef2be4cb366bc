/*!
 * End-to-end tests of the document translation pipeline
 */

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use layout_translator::document::{Block, BlockKind, BlockRef, Document, Page};
use layout_translator::errors::{CacheError, FailureKind, ProviderError, TranslationError};
use layout_translator::providers::mock::MockProvider;
use layout_translator::translation::{
    ClientOutcome, DocumentTranslator, LlmTranslator, MemoryCache, NoopCache, PipelineOptions,
    TranslationCache, Translator,
};

use crate::common;

const TITLE: BlockRef = BlockRef { page_index: 0, block_index: 0 };
const PARAGRAPH: BlockRef = BlockRef { page_index: 0, block_index: 1 };
const IMAGE: BlockRef = BlockRef { page_index: 0, block_index: 2 };
const BLANK: BlockRef = BlockRef { page_index: 1, block_index: 0 };
const FORMULA: BlockRef = BlockRef { page_index: 1, block_index: 1 };

fn translated(document: &Document, block: BlockRef) -> Option<&str> {
    document.block(block)?.translated_text.as_deref()
}

/// Translator that waits before answering texts containing a needle
struct DelayedTranslator {
    delays: Vec<(&'static str, Duration)>,
}

#[async_trait]
impl Translator for DelayedTranslator {
    async fn translate(
        &self,
        text: &str,
        _target_language: &str,
        _model_override: Option<&str>,
    ) -> Result<ClientOutcome, ProviderError> {
        if let Some((_, delay)) = self.delays.iter().find(|(needle, _)| text.contains(needle)) {
            tokio::time::sleep(*delay).await;
        }
        Ok(ClientOutcome::Translated(format!("<{}>", text)))
    }
}

/// Cache whose backend is always down
#[derive(Debug)]
struct BrokenCache {
    calls: AtomicUsize,
}

#[async_trait]
impl TranslationCache for BrokenCache {
    async fn lookup(&self, _: &str, _: &str) -> Result<Option<String>, CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn store(&self, _: &str, _: &str, _: &str, _: Duration) -> Result<(), CacheError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

fn many_blocks(count: usize) -> Document {
    let blocks = (0..count)
        .map(|i| Block::text(&[format!("Paragraph number {}", i)]))
        .collect();
    Document::new(vec![Page::new(0, blocks)])
}

#[tokio::test]
async fn test_translateDocument_withWorkingProvider_shouldAttachEveryTextBlock() {
    common::init_logging();
    let provider = MockProvider::working();
    let pipeline = common::uncached_pipeline(&provider);

    let (document, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.total_units, 3);
    assert_eq!(stats.translated_units, 3);
    assert!(stats.is_complete());
    assert_eq!(provider.request_count(), 3);

    assert_eq!(translated(&document, TITLE), Some("[TRANSLATED] Attention Is All You Need"));
    assert_eq!(
        translated(&document, PARAGRAPH),
        Some("[TRANSLATED] The dominant sequence transduction models are based on recurrent networks.")
    );
    assert_eq!(translated(&document, IMAGE), None);
    assert_eq!(translated(&document, BLANK), None);
    assert!(translated(&document, FORMULA).is_some());
    assert_eq!(document.translated_block_count(), 3);
}

#[tokio::test]
async fn test_translateDocument_shouldKeepStructureAndOriginalFields() {
    let provider = MockProvider::working();
    let pipeline = common::uncached_pipeline(&provider);
    let original = common::sample_document();

    let (document, _) = pipeline
        .translate_document(original.clone(), "zh", None)
        .await
        .unwrap();

    assert_eq!(document.pages.len(), original.pages.len());
    for (page, original_page) in document.pages.iter().zip(&original.pages) {
        assert_eq!(page.page_number, original_page.page_number);
        assert_eq!(page.blocks.len(), original_page.blocks.len());
        for (block, original_block) in page.blocks.iter().zip(&original_page.blocks) {
            assert_eq!(block.kind, original_block.kind);
            assert_eq!(block.lines, original_block.lines);
            assert_eq!(block.bounding_box(), original_block.bounding_box());
        }
    }
}

#[tokio::test]
async fn test_translateDocument_withSlowEarlyBlocks_shouldStillAttachInDocumentOrder() {
    let client = DelayedTranslator {
        delays: vec![
            ("Attention", Duration::from_millis(120)),
            ("dominant", Duration::from_millis(60)),
        ],
    };
    let pipeline = DocumentTranslator::new(
        Arc::new(client),
        Arc::new(NoopCache),
        common::fast_pipeline_options(),
    );

    let (document, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.translated_units, 3);
    assert_eq!(translated(&document, TITLE), Some("<Attention Is All You Need>"));
    assert_eq!(
        translated(&document, FORMULA),
        Some("<The loss is $L = -\\log p(y|x)$ for **every** token.>")
    );
}

#[tokio::test]
async fn test_translateDocument_twiceWithSharedCache_shouldCallProviderOncePerUnit() {
    let provider = MockProvider::working();
    let cache: Arc<dyn TranslationCache> = Arc::new(MemoryCache::new());
    let pipeline = common::pipeline_with(&provider, cache, common::fast_pipeline_options());

    let (first, first_stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();
    let (second, second_stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 3);
    assert_eq!(first_stats.cached_units, 0);
    assert_eq!(second_stats.cached_units, 3);
    assert_eq!(second_stats.translated_units, 3);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_translateDocument_cachedForOtherLanguage_shouldCallProviderAgain() {
    let provider = MockProvider::working();
    let cache: Arc<dyn TranslationCache> = Arc::new(MemoryCache::new());
    let pipeline = common::pipeline_with(&provider, cache, common::fast_pipeline_options());

    pipeline.translate_document(common::sample_document(), "zh", None).await.unwrap();
    pipeline.translate_document(common::sample_document(), "ja", None).await.unwrap();

    assert_eq!(provider.request_count(), 6);
}

#[tokio::test]
async fn test_translateDocument_withoutTextBlocks_shouldReturnDocumentUnchanged() {
    let provider = MockProvider::working();
    let pipeline = common::uncached_pipeline(&provider);
    let original = Document::new(vec![
        Page::new(0, vec![Block::new(BlockKind::Other("image".to_string()), vec![])]),
        Page::new(1, vec![Block::text(&["", " "])]),
    ]);

    let (document, stats) = pipeline
        .translate_document(original.clone(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.total_units, 0);
    assert!(stats.is_complete());
    assert_eq!(provider.request_count(), 0);
    assert_eq!(document.to_json_pretty().unwrap(), original.to_json_pretty().unwrap());
}

#[tokio::test]
async fn test_translateDocument_withOneFailingBlock_shouldIsolateFailure() {
    common::init_logging();
    let provider = MockProvider::fail_when_contains(
        "dominant",
        ProviderError::MalformedResponse("missing 'message' field".to_string()),
    );
    let pipeline = common::uncached_pipeline(&provider);

    let (document, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.total_units, 3);
    assert_eq!(stats.translated_units, 2);
    assert!(stats.has_failures());
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].block, PARAGRAPH);
    assert_eq!(stats.failures[0].page_number, 0);
    assert_eq!(stats.failures[0].kind, FailureKind::InvalidResponse);

    assert_eq!(translated(&document, PARAGRAPH), None);
    assert!(translated(&document, TITLE).is_some());
    assert!(translated(&document, FORMULA).is_some());
}

#[tokio::test]
async fn test_translateDocument_whenEveryBlockFails_shouldReturnAggregateFailure() {
    let provider = MockProvider::failing(ProviderError::Auth("invalid api key".to_string()));
    let pipeline = common::uncached_pipeline(&provider);

    let result = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await;

    match result {
        Err(TranslationError::AggregateFailure { total, failures }) => {
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 3);
            assert!(failures.iter().all(|f| f.kind == FailureKind::Auth));
        }
        other => panic!("expected aggregate failure, got {:?}", other.map(|(_, s)| s)),
    }
    // Auth errors are not retried
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_translateDocument_withoutProvider_shouldReportUnconfigured() {
    let pipeline = DocumentTranslator::new(
        Arc::new(LlmTranslator::unconfigured()),
        Arc::new(NoopCache),
        common::fast_pipeline_options(),
    );

    let result = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await;

    match result {
        Err(TranslationError::AggregateFailure { failures, .. }) => {
            assert!(failures.iter().all(|f| f.kind == FailureKind::Unconfigured));
        }
        other => panic!("expected aggregate failure, got {:?}", other.map(|(_, s)| s)),
    }
}

#[tokio::test]
async fn test_translateDocument_withoutProviderButWarmCache_shouldServeCachedTranslations() {
    let cache = MemoryCache::new();
    for unit in layout_translator::translation::extract_units(&common::sample_document(), "zh") {
        cache
            .store(&unit.source_text, "zh", "缓存", Duration::from_secs(60))
            .await
            .unwrap();
    }
    let pipeline = DocumentTranslator::new(
        Arc::new(LlmTranslator::unconfigured()),
        Arc::new(cache),
        common::fast_pipeline_options(),
    );

    let (document, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.cached_units, 3);
    assert_eq!(translated(&document, TITLE), Some("缓存"));
}

#[tokio::test]
async fn test_translateDocument_shouldPreserveMathAndMarkdown() {
    let provider = MockProvider::working();
    let pipeline = common::uncached_pipeline(&provider);

    let (document, _) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    let formula = translated(&document, FORMULA).unwrap();
    assert!(formula.contains("$L = -\\log p(y|x)$"));
    assert_eq!(formula.matches("**").count(), 2);
}

#[tokio::test]
async fn test_translateDocument_withEchoProvider_shouldCountUnchangedBlocks() {
    let provider = MockProvider::echo();
    let pipeline = common::uncached_pipeline(&provider);

    let (document, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.unchanged_units, 3);
    assert_eq!(stats.translated_units, 0);
    assert_eq!(translated(&document, TITLE), Some("Attention Is All You Need"));
}

#[tokio::test]
async fn test_translateDocument_pastDeadline_shouldRecordOutstandingBlocksAsTimeouts() {
    let client = DelayedTranslator {
        delays: vec![("dominant", Duration::from_secs(30))],
    };
    let options = PipelineOptions {
        deadline: Some(Duration::from_millis(300)),
        ..common::fast_pipeline_options()
    };
    let pipeline = DocumentTranslator::new(Arc::new(client), Arc::new(NoopCache), options);

    let started = std::time::Instant::now();
    let (document, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(stats.translated_units, 2);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].block, PARAGRAPH);
    assert_eq!(stats.failures[0].kind, FailureKind::Timeout);
    assert_eq!(translated(&document, PARAGRAPH), None);
    assert!(translated(&document, TITLE).is_some());
}

#[tokio::test]
async fn test_translateDocument_pastDeadlineForEveryBlock_shouldReturnAggregateFailure() {
    let client = DelayedTranslator {
        delays: vec![("", Duration::from_secs(30))],
    };
    let options = PipelineOptions {
        deadline: Some(Duration::from_millis(100)),
        ..common::fast_pipeline_options()
    };
    let pipeline = DocumentTranslator::new(Arc::new(client), Arc::new(NoopCache), options);

    let result = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await;

    match result {
        Err(TranslationError::AggregateFailure { total, failures }) => {
            assert_eq!(total, 3);
            assert!(failures.iter().all(|f| f.kind == FailureKind::Timeout));
        }
        other => panic!("expected aggregate failure, got {:?}", other.map(|(_, s)| s)),
    }
}

#[tokio::test]
async fn test_translateDocument_shouldNeverExceedConcurrencyLimit() {
    let provider = MockProvider::slow(30);
    let options = PipelineOptions {
        concurrency: 2,
        ..common::fast_pipeline_options()
    };
    let pipeline = common::pipeline_with(&provider, Arc::new(NoopCache), options);

    let (_, stats) = pipeline.translate_document(many_blocks(8), "zh", None).await.unwrap();

    assert_eq!(stats.translated_units, 8);
    assert_eq!(provider.request_count(), 8);
    assert_eq!(provider.max_in_flight(), 2);
}

#[tokio::test]
async fn test_translateDocument_withConcurrencyOne_shouldRunSequentially() {
    let provider = MockProvider::slow(5);
    let options = PipelineOptions {
        concurrency: 1,
        ..common::fast_pipeline_options()
    };
    let pipeline = common::pipeline_with(&provider, Arc::new(NoopCache), options);

    pipeline.translate_document(many_blocks(4), "zh", None).await.unwrap();

    assert_eq!(provider.max_in_flight(), 1);
}

#[tokio::test]
async fn test_translateDocument_withTransientErrors_shouldRetryThenSucceed() {
    let provider = MockProvider::fail_first(2, ProviderError::RateLimited {
        message: "Too many requests".to_string(),
        retry_after_secs: None,
    });
    let pipeline = common::uncached_pipeline(&provider);

    let (document, stats) = pipeline.translate_document(many_blocks(1), "zh", None).await.unwrap();

    assert!(stats.is_complete());
    assert_eq!(provider.request_count(), 3);
    assert_eq!(
        translated(&document, BlockRef { page_index: 0, block_index: 0 }),
        Some("[TRANSLATED] Paragraph number 0")
    );
}

#[tokio::test]
async fn test_translateDocument_whenRetriesRunOut_shouldRecordLastError() {
    let provider = MockProvider::fail_first(5, ProviderError::Timeout("upstream".to_string()));
    let options = PipelineOptions {
        retry_count: 1,
        ..common::fast_pipeline_options()
    };
    let pipeline = common::pipeline_with(&provider, Arc::new(NoopCache), options);

    let result = pipeline.translate_document(many_blocks(1), "zh", None).await;

    assert!(matches!(result, Err(TranslationError::AggregateFailure { total: 1, .. })));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translateDocument_withRepeatedText_shouldCallProviderOncePerDistinctText() {
    common::init_logging();
    let provider = MockProvider::slow(50);
    let cache = Arc::new(MemoryCache::new());
    let document = Document::new(vec![
        Page::new(0, vec![Block::text(&["Abstract"]), Block::text(&["Introduction"])]),
        Page::new(1, vec![Block::text(&["Abstract"]), Block::text(&[" Abstract "])]),
        Page::new(2, vec![Block::text(&["Abstract"])]),
    ]);
    let pipeline = common::pipeline_with(&provider, cache.clone(), common::fast_pipeline_options());

    let (document, stats) = pipeline.translate_document(document, "zh", None).await.unwrap();

    assert_eq!(stats.total_units, 5);
    assert_eq!(stats.translated_units, 5);
    assert_eq!(stats.cached_units, 0);
    assert_eq!(provider.request_count(), 2);
    assert_eq!(cache.len(), 2);
    for block in [
        BlockRef { page_index: 0, block_index: 0 },
        BlockRef { page_index: 1, block_index: 0 },
        BlockRef { page_index: 1, block_index: 1 },
        BlockRef { page_index: 2, block_index: 0 },
    ] {
        assert_eq!(translated(&document, block), Some("[TRANSLATED] Abstract"), "{}", block);
    }
    assert_eq!(
        translated(&document, BlockRef { page_index: 0, block_index: 1 }),
        Some("[TRANSLATED] Introduction")
    );
}

#[tokio::test]
async fn test_translateDocument_withRepeatedFailingText_shouldRecordEveryBlock() {
    let provider = MockProvider::fail_when_contains("Abstract", ProviderError::Auth("denied".to_string()));
    let document = Document::new(vec![Page::new(0, vec![
        Block::text(&["Abstract"]),
        Block::text(&["Results"]),
        Block::text(&["Abstract"]),
    ])]);

    let (_, stats) = common::uncached_pipeline(&provider)
        .translate_document(document, "zh", None)
        .await
        .unwrap();

    assert_eq!(provider.request_count(), 2);
    let failed: Vec<BlockRef> = stats.failures.iter().map(|f| f.block).collect();
    assert_eq!(
        failed,
        vec![
            BlockRef { page_index: 0, block_index: 0 },
            BlockRef { page_index: 0, block_index: 2 },
        ]
    );
    assert!(stats.failures.iter().all(|f| f.kind == FailureKind::Auth));
}

#[tokio::test]
async fn test_translateDocument_withBrokenCache_shouldTranslateAnyway() {
    common::init_logging();
    let provider = MockProvider::working();
    let cache = Arc::new(BrokenCache {
        calls: AtomicUsize::new(0),
    });
    let pipeline = common::pipeline_with(&provider, cache.clone(), common::fast_pipeline_options());

    let (_, stats) = pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(stats.translated_units, 3);
    assert_eq!(cache.calls.load(Ordering::SeqCst), 6);
}

#[tokio::test]
async fn test_translateDocument_withProgressCallback_shouldReportEveryUnit() {
    let provider = MockProvider::working();
    let reports = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = Arc::clone(&reports);
    let pipeline = common::uncached_pipeline(&provider).clone_with_progress(Arc::new(
        move |completed: usize, total: usize| sink.lock().push((completed, total)),
    ));

    pipeline
        .translate_document(common::sample_document(), "zh", None)
        .await
        .unwrap();

    assert_eq!(*reports.lock(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_translateFile_shouldWriteLanguageSuffixedOutput() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::write_document(dir.path(), "paper.json", &common::sample_document()).unwrap();
    let provider = MockProvider::working();
    let pipeline = common::uncached_pipeline(&provider);

    let (output, stats) = pipeline.translate_file(&input, None, "zh", None).await.unwrap();

    assert_eq!(output, dir.path().join("paper_zh.json"));
    assert_eq!(stats.translated_units, 3);
    let written = Document::load(&output).unwrap();
    assert_eq!(written.translated_block_count(), 3);
    assert_eq!(
        written.block(TITLE).and_then(|b| b.translated_text.as_deref()),
        Some("[TRANSLATED] Attention Is All You Need")
    );
}

#[tokio::test]
async fn test_translateFile_withInvalidJson_shouldFailBeforeAnyProviderCall() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "broken.json", "{\"pages\": [").unwrap();
    let provider = MockProvider::working();
    let pipeline = common::uncached_pipeline(&provider);

    let result = pipeline.translate_file(&input, None, "zh", None).await;

    assert!(matches!(result, Err(TranslationError::Input(_))));
    assert_eq!(provider.request_count(), 0);
    assert!(!dir.path().join("broken_zh.json").exists());
}
