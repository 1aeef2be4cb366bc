/*!
 * Tests for the file and folder jobs driven by the CLI controller
 */

use layout_translator::Document;
use layout_translator::app_config::Config;
use layout_translator::app_controller::Controller;
use layout_translator::errors::ProviderError;
use layout_translator::providers::mock::MockProvider;

use crate::common;

fn controller_with(provider: &MockProvider) -> Controller {
    Controller::with_translator(Config::default(), common::uncached_pipeline(provider))
}

#[tokio::test]
async fn test_controller_run_shouldTranslateAndSkipExistingOutput() {
    common::init_logging();
    let dir = common::create_temp_dir().unwrap();
    let input = common::write_document(dir.path(), "paper.json", &common::sample_document()).unwrap();
    let provider = MockProvider::working();
    let controller = controller_with(&provider);

    let stats = controller.run(&input, None, None, false).await.unwrap();
    assert_eq!(stats.map(|s| s.translated_units), Some(3));
    assert!(dir.path().join("paper_zh.json").exists());

    let skipped = controller.run(&input, None, None, false).await.unwrap();
    assert!(skipped.is_none());
    assert_eq!(provider.request_count(), 3);

    let forced = controller.run(&input, None, None, true).await.unwrap();
    assert!(forced.is_some());
    assert_eq!(provider.request_count(), 6);
}

#[tokio::test]
async fn test_controller_run_withExplicitOutput_shouldWriteThere() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::write_document(dir.path(), "paper.json", &common::sample_document()).unwrap();
    let output = dir.path().join("out").join("translated.json");
    let controller = controller_with(&MockProvider::working());

    controller.run(&input, Some(output.as_path()), Some("qwen-max"), false).await.unwrap();

    let written = Document::load(&output).unwrap();
    assert_eq!(written.translated_block_count(), 3);
    assert!(!dir.path().join("paper_zh.json").exists());
}

#[test]
fn test_controller_run_withMissingInput_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let controller = controller_with(&MockProvider::working());

    let result = tokio_test::block_on(async {
        controller.run(&dir.path().join("missing.json"), None, None, false).await
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn test_controller_run_whenEveryBlockFails_shouldNotWriteOutput() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::write_document(dir.path(), "paper.json", &common::sample_document()).unwrap();
    let controller = controller_with(&MockProvider::failing(ProviderError::Auth("denied".to_string())));

    let result = controller.run(&input, None, None, false).await;

    assert!(result.is_err());
    assert!(!dir.path().join("paper_zh.json").exists());
}

#[tokio::test]
async fn test_controller_runFolder_shouldProcessEachDocumentOnce() {
    let dir = common::create_temp_dir().unwrap();
    common::write_document(dir.path(), "first.json", &common::sample_document()).unwrap();
    common::write_document(dir.path(), "second.json", &common::sample_document()).unwrap();
    common::create_test_file(dir.path(), "broken.json", "not json").unwrap();
    let controller = controller_with(&MockProvider::working());

    let summary = controller.run_folder(dir.path(), None, false).await.unwrap();
    assert_eq!(summary.processed.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].ends_with("broken.json"));
    assert!(dir.path().join("first_zh.json").exists());
    assert!(dir.path().join("second_zh.json").exists());

    // Outputs are not picked up as inputs and finished documents are skipped
    let rerun = controller.run_folder(dir.path(), None, false).await.unwrap();
    assert_eq!(rerun.processed.len(), 0);
    assert_eq!(rerun.skipped.len(), 2);
    assert_eq!(rerun.failed.len(), 1);
}

#[tokio::test]
async fn test_controller_runFolder_withEmptyDirectory_shouldFail() {
    let dir = common::create_temp_dir().unwrap();
    let controller = controller_with(&MockProvider::working());

    assert!(controller.run_folder(dir.path(), None, false).await.is_err());
}

#[test]
fn test_controller_withConfig_shouldRejectInvalidConfig() {
    let mut config = Config::default();
    config.translation.common.concurrent_requests = 0;

    assert!(Controller::with_config(config).is_err());
}
