/*!
 * Tests for the single-text translation client
 */

use std::sync::Arc;
use std::time::Duration;

use layout_translator::errors::{FailureKind, ProviderError};
use layout_translator::providers::mock::MockProvider;
use layout_translator::translation::{
    ClientOptions, ClientOutcome, LlmTranslator, PromptTemplate, Translator,
};

use crate::common;

fn client_for(provider: &MockProvider) -> LlmTranslator {
    LlmTranslator::new(Arc::new(provider.clone()), common::fast_client_options())
}

#[tokio::test]
async fn test_translate_withWorkingProvider_shouldReturnTranslation() {
    let provider = MockProvider::working();
    let client = client_for(&provider);

    let outcome = client.translate("Hello world", "fr", None).await.unwrap();

    assert_eq!(outcome, ClientOutcome::Translated("[TRANSLATED] Hello world".to_string()));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_translate_withWhitespaceInput_shouldSkipWithoutProviderCall() {
    let provider = MockProvider::working();
    let client = client_for(&provider);

    let outcome = client.translate("  \n ", "fr", None).await.unwrap();

    assert_eq!(outcome, ClientOutcome::Skipped("  \n ".to_string()));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translate_withoutProvider_shouldReportUnconfigured() {
    let client = LlmTranslator::unconfigured();

    assert!(!client.is_configured());
    assert_eq!(
        client.translate("Hello", "de", None).await.unwrap(),
        ClientOutcome::Unconfigured
    );
}

#[tokio::test]
async fn test_translate_withEmptyContent_shouldFailWithEmptyResponse() {
    let client = client_for(&MockProvider::empty());

    let result = client.translate("Hello", "fr", None).await;
    assert_eq!(result, Err(ProviderError::EmptyResponse));
}

#[tokio::test]
async fn test_translate_withMissingMessage_shouldFailAsInvalidResponse() {
    let client = client_for(&MockProvider::missing_message());

    let error = client.translate("Hello", "fr", None).await.unwrap_err();
    assert!(matches!(error, ProviderError::MalformedResponse(_)));
    assert_eq!(error.kind(), FailureKind::InvalidResponse);
}

#[tokio::test]
async fn test_translate_withEchoProvider_shouldStillSucceed() {
    common::init_logging();
    let client = client_for(&MockProvider::echo());

    let outcome = client.translate("Transformer", "zh", None).await.unwrap();
    assert_eq!(outcome, ClientOutcome::Translated("Transformer".to_string()));
}

#[tokio::test]
async fn test_translate_withAuthFailure_shouldNotBeRetryable() {
    let client = client_for(&MockProvider::failing(ProviderError::Auth("bad key".to_string())));

    let error = client.translate("Hello", "fr", None).await.unwrap_err();
    assert!(!error.is_retryable());
    assert_eq!(error.kind(), FailureKind::Auth);
}

#[tokio::test]
async fn test_translate_withSlowProvider_shouldTimeOut() {
    let provider = MockProvider::slow(2_000);
    let options = ClientOptions {
        request_timeout: Duration::from_millis(50),
        ..common::fast_client_options()
    };
    let client = LlmTranslator::new(Arc::new(provider), options);

    let error = client.translate("Hello", "fr", None).await.unwrap_err();
    assert!(matches!(error, ProviderError::Timeout(_)));
    assert!(error.is_retryable());
}

#[tokio::test]
async fn test_translate_shouldSendRenderedPromptAndRawText() {
    let provider = MockProvider::working().with_custom_response(|text| format!("<{}>", text));
    let client = client_for(&provider).with_prompt(PromptTemplate::new("Translate into {target_language}."));

    let outcome = client.translate("  Line one  ", "ja", Some("other-model")).await.unwrap();

    // The mock answers with the last user message, so the source text went out untouched
    assert_eq!(outcome, ClientOutcome::Translated("<  Line one  >".to_string()));
}

#[tokio::test]
async fn test_translate_withAlteredMath_shouldStillReturnTranslation() {
    common::init_logging();
    let provider = MockProvider::working().with_custom_response(|_| "值 $x = 1$".to_string());
    let client = client_for(&provider);

    let outcome = client.translate("The value $x=1$", "zh", None).await.unwrap();
    assert_eq!(outcome, ClientOutcome::Translated("值 $x = 1$".to_string()));
}
