/*!
 * Tests for configuration loading, validation and provider selection
 */

use std::collections::HashMap;

use layout_translator::app_config::{
    CacheBackend, Config, LogLevel, ProviderConfig, ProviderKind, TranslationConfig,
};

use crate::common;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn test_config_default_shouldBeValid() {
    let config = Config::default();

    assert_eq!(config.target_language, "zh");
    assert_eq!(config.translation.common.concurrent_requests, 4);
    assert_eq!(config.cache.backend, CacheBackend::Memory);
    assert_eq!(config.cache.ttl_secs, 86_400);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validate_withInvalidValues_shouldFail() {
    let mut config = Config::default();
    config.target_language = "klingon".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.common.concurrent_requests = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.common.temperature = 3.5;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.providers[0].endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_saveAndLoad_shouldKeepSettings() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let mut config = Config::default();
    config.target_language = "ja".to_string();
    config.cache.backend = CacheBackend::Sqlite;
    config.translation.common.document_timeout_secs = Some(300);
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    assert_eq!(loaded.target_language, "ja");
    assert_eq!(loaded.cache.backend, CacheBackend::Sqlite);
    assert_eq!(loaded.translation.common.document_timeout_secs, Some(300));
}

#[test]
fn test_config_load_withPartialFile_shouldFillDefaults() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        dir.path(),
        "conf.json",
        r#"{"translation": {"providers": [{"name": "claude", "type": "anthropic", "model": "claude-3-haiku-20240307", "api_key": "sk-test"}]}}"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.target_language, "zh");
    assert_eq!(config.translation.providers.len(), 1);
    assert_eq!(config.translation.providers[0].provider_type, ProviderKind::Anthropic);
    assert_eq!(config.translation.common.retry_count, 2);
}

#[test]
fn test_selectProvider_shouldPickFirstProviderWithKey() {
    let config = TranslationConfig::default();
    let env = env_from(&[("OPENAI_API_KEY", "sk-openai")]);

    let selected = config.select_provider_with(&env).unwrap();
    assert_eq!(selected.config.name, "openai");
    assert_eq!(selected.api_key, "sk-openai");

    let env = env_from(&[("OPENAI_API_KEY", "sk-openai"), ("QWEN_API_KEY", "sk-qwen")]);
    assert_eq!(config.select_provider_with(&env).unwrap().config.name, "qwen");
}

#[test]
fn test_selectProvider_withoutKeys_shouldReturnNone() {
    let config = TranslationConfig::default();
    let env = env_from(&[("QWEN_API_KEY", "   ")]);

    assert!(config.select_provider_with(&env).is_none());
}

#[test]
fn test_resolveApiKey_inlineKey_shouldTakePrecedence() {
    let provider = ProviderConfig {
        api_key: " sk-inline ".to_string(),
        ..ProviderConfig::anthropic()
    };
    let env = env_from(&[("ANTHROPIC_API_KEY", "sk-env")]);

    assert_eq!(provider.resolve_api_key(&env).as_deref(), Some("sk-inline"));
}

#[test]
fn test_providerKind_fromStr_shouldBeCaseInsensitive() {
    assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAI);
    assert_eq!("anthropic".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
    assert!("ollama".parse::<ProviderKind>().is_err());
}
