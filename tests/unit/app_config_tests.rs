/*!
 * Tests for configuration loading and validation
 */

use std::str::FromStr;

use bisub::app_config::{
    AssLayout, Config, GluePolicy, LogLevel, SubtitleFormat, TranslationProvider,
};

#[test]
fn test_deserialize_withMinimalJson_shouldFillDefaults() {
    let config: Config = serde_json::from_str(r#"{"source_language":"ja","target_language":"en"}"#).unwrap();

    assert_eq!(config.translation.provider, TranslationProvider::Ollama);
    assert_eq!(config.translation.common.lines_per_call, 8);
    assert_eq!(config.translation.common.batch_delay_ms, 100);
    assert_eq!(config.segmentation.long_sentence_threshold, 20);
    assert_eq!(config.segmentation.gap_threshold, 0.5);
    assert_eq!(config.segmentation.glue_policy, GluePolicy::MissingLeadingSpace);
    assert_eq!(config.asr.sample_rate, 16000);
    assert_eq!(config.output.subtitle_format, SubtitleFormat::Srt);
    assert_eq!(config.log_level, LogLevel::Info);
    assert!(config.validate().is_ok());
}

#[test]
fn test_charLimit_shouldFollowSourceLanguage() {
    let mut config = Config::default();
    assert_eq!(config.char_limit(), 4500);

    config.source_language = "jpn".to_string();
    assert_eq!(config.char_limit(), 1600);

    config.source_language = "fr".to_string();
    assert_eq!(config.char_limit(), 999);

    config.translation.common.char_limits.insert("fr".to_string(), 2000);
    assert_eq!(config.char_limit(), 2000);
}

#[test]
fn test_deserialize_withSnakeCaseEnums_shouldParse() {
    let json = r#"{
        "source_language": "en",
        "target_language": "zh",
        "segmentation": {"glue_policy": "disabled"},
        "output": {"subtitle_format": "ass", "ass_layout": "dual_track", "only_target": true},
        "translation": {"provider": "google"}
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.segmentation.glue_policy, GluePolicy::Disabled);
    assert_eq!(config.output.subtitle_format, SubtitleFormat::Ass);
    assert_eq!(config.output.ass_layout, AssLayout::DualTrack);
    assert!(config.output.only_target);
    assert_eq!(config.translation.provider, TranslationProvider::Google);
    assert_eq!(config.translation.get_endpoint(), "https://translate.googleapis.com");
}

#[test]
fn test_validate_withUnknownLanguage_shouldFail() {
    let mut config = Config::default();
    config.target_language = "xx".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_withZeroThresholds_shouldFail() {
    let mut config = Config::default();
    config.translation.common.lines_per_call = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.segmentation.gap_threshold = 0.0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.common.default_char_limit = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_hasCredentials_shouldDependOnProvider() {
    let mut config = Config::default();
    assert!(config.translation.has_credentials());

    config.translation.provider = TranslationProvider::Qwen;
    config.translation.active_provider_config_mut().api_key.clear();
    assert!(!config.translation.has_credentials());

    config.translation.active_provider_config_mut().api_key = "sk-test".to_string();
    assert!(config.translation.has_credentials());

    config.translation.provider = TranslationProvider::Google;
    assert!(config.translation.has_credentials());
}

#[test]
fn test_activeProviderConfigMut_shouldOverrideModel() {
    let mut config = Config::default();
    config.translation.provider = TranslationProvider::OpenAI;
    assert_eq!(config.translation.get_model(), "gpt-4o-mini");

    config.translation.active_provider_config_mut().model = "gpt-4o".to_string();
    assert_eq!(config.translation.get_model(), "gpt-4o");
}

#[test]
fn test_providerFromStr_shouldAcceptAliases() {
    assert_eq!(TranslationProvider::from_str("DashScope").unwrap(), TranslationProvider::Qwen);
    assert_eq!(TranslationProvider::from_str("openai").unwrap(), TranslationProvider::OpenAI);
    assert!(TranslationProvider::from_str("anthropic").is_err());
    assert_eq!(SubtitleFormat::from_str("ASS").unwrap(), SubtitleFormat::Ass);
}

#[test]
fn test_serialize_shouldRoundTripDefaults() {
    let json = serde_json::to_string_pretty(&Config::default()).unwrap();
    let config: Config = serde_json::from_str(&json).unwrap();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "zh");
    assert_eq!(config.translation.common.char_limits.get("ja"), Some(&1600));
    assert_eq!(config.paths.asr_dir, "asr");
}
