use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Spoken language code (ISO)
    pub source_language: String,

    /// Translation language code (ISO)
    pub target_language: String,

    /// Working directories and file filters
    #[serde(default)]
    pub paths: PathsConfig,

    /// Speech recognition settings
    #[serde(default)]
    pub asr: AsrConfig,

    /// Sentence segmentation settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Final subtitle rendering
    #[serde(default)]
    pub output: OutputConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Qwen through the DashScope OpenAI-compatible endpoint
    Qwen,
    // @provider: Google web translate, whole-text batches
    Google,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Qwen => "Qwen",
            Self::Google => "Google Translate",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Qwen => "qwen".to_string(),
            Self::Google => "google".to_string(),
        }
    }

    // @returns: Whether the provider refuses requests without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Qwen)
    }

    // @returns: Environment variable consulted when no key is configured
    pub fn api_key_env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAI => Some("OPENAI_API_KEY"),
            Self::Qwen => Some("DASHSCOPE_API_KEY"),
            Self::Ollama | Self::Google => None,
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "qwen" | "dashscope" => Ok(Self::Qwen),
            "google" => Ok(Self::Google),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        Self {
            provider_type: provider_type.to_lowercase_string(),
            model: default_model(&provider_type),
            api_key: String::new(),
            endpoint: default_endpoint(&provider_type),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Where inputs, intermediates and outputs live
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PathsConfig {
    // @field: Directory scanned for videos
    #[serde(default = "default_video_dir")]
    pub video_dir: String,

    // @field: Directory for extracted or supplied audio
    #[serde(default = "default_audio_dir")]
    pub audio_dir: String,

    // @field: Directory for intermediate line files
    #[serde(default = "default_asr_dir")]
    pub asr_dir: String,

    // @field: Directory for final subtitle files
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    // @field: Video extensions considered during scanning
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,

    // @field: Audio extensions considered during scanning
    #[serde(default = "default_audio_extensions")]
    pub audio_extensions: Vec<String>,

    // @field: Inputs are audio files, skip extraction
    #[serde(default)]
    pub input_is_audio: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            video_dir: default_video_dir(),
            audio_dir: default_audio_dir(),
            asr_dir: default_asr_dir(),
            output_dir: default_output_dir(),
            video_extensions: default_video_extensions(),
            audio_extensions: default_audio_extensions(),
            input_is_audio: false,
        }
    }
}

/// Speech recognition service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AsrConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_openai_endpoint")]
    pub endpoint: String,

    /// Transcription model
    #[serde(default = "default_asr_model")]
    pub model: String,

    /// API key, falls back to OPENAI_API_KEY
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Domain vocabulary hint passed with every request
    #[serde(default)]
    pub prompt: Option<String>,

    /// Decoding sample rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Request timeout in seconds
    #[serde(default = "default_asr_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            endpoint: default_openai_endpoint(),
            model: default_asr_model(),
            api_key: String::new(),
            prompt: None,
            sample_rate: default_sample_rate(),
            timeout_secs: default_asr_timeout_secs(),
        }
    }
}

/// How the punctuation repair decides a fragment was glued to its predecessor
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GluePolicy {
    /// A fragment without a leading space is merged into the previous one
    #[default]
    MissingLeadingSpace,
    /// Never merge; mismatched buffers are left untouched
    Disabled,
}

/// Sentence segmentation tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    /// Pause between words that forces a line break, in seconds
    #[serde(default = "default_gap_threshold")]
    pub gap_threshold: f64,

    /// Sentences with at least this many fragments get split
    #[serde(default = "default_long_sentence_threshold")]
    pub long_sentence_threshold: usize,

    /// Fragments per punctuation mark above which punctuation is restored
    #[serde(default = "default_punctuation_ratio_threshold")]
    pub punctuation_ratio_threshold: f64,

    /// Merge rule used when restored word count differs
    #[serde(default)]
    pub glue_policy: GluePolicy,

    /// Whether long sentences go through punctuation restoration
    #[serde(default = "default_true")]
    pub punctuation_enabled: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            gap_threshold: default_gap_threshold(),
            long_sentence_threshold: default_long_sentence_threshold(),
            punctuation_ratio_threshold: default_punctuation_ratio_threshold(),
            glue_policy: GluePolicy::default(),
            punctuation_enabled: true,
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Lines per request in tagged-line mode
    #[serde(default = "default_lines_per_call")]
    pub lines_per_call: usize,

    /// Pause between character-budget batches, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Character budget per source language (ISO 639-1 code)
    #[serde(default = "default_char_limits")]
    pub char_limits: BTreeMap<String, usize>,

    /// Character budget for languages missing from `char_limits`
    #[serde(default = "default_char_limit")]
    pub default_char_limit: usize,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Stop after segmentation and leave empty translation files
    #[serde(default)]
    pub skip_translate: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            lines_per_call: default_lines_per_call(),
            batch_delay_ms: default_batch_delay_ms(),
            char_limits: default_char_limits(),
            default_char_limit: default_char_limit(),
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            skip_translate: false,
        }
    }
}

/// Final subtitle file layout
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// Numbered blocks
    #[default]
    Srt,
    /// Styled dialogue events
    Ass,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "ass" => Ok(Self::Ass),
            _ => Err(anyhow!("Invalid subtitle format: {}", s)),
        }
    }
}

/// How bilingual ASS output is arranged
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssLayout {
    /// One event per line, target then source after a style reset
    #[default]
    Inline,
    /// All target events, then all source events
    DualTrack,
}

/// Output rendering configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub subtitle_format: SubtitleFormat,

    /// Emit the translation alone
    #[serde(default)]
    pub only_target: bool,

    #[serde(default)]
    pub ass_layout: AssLayout,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_asr_timeout_secs() -> u64 {
    600
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // doubled on each retry
}

fn default_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}

fn default_gap_threshold() -> f64 {
    0.5
}

fn default_long_sentence_threshold() -> usize {
    20
}

fn default_punctuation_ratio_threshold() -> f64 {
    12.0
}

fn default_lines_per_call() -> usize {
    8
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_char_limits() -> BTreeMap<String, usize> {
    BTreeMap::from([
        ("en".to_string(), 4500),
        ("ja".to_string(), 1600),
    ])
}

fn default_char_limit() -> usize {
    999
}

fn default_sample_rate() -> u32 {
    16000
}

fn default_asr_model() -> String {
    "whisper-1".to_string()
}

fn default_video_dir() -> String {
    "videos".to_string()
}

fn default_audio_dir() -> String {
    "audios".to_string()
}

fn default_asr_dir() -> String {
    "asr".to_string()
}

fn default_output_dir() -> String {
    "subtitles".to_string()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "mkv", "webm", "mov", "avi"].iter().map(|s| s.to_string()).collect()
}

fn default_audio_extensions() -> Vec<String> {
    ["wav", "mp3", "m4a", "flac"].iter().map(|s| s.to_string()).collect()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_endpoint(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "http://localhost:11434".to_string(),
        TranslationProvider::OpenAI => default_openai_endpoint(),
        TranslationProvider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
        TranslationProvider::Google => "https://translate.googleapis.com".to_string(),
    }
}

fn default_model(provider: &TranslationProvider) -> String {
    match provider {
        TranslationProvider::Ollama => "qwen2.5:7b".to_string(),
        TranslationProvider::OpenAI => "gpt-4o-mini".to_string(),
        TranslationProvider::Qwen => "qwen-plus".to_string(),
        TranslationProvider::Google => String::new(),
    }
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        let _source_name = crate::language_utils::get_language_name(&self.source_language)?;
        let _target_name = crate::language_utils::get_language_name(&self.target_language)?;

        let seg = &self.segmentation;
        if !(seg.gap_threshold > 0.0) {
            return Err(anyhow!("segmentation.gap_threshold must be positive"));
        }
        if seg.long_sentence_threshold < 2 {
            return Err(anyhow!("segmentation.long_sentence_threshold must be at least 2"));
        }
        if !(seg.punctuation_ratio_threshold > 0.0) {
            return Err(anyhow!("segmentation.punctuation_ratio_threshold must be positive"));
        }

        let common = &self.translation.common;
        if common.lines_per_call == 0 {
            return Err(anyhow!("translation.common.lines_per_call must be at least 1"));
        }
        if common.default_char_limit == 0 || common.char_limits.values().any(|&limit| limit == 0) {
            return Err(anyhow!("translation character limits must be positive"));
        }
        if self.asr.sample_rate == 0 {
            return Err(anyhow!("asr.sample_rate must be positive"));
        }

        Ok(())
    }

    /// Fill empty API keys from the environment
    pub fn resolve_api_keys(&mut self) {
        if self.asr.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                self.asr.api_key = key;
            }
        }

        let provider = self.translation.provider.clone();
        if let Some(env_var) = provider.api_key_env_var() {
            if self.translation.get_api_key().is_empty() {
                if let Ok(key) = std::env::var(env_var) {
                    self.translation.active_provider_config_mut().api_key = key;
                }
            }
        }
    }

    /// Character budget for the configured source language
    pub fn char_limit(&self) -> usize {
        self.translation.char_limit_for(&self.source_language)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: "en".to_string(),
            target_language: "zh".to_string(),
            paths: PathsConfig::default(),
            asr: AsrConfig::default(),
            segmentation: SegmentationConfig::default(),
            translation: TranslationConfig::default(),
            output: OutputConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Active provider entry, inserted with defaults when missing
    pub fn active_provider_config_mut(&mut self) -> &mut ProviderConfig {
        let provider_str = self.provider.to_lowercase_string();
        let index = match self.available_providers.iter().position(|p| p.provider_type == provider_str) {
            Some(index) => index,
            None => {
                self.available_providers.push(ProviderConfig::new(self.provider.clone()));
                self.available_providers.len() - 1
            }
        };
        &mut self.available_providers[index]
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        self.get_active_provider_config()
            .filter(|p| !p.model.is_empty())
            .map(|p| p.model.clone())
            .unwrap_or_else(|| default_model(&self.provider))
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        self.get_active_provider_config()
            .filter(|p| !p.endpoint.is_empty())
            .map(|p| p.endpoint.clone())
            .unwrap_or_else(|| default_endpoint(&self.provider))
    }

    /// Get the request timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        self.get_active_provider_config()
            .map(|p| p.timeout_secs)
            .unwrap_or_else(default_timeout_secs)
    }

    /// Whether the active provider can be called at all
    pub fn has_credentials(&self) -> bool {
        !self.provider.requires_api_key() || !self.get_api_key().is_empty()
    }

    /// Character budget for a source language, accepting any ISO 639 form
    pub fn char_limit_for(&self, language: &str) -> usize {
        let limits = &self.common.char_limits;
        limits.get(language)
            .or_else(|| {
                crate::language_utils::normalize_to_part1(language)
                    .ok()
                    .and_then(|code| limits.get(&code))
            })
            .copied()
            .unwrap_or(self.common.default_char_limit)
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::Ollama),
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Qwen),
                ProviderConfig::new(TranslationProvider::Google),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
