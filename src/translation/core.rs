/*!
 * LLM-backed collaborators and translator selection.
 *
 * `TranslationService` wraps one chat client (Ollama, or any
 * OpenAI-compatible API) and serves both the tagged-line translation and
 * the punctuation-restoration contracts with different system prompts.
 * `TranslationBackend` picks between it and the whole-text Google client
 * according to the configured provider.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{Config, TranslationProvider};
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::google::GoogleTranslator;
use crate::providers::ollama::{ChatRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::{LineTranslator, Provider, PunctuationRestorer};
use super::batch::BatchTranslator;
use super::prompts::PromptTemplate;

// Reasoning models prefix their answer with a <think> block
static THINK_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>.*?</think>").expect("Invalid think block regex")
});

static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^```[a-zA-Z]*\s*$").expect("Invalid code fence regex")
});

/// Chat client variants
#[derive(Debug)]
enum ChatClient {
    Ollama(Ollama),
    OpenAI(OpenAI),
}

/// Chat-model service used for line translation and punctuation restoration
#[derive(Debug)]
pub struct TranslationService {
    client: ChatClient,
    provider: TranslationProvider,
    model: String,
    temperature: f32,
    line_prompt: String,
    punctuation_prompt: String,
}

impl TranslationService {
    /// Create the service for the configured chat provider
    pub fn new(config: &Config) -> Result<Self> {
        let translation = &config.translation;
        let common = &translation.common;
        let provider = translation.provider.clone();

        let client = match provider {
            TranslationProvider::Ollama => ChatClient::Ollama(Ollama::new_with_config(
                translation.get_endpoint(),
                common.retry_count,
                common.retry_backoff_ms,
                translation.get_timeout_secs(),
            )),
            // Qwen goes through DashScope's OpenAI-compatible mode
            TranslationProvider::OpenAI | TranslationProvider::Qwen => ChatClient::OpenAI(OpenAI::new_with_config(
                translation.get_api_key(),
                translation.get_endpoint(),
                common.retry_count,
                common.retry_backoff_ms,
                translation.get_timeout_secs(),
            )),
            TranslationProvider::Google => {
                return Err(anyhow!("{} is not a chat provider", provider.display_name()));
            }
        };

        let source_name = language_utils::get_language_name(&config.source_language)?;
        let target_name = language_utils::get_language_name(&config.target_language)?;

        Ok(Self {
            client,
            model: translation.get_model(),
            temperature: common.temperature,
            line_prompt: PromptTemplate::line_translator().render(&source_name, &target_name),
            punctuation_prompt: PromptTemplate::punctuation_restorer().render(&source_name, &target_name),
            provider,
        })
    }

    pub fn provider(&self) -> &TranslationProvider {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check the chat endpoint answers
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.client {
            ChatClient::Ollama(client) => client.test_connection().await,
            ChatClient::OpenAI(client) => client.test_connection().await,
        }
    }

    /// One system + user round-trip, returning the cleaned reply
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, ProviderError> {
        let reply = match &self.client {
            ChatClient::Ollama(client) => {
                let request = ChatRequest::new(self.model.clone())
                    .add_message("system", system_prompt)
                    .add_message("user", user_text)
                    .temperature(self.temperature);
                let response = client.complete(request).await?;
                Ollama::extract_text(&response)
            }
            ChatClient::OpenAI(client) => {
                let request = OpenAIRequest::new(self.model.clone())
                    .add_message("system", system_prompt)
                    .add_message("user", user_text)
                    .temperature(self.temperature);
                let response = client.complete(request).await?;
                if let Some(usage) = &response.usage {
                    debug!("{} tokens: {} prompt, {} completion",
                        self.provider.display_name(), usage.prompt_tokens, usage.completion_tokens);
                }
                OpenAI::extract_text(&response)
            }
        };

        Ok(Self::clean_response(&reply))
    }

    /// Drop reasoning blocks and markdown fences around a model reply
    pub fn clean_response(reply: &str) -> String {
        let without_think = THINK_BLOCK_REGEX.replace_all(reply, "");
        CODE_FENCE_REGEX.replace_all(&without_think, "").trim().to_string()
    }
}

#[async_trait]
impl LineTranslator for TranslationService {
    async fn translate_lines(&self, tagged_lines: &str) -> Result<String, ProviderError> {
        if tagged_lines.trim().is_empty() {
            return Ok(String::new());
        }
        self.complete(&self.line_prompt, tagged_lines).await
    }
}

#[async_trait]
impl PunctuationRestorer for TranslationService {
    async fn restore_punctuation(&self, text: &str) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        let reply = self.complete(&self.punctuation_prompt, text).await?;
        // A single line is requested; models sometimes wrap anyway
        Ok(reply.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Translator selected from the configuration
#[derive(Debug, Clone)]
pub enum TranslationBackend {
    Chat(Arc<TranslationService>),
    Google(Arc<GoogleTranslator>),
}

impl TranslationBackend {
    /// Build the backend for the configured provider
    pub fn from_config(config: &Config) -> Result<Self> {
        let translation = &config.translation;
        match translation.provider {
            TranslationProvider::Google => {
                let source = language_utils::normalize_to_part1(&config.source_language)?;
                let target = language_utils::normalize_to_part1(&config.target_language)?;
                let client = GoogleTranslator::new(
                    &translation.get_endpoint(),
                    &source,
                    &target,
                    translation.common.retry_count,
                    translation.common.retry_backoff_ms,
                    translation.get_timeout_secs(),
                )?;
                Ok(Self::Google(Arc::new(client)))
            }
            _ => Ok(Self::Chat(Arc::new(TranslationService::new(config)?))),
        }
    }

    /// Check the translator can be reached
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match self {
            Self::Chat(service) => service.test_connection().await,
            Self::Google(client) => client.test_connection().await,
        }
    }

    /// Batch translator in the mode that suits this backend
    pub fn batch_translator(&self, config: &Config) -> BatchTranslator {
        let common = &config.translation.common;
        match self {
            Self::Chat(service) => {
                info!("Translating with {} ({}), {} lines per call",
                    service.provider().display_name(), service.model(), common.lines_per_call);
                BatchTranslator::chunked(service.clone(), common.lines_per_call)
            }
            Self::Google(client) => {
                let char_limit = config.char_limit();
                info!("Translating with Google, {} characters per call", char_limit);
                BatchTranslator::character_budget(
                    client.clone(),
                    char_limit,
                    Duration::from_millis(common.batch_delay_ms),
                )
            }
        }
    }
}
