/*!
 * Collaborator interfaces and their concrete clients.
 *
 * The pipeline talks to three kinds of external service, each behind a
 * capability trait with a single call:
 * - `SpeechRecognizer`: audio in, timed word fragments out
 * - `PunctuationRestorer`: plain text in, punctuated text out
 * - `LineTranslator` / `TextTranslator`: tagged lines or an opaque blob in, translation out
 *
 * Concrete clients:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI-compatible chat API
 * - Google: keyless web translate endpoint
 * - Whisper: OpenAI-compatible transcription endpoint
 * - Mock: scripted behaviours for tests
 */

use async_trait::async_trait;
use log::{error, warn};
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use crate::audio::AudioBuffer;
use crate::errors::ProviderError;
use crate::subtitle_processor::WordFragment;

/// Common trait for chat-style LLM clients
///
/// Lets the translation service drive any chat backend the same way.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Test the connection to the provider
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Speech recognition collaborator
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Transcribe a waveform into ordered, non-overlapping word fragments.
    ///
    /// `prompt` is an optional domain-vocabulary hint.
    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        prompt: Option<&str>,
    ) -> Result<Vec<WordFragment>, ProviderError>;
}

/// Punctuation restoration collaborator
///
/// The returned word count is not guaranteed to match the input.
#[async_trait]
pub trait PunctuationRestorer: Send + Sync {
    async fn restore_punctuation(&self, text: &str) -> Result<String, ProviderError>;
}

/// Translation collaborator for timestamp-tagged multi-line requests
#[async_trait]
pub trait LineTranslator: Send + Sync {
    /// Translate newline-separated `[start->end]text` lines, keeping the tags
    async fn translate_lines(&self, tagged_lines: &str) -> Result<String, ProviderError>;
}

/// Translation collaborator for opaque text blobs
#[async_trait]
pub trait TextTranslator: Send + Sync {
    async fn translate_text(&self, text: &str) -> Result<String, ProviderError>;
}

/// Run a request, retrying retryable failures with exponential backoff
pub(crate) async fn with_retry<T, F, Fut>(
    label: &str,
    max_retries: u32,
    backoff_base_ms: u64,
    mut request: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_retries => {
                attempt += 1;
                let backoff_ms = backoff_base_ms * (1u64 << (attempt - 1));
                warn!("{} request failed: {} - retry {}/{} in {} ms", label, e, attempt, max_retries, backoff_ms);
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            }
            Err(e) => {
                error!("{} request failed: {}", label, e);
                return Err(e);
            }
        }
    }
}

/// Turn a non-success HTTP response into the matching `ProviderError`
pub(crate) async fn check_status(response: reqwest::Response, label: &str) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    Err(ProviderError::from_status(status.as_u16(), format!("{} ({}): {}", label, status, error_text)))
}

pub mod ollama;
pub mod openai;
pub mod google;
pub mod whisper;
pub mod mock;
