/*!
 * Mock collaborator implementations for testing.
 *
 * A single `MockProvider` implements every collaborator trait and follows a
 * scripted `MockBehavior`:
 * - `MockProvider::working()` - Echoes tagged input with a `[TRANSLATED] ` prefix
 * - `MockProvider::fixed(text)` - Always answers with the same text
 * - `MockProvider::dropping_line(i)` - Echoes input but loses the i-th tagged line
 * - `MockProvider::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::AudioBuffer;
use crate::errors::ProviderError;
use crate::providers::{LineTranslator, PunctuationRestorer, SpeechRecognizer, TextTranslator};
use crate::subtitle_processor::{split_tagged_segments, WordFragment};

/// Prefix added to every segment by the working mock
pub const MOCK_TRANSLATION_PREFIX: &str = "[TRANSLATED] ";

/// Behavior mode for the mock provider
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Echo each tagged segment back with a translation prefix
    Working,
    /// Always answer with the given text
    Fixed(String),
    /// Echo, but omit the tagged segment at this index
    DropLine { index: usize },
    /// Echo, then append one extra tagged segment
    ExtraLine,
    /// Fail every Nth request
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns empty response
    Empty,
}

/// Mock collaborator for testing recovery behaviour without the network
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every request text received, in order
    requests: Arc<Mutex<Vec<String>>>,
    /// Fragments returned by `transcribe`
    fragments: Vec<WordFragment>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            fragments: Vec::new(),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    pub fn dropping_line(index: usize) -> Self {
        Self::new(MockBehavior::DropLine { index })
    }

    pub fn extra_line() -> Self {
        Self::new(MockBehavior::ExtraLine)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Set the fragments handed out by speech recognition
    pub fn with_fragments(mut self, fragments: Vec<WordFragment>) -> Self {
        self.fragments = fragments;
        self
    }

    /// Number of calls made so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Texts received so far
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Build a tagged response with every segment prefixed
    pub fn echo_tagged(input: &str, skip: Option<usize>) -> String {
        split_tagged_segments(input)
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .map(|(_, seg)| format!("[{}]{}{}", seg.time_key(), MOCK_TRANSLATION_PREFIX, seg.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn respond(&self, input: &str) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(input.to_string());
        }

        match &self.behavior {
            MockBehavior::Working => Ok(Self::echo_tagged(input, None)),

            MockBehavior::Fixed(text) => Ok(text.clone()),

            MockBehavior::DropLine { index } => Ok(Self::echo_tagged(input, Some(*index))),

            MockBehavior::ExtraLine => {
                let mut response = Self::echo_tagged(input, None);
                response.push_str("\n[999.00->999.50]extra");
                Ok(response)
            }

            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(Self::echo_tagged(input, None))
                }
            }

            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),

            MockBehavior::Empty => Ok(String::new()),
        }
    }
}

#[async_trait]
impl LineTranslator for MockProvider {
    async fn translate_lines(&self, tagged_lines: &str) -> Result<String, ProviderError> {
        self.respond(tagged_lines)
    }
}

#[async_trait]
impl TextTranslator for MockProvider {
    async fn translate_text(&self, text: &str) -> Result<String, ProviderError> {
        self.respond(text)
    }
}

#[async_trait]
impl PunctuationRestorer for MockProvider {
    async fn restore_punctuation(&self, text: &str) -> Result<String, ProviderError> {
        match self.behavior {
            // Untagged text: echo it back unchanged
            MockBehavior::Working => {
                self.respond(text)?;
                Ok(text.to_string())
            }
            _ => self.respond(text),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for MockProvider {
    async fn transcribe(
        &self,
        _audio: &AudioBuffer,
        prompt: Option<&str>,
    ) -> Result<Vec<WordFragment>, ProviderError> {
        self.respond(prompt.unwrap_or(""))?;
        Ok(self.fragments.clone())
    }
}
