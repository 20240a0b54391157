/*!
 * Whisper-compatible speech recognition client.
 *
 * Posts the waveform as a 16-bit mono WAV to `{endpoint}/audio/transcriptions`
 * and asks for `verbose_json` with word-level timestamps.
 */

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

use crate::audio::AudioBuffer;
use crate::errors::ProviderError;
use crate::providers::{check_status, with_retry, SpeechRecognizer};
use crate::subtitle_processor::WordFragment;

/// Whisper-compatible transcription client
#[derive(Debug)]
pub struct WhisperClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    // @field: ISO 639-1 language hint, empty to let the service detect it
    language: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TranscriptionWord {
    word: String,
    start: f64,
    end: f64,
}

/// The subset of a `verbose_json` transcription we read
#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    words: Vec<TranscriptionWord>,
}

impl TranscriptionResponse {
    /// Word fragments with a leading separating space on every word
    pub fn into_fragments(self) -> Vec<WordFragment> {
        self.words
            .into_iter()
            .filter(|w| !w.word.trim().is_empty())
            .map(|w| WordFragment::new(normalize_word(&w.word), w.start, w.end.max(w.start)))
            .collect()
    }
}

/// Whisper returns words either bare or space-prefixed; the segmenter expects the prefix.
/// A bare word starting with a hyphen or dot stays glued to its predecessor.
fn normalize_word(word: &str) -> String {
    if word.starts_with(char::is_whitespace) {
        format!(" {}", word.trim_start())
    } else if word.starts_with(['-', '.']) {
        word.to_string()
    } else {
        format!(" {}", word)
    }
}

/// Encode a waveform as 16-bit mono WAV bytes
pub fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>, ProviderError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec)
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to start WAV encoding: {}", e)))?;
        for sample in &audio.samples {
            let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(value)
                .map_err(|e| ProviderError::RequestFailed(format!("Failed to encode WAV sample: {}", e)))?;
        }
        writer.finalize()
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to finish WAV encoding: {}", e)))?;
    }
    Ok(cursor.into_inner())
}

impl WhisperClient {
    pub fn new_with_config(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        language: impl Into<String>,
        max_retries: u32,
        backoff_base_ms: u64,
        timeout_secs: u64,
    ) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            language: language.into(),
            max_retries,
            backoff_base_ms,
        }
    }

    fn transcriptions_url(&self) -> String {
        format!("{}/audio/transcriptions", self.endpoint.trim_end_matches('/'))
    }

    fn build_form(&self, wav: Vec<u8>, prompt: Option<&str>) -> Result<Form, ProviderError> {
        let file_part = Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid audio part: {}", e)))?;

        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .part("file", file_part);

        if !self.language.is_empty() {
            form = form.text("language", self.language.clone());
        }
        if let Some(prompt) = prompt.filter(|p| !p.trim().is_empty()) {
            form = form.text("prompt", prompt.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl SpeechRecognizer for WhisperClient {
    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        prompt: Option<&str>,
    ) -> Result<Vec<WordFragment>, ProviderError> {
        let wav = encode_wav(audio)?;
        let url = self.transcriptions_url();
        let url = url.as_str();
        let wav = &wav;

        let response = with_retry("Whisper", self.max_retries, self.backoff_base_ms, || async move {
            // Multipart forms are consumed by send, so each attempt builds its own
            let form = self.build_form(wav.clone(), prompt)?;
            let mut request = self.client.post(url).multipart(form);
            if !self.api_key.is_empty() {
                request = request.bearer_auth(&self.api_key);
            }
            let response = check_status(request.send().await?, "Whisper API error").await?;
            response.json::<TranscriptionResponse>()
                .await
                .map_err(|e| ProviderError::ParseError(format!("Failed to parse transcription: {}", e)))
        })
        .await?;

        let fragments = response.into_fragments();
        debug!("Whisper returned {} words for {:.1}s of audio", fragments.len(), audio.duration());
        Ok(fragments)
    }
}
