/*!
 * Audio extraction and decoding.
 *
 * Both steps shell out to `ffmpeg`, which must be on `PATH`. Decoding reads
 * raw little-endian `f32` PCM from ffmpeg's stdout into an in-memory buffer.
 */

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::errors::ProviderError;
use crate::providers::SpeechRecognizer;
use crate::subtitle_processor::WordFragment;

/// Mono PCM waveform
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    // @field: Samples in [-1.0, 1.0]
    pub samples: Vec<f32>,

    // @field: Samples per second
    pub sample_rate: u32,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Copy out the window between `start` and `end` seconds, clamped to the buffer
    pub fn slice(&self, start: f64, end: f64) -> AudioBuffer {
        let rate = self.sample_rate as f64;
        let len = self.samples.len();
        let from = ((start.max(0.0) * rate).round() as usize).min(len);
        let to = ((end.max(0.0) * rate).round() as usize).clamp(from, len);

        AudioBuffer::new(self.samples[from..to].to_vec(), self.sample_rate)
    }

    /// Build a buffer from raw little-endian `f32` bytes
    pub fn from_f32le_bytes(bytes: &[u8], sample_rate: u32) -> Self {
        let samples = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Self::new(samples, sample_rate)
    }
}

/// Output path of the extracted audio for a video
pub fn audio_path_for(video: &Path, audio_dir: &Path) -> PathBuf {
    let stem = video.file_stem().unwrap_or_default();
    audio_dir.join(stem).with_extension("wav")
}

/// Extract the audio track of `video` to `<audio_dir>/<stem>.wav`
pub async fn extract_audio(video: &Path, audio_dir: &Path) -> Result<PathBuf> {
    let output = audio_path_for(video, audio_dir);
    tokio::fs::create_dir_all(audio_dir)
        .await
        .with_context(|| format!("Failed to create audio directory {}", audio_dir.display()))?;

    info!("Extracting audio from {}", video.display());
    let result = Command::new("ffmpeg")
        .args(["-y", "-loglevel", "error", "-i"])
        .arg(video)
        .args(["-vn", "-acodec", "pcm_s16le"])
        .arg(&output)
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run ffmpeg on {}", video.display()))?;

    if !result.status.success() {
        return Err(anyhow!(
            "ffmpeg failed to extract audio from {}: {}",
            video.display(),
            String::from_utf8_lossy(&result.stderr).trim()
        ));
    }

    debug!("Audio written to {}", output.display());
    Ok(output)
}

/// Decode any ffmpeg-readable file to mono PCM at `sample_rate`
pub async fn decode_audio(path: &Path, sample_rate: u32) -> Result<AudioBuffer> {
    let result = Command::new("ffmpeg")
        .args(["-loglevel", "error", "-i"])
        .arg(path)
        .args(["-f", "f32le", "-ac", "1", "-ar"])
        .arg(sample_rate.to_string())
        .arg("pipe:1")
        .stdin(Stdio::null())
        .output()
        .await
        .with_context(|| format!("Failed to run ffmpeg on {}", path.display()))?;

    if !result.status.success() {
        return Err(anyhow!(
            "ffmpeg failed to decode {}: {}",
            path.display(),
            String::from_utf8_lossy(&result.stderr).trim()
        ));
    }

    let buffer = AudioBuffer::from_f32le_bytes(&result.stdout, sample_rate);
    debug!("Decoded {} ({:.1}s)", path.display(), buffer.duration());
    Ok(buffer)
}

/// Transcribe a window of `audio`, returning fragments on the absolute timeline
pub async fn transcribe_slice(
    recognizer: &dyn SpeechRecognizer,
    audio: &AudioBuffer,
    start: f64,
    end: f64,
    prompt: Option<&str>,
) -> Result<Vec<WordFragment>, ProviderError> {
    let window = audio.slice(start, end);
    let offset = start.max(0.0);
    let fragments = recognizer.transcribe(&window, prompt).await?;

    Ok(fragments
        .into_iter()
        .map(|f| WordFragment::new(f.text, f.start + offset, f.end + offset))
        .collect())
}
