/*!
 * Common test utilities for the bisub test suite
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use anyhow::Result;
use tempfile::TempDir;

use bisub::app_config::Config;
use bisub::subtitle_processor::{SubtitleLine, WordFragment};


static INIT_LOGGING: Once = Once::new();

/// Route `log` output through env_logger (RUST_LOG) once per test binary
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Configuration whose working directories all live under `root`
pub fn workspace_config(root: &Path) -> Config {
    let mut config = Config::default();
    let dir = |name: &str| root.join(name).to_string_lossy().to_string();
    config.paths.video_dir = dir("videos");
    config.paths.audio_dir = dir("audios");
    config.paths.asr_dir = dir("asr");
    config.paths.output_dir = dir("subtitles");
    config
}

/// Fragments from `(text, start, end)` triples
pub fn fragments(words: &[(&str, f64, f64)]) -> Vec<WordFragment> {
    words.iter()
        .map(|(text, start, end)| WordFragment::new(*text, *start, *end))
        .collect()
}

/// A sentence of `count` evenly spaced words, the last one ending with a period
pub fn evenly_spaced_sentence(count: usize, offset: f64) -> Vec<WordFragment> {
    (0..count)
        .map(|i| {
            let start = offset + i as f64 * 0.25;
            let text = if i + 1 == count { format!(" word{}.", i) } else { format!(" word{}", i) };
            WordFragment::new(text, start, start + 0.25)
        })
        .collect()
}

/// `count` one-second subtitle lines
pub fn sample_lines(count: usize) -> Vec<SubtitleLine> {
    (0..count)
        .map(|i| SubtitleLine::new(i as f64, i as f64 + 1.0, format!("Line number {}.", i + 1)))
        .collect()
}
