use anyhow::{Result, Context};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use std::fs::OpenOptions;
use std::io::Write;
use chrono::Local;

use crate::app_config::{PathsConfig, SubtitleFormat};

// @module: File and directory utilities

// @const: Audit trail of per-file problems, kept in the output directory
pub const ISSUES_LOG_NAME: &str = "bisub.issues.log";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {:?}", path))?;
        }
        Ok(())
    }

    /// Files directly inside `dir` whose extension is one of `extensions`, sorted by path.
    ///
    /// Extensions match case-insensitively, with or without a leading dot.
    /// A missing directory yields no files.
    pub fn find_files<P: AsRef<Path>, S: AsRef<str>>(dir: P, extensions: &[S]) -> Result<Vec<PathBuf>> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let wanted: Vec<String> = extensions.iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .collect();

        let mut result = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if wanted.iter().any(|w| *w == ext) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// File name without extension
    pub fn stem<P: AsRef<Path>>(path: P) -> String {
        path.as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Append content to a log file with timestamp
    pub fn append_to_log_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {:?}", path.as_ref()))?;

        writeln!(file, "[{}] {}", timestamp, content)
            .with_context(|| format!("Failed to write to log file: {:?}", path.as_ref()))?;

        Ok(())
    }
}

/// Where every artefact of one input lives
#[derive(Debug, Clone, PartialEq)]
pub struct WorkPaths {
    pub video_dir: PathBuf,
    pub audio_dir: PathBuf,
    pub asr_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl WorkPaths {
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self {
            video_dir: PathBuf::from(&paths.video_dir),
            audio_dir: PathBuf::from(&paths.audio_dir),
            asr_dir: PathBuf::from(&paths.asr_dir),
            output_dir: PathBuf::from(&paths.output_dir),
        }
    }

    /// Segmented source lines: `<asr_dir>/<stem>.list`
    pub fn line_file(&self, stem: &str) -> PathBuf {
        self.asr_dir.join(format!("{}.list", stem))
    }

    /// Paired records: `<asr_dir>/<stem>.bilingual.list`
    pub fn bilingual_file(&self, stem: &str) -> PathBuf {
        self.asr_dir.join(format!("{}.bilingual.list", stem))
    }

    /// Manual translation placeholder: `<asr_dir>/<stem>_<target>.list`
    pub fn manual_translation_file(&self, stem: &str, target_language: &str) -> PathBuf {
        self.asr_dir.join(format!("{}_{}.list", stem, target_language))
    }

    /// Final subtitle: `<output_dir>/<stem>.<srt|ass>`
    pub fn subtitle_file(&self, stem: &str, format: SubtitleFormat) -> PathBuf {
        self.output_dir.join(format!("{}.{}", stem, format.extension()))
    }

    pub fn issues_log(&self) -> PathBuf {
        self.output_dir.join(ISSUES_LOG_NAME)
    }

    /// Stem of a manual translation file for `target_language`, if `path` is one
    pub fn manual_translation_stem(path: &Path, target_language: &str) -> Option<String> {
        let suffix = format!("_{}", target_language);
        let name = path.file_name()?.to_str()?;
        let stem = name.strip_suffix(".list")?.strip_suffix(&suffix)?;
        (!stem.is_empty()).then(|| stem.to_string())
    }

    /// Create every working directory
    pub fn ensure_all(&self) -> Result<()> {
        for dir in [&self.audio_dir, &self.asr_dir, &self.output_dir] {
            FileManager::ensure_dir(dir)?;
        }
        Ok(())
    }
}
