use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::audio::{self, AudioBuffer};
use crate::errors::TranslationError;
use crate::file_utils::{FileManager, WorkPaths};
use crate::language_utils;
use crate::providers::whisper::WhisperClient;
use crate::providers::{PunctuationRestorer, SpeechRecognizer};
use crate::segmentation::{PunctuationRealigner, SentenceSegmenter};
use crate::subtitle_processor::{split_tagged_segments, SubtitleCollection, WordFragment};
use crate::subtitle_writer::SubtitleMerger;
use crate::translation::{BatchTranslator, TranslationBackend};

// @module: Application controller for subtitle generation

/// Per-run file counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    fn absorb(&mut self, other: RunSummary) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// What happened to one file
enum FileOutcome {
    Done,
    Skipped,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Working directories
    paths: WorkPaths,

    // @field: Speech recognition collaborator
    recognizer: Arc<dyn SpeechRecognizer>,

    // @field: Sentence segmentation, with punctuation repair when available
    segmenter: SentenceSegmenter,

    // @field: Batch translator, `None` when translation is bypassed
    translator: Option<BatchTranslator>,

    // @field: Backend checked once before transcription
    backend: Option<TranslationBackend>,

    // @field: Final subtitle renderer
    merger: SubtitleMerger,

    // @field: Problems recorded for the issues log
    issues: Vec<String>,
}

impl Controller {
    // @method: Build every collaborator from the configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let asr_language = language_utils::normalize_to_part1(&config.source_language).unwrap_or_default();
        let recognizer: Arc<dyn SpeechRecognizer> = Arc::new(WhisperClient::new_with_config(
            config.asr.endpoint.clone(),
            config.asr.api_key.clone(),
            config.asr.model.clone(),
            asr_language,
            config.translation.common.retry_count,
            config.translation.common.retry_backoff_ms,
            config.asr.timeout_secs,
        ));

        let translation = &config.translation;
        let backend = if translation.has_credentials() {
            Some(TranslationBackend::from_config(&config)?)
        } else {
            let reason = TranslationError::Unavailable(format!(
                "no API key for {} (set {})",
                translation.provider.display_name(),
                translation.provider.api_key_env_var().unwrap_or("api_key")
            ));
            warn!("{}, translation will be skipped", reason);
            None
        };

        // The chat service doubles as the punctuation restorer
        let restorer: Option<Arc<dyn PunctuationRestorer>> = match &backend {
            Some(TranslationBackend::Chat(service)) => Some(service.clone()),
            _ => None,
        };

        // Kept even when translating is skipped: punctuation repair still needs it
        let translator = if translation.common.skip_translate {
            None
        } else {
            backend.as_ref().map(|b| b.batch_translator(&config))
        };

        Ok(Self::with_collaborators(config, recognizer, restorer, translator).with_backend(backend))
    }

    /// Build a controller around explicit collaborators
    pub fn with_collaborators(
        config: Config,
        recognizer: Arc<dyn SpeechRecognizer>,
        restorer: Option<Arc<dyn PunctuationRestorer>>,
        translator: Option<BatchTranslator>,
    ) -> Self {
        let mut segmenter = SentenceSegmenter::new(config.segmentation.clone());
        match restorer {
            Some(restorer) if config.segmentation.punctuation_enabled => {
                segmenter = segmenter.with_realigner(PunctuationRealigner::from_config(restorer, &config.segmentation));
            }
            _ => debug!("Punctuation restoration disabled"),
        }

        Self {
            paths: WorkPaths::from_config(&config.paths),
            merger: SubtitleMerger::from_config(&config.output),
            config,
            recognizer,
            segmenter,
            translator,
            backend: None,
            issues: Vec::new(),
        }
    }

    /// Check this backend before transcribing
    pub fn with_backend(mut self, backend: Option<TranslationBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn paths(&self) -> &WorkPaths {
        &self.paths
    }

    /// Generate task: extract, transcribe, segment, translate and merge
    pub async fn run_generate(&mut self, force_overwrite: bool) -> Result<RunSummary> {
        let start_time = Instant::now();
        self.paths.ensure_all()?;
        let multi_progress = MultiProgress::new();
        let mut summary = RunSummary::default();

        if !self.config.paths.input_is_audio {
            summary.absorb(self.extract_all_audio(force_overwrite).await?);
        }

        // Checked up front so a dead chat backend cannot sink punctuation repair
        let translation_ready = self.check_backend().await;
        let stems = self.transcribe_all(&multi_progress, force_overwrite, &mut summary).await?;

        if translation_ready {
            summary.absorb(self.translate_all(&stems, &multi_progress, force_overwrite).await?);
        } else {
            self.write_manual_placeholders(&stems)?;
        }

        self.finish("generate", &summary, start_time.elapsed());
        Ok(summary)
    }

    /// Continue task: merge manually translated `<stem>_<target>.list` files
    pub async fn run_continue(&mut self, force_overwrite: bool) -> Result<RunSummary> {
        let start_time = Instant::now();
        self.paths.ensure_all()?;
        let target = self.config.target_language.clone();
        let mut summary = RunSummary::default();

        let candidates: Vec<(String, PathBuf)> = FileManager::find_files(&self.paths.asr_dir, &["list"])?
            .into_iter()
            .filter_map(|path| WorkPaths::manual_translation_stem(&path, &target).map(|stem| (stem, path)))
            .collect();

        if candidates.is_empty() {
            warn!("No *_{}.list translations found in {}", target, self.paths.asr_dir.display());
        }

        for (stem, translation_file) in candidates {
            match self.continue_file(&stem, &translation_file, force_overwrite) {
                Ok(FileOutcome::Done) => summary.processed += 1,
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Err(e) => self.record_failure(&stem, &e, &mut summary),
            }
        }

        self.finish("continue", &summary, start_time.elapsed());
        Ok(summary)
    }

    async fn extract_all_audio(&mut self, force_overwrite: bool) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let videos = FileManager::find_files(&self.paths.video_dir, &self.config.paths.video_extensions)?;
        if videos.is_empty() {
            warn!("No videos found in {}", self.paths.video_dir.display());
        }

        for video in videos {
            let stem = FileManager::stem(&video);
            if !force_overwrite && self.audio_for_stem(&stem)?.is_some() {
                debug!("Audio for {} already present", stem);
                continue;
            }
            if let Err(e) = audio::extract_audio(&video, &self.paths.audio_dir).await {
                self.record_failure(&stem, &e, &mut summary);
            }
        }
        Ok(summary)
    }

    fn audio_for_stem(&self, stem: &str) -> Result<Option<PathBuf>> {
        Ok(FileManager::find_files(&self.paths.audio_dir, &self.config.paths.audio_extensions)?
            .into_iter()
            .find(|path| FileManager::stem(path) == stem))
    }

    /// Transcribe and segment every audio in scope, returning the stems considered
    async fn transcribe_all(
        &mut self,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
        summary: &mut RunSummary,
    ) -> Result<Vec<String>> {
        let audio_files = FileManager::find_files(&self.paths.audio_dir, &self.config.paths.audio_extensions)?;

        let video_stems: BTreeSet<String> = if self.config.paths.input_is_audio {
            BTreeSet::new()
        } else {
            FileManager::find_files(&self.paths.video_dir, &self.config.paths.video_extensions)?
                .iter()
                .map(FileManager::stem)
                .collect()
        };

        let in_scope: Vec<PathBuf> = audio_files.into_iter()
            .filter(|path| self.config.paths.input_is_audio || video_stems.contains(&FileManager::stem(path)))
            .collect();

        let files_pb = multi_progress.add(ProgressBar::new(in_scope.len() as u64));
        files_pb.set_style(progress_style("files"));
        files_pb.set_message("Transcribing");

        let mut stems = Vec::new();
        for audio_file in in_scope {
            let stem = FileManager::stem(&audio_file);
            files_pb.set_message(format!("Transcribing: {}", stem));

            let line_file = self.paths.line_file(&stem);
            if line_file.exists() && !force_overwrite {
                debug!("{} already segmented", stem);
            } else {
                match self.transcribe_file(&audio_file, &line_file).await {
                    Ok(count) => info!("{}: {} lines written to {}", stem, count, line_file.display()),
                    Err(e) => {
                        self.record_failure(&stem, &e, summary);
                        files_pb.inc(1);
                        continue;
                    }
                }
            }
            stems.push(stem);
            files_pb.inc(1);
        }

        files_pb.finish_and_clear();
        Ok(stems)
    }

    async fn transcribe_file(&self, audio_file: &Path, line_file: &Path) -> Result<usize> {
        let buffer = audio::decode_audio(audio_file, self.config.asr.sample_rate).await?;
        let fragments = self.transcribe_buffer(&buffer).await?;
        self.segment_to_file(fragments, audio_file, line_file).await
    }

    async fn transcribe_buffer(&self, buffer: &AudioBuffer) -> Result<Vec<WordFragment>> {
        let prompt = self.config.asr.prompt.as_deref();
        let fragments = audio::transcribe_slice(self.recognizer.as_ref(), buffer, 0.0, buffer.duration(), prompt)
            .await
            .context("Speech recognition failed")?;
        if fragments.is_empty() {
            return Err(anyhow!("Speech recognition returned no words"));
        }
        Ok(fragments)
    }

    /// Segment fragments and persist the intermediate line file
    pub async fn segment_to_file(&self, fragments: Vec<WordFragment>, origin: &Path, line_file: &Path) -> Result<usize> {
        let lines = self.segmenter.segment(fragments).await
            .context("Segmentation failed")?;
        let collection = SubtitleCollection::new(origin.to_path_buf(), lines);
        collection.write_line_file(line_file)?;
        Ok(collection.lines.len())
    }

    /// Check the backend once. When it cannot be reached, translation is
    /// bypassed and punctuation repair falls back to raw recognizer text.
    /// Returns whether the translation stage should run.
    pub async fn check_backend(&mut self) -> bool {
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.test_connection().await {
                let reason = TranslationError::Unavailable(format!("provider unreachable: {}", e));
                warn!("{}, translation and punctuation repair will be skipped", reason);
                self.issues.push(reason.to_string());
                self.translator = None;
                self.backend = None;
                if self.segmenter.has_realigner() {
                    self.segmenter = SentenceSegmenter::new(self.config.segmentation.clone());
                }
                return false;
            }
        }
        self.translator.is_some()
    }

    async fn translate_all(
        &mut self,
        stems: &[String],
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let files_pb = multi_progress.add(ProgressBar::new(stems.len() as u64));
        files_pb.set_style(progress_style("files"));

        for stem in stems {
            files_pb.set_message(format!("Translating: {}", stem));
            match self.translate_file(stem, multi_progress, force_overwrite).await {
                Ok(FileOutcome::Done) => summary.processed += 1,
                Ok(FileOutcome::Skipped) => summary.skipped += 1,
                Err(e) => self.record_failure(stem, &e, &mut summary),
            }
            files_pb.inc(1);
        }

        files_pb.finish_and_clear();
        Ok(summary)
    }

    async fn translate_file(&mut self, stem: &str, multi_progress: &MultiProgress, force_overwrite: bool) -> Result<FileOutcome> {
        let line_file = self.paths.line_file(stem);
        let output = self.paths.subtitle_file(stem, self.merger.format());
        if output.exists() && !force_overwrite {
            debug!("{} already exists", output.display());
            return Ok(FileOutcome::Skipped);
        }
        let translator = self.translator.as_ref()
            .ok_or_else(|| anyhow!("Translation is not available"))?;

        let collection = SubtitleCollection::read_line_file(&line_file)?;
        if collection.lines.is_empty() {
            return Err(anyhow!("{} holds no lines", line_file.display()));
        }
        let line_count = collection.lines.len();

        let batch_pb = multi_progress.add(ProgressBar::new(0));
        batch_pb.set_style(progress_style("batches"));
        let (lines, report) = translator
            .translate_with_progress(collection.lines, |done, total| {
                batch_pb.set_length(total as u64);
                batch_pb.set_position(done as u64);
            })
            .await
            .with_context(|| format!("Translation of {} failed", stem))?;
        batch_pb.finish_and_clear();

        if lines.len() != line_count {
            return Err(anyhow!("Line count changed during translation: {} -> {}", line_count, lines.len()));
        }
        if !report.is_clean() {
            let message = format!(
                "{}: {} placeholder lines, {} extra segments dropped",
                stem, report.placeholders, report.truncated
            );
            warn!("{}", message);
            self.issues.push(message);
        }

        let translated = SubtitleCollection::new(line_file, lines);
        self.persist_and_merge(stem, &translated, &output)?;
        Ok(FileOutcome::Done)
    }

    /// Write empty `<stem>_<target>.list` files for manual translation
    fn write_manual_placeholders(&mut self, stems: &[String]) -> Result<()> {
        warn!(
            "Translation skipped; fill in {}/<name>_{}.list and run `continue`",
            self.paths.asr_dir.display(),
            self.config.target_language
        );
        for stem in stems {
            let placeholder = self.paths.manual_translation_file(stem, &self.config.target_language);
            if !placeholder.exists() {
                FileManager::write_to_file(&placeholder, "")?;
                debug!("Created {}", placeholder.display());
            }
        }
        Ok(())
    }

    fn continue_file(&mut self, stem: &str, translation_file: &Path, force_overwrite: bool) -> Result<FileOutcome> {
        let line_file = self.paths.line_file(stem);
        let output = self.paths.subtitle_file(stem, self.merger.format());

        if !line_file.exists() {
            warn!("{}: no {} to pair with, skipping", stem, line_file.display());
            return Ok(FileOutcome::Skipped);
        }
        if output.exists() && !force_overwrite {
            debug!("{} already exists", output.display());
            return Ok(FileOutcome::Skipped);
        }

        let raw = SubtitleCollection::read_line_file(&line_file)?;
        let translation = FileManager::read_to_string(translation_file)?;
        let segments = split_tagged_segments(&translation);

        if segments.len() != raw.lines.len() {
            let message = format!(
                "{}: {} translated segments for {} lines, skipping",
                stem, segments.len(), raw.lines.len()
            );
            warn!("{}", message);
            self.issues.push(message);
            return Ok(FileOutcome::Skipped);
        }

        let lines = raw.lines.into_iter()
            .zip(segments)
            .map(|(line, segment)| line.with_target(segment.text))
            .collect();
        let paired = SubtitleCollection::new(line_file, lines);
        self.persist_and_merge(stem, &paired, &output)?;
        Ok(FileOutcome::Done)
    }

    fn persist_and_merge(&mut self, stem: &str, collection: &SubtitleCollection, output: &Path) -> Result<()> {
        let bilingual = self.paths.bilingual_file(stem);
        collection.write_bilingual_file(&bilingual)?;

        let merge = self.merger.merge_file(&bilingual, output)?;
        if merge.skipped > 0 {
            self.issues.push(format!("{}: {} unreadable lines skipped while merging", stem, merge.skipped));
        }
        info!("Success: {}", output.display());
        Ok(())
    }

    fn record_failure(&mut self, stem: &str, e: &anyhow::Error, summary: &mut RunSummary) {
        error!("Error processing {}: {:#}", stem, e);
        self.issues.push(format!("{}: {:#}", stem, e));
        summary.failed += 1;
    }

    fn finish(&mut self, task: &str, summary: &RunSummary, duration: Duration) {
        info!(
            "{} completed in {}: {} processed, {} skipped, {} errors",
            task, Self::format_duration(duration), summary.processed, summary.skipped, summary.failed
        );

        if self.issues.is_empty() {
            return;
        }
        let log_path = self.paths.issues_log();
        let header = format!("== {} run: {} issue(s)", task, self.issues.len());
        let result = std::iter::once(header.as_str())
            .chain(self.issues.iter().map(String::as_str))
            .try_for_each(|entry| FileManager::append_to_log_file(&log_path, entry));

        match result {
            Ok(()) => info!("Issues written to {}", log_path.display()),
            Err(e) => warn!("Failed to write issues log: {}", e),
        }
        self.issues.clear();
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let minutes = total_seconds / 60;
        let seconds = total_seconds % 60;

        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}

fn progress_style(unit: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!("{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}}", unit))
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{bar:40}] {pos}/{len} {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░")
}
