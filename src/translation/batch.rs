/*!
 * Batch translation with count recovery.
 *
 * Subtitle lines are sent to the translation collaborator in batches, either
 * a fixed number of tagged lines per call or as many lines as fit a
 * character budget. Whatever comes back, every submitted line leaves with
 * exactly one target text: recovered by timestamp tag where possible,
 * otherwise an explicit placeholder.
 */

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;
use log::{debug, warn};

use crate::errors::ProviderError;
use crate::providers::{LineTranslator, TextTranslator};
use crate::subtitle_processor::{split_tagged_segments, SubtitleLine, TaggedSegment};

/// Target text for a submitted line the collaborator did not return
pub const MISSING_TRANSLATION: &str = "[missing translation]";

/// Target text for lines lost when a whole-text translation came back short
pub const COUNT_MISMATCH: &str = "[translation count mismatch]";

/// How lines are grouped and sent
pub enum TranslationMode {
    /// Fixed number of tagged lines per call, tags expected back
    Chunked {
        translator: Arc<dyn LineTranslator>,
        lines_per_call: usize,
    },
    /// Lines packed up to a character budget, sent as one opaque text
    CharacterBudget {
        translator: Arc<dyn TextTranslator>,
        char_limit: usize,
        delay: Duration,
    },
}

/// Counters describing one translation run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Calls made to the collaborator
    pub batches: usize,
    /// Lines that received a placeholder
    pub placeholders: usize,
    /// Extra segments discarded
    pub truncated: usize,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.placeholders == 0 && self.truncated == 0
    }
}

/// Batch translator for subtitle lines
pub struct BatchTranslator {
    mode: TranslationMode,
}

impl BatchTranslator {
    pub fn new(mode: TranslationMode) -> Self {
        Self { mode }
    }

    pub fn chunked(translator: Arc<dyn LineTranslator>, lines_per_call: usize) -> Self {
        Self::new(TranslationMode::Chunked {
            translator,
            lines_per_call: lines_per_call.max(1),
        })
    }

    pub fn character_budget(translator: Arc<dyn TextTranslator>, char_limit: usize, delay: Duration) -> Self {
        Self::new(TranslationMode::CharacterBudget { translator, char_limit, delay })
    }

    /// Contiguous index ranges sent together
    pub fn plan_batches(&self, lines: &[SubtitleLine]) -> Vec<Range<usize>> {
        match &self.mode {
            TranslationMode::Chunked { lines_per_call, .. } => {
                (0..lines.len())
                    .step_by(*lines_per_call)
                    .map(|start| start..(start + lines_per_call).min(lines.len()))
                    .collect()
            }
            TranslationMode::CharacterBudget { char_limit, .. } => character_batches(lines, *char_limit),
        }
    }

    /// Translate every line, preserving the line count
    pub async fn translate(&self, lines: Vec<SubtitleLine>) -> Result<(Vec<SubtitleLine>, BatchReport), ProviderError> {
        self.translate_with_progress(lines, |_, _| {}).await
    }

    /// Translate every line, reporting `(done, total)` batches after each call
    pub async fn translate_with_progress(
        &self,
        lines: Vec<SubtitleLine>,
        progress_callback: impl Fn(usize, usize),
    ) -> Result<(Vec<SubtitleLine>, BatchReport), ProviderError> {
        let batches = self.plan_batches(&lines);
        let total_batches = batches.len();
        let mut targets: Vec<String> = Vec::with_capacity(lines.len());
        let mut report = BatchReport::default();

        for (batch_index, range) in batches.into_iter().enumerate() {
            let batch = &lines[range.clone()];
            let request = batch.iter()
                .map(SubtitleLine::to_line_record)
                .collect::<Vec<_>>()
                .join("\n");

            let translated = match &self.mode {
                TranslationMode::Chunked { translator, .. } => {
                    let response = translator.translate_lines(&request).await?;
                    align_tagged_response(batch, &split_tagged_segments(&response), &mut report)
                }
                TranslationMode::CharacterBudget { translator, delay, .. } => {
                    if batch_index > 0 && !delay.is_zero() {
                        tokio::time::sleep(*delay).await;
                    }
                    let response = translator.translate_text(&request).await?;
                    pad_text_response(batch, split_tagged_segments(&response), &mut report)
                }
            };

            debug!(
                "Batch {}/{}: lines {}..{} translated",
                batch_index + 1, total_batches, range.start, range.end
            );
            report.batches += 1;
            targets.extend(translated);
            progress_callback(batch_index + 1, total_batches);
        }

        let lines = lines.into_iter()
            .zip(targets)
            .map(|(line, target)| line.with_target(target))
            .collect();
        Ok((lines, report))
    }
}

/// Pack lines into batches, closing a batch once its size exceeds `char_limit`.
///
/// Size is counted in characters of each tagged line plus its newline.
pub fn character_batches(lines: &[SubtitleLine], char_limit: usize) -> Vec<Range<usize>> {
    let mut batches = Vec::new();
    let mut start = 0;
    let mut size = 0;

    for (i, line) in lines.iter().enumerate() {
        size += line.to_line_record().chars().count() + 1;
        if size > char_limit {
            batches.push(start..i + 1);
            start = i + 1;
            size = 0;
        }
    }
    if start < lines.len() {
        batches.push(start..lines.len());
    }
    batches
}

/// Map a tagged response onto submitted lines.
///
/// When the first segments carry exactly the submitted tags in order they
/// are taken positionally and extras dropped. Otherwise every submitted line
/// looks for its own tag forward from the last match; lines without one get
/// `MISSING_TRANSLATION` and segments nobody claimed count as truncated.
pub fn align_tagged_response(
    batch: &[SubtitleLine],
    segments: &[TaggedSegment],
    report: &mut BatchReport,
) -> Vec<String> {
    let in_order = segments.len() >= batch.len()
        && batch.iter().zip(segments).all(|(line, seg)| line.time_key() == seg.time_key());

    if in_order {
        if segments.len() > batch.len() {
            warn!(
                "Translation returned {} segments for {} lines, dropping extras",
                segments.len(), batch.len()
            );
            report.truncated += segments.len() - batch.len();
        }
        return segments.iter()
            .take(batch.len())
            .map(|seg| seg.text.clone())
            .collect();
    }

    warn!(
        "Translation returned {} segments for {} lines out of order, matching by timestamp",
        segments.len(), batch.len()
    );

    let mut cursor = 0;
    let mut matched = 0;
    let texts = batch.iter()
        .map(|line| {
            let key = line.time_key();
            match segments[cursor..].iter().position(|seg| seg.time_key() == key) {
                Some(offset) => {
                    let segment = &segments[cursor + offset];
                    cursor += offset + 1;
                    matched += 1;
                    segment.text.clone()
                }
                None => {
                    warn!("No translation for line [{}] {:?}", key, line.source_text);
                    report.placeholders += 1;
                    MISSING_TRANSLATION.to_string()
                }
            }
        })
        .collect();

    if segments.len() > matched {
        warn!("Discarding {} unmatched translation segments", segments.len() - matched);
        report.truncated += segments.len() - matched;
    }
    texts
}

/// Fit a whole-text response to its batch: extras dropped, missing tail padded
pub fn pad_text_response(
    batch: &[SubtitleLine],
    segments: Vec<TaggedSegment>,
    report: &mut BatchReport,
) -> Vec<String> {
    let returned = segments.len();
    let mut texts: Vec<String> = segments.into_iter()
        .take(batch.len())
        .map(|seg| seg.text)
        .collect();

    if returned != batch.len() {
        warn!("Translation segment count mismatch: {} returned for {} lines", returned, batch.len());
    }
    if returned > batch.len() {
        report.truncated += returned - batch.len();
    }
    while texts.len() < batch.len() {
        texts.push(COUNT_MISMATCH.to_string());
        report.placeholders += 1;
    }
    texts
}
