/*!
 * Final subtitle rendering.
 *
 * Bilingual records (`[start->end]source@@@target`) are parsed back, then
 * rendered either as numbered SRT blocks or as ASS dialogue events. A record
 * that cannot be parsed, even after stripping zero-width spaces, is skipped
 * with a warning and the rest of the file is still written.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use std::path::Path;

use crate::app_config::{AssLayout, OutputConfig, SubtitleFormat};
use crate::file_utils::FileManager;
use crate::subtitle_processor::{format_ass_timestamp, format_srt_timestamp, SubtitleLine};

/// Script header with one style per language track
pub const ASS_HEADER: &str = "[Script Info]
ScriptType: v4.00+
PlayResX: 1920
PlayResY: 1080
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Target,Arial,64,&H00FFFFFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,2,1,2,20,20,70,1
Style: Source,Arial,44,&H0000DDFF,&H000000FF,&H00000000,&H80000000,0,0,0,0,100,100,0,0,1,2,1,2,20,20,20,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

const TARGET_STYLE: &str = "Target";
const SOURCE_STYLE: &str = "Source";

/// Outcome of merging one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeSummary {
    /// Lines rendered
    pub written: usize,
    /// Records skipped as unparseable
    pub skipped: usize,
}

/// Renders aligned lines into the configured subtitle layout
#[derive(Debug, Clone)]
pub struct SubtitleMerger {
    format: SubtitleFormat,
    only_target: bool,
    ass_layout: AssLayout,
}

impl SubtitleMerger {
    pub fn new(format: SubtitleFormat, only_target: bool, ass_layout: AssLayout) -> Self {
        Self { format, only_target, ass_layout }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(config.subtitle_format, config.only_target, config.ass_layout)
    }

    pub fn format(&self) -> SubtitleFormat {
        self.format
    }

    /// Parse bilingual records, skipping blank and unreadable ones.
    ///
    /// `origin` names the file in warnings.
    pub fn parse_records<'a>(
        records: impl IntoIterator<Item = &'a str>,
        origin: &str,
    ) -> (Vec<SubtitleLine>, usize) {
        let mut lines = Vec::new();
        let mut skipped = 0;

        for (index, record) in records.into_iter().enumerate() {
            if record.trim().is_empty() {
                continue;
            }
            match SubtitleLine::parse_bilingual_lenient(record) {
                Ok(line) => lines.push(line),
                Err(e) => {
                    warn!("{}: skipping line {}: {}", origin, index + 1, e);
                    skipped += 1;
                }
            }
        }
        (lines, skipped)
    }

    /// Render lines into a complete subtitle document
    pub fn render(&self, lines: &[SubtitleLine]) -> String {
        match self.format {
            SubtitleFormat::Srt => self.render_srt(lines),
            SubtitleFormat::Ass => self.render_ass(lines),
        }
    }

    fn render_srt(&self, lines: &[SubtitleLine]) -> String {
        let mut output = String::new();

        for (index, line) in lines.iter().enumerate() {
            let target = line.target_text.as_deref().unwrap_or("").trim();
            let source = line.source_text.trim();

            output.push_str(&format!(
                "{}\n{} --> {}\n",
                index + 1,
                format_srt_timestamp(line.start),
                format_srt_timestamp(line.end)
            ));
            // An untranslated line falls back to its source rather than an empty cue
            if target.is_empty() {
                output.push_str(&format!("{}\n", source));
            } else if self.only_target {
                output.push_str(&format!("{}\n", target));
            } else {
                output.push_str(&format!("{}\n{}\n", target, source));
            }
            output.push('\n');
        }

        output
    }

    fn render_ass(&self, lines: &[SubtitleLine]) -> String {
        let mut output = String::from(ASS_HEADER);

        let target_of = |line: &SubtitleLine| line.target_text.clone().unwrap_or_default();

        if self.only_target {
            for line in lines {
                match target_of(line).trim() {
                    "" => push_dialogue(&mut output, line, SOURCE_STYLE, line.source_text.trim()),
                    target => push_dialogue(&mut output, line, TARGET_STYLE, target),
                }
            }
            return output;
        }

        match self.ass_layout {
            AssLayout::Inline => {
                for line in lines {
                    let text = format!("{}\\N{{\\r{}}}{}", target_of(line).trim(), SOURCE_STYLE, line.source_text.trim());
                    push_dialogue(&mut output, line, TARGET_STYLE, &text);
                }
            }
            // Two independent tracks: every target event, then every source event
            AssLayout::DualTrack => {
                for line in lines {
                    push_dialogue(&mut output, line, TARGET_STYLE, target_of(line).trim());
                }
                for line in lines {
                    push_dialogue(&mut output, line, SOURCE_STYLE, line.source_text.trim());
                }
            }
        }

        output
    }

    /// Parse and render bilingual records
    pub fn merge_records<'a>(
        &self,
        records: impl IntoIterator<Item = &'a str>,
        origin: &str,
    ) -> (String, MergeSummary) {
        let (lines, skipped) = Self::parse_records(records, origin);
        let summary = MergeSummary { written: lines.len(), skipped };
        (self.render(&lines), summary)
    }

    /// Merge a bilingual intermediate file into the final subtitle file
    pub fn merge_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, bilingual: P, output: Q) -> Result<MergeSummary> {
        let bilingual = bilingual.as_ref();
        let content = FileManager::read_to_string(bilingual)?;
        let origin = bilingual.display().to_string();

        let (rendered, summary) = self.merge_records(content.lines(), &origin);
        FileManager::write_to_file(output.as_ref(), &rendered)
            .with_context(|| format!("Failed to write subtitle for {}", origin))?;

        debug!("Wrote {} lines to {} ({} skipped)", summary.written, output.as_ref().display(), summary.skipped);
        Ok(summary)
    }
}

fn push_dialogue(output: &mut String, line: &SubtitleLine, style: &str, text: &str) {
    output.push_str(&format!(
        "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
        format_ass_timestamp(line.start),
        format_ass_timestamp(line.end),
        style,
        text
    ));
}
