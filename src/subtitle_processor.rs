use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: Subtitle line model and the timestamp-tag line format

// @const: Whole-line record `[start->end]text`
static LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(\d+\.\d+)->(\d+\.\d+)\](.*)$").expect("Invalid line regex")
});

// @const: Bare `[start->end]` tag, used to split collaborator output
static TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(\d+\.\d+)->(\d+\.\d+)\]").expect("Invalid tag regex")
});

/// Separator between source and target text in a bilingual record
pub const BILINGUAL_SEPARATOR: &str = "@@@";

/// Zero-width space occasionally injected by translation providers
pub const ZERO_WIDTH_SPACE: char = '\u{200b}';

// @struct: One time-stamped word unit from speech recognition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordFragment {
    // @field: Word text, carrying its own leading space
    pub text: String,

    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,
}

impl WordFragment {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self { text: text.into(), start, end }
    }

    /// Concatenate fragment texts into display text
    pub fn join_text(fragments: &[WordFragment]) -> String {
        fragments.iter()
            .map(|f| f.text.as_str())
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Last character of the fragment text, ignoring trailing whitespace
    pub fn last_char(&self) -> Option<char> {
        self.text.trim_end().chars().last()
    }
}

// @struct: Time-ranged unit of display text
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLine {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Text in the spoken language
    pub source_text: String,

    // @field: Translated text, once available
    pub target_text: Option<String>,
}

impl SubtitleLine {
    pub fn new(start: f64, end: f64, source_text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            source_text: source_text.into(),
            target_text: None,
        }
    }

    /// Build a line spanning the given fragments
    pub fn from_fragments(fragments: &[WordFragment]) -> Option<Self> {
        let first = fragments.first()?;
        let last = fragments.last()?;
        Some(Self::new(first.start, last.end, WordFragment::join_text(fragments)))
    }

    pub fn with_target(mut self, target_text: impl Into<String>) -> Self {
        self.target_text = Some(target_text.into());
        self
    }

    /// The `start->end` literal shared by every tagged representation of this line
    pub fn time_key(&self) -> String {
        format_time_key(self.start, self.end)
    }

    /// `[start->end]source`
    pub fn to_line_record(&self) -> String {
        format!("[{}]{}", self.time_key(), single_line(&self.source_text))
    }

    /// `[start->end]source@@@target`, each side collapsed onto one line
    pub fn to_bilingual_record(&self) -> String {
        format!(
            "[{}]{}{}{}",
            self.time_key(),
            single_line(&self.source_text),
            BILINGUAL_SEPARATOR,
            single_line(self.target_text.as_deref().unwrap_or(""))
        )
    }

    /// Parse a bilingual record `[start->end]source@@@target`
    pub fn parse_bilingual(line: &str) -> Result<Self, SubtitleError> {
        let timed = TimedLine::parse(line)?;
        let (source, target) = timed.text
            .rsplit_once(BILINGUAL_SEPARATOR)
            .ok_or_else(|| SubtitleError::MissingSeparator(line.to_string()))?;

        Ok(Self {
            start: timed.start,
            end: timed.end,
            source_text: source.to_string(),
            target_text: Some(target.to_string()),
        })
    }

    /// Parse a bilingual record, retrying once with zero-width spaces removed.
    ///
    /// Zero-width spaces never survive into the parsed texts.
    pub fn parse_bilingual_lenient(line: &str) -> Result<Self, SubtitleError> {
        let mut parsed = parse_with_retry(line, Self::parse_bilingual)?;
        parsed.source_text = strip_zero_width(&parsed.source_text);
        parsed.target_text = parsed.target_text.map(|t| strip_zero_width(&t));
        Ok(parsed)
    }
}

impl From<TimedLine> for SubtitleLine {
    fn from(timed: TimedLine) -> Self {
        Self::new(timed.start, timed.end, timed.text)
    }
}

// @struct: Typed result of reading one `[start->end]text` record
#[derive(Debug, Clone, PartialEq)]
pub struct TimedLine {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TimedLine {
    /// Parse `[start->end]text`; surrounding whitespace is ignored
    pub fn parse(line: &str) -> Result<Self, SubtitleError> {
        let trimmed = line.trim();
        let caps = LINE_REGEX.captures(trimmed)
            .ok_or_else(|| SubtitleError::MalformedLine(line.to_string()))?;

        let start = parse_seconds(&caps[1], line)?;
        let end = parse_seconds(&caps[2], line)?;

        Ok(Self {
            start,
            end,
            text: caps[3].to_string(),
        })
    }

    pub fn time_key(&self) -> String {
        format_time_key(self.start, self.end)
    }
}

// @struct: Text following one tag inside a multi-segment collaborator response
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl TaggedSegment {
    pub fn time_key(&self) -> String {
        format_time_key(self.start, self.end)
    }
}

/// Split free text on `[start->end]` tags.
///
/// Text before the first tag is dropped; each segment's text runs up to the
/// next tag and is trimmed.
pub fn split_tagged_segments(text: &str) -> Vec<TaggedSegment> {
    let tags: Vec<(usize, usize, f64, f64)> = TAG_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let start = caps[1].parse().ok()?;
            let end = caps[2].parse().ok()?;
            Some((whole.start(), whole.end(), start, end))
        })
        .collect();

    tags.iter()
        .enumerate()
        .map(|(i, &(_, content_start, start, end))| {
            let content_end = tags.get(i + 1).map_or(text.len(), |next| next.0);
            TaggedSegment {
                start,
                end,
                text: text[content_start..content_end].trim().to_string(),
            }
        })
        .collect()
}

/// Collapse runs of whitespace, newlines included, into single spaces
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove zero-width spaces
pub fn strip_zero_width(text: &str) -> String {
    text.chars().filter(|&c| c != ZERO_WIDTH_SPACE).collect()
}

/// Run a line parser, retrying once after stripping zero-width spaces
pub fn parse_with_retry<T>(
    line: &str,
    parser: impl Fn(&str) -> Result<T, SubtitleError>,
) -> Result<T, SubtitleError> {
    match parser(line) {
        Ok(parsed) => Ok(parsed),
        Err(first_error) => {
            if !line.contains(ZERO_WIDTH_SPACE) {
                return Err(first_error);
            }
            debug!("Retrying parse without zero-width spaces: {:?}", line);
            parser(&strip_zero_width(line))
        }
    }
}

fn parse_seconds(value: &str, line: &str) -> Result<f64, SubtitleError> {
    value.parse::<f64>().map_err(|_| SubtitleError::InvalidTimestamp {
        value: value.to_string(),
        line: line.to_string(),
    })
}

/// `start->end` with two-decimal seconds
pub fn format_time_key(start: f64, end: f64) -> String {
    format!("{:.2}->{:.2}", start, end)
}

/// Format seconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_srt_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Format seconds as an ASS timestamp (H:MM:SS.cc)
pub fn format_ass_timestamp(seconds: f64) -> String {
    let cs = (seconds.max(0.0) * 100.0).round() as u64;
    let hours = cs / 360_000;
    let minutes = (cs % 360_000) / 6_000;
    let secs = (cs % 6_000) / 100;
    let centis = cs % 100;

    format!("{}:{:02}:{:02}.{:02}", hours, minutes, secs, centis)
}

/// Ordered subtitle lines with the file they belong to
#[derive(Debug)]
pub struct SubtitleCollection {
    /// Source filename
    pub source_file: PathBuf,

    /// Lines ordered by start time
    pub lines: Vec<SubtitleLine>,
}

impl SubtitleCollection {
    pub fn new(source_file: PathBuf, lines: Vec<SubtitleLine>) -> Self {
        Self { source_file, lines }
    }

    /// Read an intermediate line file (`[start->end]text` per line).
    ///
    /// Unreadable lines are skipped with a warning.
    pub fn read_line_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read line file: {}", path.display()))?;

        let lines = Self::parse_line_records(&content, path);
        Ok(Self::new(path.to_path_buf(), lines))
    }

    /// Parse intermediate line records from a string
    pub fn parse_line_records(content: &str, origin: &Path) -> Vec<SubtitleLine> {
        let mut lines = Vec::new();
        for (number, raw) in content.lines().enumerate() {
            if raw.trim().is_empty() {
                continue;
            }
            match parse_with_retry(raw, TimedLine::parse) {
                Ok(timed) => lines.push(SubtitleLine::from(timed)),
                Err(e) => warn!("{}:{}: skipping unreadable line: {}", origin.display(), number + 1, e),
            }
        }
        lines
    }

    /// Write `[start->end]source` records
    pub fn write_line_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content: String = self.lines.iter()
            .map(|line| format!("{}\n", line.to_line_record()))
            .collect();
        write_with_parent(path.as_ref(), &content)
    }

    /// Write `[start->end]source@@@target` records
    pub fn write_bilingual_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content: String = self.lines.iter()
            .map(|line| format!("{}\n", line.to_bilingual_record()))
            .collect();
        write_with_parent(path.as_ref(), &content)
    }

    /// Bilingual records for every line, in order
    pub fn bilingual_records(&self) -> Vec<String> {
        self.lines.iter().map(SubtitleLine::to_bilingual_record).collect()
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle Collection")?;
        writeln!(f, "Source: {:?}", self.source_file)?;
        writeln!(f, "Lines: {}", self.lines.len())?;
        Ok(())
    }
}

fn write_with_parent(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content)
        .with_context(|| format!("Failed to write file: {}", path.display()))
}
