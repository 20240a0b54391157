/*!
 * Tests for the subtitle line model and line-file handling
 */

use std::path::Path;

use bisub::errors::SubtitleError;
use bisub::subtitle_processor::{
    format_ass_timestamp, format_srt_timestamp, split_tagged_segments, SubtitleCollection,
    SubtitleLine, TimedLine,
};

use crate::common;

#[test]
fn test_lineFile_writeThenRead_shouldKeepLinesInOrder() {
    let temp_dir = common::create_temp_dir().unwrap();
    let path = temp_dir.path().join("asr").join("talk.list");
    let collection = SubtitleCollection::new(path.clone(), common::sample_lines(3));

    collection.write_line_file(&path).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        content,
        "[0.00->1.00]Line number 1.\n[1.00->2.00]Line number 2.\n[2.00->3.00]Line number 3.\n"
    );

    let read = SubtitleCollection::read_line_file(&path).unwrap();
    assert_eq!(read.lines, collection.lines);
}

#[test]
fn test_readLineFile_withGarbage_shouldSkipUnreadableLines() {
    common::init_logging();
    let temp_dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(
        temp_dir.path(),
        "talk.list",
        "[0.00->1.00]first\n\nnot a record\n[1.00->x]broken\n[2.50->3.00]  second  \n",
    )
    .unwrap();

    let collection = SubtitleCollection::read_line_file(&path).unwrap();

    assert_eq!(collection.lines.len(), 2);
    assert_eq!(collection.lines[0].source_text, "first");
    assert_eq!(collection.lines[1].start, 2.5);
}

#[test]
fn test_readLineFile_whenMissing_shouldFail() {
    assert!(SubtitleCollection::read_line_file(Path::new("/nonexistent/talk.list")).is_err());
}

#[test]
fn test_parseBilingualLenient_withZeroWidthSpace_shouldStripIt() {
    let line = SubtitleLine::parse_bilingual_lenient("[1.00->2.00]hi\u{200b}@@@你好").unwrap();

    assert_eq!(line.start, 1.0);
    assert_eq!(line.end, 2.0);
    assert_eq!(line.source_text, "hi");
    assert_eq!(line.target_text.as_deref(), Some("你好"));
}

#[test]
fn test_parseBilingualLenient_withZeroWidthInTag_shouldRetry() {
    let line = SubtitleLine::parse_bilingual_lenient("[1.00->\u{200b}2.00]hi@@@salut").unwrap();
    assert_eq!(line.end, 2.0);
    assert_eq!(line.target_text.as_deref(), Some("salut"));
}

#[test]
fn test_parseBilingual_withoutSeparator_shouldFail() {
    let result = SubtitleLine::parse_bilingual("[1.00->2.00]only source");
    assert!(matches!(result, Err(SubtitleError::MissingSeparator(_))));
}

#[test]
fn test_bilingualRecord_withMultiLineTarget_shouldStayOnOneLine() {
    let line = SubtitleLine::new(0.0, 2.0, "Good  morning,\neveryone.").with_target("大家\n早上好。\r\n");
    let record = line.to_bilingual_record();

    assert_eq!(record, "[0.00->2.00]Good morning, everyone.@@@大家 早上好。");
    assert_eq!(record.lines().count(), 1);
    let parsed = SubtitleLine::parse_bilingual(&record).unwrap();
    assert_eq!(parsed.target_text.as_deref(), Some("大家 早上好。"));
}

#[test]
fn test_bilingualRecord_shouldSplitOnLastSeparator() {
    let record = SubtitleLine::new(0.0, 1.5, "a@@@b").with_target("c").to_bilingual_record();
    let parsed = SubtitleLine::parse_bilingual(&record).unwrap();

    assert_eq!(parsed.source_text, "a@@@b");
    assert_eq!(parsed.target_text.as_deref(), Some("c"));
}

#[test]
fn test_timedLine_withSurroundingWhitespace_shouldParse() {
    let timed = TimedLine::parse("  [12.34->56.78]text here \n").unwrap();
    assert_eq!(timed.start, 12.34);
    assert_eq!(timed.end, 56.78);
    assert_eq!(timed.time_key(), "12.34->56.78");
}

#[test]
fn test_splitTaggedSegments_shouldDropPreambleAndTrim() {
    let response = "Sure, here you go:\n[0.00->1.00] 你好 \n[1.00->2.50]世界\n";
    let segments = split_tagged_segments(response);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "你好");
    assert_eq!(segments[1].time_key(), "1.00->2.50");
    assert_eq!(segments[1].text, "世界");
}

#[test]
fn test_splitTaggedSegments_onSingleLine_shouldSplitOnEveryTag() {
    let segments = split_tagged_segments("[0.00->1.00]a [1.00->2.00]b[2.00->3.00]c");
    let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "b", "c"]);
}

#[test]
fn test_timestamps_shouldRoundToUnit() {
    assert_eq!(format_srt_timestamp(3661.5), "01:01:01,500");
    assert_eq!(format_srt_timestamp(-1.0), "00:00:00,000");
    assert_eq!(format_ass_timestamp(3661.5), "1:01:01.50");
    assert_eq!(format_ass_timestamp(0.0), "0:00:00.00");
}
