/*!
 * End-to-end pipeline tests: fragments in, subtitle file out
 */

use std::sync::Arc;

use bisub::app_config::{AssLayout, SegmentationConfig, SubtitleFormat};
use bisub::segmentation::SentenceSegmenter;
use bisub::subtitle_processor::SubtitleCollection;
use bisub::subtitle_writer::SubtitleMerger;
use bisub::translation::{BatchTranslator, MISSING_TRANSLATION};

use crate::common;
use crate::common::mock_providers::{MockProvider, MOCK_TRANSLATION_PREFIX};

/// Three sentences, the middle one long enough to be split at a pause
fn lecture_fragments() -> Vec<bisub::subtitle_processor::WordFragment> {
    let mut fragments = common::evenly_spaced_sentence(6, 0.0);
    let mut long = common::evenly_spaced_sentence(24, 5.0);
    for fragment in long.iter_mut().skip(12) {
        fragment.start += 0.8;
        fragment.end += 0.8;
    }
    fragments.extend(long);
    fragments.extend(common::evenly_spaced_sentence(4, 20.0));
    fragments
}

#[tokio::test]
async fn test_pipeline_shouldKeepOneSubtitlePerSegmentedLine() {
    common::init_logging();
    let temp_dir = common::create_temp_dir().unwrap();
    let line_file = temp_dir.path().join("asr").join("lecture.list");
    let bilingual_file = temp_dir.path().join("asr").join("lecture.bilingual.list");
    let output = temp_dir.path().join("subtitles").join("lecture.srt");

    let lines = SentenceSegmenter::new(SegmentationConfig::default())
        .segment(lecture_fragments())
        .await
        .unwrap();
    assert_eq!(lines.len(), 4);
    SubtitleCollection::new(line_file.clone(), lines).write_line_file(&line_file).unwrap();

    let collection = SubtitleCollection::read_line_file(&line_file).unwrap();
    let line_count = collection.lines.len();
    let mock = MockProvider::dropping_line(1);
    let translator = BatchTranslator::chunked(Arc::new(mock.clone()), 8);
    let (translated, report) = translator.translate(collection.lines).await.unwrap();

    assert_eq!(translated.len(), line_count);
    assert_eq!(report.placeholders, 1);
    assert_eq!(translated[1].target_text.as_deref(), Some(MISSING_TRANSLATION));

    SubtitleCollection::new(line_file, translated)
        .write_bilingual_file(&bilingual_file)
        .unwrap();
    let merger = SubtitleMerger::new(SubtitleFormat::Srt, false, AssLayout::Inline);
    let summary = merger.merge_file(&bilingual_file, &output).unwrap();

    assert_eq!(summary.written, line_count);
    assert_eq!(summary.skipped, 0);

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.matches(" --> ").count(), line_count);
    assert!(content.contains(MISSING_TRANSLATION));
    assert_eq!(content.matches(MOCK_TRANSLATION_PREFIX.trim()).count(), line_count - 1);
}

#[tokio::test]
async fn test_pipeline_toAss_shouldEmitEventsForBothTracks() {
    let temp_dir = common::create_temp_dir().unwrap();
    let bilingual_file = temp_dir.path().join("lecture.bilingual.list");
    let output = temp_dir.path().join("lecture.ass");

    let lines = SentenceSegmenter::new(SegmentationConfig::default())
        .segment(lecture_fragments())
        .await
        .unwrap();
    let translator = BatchTranslator::chunked(Arc::new(MockProvider::working()), 2);
    let (translated, report) = translator.translate(lines).await.unwrap();
    assert!(report.is_clean());

    SubtitleCollection::new(bilingual_file.clone(), translated)
        .write_bilingual_file(&bilingual_file)
        .unwrap();
    SubtitleMerger::new(SubtitleFormat::Ass, false, AssLayout::DualTrack)
        .merge_file(&bilingual_file, &output)
        .unwrap();

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(content.matches(",Target,").count(), 4);
    assert_eq!(content.matches(",Source,").count(), 4);
}
