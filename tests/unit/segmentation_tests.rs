/*!
 * Tests for sentence segmentation and punctuation realignment
 */

use std::sync::Arc;

use bisub::app_config::{GluePolicy, SegmentationConfig};
use bisub::segmentation::{PunctuationRealigner, SentenceSegmenter};
use bisub::subtitle_processor::{SubtitleLine, WordFragment};

use crate::common;
use crate::common::mock_providers::MockProvider;

fn realigning_segmenter(mock: &MockProvider) -> SentenceSegmenter {
    let config = SegmentationConfig::default();
    let realigner = PunctuationRealigner::from_config(Arc::new(mock.clone()), &config);
    SentenceSegmenter::new(config).with_realigner(realigner)
}

#[tokio::test]
async fn test_segment_helloWorld_shouldProduceOneLine() {
    let fragments = common::fragments(&[("Hello", 0.0, 0.4), (" world.", 0.4, 1.0)]);
    let lines = SentenceSegmenter::new(SegmentationConfig::default())
        .segment(fragments)
        .await
        .unwrap();

    assert_eq!(lines, vec![SubtitleLine::new(0.0, 1.0, "Hello world.")]);
}

#[tokio::test]
async fn test_segment_mixedStream_shouldCoverEveryWordInOrder() {
    let mut fragments = common::evenly_spaced_sentence(5, 0.0);
    let mut long = common::evenly_spaced_sentence(30, 10.0);
    for fragment in long.iter_mut().skip(15) {
        fragment.start += 1.0;
        fragment.end += 1.0;
    }
    fragments.extend(long);
    fragments.extend(common::evenly_spaced_sentence(3, 30.0));

    let lines = SentenceSegmenter::new(SegmentationConfig::default())
        .segment(fragments.clone())
        .await
        .unwrap();

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1].end, fragments[19].end);
    assert_eq!(lines[2].start, fragments[20].start);
    assert_eq!(lines.first().unwrap().start, fragments.first().unwrap().start);
    assert_eq!(lines.last().unwrap().end, fragments.last().unwrap().end);
    for pair in lines.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }

    let rejoined: Vec<&str> = lines.iter().map(|l| l.source_text.as_str()).collect();
    assert_eq!(rejoined.join(" "), WordFragment::join_text(&fragments));
}

#[tokio::test]
async fn test_segment_withRealigner_shouldSplitOnRestoredQuestionMark() {
    let fragments = common::evenly_spaced_sentence(25, 0.0);
    let mut words: Vec<String> = (0..25).map(|i| format!("word{}", i)).collect();
    words[11].push('?');
    words[24].push('.');
    let mock = MockProvider::fixed(words.join(" "));

    let lines = realigning_segmenter(&mock).segment(fragments.clone()).await.unwrap();

    assert_eq!(mock.request_count(), 1);
    assert_eq!(mock.requests()[0], (0..25).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" "));
    assert_eq!(lines.len(), 2);
    assert!(lines[0].source_text.ends_with("word11?"));
    assert_eq!((lines[0].start, lines[0].end), (fragments[0].start, fragments[11].end));
    assert_eq!((lines[1].start, lines[1].end), (fragments[12].start, fragments[24].end));
}

#[tokio::test]
async fn test_segment_shortSentences_shouldNotConsultRestorer() {
    let mock = MockProvider::failing();
    let mut fragments = common::evenly_spaced_sentence(4, 0.0);
    fragments.extend(common::evenly_spaced_sentence(6, 5.0));

    let lines = realigning_segmenter(&mock).segment(fragments).await.unwrap();

    assert_eq!(lines.len(), 2);
    assert_eq!(mock.request_count(), 0);
}

#[tokio::test]
async fn test_segment_whenRestorerFails_shouldPropagate() {
    let mock = MockProvider::failing();
    let result = realigning_segmenter(&mock)
        .segment(common::evenly_spaced_sentence(22, 0.0))
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_segment_withRestorerWordMismatch_shouldFallBackToOriginalText() {
    let mock = MockProvider::fixed("far too few words.");
    let fragments = common::evenly_spaced_sentence(21, 0.0);

    let lines = realigning_segmenter(&mock).segment(fragments.clone()).await.unwrap();

    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].source_text, WordFragment::join_text(&fragments));
}

#[tokio::test]
async fn test_segment_withLowThreshold_shouldSplitShortSentence() {
    let config = SegmentationConfig { long_sentence_threshold: 3, ..SegmentationConfig::default() };
    let fragments = common::fragments(&[
        (" yes!", 0.0, 0.3),
        (" we", 0.3, 0.6),
        (" agree.", 0.6, 1.0),
    ]);

    let lines = SentenceSegmenter::new(config).segment(fragments).await.unwrap();

    let texts: Vec<&str> = lines.iter().map(|l| l.source_text.as_str()).collect();
    assert_eq!(texts, vec!["yes!", "we agree."]);
}

#[test]
fn test_mergeGlued_shouldExtendTimingOfPreviousFragment() {
    let realigner = PunctuationRealigner::new(Arc::new(MockProvider::working()), 12.0, GluePolicy::MissingLeadingSpace);
    let mut fragments = common::fragments(&[(" v", 0.0, 0.5), ("1", 0.5, 0.8), (".2", 0.8, 1.2), (" ok", 1.5, 2.0)]);

    assert!(realigner.merge_glued(&mut fragments, 2));
    assert_eq!(fragments[0].text, " v1.2");
    assert_eq!((fragments[0].start, fragments[0].end), (0.0, 1.2));
    assert_eq!(fragments[1].text, " ok");
}

#[test]
fn test_mergeGlued_whenTargetUnreachable_shouldReportFailure() {
    let realigner = PunctuationRealigner::new(Arc::new(MockProvider::working()), 12.0, GluePolicy::MissingLeadingSpace);
    let mut fragments = common::fragments(&[(" a", 0.0, 0.5), (" b", 0.5, 1.0), (" c", 1.0, 1.5)]);

    assert!(!realigner.merge_glued(&mut fragments, 1));
    assert_eq!(fragments.len(), 3);
}

#[test]
fn test_segment_onBlockingRuntime_shouldMatchAsyncResult() {
    let fragments = common::evenly_spaced_sentence(8, 2.0);
    let segmenter = SentenceSegmenter::new(SegmentationConfig::default());

    let lines = tokio_test::block_on(segmenter.segment(fragments.clone()));

    let lines = tokio_test::assert_ok!(lines);
    assert_eq!(lines, vec![SubtitleLine::from_fragments(&fragments).unwrap()]);
}
