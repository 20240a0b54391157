/*!
 * Sentence segmentation.
 *
 * Groups the flat stream of recognised words into subtitle-sized lines:
 * first into sentences (a word ending with `.`), then long sentences are
 * split on terminal marks, comma-conjunction pairs and long pauses.
 */

use log::debug;

use crate::app_config::SegmentationConfig;
use crate::errors::ProviderError;
use crate::segmentation::punctuation::PunctuationRealigner;
use crate::subtitle_processor::{SubtitleLine, WordFragment};

/// Words that open a new clause after a comma
pub const CLAUSE_CONJUNCTIONS: [&str; 9] = ["and", "so", "but", "or", "then", "because", "where", "we", "you"];

/// Sentences shorter than this are treated as filler and dropped
const MIN_SENTENCE_FRAGMENTS: usize = 2;

/// A partial line must exceed this many fragments before a comma split
const MIN_COMMA_SPLIT_FRAGMENTS: usize = 4;

/// Turns timed word fragments into source-language subtitle lines
pub struct SentenceSegmenter {
    config: SegmentationConfig,
    realigner: Option<PunctuationRealigner>,
}

impl SentenceSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config, realigner: None }
    }

    /// Re-punctuate long sentences before splitting them
    pub fn with_realigner(mut self, realigner: PunctuationRealigner) -> Self {
        self.realigner = Some(realigner);
        self
    }

    pub fn has_realigner(&self) -> bool {
        self.realigner.is_some()
    }

    /// Segment an ordered fragment stream into subtitle lines
    pub async fn segment(&self, fragments: Vec<WordFragment>) -> Result<Vec<SubtitleLine>, ProviderError> {
        let total = fragments.len();
        let mut lines = Vec::new();
        let mut sentence = Vec::new();

        for (i, fragment) in fragments.into_iter().enumerate() {
            let closes_sentence = fragment.text.trim_end().ends_with('.') || i + 1 == total;
            sentence.push(fragment);

            if closes_sentence {
                let buffer = std::mem::take(&mut sentence);
                lines.extend(self.segment_sentence(buffer).await?);
            }
        }

        debug!("Segmented {} fragments into {} lines", total, lines.len());
        Ok(lines)
    }

    async fn segment_sentence(&self, sentence: Vec<WordFragment>) -> Result<Vec<SubtitleLine>, ProviderError> {
        if sentence.len() < MIN_SENTENCE_FRAGMENTS {
            debug!("Dropping filler sentence {:?}", WordFragment::join_text(&sentence));
            return Ok(Vec::new());
        }

        if sentence.len() < self.config.long_sentence_threshold {
            return Ok(SubtitleLine::from_fragments(&sentence).into_iter().collect());
        }

        let sentence = match &self.realigner {
            Some(realigner) => realigner.realign(sentence).await?,
            None => sentence,
        };

        Ok(split_long_sentence(&sentence, self.config.gap_threshold))
    }
}

/// Split a sentence at terminal marks, comma-conjunction pairs and long pauses.
///
/// The trailing partial, which always holds the last fragment, is flushed at the end.
pub fn split_long_sentence(fragments: &[WordFragment], gap_threshold: f64) -> Vec<SubtitleLine> {
    let mut lines = Vec::new();
    let mut partial_start = 0;

    for (i, pair) in fragments.windows(2).enumerate() {
        let (current, next) = (&pair[0], &pair[1]);
        let partial_len = i + 1 - partial_start;

        if is_split_point(current, next, partial_len, gap_threshold) {
            lines.extend(SubtitleLine::from_fragments(&fragments[partial_start..=i]));
            partial_start = i + 1;
        }
    }

    if partial_start < fragments.len() {
        lines.extend(SubtitleLine::from_fragments(&fragments[partial_start..]));
    }
    lines
}

/// Whether a line may end after `current`, given the `next` fragment
pub fn is_split_point(current: &WordFragment, next: &WordFragment, partial_len: usize, gap_threshold: f64) -> bool {
    let last = current.last_char();

    let sentence_end = matches!(last, Some('.' | '!' | '?'));

    let comma_conjunction = partial_len > MIN_COMMA_SPLIT_FRAGMENTS
        && last == Some(',')
        && CLAUSE_CONJUNCTIONS.contains(&next.text.trim().to_lowercase().as_str());

    let long_gap = next.start - current.end > gap_threshold;

    sentence_end || comma_conjunction || long_gap
}
