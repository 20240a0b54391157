/*!
 * Punctuation realignment.
 *
 * Sends the text of an under-punctuated sentence to a punctuation
 * restoration collaborator and maps the restored words back onto the
 * original fragment boundaries. Timing is never changed, only text.
 */

use std::sync::Arc;
use log::{debug, warn};

use crate::app_config::{GluePolicy, SegmentationConfig};
use crate::errors::ProviderError;
use crate::providers::PunctuationRestorer;
use crate::subtitle_processor::WordFragment;

/// Trailing marks removed from each fragment before restoration
const TRAILING_MARKS: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Re-punctuates fragment buffers through an external restorer
pub struct PunctuationRealigner {
    restorer: Arc<dyn PunctuationRestorer>,
    ratio_threshold: f64,
    glue_policy: GluePolicy,
}

impl PunctuationRealigner {
    pub fn new(restorer: Arc<dyn PunctuationRestorer>, ratio_threshold: f64, glue_policy: GluePolicy) -> Self {
        Self { restorer, ratio_threshold, glue_policy }
    }

    pub fn from_config(restorer: Arc<dyn PunctuationRestorer>, config: &SegmentationConfig) -> Self {
        Self::new(restorer, config.punctuation_ratio_threshold, config.glue_policy)
    }

    /// Whether the buffer is sparse enough in punctuation to need restoring.
    ///
    /// A mark is a fragment whose last character is not alphanumeric.
    pub fn needs_restoration(&self, fragments: &[WordFragment]) -> bool {
        let marks = fragments.iter()
            .filter(|f| f.last_char().is_some_and(|c| !c.is_alphanumeric()))
            .count();

        marks == 0 || fragments.len() as f64 / marks as f64 > self.ratio_threshold
    }

    /// Text handed to the restorer: fragments without their trailing marks
    pub fn unpunctuated_text(fragments: &[WordFragment]) -> String {
        fragments.iter()
            .map(|f| f.text.trim_end().trim_end_matches(TRAILING_MARKS))
            .collect::<String>()
            .trim()
            .to_string()
    }

    /// Restore punctuation on a sentence buffer.
    ///
    /// Returns the buffer with restored word texts when the restorer's word
    /// count matches (directly or after merging glued fragments), otherwise
    /// the untouched input.
    pub async fn realign(&self, fragments: Vec<WordFragment>) -> Result<Vec<WordFragment>, ProviderError> {
        if fragments.is_empty() || !self.needs_restoration(&fragments) {
            return Ok(fragments);
        }

        let text = Self::unpunctuated_text(&fragments);
        let restored = self.restorer.restore_punctuation(&text).await?;
        let words: Vec<&str> = restored.split_whitespace().collect();
        debug!("Punctuation restored: {} fragments, {} words", fragments.len(), words.len());

        let mut repaired = fragments.clone();
        if words.len() != repaired.len() {
            warn!(
                "Punctuation word count mismatch: {} != {}, trying to merge glued fragments",
                words.len(), repaired.len()
            );
            if !self.merge_glued(&mut repaired, words.len()) {
                warn!(
                    "Punctuation repair failed: {} words for {} fragments, keeping original text of {:?}",
                    words.len(), repaired.len(), WordFragment::join_text(&fragments)
                );
                return Ok(fragments);
            }
        }

        for (fragment, word) in repaired.iter_mut().zip(words) {
            fragment.text = format!(" {}", word);
        }
        Ok(repaired)
    }

    /// Merge glued fragments backward until `target` fragments remain.
    ///
    /// Returns whether the counts match afterwards.
    pub fn merge_glued(&self, fragments: &mut Vec<WordFragment>, target: usize) -> bool {
        if self.glue_policy == GluePolicy::Disabled || fragments.len() <= target {
            return fragments.len() == target;
        }

        let mut i = fragments.len() - 1;
        while i > 0 && fragments.len() > target {
            if self.is_glued(&fragments[i]) {
                let glued = fragments.remove(i);
                let previous = &mut fragments[i - 1];
                previous.text.push_str(&glued.text);
                previous.end = glued.end;
            }
            i -= 1;
        }

        fragments.len() == target
    }

    fn is_glued(&self, fragment: &WordFragment) -> bool {
        match self.glue_policy {
            GluePolicy::MissingLeadingSpace => !fragment.text.starts_with(char::is_whitespace),
            GluePolicy::Disabled => false,
        }
    }
}
