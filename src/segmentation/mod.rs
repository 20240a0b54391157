/*!
 * Segmentation of recognised speech into subtitle lines.
 *
 * - `segmenter`: sentence grouping and long-sentence splitting
 * - `punctuation`: punctuation restoration mapped back onto word timings
 */

pub mod punctuation;
pub mod segmenter;

pub use self::punctuation::PunctuationRealigner;
pub use self::segmenter::SentenceSegmenter;
