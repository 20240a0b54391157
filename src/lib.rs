/*!
 * # bisub - bilingual subtitles from speech
 *
 * Turns the speech of video or audio files into time-aligned bilingual subtitles.
 *
 * ## Pipeline
 *
 * timed words → segmented lines → (re-punctuated) → `<name>.list`
 * → batched translation → `<name>.bilingual.list` → SRT / ASS
 *
 * Speech recognition, punctuation restoration and translation are external
 * collaborators behind single-call traits (`providers`). They may drop, merge
 * or miscount what they are given; every line produced by segmentation still
 * reaches the final subtitle, with a placeholder where text was lost.
 *
 * ## Architecture
 *
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Word and line model, the timestamp-tag line format
 * - `segmentation`: Sentence segmentation and punctuation realignment
 * - `translation`: Batched translation with count recovery
 * - `subtitle_writer`: Final SRT / ASS rendering
 * - `providers`: Collaborator traits and clients (Ollama, OpenAI-compatible, Google, Whisper)
 * - `audio`: ffmpeg extraction and decoding
 * - `file_utils`: File system operations and artefact naming
 * - `app_controller`: Generate and continue tasks
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod segmentation;
pub mod subtitle_processor;
pub mod subtitle_writer;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::Controller;
pub use segmentation::{PunctuationRealigner, SentenceSegmenter};
pub use subtitle_processor::{SubtitleCollection, SubtitleLine, WordFragment};
pub use subtitle_writer::SubtitleMerger;
pub use translation::{BatchTranslator, TranslationService};
pub use language_utils::{normalize_to_part1, get_language_name};
pub use errors::{ProviderError, SubtitleError, TranslationError};
