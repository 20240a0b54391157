/*!
 * Translation of segmented subtitle lines.
 *
 * - `batch`: batching and count recovery around the translation collaborator
 * - `core`: chat-model service and translator selection
 * - `prompts`: system prompt templates
 */

pub use self::batch::{BatchReport, BatchTranslator, TranslationMode, COUNT_MISMATCH, MISSING_TRANSLATION};
pub use self::core::{TranslationBackend, TranslationService};
pub use self::prompts::PromptTemplate;

pub mod batch;
pub mod core;
pub mod prompts;
