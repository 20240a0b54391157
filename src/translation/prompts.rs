/*!
 * Prompt templates for the LLM-backed collaborators.
 */

/// System prompt template with `{source_language}` / `{target_language}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Translates timestamp-tagged subtitle lines, one output line per input line
    pub const LINE_TRANSLATOR: &'static str = r#"You are a professional subtitle translator. Translate the following {source_language} subtitle lines into {target_language}.

Each line starts with a timestamp tag such as [12.34->15.60].
- Output exactly one line per input line, in the same order
- Copy every timestamp tag unchanged at the start of its line
- Do not merge, split, add or drop lines
- Reply with the translated lines only, without explanations"#;

    /// Restores punctuation and capitalization without changing words
    pub const PUNCTUATION_RESTORER: &'static str = r#"You restore punctuation in {source_language} speech transcripts.
Add punctuation marks and capitalization to the text you are given.
Do not add, remove, reorder or translate words, and do not split or join words.
Reply with the punctuated text only, on a single line."#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    pub fn line_translator() -> Self {
        Self::new(Self::LINE_TRANSLATOR)
    }

    pub fn punctuation_restorer() -> Self {
        Self::new(Self::PUNCTUATION_RESTORER)
    }

    /// Render the template with the given variables.
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", source_language)
            .replace("{target_language}", target_language)
    }
}
