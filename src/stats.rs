//! Document content statistics.
//!
//! Pure derivation of counts from document content, written into the
//! `statistics.*` subtree as a single ordered batch.

use serde_json::json;

use crate::store::StateStore;

/// Derived counts for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStatistics {
    pub char_count: usize,
    pub char_count_no_spaces: usize,
    pub word_count: usize,
    pub line_count: usize,
    pub paragraph_count: usize,
    /// Estimated reading time in whole minutes, rounded up
    pub reading_minutes: usize,
}

impl TextStatistics {
    /// Measure `content`. Empty text yields all zeros; words are
    /// whitespace-delimited; paragraphs are runs of non-blank lines.
    pub fn measure(content: &str, reading_speed_wpm: usize) -> Self {
        let word_count = content.split_whitespace().count();

        let line_count = if content.is_empty() {
            0
        } else {
            content.split('\n').count()
        };

        let mut paragraph_count = 0;
        let mut in_paragraph = false;
        for line in content.split('\n') {
            if line.trim().is_empty() {
                in_paragraph = false;
            } else if !in_paragraph {
                paragraph_count += 1;
                in_paragraph = true;
            }
        }

        Self {
            char_count: content.chars().count(),
            char_count_no_spaces: content.chars().filter(|c| !c.is_whitespace()).count(),
            word_count,
            line_count,
            paragraph_count,
            reading_minutes: word_count.div_ceil(reading_speed_wpm.max(1)),
        }
    }

    /// Write all counts into `statistics.*`, one dispatch per field in a
    /// fixed order.
    pub fn apply_to(&self, store: &mut StateStore) {
        store.update([
            ("statistics.charCount".to_string(), json!(self.char_count)),
            (
                "statistics.charCountNoSpaces".to_string(),
                json!(self.char_count_no_spaces),
            ),
            ("statistics.wordCount".to_string(), json!(self.word_count)),
            ("statistics.lineCount".to_string(), json!(self.line_count)),
            (
                "statistics.paragraphCount".to_string(),
                json!(self.paragraph_count),
            ),
            (
                "statistics.readingTime".to_string(),
                json!(self.reading_minutes),
            ),
        ]);
    }
}
