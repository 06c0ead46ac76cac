// ============================================================
// Layer 3 — Document Domain Type
// ============================================================
// One unit of raw pre-training text as it came off disk.
// By the time a Document exists, any container format
// (.docx, .txt) has already been stripped away.

use serde::{Deserialize, Serialize};

/// A raw document loaded from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The filename, kept so corpus statistics can be traced back
    pub source: String,

    /// The full extracted text, before cleaning or tokenisation
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text:   text.into(),
        }
    }

    /// Whitespace-separated word count of the raw text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        let doc = Document::new("notes.txt", "the  quick\nbrown fox");
        assert_eq!(doc.word_count(), 4);
        assert_eq!(doc.source, "notes.txt");
    }
}
