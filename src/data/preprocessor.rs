// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Normalises raw document text before it reaches the
// tokenizer, so whitespace artefacts from word processors do
// not turn into vocabulary entries:
//
//   1. Unicode space variants, tabs and control chars → ' '
//   2. '\r' → '\n'
//   3. Runs of spaces collapsed, each line trimmed
//   4. At most one blank line between paragraphs
//
// Reference: Rust Book §8 (Strings in Rust)

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    pub fn clean(&self, text: &str) -> String {
        let normalised: String = text.chars().map(normalise_char).collect();

        let lines: Vec<String> = normalised
            .lines()
            .map(|line| line.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
            .collect();

        // keep paragraph breaks, drop runs of blank lines
        let mut out: Vec<&str> = Vec::with_capacity(lines.len());
        for line in &lines {
            let prev_blank = out.last().map_or(false, |l: &&str| l.is_empty());
            if line.is_empty() && prev_blank {
                continue;
            }
            out.push(line.as_str());
        }

        out.join("\n").trim().to_string()
    }
}

fn normalise_char(c: char) -> char {
    match c {
        '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
        '\r' => '\n',
        c if c.is_control() && c != '\n' => ' ',
        c => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_spaces_and_trims() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("  masked   language\tmodel  "), "masked language model");
    }

    #[test]
    fn test_control_and_invisible_chars_become_spaces() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("mask\x01token\u{200B}here"), "mask token here");
    }

    #[test]
    fn test_keeps_single_paragraph_break() {
        let p = Preprocessor::new();
        assert_eq!(p.clean("first\r\n\r\n\r\n\nsecond"), "first\n\nsecond");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Preprocessor::new().clean("  \n\n "), "");
    }
}
