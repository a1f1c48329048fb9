use crate::error::ContextError;
use crate::error::Result;
use regex_lite::Regex;

/// Characters per estimated token
pub const CHARS_PER_TOKEN: usize = 4;

/// Rough token count: one token per four characters.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Canonical form used for duplicate detection: lowercase, punctuation
/// removed, whitespace collapsed to single spaces.
pub fn normalize_text(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of `text`.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Per-chunk text compression.
///
/// Collapses runs of three or more line breaks to one blank line, squeezes
/// repeated spaces and strips boilerplate phrases. Applying it twice yields
/// the same text as applying it once.
pub struct Compressor {
    blank_lines: Regex,
    spaces: Regex,
    boilerplate: Vec<Regex>,
}

impl Compressor {
    /// Compile the boilerplate patterns (matched case-insensitively).
    pub fn new(patterns: &[String]) -> Result<Self> {
        let boilerplate = patterns
            .iter()
            .map(|pattern| {
                Regex::new(&format!("(?i){pattern}")).map_err(|e| ContextError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            blank_lines: compile(r"\n\s*\n\s*\n+")?,
            spaces: compile(r" +")?,
            boilerplate,
        })
    }

    pub fn compress(&self, content: &str) -> String {
        let mut current = self.compress_once(content);
        loop {
            let next = self.compress_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn compress_once(&self, content: &str) -> String {
        let text = self.blank_lines.replace_all(content, "\n\n");
        let mut text = self.spaces.replace_all(&text, " ").into_owned();

        for pattern in &self.boilerplate {
            text = pattern.replace_all(&text, "").into_owned();
        }

        text.trim().to_string()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| ContextError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use pretty_assertions::assert_eq;

    fn compressor() -> Compressor {
        Compressor::new(&ContextConfig::default().boilerplate_patterns).unwrap()
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 0);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        // Counted in characters, not bytes
        assert_eq!(estimate_tokens("éééé"), 1);
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            normalize_text("  Hello,   WORLD!\n\tIt's  me. "),
            "hello world its me"
        );
        assert_eq!(normalize_text("snake_case stays"), "snake_case stays");
        assert_eq!(normalize_text("!!!"), "");
    }

    #[test]
    fn test_char_prefix() {
        assert_eq!(char_prefix("hello", 3), "hel");
        assert_eq!(char_prefix("hello", 10), "hello");
        assert_eq!(char_prefix("héllo", 2), "hé");
    }

    #[test]
    fn test_compress_whitespace() {
        let compressed = compressor().compress("Line one.\n\n\n\n  \nLine   two.");
        assert_eq!(compressed, "Line one.\n\nLine two.");
    }

    #[test]
    fn test_compress_boilerplate() {
        let text = "Refunds take 5 days. Click here to contact support. \
                    Copyright 2024 Acme Inc. All rights reserved.";
        assert_eq!(compressor().compress(text), "Refunds take 5 days.");

        let text = "Read the guide. LEARN MORE AT THE HELP CENTER.";
        assert_eq!(compressor().compress(text), "Read the guide.");

        let text = "Setup is quick. For more information, visit our docs.";
        assert_eq!(compressor().compress(text), "Setup is quick.");
    }

    #[test]
    fn test_compress_idempotent() {
        let compressor = compressor();
        let inputs = [
            "A  B\n\n\n\nC. Click here to   see more.  D",
            "Intro\n \n \n \nBody.  All rights reserved\n\n\n",
            "plain text",
            "",
        ];
        for input in inputs {
            let once = compressor.compress(input);
            assert_eq!(compressor.compress(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Compressor::new(&["(unclosed".to_string()]).err().unwrap();
        assert!(matches!(err, ContextError::InvalidPattern { .. }));
    }
}
