//! Text canonicalization for cache keys and identifier input.
//! Lowercase, drop ASCII punctuation/symbols, collapse whitespace.
//! Anything at or above U+0080 is kept so non-Latin scripts survive intact.

use std::sync::LazyLock;

use regex::Regex;

static DEFAULT: LazyLock<TextNormalizer> = LazyLock::new(TextNormalizer::new);

pub struct TextNormalizer {
    strip: Regex,
    whitespace: Regex,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self {
            // Not an ASCII word char, not whitespace, not extended range.
            strip: Regex::new(r"[^0-9A-Za-z_\s\x{80}-\x{10FFFF}]+").unwrap(),
            whitespace: Regex::new(r"\s+").unwrap(),
        }
    }

    /// Canonicalize `text`. Idempotent: stripping runs before whitespace
    /// collapse so removed symbols never leave double spaces behind.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        let stripped = self.strip.replace_all(&lowered, "");
        self.whitespace
            .replace_all(&stripped, " ")
            .trim()
            .to_string()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize with the shared default normalizer.
pub fn normalize(text: &str) -> String {
    DEFAULT.normalize(text)
}
