//! Heuristic classification used when no identifier is available.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::languages::{primary_subtag, LanguageRegistry, LanguageSet};

/// Minimum number of distinct common-word hits for a keyword match.
const MIN_KEYWORD_HITS: usize = 2;

/// Accented Latin letters tolerated inside otherwise-ASCII English titles.
const ALLOWED_ACCENTS: &str = "àáäâèéëêìíïîòóöôùúüûñç";

/// Pluggable verdict source for when the identifier is missing or not ready.
pub trait FallbackStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// `text` is already normalized.
    fn classify(&self, text: &str, targets: &LanguageSet, strict: bool) -> bool;
}

/// Script and common-word matching against the registry.
pub struct KeywordFallback {
    registry: Arc<LanguageRegistry>,
}

impl KeywordFallback {
    pub fn new(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    fn keyword_hits(text: &str, keywords: &[&str]) -> usize {
        text.split(|c: char| !c.is_alphanumeric() && c != '\'')
            .filter(|w| keywords.contains(w))
            .collect::<HashSet<_>>()
            .len()
    }

    fn is_latin_text(text: &str) -> bool {
        text.chars()
            .all(|c| c.is_ascii() || ALLOWED_ACCENTS.contains(c))
    }

    fn matches_target(&self, text: &str, target: &str, strict: bool) -> bool {
        let Some(info) = self.registry.get(primary_subtag(target)) else {
            return false;
        };
        if !info.scripts.is_empty() {
            return info.contains_script(text);
        }
        if !info.keywords.is_empty() {
            return Self::is_latin_text(text)
                && Self::keyword_hits(text, info.keywords) >= MIN_KEYWORD_HITS;
        }
        // No usable signal for this language.
        !strict
    }
}

impl FallbackStrategy for KeywordFallback {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn classify(&self, text: &str, targets: &LanguageSet, strict: bool) -> bool {
        let verdict = targets.iter().any(|t| self.matches_target(text, t, strict));
        debug!(
            targets = %targets.joined(),
            strict,
            verdict,
            "fallback_classified"
        );
        verdict
    }
}

/// Treats everything as non-matching.
pub struct RejectFallback;

impl FallbackStrategy for RejectFallback {
    fn name(&self) -> &'static str {
        "reject"
    }

    fn classify(&self, _text: &str, _targets: &LanguageSet, _strict: bool) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(codes: &[&str]) -> LanguageSet {
        codes.iter().collect()
    }

    fn fallback() -> KeywordFallback {
        KeywordFallback::new(Arc::new(LanguageRegistry::builtin()))
    }

    #[test]
    fn english_needs_two_common_words() {
        let fb = fallback();
        assert!(fb.classify("how to make the best pizza", &set(&["en"]), true));
        assert!(!fb.classify("pizza napoletana", &set(&["en"]), true));
        // Repeating one word is still a single hit.
        assert!(!fb.classify("the the the", &set(&["en"]), true));
    }

    #[test]
    fn english_rejects_foreign_letters() {
        let fb = fallback();
        assert!(!fb.classify("the best şarkı of the year", &set(&["en"]), false));
        assert!(fb.classify("the café you should know", &set(&["en"]), false));
    }

    #[test]
    fn scripted_languages_match_by_characters() {
        let fb = fallback();
        assert!(fb.classify("東京の夜", &set(&["ja"]), true));
        assert!(!fb.classify("tokyo at night", &set(&["ja"]), true));
    }

    #[test]
    fn latin_without_keywords_depends_on_strictness() {
        let fb = fallback();
        assert!(!fb.classify("bu bir başlık", &set(&["tr"]), true));
        assert!(fb.classify("bu bir başlık", &set(&["tr"]), false));
    }

    #[test]
    fn reject_fallback_always_false() {
        assert!(!RejectFallback.classify("how to make the best pizza", &set(&["en"]), false));
    }
}
