//! Known-language registry.
//! Maps language codes to display names, the Unicode blocks their script lives
//! in, and the common-word lists used by the keyword fallback.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

/// Inclusive code point range of a script block.
pub type ScriptRange = (char, char);

const CJK_IDEOGRAPHS: ScriptRange = ('\u{4E00}', '\u{9FAF}');
const CYRILLIC: ScriptRange = ('\u{0400}', '\u{04FF}');
const ARABIC: &[ScriptRange] = &[('\u{0600}', '\u{06FF}'), ('\u{0750}', '\u{077F}')];
const DEVANAGARI: ScriptRange = ('\u{0900}', '\u{097F}');

/// Common English words. Two distinct hits are required before the keyword
/// fallback accepts a title as English.
const ENGLISH_KEYWORDS: &[&str] = &[
    "the", "be", "to", "of", "and", "a", "in", "that", "have", "i", "it", "for", "not", "on",
    "with", "he", "as", "you", "do", "at", "this", "but", "his", "by", "from", "they", "we",
    "say", "her", "she", "or", "an", "will", "my", "one", "all", "would", "there", "their",
    "what", "so", "up", "out", "if", "about", "who", "get", "which", "go", "me", "when",
    "make", "can", "like", "time", "no", "just", "him", "know", "take", "people", "into",
    "year", "your", "good", "some", "could", "them", "see", "other", "than", "then", "now",
    "look", "only", "come", "its", "over", "think", "also", "back", "after", "use", "two",
    "how", "our", "work", "first", "well", "way", "even", "new", "want", "because", "any",
    "these", "give", "day", "most", "us",
];

/// Static description of one supported language.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    #[serde(skip)]
    pub scripts: &'static [ScriptRange],
    #[serde(skip)]
    pub keywords: &'static [&'static str],
}

impl LanguageInfo {
    const fn latin(code: &'static str, name: &'static str) -> Self {
        Self {
            code,
            name,
            scripts: &[],
            keywords: &[],
        }
    }

    const fn scripted(
        code: &'static str,
        name: &'static str,
        scripts: &'static [ScriptRange],
    ) -> Self {
        Self {
            code,
            name,
            scripts,
            keywords: &[],
        }
    }

    /// True if at least one character of `text` falls in this language's script.
    pub fn contains_script(&self, text: &str) -> bool {
        text.chars()
            .any(|c| self.scripts.iter().any(|&(lo, hi)| c >= lo && c <= hi))
    }
}

const BUILTIN: &[LanguageInfo] = &[
    LanguageInfo {
        code: "en",
        name: "English",
        scripts: &[],
        keywords: ENGLISH_KEYWORDS,
    },
    LanguageInfo::latin("tr", "Türkçe"),
    LanguageInfo::latin("de", "Deutsch"),
    LanguageInfo::latin("fr", "Français"),
    LanguageInfo::latin("es", "Español"),
    LanguageInfo::latin("pt", "Português"),
    LanguageInfo::latin("it", "Italiano"),
    LanguageInfo::latin("nl", "Nederlands"),
    LanguageInfo::latin("pl", "Polski"),
    LanguageInfo::latin("vi", "Tiếng Việt"),
    LanguageInfo::scripted(
        "ja",
        "日本語",
        &[('\u{3040}', '\u{309F}'), ('\u{30A0}', '\u{30FF}'), CJK_IDEOGRAPHS],
    ),
    LanguageInfo::scripted(
        "ko",
        "한국어",
        &[('\u{AC00}', '\u{D7AF}'), ('\u{1100}', '\u{11FF}'), ('\u{3130}', '\u{318F}')],
    ),
    LanguageInfo::scripted("zh", "中文", &[CJK_IDEOGRAPHS]),
    LanguageInfo::scripted("ru", "Русский", &[CYRILLIC]),
    LanguageInfo::scripted("uk", "Українська", &[CYRILLIC]),
    LanguageInfo::scripted("bg", "Български", &[CYRILLIC]),
    LanguageInfo::scripted("sr", "Српски", &[CYRILLIC]),
    LanguageInfo::scripted("ar", "العربية", ARABIC),
    LanguageInfo::scripted("fa", "فارسی", ARABIC),
    LanguageInfo::scripted("ur", "اردو", ARABIC),
    LanguageInfo::scripted("el", "Ελληνικά", &[('\u{0370}', '\u{03FF}')]),
    LanguageInfo::scripted("he", "עברית", &[('\u{0590}', '\u{05FF}')]),
    LanguageInfo::scripted("th", "ไทย", &[('\u{0E00}', '\u{0E7F}')]),
    LanguageInfo::scripted("hi", "हिन्दी", &[DEVANAGARI]),
    LanguageInfo::scripted("mr", "मराठी", &[DEVANAGARI]),
    LanguageInfo::scripted("bn", "বাংলা", &[('\u{0980}', '\u{09FF}')]),
    LanguageInfo::scripted("ta", "தமிழ்", &[('\u{0B80}', '\u{0BFF}')]),
    LanguageInfo::scripted("te", "తెలుగు", &[('\u{0C00}', '\u{0C7F}')]),
    LanguageInfo::scripted("hy", "Հայերեն", &[('\u{0530}', '\u{058F}')]),
    LanguageInfo::scripted("ka", "ქართული", &[('\u{10A0}', '\u{10FF}')]),
];

/// Returns the primary subtag of a language code (`en-US` -> `en`).
pub fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Sorted, de-duplicated set of lowercase language codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct LanguageSet(BTreeSet<String>);

impl LanguageSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Codes joined with `,` in sorted order. Used for cache keys and logs.
    pub fn joined(&self) -> String {
        self.iter().collect::<Vec<_>>().join(",")
    }
}

impl<S: AsRef<str>> FromIterator<S> for LanguageSet {
    /// Builds a set without registry filtering. Codes are lowercased and trimmed.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|c| c.as_ref().trim().to_lowercase())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    }
}

/// Registry of languages a user may select.
pub struct LanguageRegistry {
    languages: BTreeMap<&'static str, LanguageInfo>,
}

impl LanguageRegistry {
    /// Registry with every built-in language.
    pub fn builtin() -> Self {
        Self {
            languages: BUILTIN.iter().map(|l| (l.code, l.clone())).collect(),
        }
    }

    /// Registry restricted to the given built-in codes.
    pub fn with_codes(codes: &[&str]) -> Self {
        Self {
            languages: BUILTIN
                .iter()
                .filter(|l| codes.contains(&l.code))
                .map(|l| (l.code, l.clone()))
                .collect(),
        }
    }

    pub fn get(&self, code: &str) -> Option<&LanguageInfo> {
        self.languages.get(code)
    }

    pub fn is_known(&self, code: &str) -> bool {
        self.languages.contains_key(code)
    }

    pub fn all(&self) -> impl Iterator<Item = &LanguageInfo> {
        self.languages.values()
    }

    /// Keeps only codes present in the registry. Unknown codes are dropped
    /// silently (debug-logged).
    pub fn select<I, S>(&self, codes: I) -> LanguageSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let requested: LanguageSet = codes.into_iter().collect();
        let (known, unknown): (Vec<&str>, Vec<&str>) =
            requested.iter().partition(|c| self.is_known(c));
        if !unknown.is_empty() {
            debug!(unknown = ?unknown, "dropping unknown language codes");
        }
        known.into_iter().collect()
    }

    /// Script ranges for `code`, falling back to its primary subtag.
    fn info_for(&self, code: &str) -> Option<&LanguageInfo> {
        self.get(code).or_else(|| self.get(primary_subtag(code)))
    }

    /// True unless `code` has a script and `text` contains none of it.
    /// Languages without a script (Latin-based) always pass.
    pub fn has_language_characters(&self, text: &str, code: &str) -> bool {
        match self.info_for(code) {
            Some(info) if !info.scripts.is_empty() => info.contains_script(text),
            _ => true,
        }
    }

    /// True if `text` could plausibly be in any of `targets`, judged by script
    /// alone.
    pub fn could_match_any(&self, text: &str, targets: &LanguageSet) -> bool {
        targets.iter().any(|t| self.has_language_characters(text, t))
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
