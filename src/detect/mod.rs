//! Language detection pipeline.
//! normalize → cache → classifier (identifier or fallback heuristic).

pub mod cache;
pub mod classifier;
pub mod fallback;
pub mod identifier;
pub mod normalize;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::languages::LanguageSet;
use cache::CacheKey;

/// One detection call: text plus the policy it is judged under.
#[derive(Debug, Clone)]
pub struct DetectionRequest {
    pub text: String,
    pub target_languages: LanguageSet,
    pub strict: bool,
    /// Caller context tag (e.g. "search", "homepage") selecting a threshold.
    pub context: Option<String>,
}

impl DetectionRequest {
    pub fn new(text: impl Into<String>, target_languages: LanguageSet, strict: bool) -> Self {
        Self {
            text: text.into(),
            target_languages,
            strict,
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Cache key over the normalized text and the policy.
    pub fn cache_key(&self, normalizer: &normalize::TextNormalizer) -> CacheKey {
        CacheKey::compute(
            &normalizer.normalize(&self.text),
            &self.target_languages,
            self.strict,
            self.context.as_deref(),
        )
    }
}

/// Confidence signal reported by an identifier. Backends report either a
/// single reliability flag or per-language scores in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierSignal {
    Reliability(bool),
    Scores(HashMap<String, f32>),
}

/// Raw identifier output for one text. Not persisted beyond the call.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierResult {
    /// Best-guess language code; `None` when undetermined.
    pub language: Option<String>,
    pub signal: ClassifierSignal,
}

impl ClassifierResult {
    pub fn reliable(language: impl Into<String>, reliable: bool) -> Self {
        Self {
            language: Some(language.into()),
            signal: ClassifierSignal::Reliability(reliable),
        }
    }

    pub fn scored<I, S>(language: impl Into<String>, scores: I) -> Self
    where
        I: IntoIterator<Item = (S, f32)>,
        S: Into<String>,
    {
        Self {
            language: Some(language.into()),
            signal: ClassifierSignal::Scores(
                scores.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ),
        }
    }

    pub fn undetermined() -> Self {
        Self {
            language: None,
            signal: ClassifierSignal::Reliability(false),
        }
    }
}

#[derive(Debug)]
pub enum IdentifyError {
    /// Backend not present at all.
    Unavailable,
    /// Backend present but its model is still loading.
    Loading,
    /// Backend ran and failed.
    Failed(String),
}

impl std::fmt::Display for IdentifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifyError::Unavailable => write!(f, "language identifier unavailable"),
            IdentifyError::Loading => write!(f, "language identifier still loading"),
            IdentifyError::Failed(msg) => write!(f, "language identification failed: {msg}"),
        }
    }
}

impl std::error::Error for IdentifyError {}

/// External language identification capability (adapter for different backends).
#[async_trait]
pub trait LanguageIdentifier: Send + Sync {
    async fn identify(&self, text: &str) -> Result<ClassifierResult, IdentifyError>;
}
