//! Verdict policy on top of the external identifier.
//! Length gate → script pre-filter → identify (or fallback) → threshold /
//! strict-mode checks → target match with region variants.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use super::fallback::FallbackStrategy;
use super::normalize::TextNormalizer;
use super::{ClassifierResult, ClassifierSignal, IdentifyError, LanguageIdentifier};
use crate::languages::{primary_subtag, LanguageRegistry, LanguageSet};
use crate::metrics::{metric_names, MetricsRegistry};

/// Thresholds and gates applied to identifier output.
#[derive(Debug, Clone)]
pub struct ClassifierPolicy {
    /// Trimmed texts shorter than this (in chars) are rejected outright.
    pub min_length: usize,
    /// Minimum score for a strict-mode match when the identifier reports scores.
    pub strict_threshold: f32,
    /// Per-context overrides of `strict_threshold`.
    pub context_thresholds: HashMap<String, f32>,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            min_length: 3,
            strict_threshold: 0.7,
            context_thresholds: HashMap::new(),
        }
    }
}

impl ClassifierPolicy {
    pub fn threshold_for(&self, context: Option<&str>) -> f32 {
        context
            .and_then(|c| self.context_thresholds.get(c))
            .copied()
            .unwrap_or(self.strict_threshold)
    }

    pub fn is_too_short(&self, text: &str) -> bool {
        text.trim().chars().count() < self.min_length
    }
}

/// True if `detected` is `target` or a regional variant of it.
pub fn language_matches(detected: &str, target: &str) -> bool {
    let detected = detected.to_lowercase();
    detected == target || primary_subtag(&detected) == primary_subtag(target)
}

pub struct LanguageClassifier {
    identifier: Option<Arc<dyn LanguageIdentifier>>,
    fallback: Arc<dyn FallbackStrategy>,
    registry: Arc<LanguageRegistry>,
    normalizer: TextNormalizer,
    policy: ClassifierPolicy,
    metrics: Arc<MetricsRegistry>,
}

impl LanguageClassifier {
    pub fn new(
        identifier: Option<Arc<dyn LanguageIdentifier>>,
        fallback: Arc<dyn FallbackStrategy>,
        registry: Arc<LanguageRegistry>,
        policy: ClassifierPolicy,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            identifier,
            fallback,
            registry,
            normalizer: TextNormalizer::new(),
            policy,
            metrics,
        }
    }

    pub fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }

    pub async fn classify(&self, text: &str, targets: &LanguageSet, strict: bool) -> bool {
        self.classify_in_context(text, targets, strict, None).await
    }

    /// Final verdict for `text`. Never fails: every fault is logged and
    /// becomes `false`.
    pub async fn classify_in_context(
        &self,
        text: &str,
        targets: &LanguageSet,
        strict: bool,
        context: Option<&str>,
    ) -> bool {
        if self.policy.is_too_short(text) || targets.is_empty() {
            return false;
        }
        if !self.registry.could_match_any(text, targets) {
            debug!(targets = %targets.joined(), "script pre-filter rejected");
            return false;
        }

        let normalized = self.normalizer.normalize(text);
        let Some(identifier) = &self.identifier else {
            return self.run_fallback(&normalized, targets, strict);
        };

        let span = self.metrics.span(metric_names::IDENTIFY);
        let outcome = identifier.identify(&normalized).await;
        span.finish();

        match outcome {
            Ok(result) => self.evaluate(text, &result, targets, strict, context),
            Err(e @ (IdentifyError::Unavailable | IdentifyError::Loading)) => {
                debug!(error = %e, fallback = self.fallback.name(), "identifier not ready");
                self.run_fallback(&normalized, targets, strict)
            }
            Err(e) => {
                warn!(error = %e, "identifier failed, treating as non-matching");
                false
            }
        }
    }

    fn run_fallback(&self, normalized: &str, targets: &LanguageSet, strict: bool) -> bool {
        let span = self.metrics.span(metric_names::FALLBACK);
        let verdict = self.fallback.classify(normalized, targets, strict);
        span.finish();
        verdict
    }

    /// Apply the confidence policy and match rule to one identifier result.
    pub fn evaluate(
        &self,
        text: &str,
        result: &ClassifierResult,
        targets: &LanguageSet,
        strict: bool,
        context: Option<&str>,
    ) -> bool {
        let detected = match result.language.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang,
            // No signal: don't penalize content unless strict.
            _ => return !strict,
        };

        let matched: Vec<&str> = targets
            .iter()
            .filter(|t| language_matches(detected, t))
            .collect();

        if strict {
            let passes = match &result.signal {
                ClassifierSignal::Reliability(reliable) => *reliable,
                ClassifierSignal::Scores(scores) => {
                    let threshold = self.policy.threshold_for(context);
                    matched
                        .iter()
                        .any(|t| best_score(scores, t).is_some_and(|s| s >= threshold))
                }
            };
            if !passes {
                debug!(lang = detected, "strict mode: low confidence");
                return false;
            }
        }

        if matched.is_empty() {
            debug!(lang = detected, targets = %targets.joined(), "not a target language");
            return false;
        }

        // Identifier claims a scripted language but the text has none of it.
        if !self.registry.has_language_characters(text, detected) {
            debug!(lang = detected, "detected language script missing from text");
            return false;
        }

        true
    }
}

/// Highest score among entries that are `target` or a variant of it.
fn best_score(scores: &HashMap<String, f32>, target: &str) -> Option<f32> {
    scores
        .iter()
        .filter(|(lang, _)| language_matches(lang, target))
        .map(|(_, score)| *score)
        .reduce(f32::max)
}
