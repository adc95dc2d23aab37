//! Detection service: the single entry point used by the page layer.
//! Owns the active language policy, the verdict cache and the classifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DetectionConfig;
use crate::detect::cache::{CacheStats, DetectionCache, SweepHandle};
use crate::detect::classifier::{ClassifierPolicy, LanguageClassifier};
use crate::detect::fallback::{FallbackStrategy, KeywordFallback};
use crate::detect::normalize::TextNormalizer;
use crate::detect::{DetectionRequest, LanguageIdentifier};
use crate::languages::{LanguageRegistry, LanguageSet};
use crate::metrics::{metric_names, MetricSummary, MetricsRegistry};

/// Policy applied by `detect_active`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActivePolicy {
    languages: LanguageSet,
    strict: bool,
}

pub struct DetectionService {
    normalizer: TextNormalizer,
    cache: Arc<DetectionCache>,
    classifier: LanguageClassifier,
    registry: Arc<LanguageRegistry>,
    policy: RwLock<ActivePolicy>,
    metrics: Arc<MetricsRegistry>,
    cleanup_interval: Duration,
    stats_log_interval: Option<Duration>,
}

impl DetectionService {
    /// Service over the built-in registry with the keyword fallback.
    pub fn new(config: &DetectionConfig, identifier: Option<Arc<dyn LanguageIdentifier>>) -> Self {
        let registry = Arc::new(LanguageRegistry::builtin());
        let fallback = Arc::new(KeywordFallback::new(Arc::clone(&registry)));
        Self::with_parts(config, identifier, fallback, registry)
    }

    pub fn with_parts(
        config: &DetectionConfig,
        identifier: Option<Arc<dyn LanguageIdentifier>>,
        fallback: Arc<dyn FallbackStrategy>,
        registry: Arc<LanguageRegistry>,
    ) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "detection config failed validation");
        }
        let metrics = Arc::new(MetricsRegistry::new());
        let classifier = LanguageClassifier::new(
            identifier,
            fallback,
            Arc::clone(&registry),
            config.classifier_policy(),
            Arc::clone(&metrics),
        );
        let policy = ActivePolicy {
            languages: registry.select(&config.target_languages),
            strict: config.strict_mode,
        };
        info!(
            languages = %policy.languages.joined(),
            strict = policy.strict,
            identifier = classifier.has_identifier(),
            "detection service created"
        );

        Self {
            normalizer: TextNormalizer::new(),
            cache: Arc::new(DetectionCache::new(config.cache_max_size, config.cache_ttl())),
            classifier,
            registry,
            policy: RwLock::new(policy),
            metrics,
            cleanup_interval: config.cleanup_interval(),
            stats_log_interval: config.stats_log_interval().filter(|every| !every.is_zero()),
        }
    }

    /// Start background maintenance: the cache sweeper and, if configured,
    /// periodic stats logging. Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> ServiceHandle {
        let sweeper = self.cache.start_sweeper(self.cleanup_interval);
        let token = CancellationToken::new();
        let stats_logger = self
            .stats_log_interval
            .map(|every| spawn_stats_logger(Arc::downgrade(self), every, token.child_token()));
        info!(
            cleanup_interval_ms = self.cleanup_interval.as_millis() as u64,
            stats_logging = stats_logger.is_some(),
            "detection service started"
        );
        ServiceHandle {
            sweeper: Some(sweeper),
            token,
            stats_logger,
        }
    }

    /// Is `text` in one of `targets` under the given strictness?
    pub async fn detect(&self, text: &str, targets: &LanguageSet, strict: bool) -> bool {
        self.detect_request(&DetectionRequest::new(text, targets.clone(), strict))
            .await
    }

    /// Like `detect`, with a caller context tag selecting the threshold.
    pub async fn detect_in_context(
        &self,
        text: &str,
        targets: &LanguageSet,
        strict: bool,
        context: &str,
    ) -> bool {
        let request = DetectionRequest::new(text, targets.clone(), strict).with_context(context);
        self.detect_request(&request).await
    }

    /// Detect under the service's current language selection and strictness.
    pub async fn detect_active(&self, text: &str) -> bool {
        let policy = self.policy.read().clone();
        self.detect(text, &policy.languages, policy.strict).await
    }

    pub async fn detect_request(&self, request: &DetectionRequest) -> bool {
        if self.classifier.policy().is_too_short(&request.text) {
            return false;
        }
        let targets = self.registry.select(request.target_languages.iter());
        if targets.is_empty() {
            return false;
        }
        let request = DetectionRequest {
            target_languages: targets,
            ..request.clone()
        };

        let span = self.metrics.span(metric_names::DETECT);
        let key = request.cache_key(&self.normalizer);
        if let Some(verdict) = self.cache.get(&key) {
            span.finish();
            return verdict;
        }

        let classify_span = self.metrics.span(metric_names::CLASSIFY);
        let verdict = self
            .classifier
            .classify_in_context(
                &request.text,
                &request.target_languages,
                request.strict,
                request.context.as_deref(),
            )
            .await;
        classify_span.finish();

        // Negative verdicts from swallowed errors are cached too.
        self.cache.set(key, verdict);
        span.finish();
        verdict
    }

    /// Replace the selected languages. Unknown codes are dropped. Returns
    /// true (and clears the cache) only if the effective selection changed.
    pub fn set_target_languages<I, S>(&self, codes: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let languages = self.registry.select(codes);
        let mut policy = self.policy.write();
        if policy.languages == languages {
            return false;
        }
        info!(from = %policy.languages.joined(), to = %languages.joined(), "target languages changed");
        policy.languages = languages;
        self.cache.clear();
        true
    }

    /// Toggle strict mode. Returns true (and clears the cache) on change.
    pub fn set_strict_mode(&self, strict: bool) -> bool {
        let mut policy = self.policy.write();
        if policy.strict == strict {
            return false;
        }
        info!(strict, "strict mode changed");
        policy.strict = strict;
        self.cache.clear();
        true
    }

    pub fn target_languages(&self) -> LanguageSet {
        self.policy.read().languages.clone()
    }

    pub fn strict_mode(&self) -> bool {
        self.policy.read().strict
    }

    /// Filter `codes` down to languages this service knows.
    pub fn select_languages<I, S>(&self, codes: I) -> LanguageSet
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.registry.select(codes)
    }

    pub fn registry(&self) -> &LanguageRegistry {
        &self.registry
    }

    pub fn classifier_policy(&self) -> &ClassifierPolicy {
        self.classifier.policy()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("detection cache cleared");
    }

    pub fn metrics_summary(&self) -> HashMap<String, MetricSummary> {
        self.metrics.summary()
    }
}

fn spawn_stats_logger(
    service: std::sync::Weak<DetectionService>,
    every: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(service) = service.upgrade() else { break };
                    let stats = service.stats();
                    debug!(
                        size = stats.size,
                        hits = stats.hits,
                        misses = stats.misses,
                        hit_rate = %stats.hit_rate,
                        "cache stats"
                    );
                }
            }
        }
    })
}

/// Background resources of a started service. Stopped on `stop()` or drop.
pub struct ServiceHandle {
    sweeper: Option<SweepHandle>,
    token: CancellationToken,
    stats_logger: Option<JoinHandle<()>>,
}

impl ServiceHandle {
    pub fn stop(&self) {
        if let Some(sweeper) = &self.sweeper {
            sweeper.stop();
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() && self.sweeper.as_ref().map_or(true, SweepHandle::is_stopped)
    }

    /// Stop and wait for background tasks to exit. Returns false if any of
    /// them panicked or was aborted.
    pub async fn shutdown(mut self) -> bool {
        self.stop();
        let mut clean = true;
        if let Some(task) = self.stats_logger.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "stats logger task failed");
                clean = false;
            }
        }
        if let Some(sweeper) = self.sweeper.take() {
            clean &= sweeper.join().await;
        }
        info!(clean, "detection service stopped");
        clean
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::cache::DEFAULT_SWEEP_INTERVAL;
    use crate::detect::fallback::RejectFallback;

    fn service() -> DetectionService {
        DetectionService::new(&DetectionConfig::default(), None)
    }

    #[test]
    fn initial_policy_comes_from_config() {
        let config = DetectionConfig {
            target_languages: vec!["tr".into(), "zz".into(), "en".into()],
            strict_mode: false,
            ..DetectionConfig::default()
        };
        let svc = DetectionService::new(&config, None);
        assert_eq!(svc.target_languages().joined(), "en,tr");
        assert!(!svc.strict_mode());
    }

    #[test]
    fn setters_are_idempotent() {
        let svc = service();
        assert!(!svc.set_strict_mode(true));
        assert!(svc.set_strict_mode(false));
        assert!(!svc.set_strict_mode(false));

        assert!(!svc.set_target_languages(["en"]));
        assert!(!svc.set_target_languages(["EN", "unknown"]));
        assert!(svc.set_target_languages(["en", "tr"]));
        assert!(!svc.set_target_languages(["tr", "en"]));
    }

    #[tokio::test]
    async fn detect_active_uses_current_policy() {
        let svc = service();
        assert!(svc.detect_active("how to make the best pizza at home").await);
        svc.set_target_languages(["ja"]);
        assert!(!svc.detect_active("how to make the best pizza at home").await);
        assert!(svc.detect_active("東京の夜景を歩く").await);
    }

    #[tokio::test]
    async fn context_is_part_of_cache_key() {
        let svc = service();
        let en = svc.select_languages(["en"]);
        svc.detect("how to make the best pizza", &en, true).await;
        svc.detect_in_context("how to make the best pizza", &en, true, "search")
            .await;
        let stats = svc.stats();
        assert_eq!(stats.misses, 2);
        assert_eq!(stats.size, 2);
    }

    #[tokio::test]
    async fn metrics_recorded_per_detect() {
        let svc = DetectionService::with_parts(
            &DetectionConfig::default(),
            None,
            Arc::new(RejectFallback),
            Arc::new(LanguageRegistry::builtin()),
        );
        let en = svc.select_languages(["en"]);
        svc.detect("some title here", &en, true).await;
        svc.detect("some title here", &en, true).await;
        let summary = svc.metrics_summary();
        assert_eq!(summary[metric_names::DETECT].count, 2);
        assert_eq!(summary[metric_names::CLASSIFY].count, 1);
        assert_eq!(summary[metric_names::FALLBACK].count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_stops_background_tasks() {
        let config = DetectionConfig {
            stats_log_interval_ms: Some(1000),
            cleanup_interval_ms: 1000,
            ..DetectionConfig::default()
        };
        let svc = Arc::new(DetectionService::new(&config, None));
        let handle = svc.start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!handle.is_stopped());
        handle.stop();
        assert!(handle.is_stopped());
        assert!(handle.shutdown().await);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_intervals_keep_background_tasks_alive() {
        let config = DetectionConfig {
            cache_ttl_ms: 1_000,
            cleanup_interval_ms: 0,
            stats_log_interval_ms: Some(0),
            ..DetectionConfig::default()
        };
        let svc = Arc::new(DetectionService::new(&config, None));
        let handle = svc.start();
        assert!(svc.detect_active("how to make the best pizza at home").await);
        assert_eq!(svc.stats().size, 1);

        tokio::time::sleep(DEFAULT_SWEEP_INTERVAL + Duration::from_secs(1)).await;
        assert_eq!(svc.stats().size, 0);
        assert!(handle.shutdown().await);
    }
}
