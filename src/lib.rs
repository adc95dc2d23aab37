//! langfilter: decides whether short video titles are in a selected set of
//! languages. Text normalization, verdict caching, and the confidence policy
//! applied on top of a pluggable language identifier.

pub mod config;
pub mod detect;
pub mod languages;
pub mod metrics;
pub mod service;

pub use config::{ConfigError, DetectionConfig};
pub use detect::cache::{
    CacheKey, CacheStats, DetectionCache, SweepHandle, DEFAULT_SWEEP_INTERVAL,
};
pub use detect::classifier::{ClassifierPolicy, LanguageClassifier};
pub use detect::fallback::{FallbackStrategy, KeywordFallback, RejectFallback};
pub use detect::identifier::{SignalMode, WhatlangIdentifier};
pub use detect::normalize::{normalize, TextNormalizer};
pub use detect::{
    ClassifierResult, ClassifierSignal, DetectionRequest, IdentifyError, LanguageIdentifier,
};
pub use languages::{LanguageInfo, LanguageRegistry, LanguageSet};
pub use service::{DetectionService, ServiceHandle};

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "langfilter=info";

/// Install the global tracing subscriber. `json` switches to JSON lines.
/// Returns false if a subscriber was already installed.
pub fn init_tracing(json: bool) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.is_ok()
}
