//! Detection configuration.
//! Loaded from a camelCase JSON file; every field is optional and falls back
//! to its default.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::detect::classifier::ClassifierPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectionConfig {
    pub min_length: usize,
    pub cache_max_size: usize,
    pub cache_ttl_ms: u64,
    pub cleanup_interval_ms: u64,
    pub strict_threshold: f32,
    pub context_thresholds: HashMap<String, f32>,
    /// Initially selected languages; filtered through the registry.
    pub target_languages: Vec<String>,
    pub strict_mode: bool,
    /// Periodic debug dump of cache stats. Disabled when absent.
    pub stats_log_interval_ms: Option<u64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_length: 3,
            cache_max_size: 1000,
            cache_ttl_ms: 30 * 60 * 1000,
            cleanup_interval_ms: 5 * 60 * 1000,
            strict_threshold: 0.7,
            context_thresholds: HashMap::new(),
            target_languages: vec!["en".to_string()],
            strict_mode: true,
            stats_log_interval_ms: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config IO error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl DetectionConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("strictThreshold", self.strict_threshold)?;
        for (context, &threshold) in &self.context_thresholds {
            check_threshold(&format!("contextThresholds.{context}"), threshold)?;
        }
        if self.cleanup_interval_ms == 0 {
            return Err(ConfigError::Invalid("cleanupIntervalMs must be > 0".into()));
        }
        if self.stats_log_interval_ms == Some(0) {
            return Err(ConfigError::Invalid("statsLogIntervalMs must be > 0".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn stats_log_interval(&self) -> Option<Duration> {
        self.stats_log_interval_ms.map(Duration::from_millis)
    }

    pub fn classifier_policy(&self) -> ClassifierPolicy {
        ClassifierPolicy {
            min_length: self.min_length,
            strict_threshold: self.strict_threshold,
            context_thresholds: self.context_thresholds.clone(),
        }
    }
}

fn check_threshold(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{field} must be within [0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = DetectionConfig::default();
        assert_eq!(config.min_length, 3);
        assert_eq!(config.cache_max_size, 1000);
        assert_eq!(config.cache_ttl(), Duration::from_secs(1800));
        assert_eq!(config.cleanup_interval(), Duration::from_secs(300));
        assert_eq!(config.strict_threshold, 0.7);
        assert!(config.strict_mode);
        assert_eq!(config.stats_log_interval(), None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = DetectionConfig::from_json(
            r#"{ "minLength": 5, "contextThresholds": { "search": 0.85 }, "targetLanguages": ["tr"] }"#,
        )
        .unwrap();
        assert_eq!(config.min_length, 5);
        assert_eq!(config.cache_max_size, 1000);
        assert_eq!(config.target_languages, vec!["tr".to_string()]);
        assert_eq!(config.classifier_policy().threshold_for(Some("search")), 0.85);
        assert_eq!(config.classifier_policy().threshold_for(Some("homepage")), 0.7);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = DetectionConfig::from_json(r#"{ "contextThresholds": { "search": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("contextThresholds.search"));
    }

    #[test]
    fn rejects_zero_cleanup_interval() {
        let err = DetectionConfig::from_json(r#"{ "cleanupIntervalMs": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = DetectionConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DetectionConfig::load_from_file(Path::new("/nonexistent/langfilter.json"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
