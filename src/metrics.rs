//! Latency histograms for the detection pipeline.
//! Each named metric keeps a bounded window of samples and reports p50/p95/p99.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Measures elapsed time from creation until `finish`.
pub struct TimingSpan {
    name: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    /// Record elapsed microseconds and return them.
    pub fn finish(self) -> f64 {
        let elapsed_us = self.start.elapsed().as_micros() as f64;
        self.registry.record(self.name, elapsed_us);
        elapsed_us
    }
}

/// Sliding window of the most recent samples.
struct SampleWindow {
    samples: Vec<f64>,
    next: usize,
    capacity: usize,
    recorded: u64,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            next: 0,
            capacity,
            recorded: 0,
        }
    }

    fn push(&mut self, value: f64) {
        if self.samples.len() < self.capacity {
            self.samples.push(value);
        } else {
            self.samples[self.next] = value;
        }
        self.next = (self.next + 1) % self.capacity;
        self.recorded += 1;
    }

    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        if self.samples.is_empty() {
            return vec![0.0; ps.len()];
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let last = sorted.len() - 1;
        ps.iter()
            .map(|p| {
                let idx = ((p / 100.0) * last as f64).round() as usize;
                sorted[idx.min(last)]
            })
            .collect()
    }
}

pub struct MetricsRegistry {
    windows: Mutex<HashMap<&'static str, SampleWindow>>,
    window_size: usize,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::with_window(512)
    }

    pub fn with_window(window_size: usize) -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
            window_size: window_size.max(1),
        }
    }

    /// Record a sample in microseconds.
    pub fn record(&self, name: &'static str, value_us: f64) {
        let mut windows = self.windows.lock();
        windows
            .entry(name)
            .or_insert_with(|| SampleWindow::new(self.window_size))
            .push(value_us);
        tracing::trace!(metric = name, value_us, "metric_recorded");
    }

    pub fn span(self: &Arc<Self>, name: &'static str) -> TimingSpan {
        TimingSpan {
            name,
            start: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    pub fn summary(&self) -> HashMap<String, MetricSummary> {
        let windows = self.windows.lock();
        windows
            .iter()
            .map(|(&name, window)| {
                let p = window.percentiles(&[50.0, 95.0, 99.0]);
                (
                    name.to_string(),
                    MetricSummary {
                        p50_us: p[0],
                        p95_us: p[1],
                        p99_us: p[2],
                        count: window.recorded,
                    },
                )
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: u64,
}

/// Well-known metric names.
pub mod metric_names {
    /// Whole `detect` call, cache hits included.
    pub const DETECT: &str = "t_detect";
    /// Classifier run on a cache miss.
    pub const CLASSIFY: &str = "t_classify";
    pub const IDENTIFY: &str = "t_identify";
    pub const FALLBACK: &str = "t_fallback";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_window() {
        let registry = MetricsRegistry::with_window(100);
        for v in 1..=100 {
            registry.record(metric_names::DETECT, v as f64);
        }
        let summary = registry.summary();
        let detect = &summary[metric_names::DETECT];
        assert_eq!(detect.count, 100);
        assert_eq!(detect.p50_us, 51.0);
        assert_eq!(detect.p99_us, 99.0);
    }

    #[test]
    fn window_keeps_latest_samples() {
        let registry = MetricsRegistry::with_window(4);
        for v in [1000.0, 1.0, 2.0, 3.0, 4.0] {
            registry.record(metric_names::CLASSIFY, v);
        }
        let summary = registry.summary();
        let classify = &summary[metric_names::CLASSIFY];
        assert_eq!(classify.count, 5);
        assert_eq!(classify.p99_us, 4.0);
    }

    #[test]
    fn span_records_on_finish() {
        let registry = Arc::new(MetricsRegistry::new());
        let span = registry.span(metric_names::IDENTIFY);
        span.finish();
        assert_eq!(registry.summary()[metric_names::IDENTIFY].count, 1);
    }
}
