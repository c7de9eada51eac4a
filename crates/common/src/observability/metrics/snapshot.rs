use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Immutable point-in-time copy of the collector
///
/// Latencies are kept as microseconds so the snapshot serializes to plain
/// numbers for whatever sink consumes it.
///
/// # Example
/// ```
/// use std::time::Duration;
///
/// use tollgate_common::observability::MetricsCollector;
///
/// let metrics = MetricsCollector::default();
/// metrics.record_latency(Duration::from_millis(10));
/// metrics.record_latency(Duration::from_millis(30));
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.max_latency(), Some(Duration::from_millis(30)));
/// assert_eq!(snapshot.mean_latency(), Some(Duration::from_millis(20)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSnapshot {
    pub requests_submitted: u64,
    pub requests_sent: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub retries_performed: u64,
    pub circuit_opens: u64,
    pub circuit_half_opens: u64,
    pub circuit_closes: u64,
    pub circuit_rejections: u64,
    pub rate_limited_waits: u64,
    pub queue_rejections: u64,
    pub deadline_exceeded: u64,
    /// Total latencies observed, including those not retained in the sample
    pub latency_observations: u64,
    /// Retained latency samples in microseconds, sorted ascending
    pub latency_samples_us: Vec<u64>,
}

impl MetricsSnapshot {
    /// Nearest-rank percentile over the retained samples
    ///
    /// `p` is clamped to `[0.0, 1.0]`. Returns `None` when no samples exist.
    pub fn percentile(&self, p: f64) -> Option<Duration> {
        if self.latency_samples_us.is_empty() {
            return None;
        }

        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) };
        let len = self.latency_samples_us.len();
        let rank = (p * len as f64).ceil() as usize;
        let index = rank.saturating_sub(1).min(len - 1);
        Some(Duration::from_micros(self.latency_samples_us[index]))
    }

    pub fn mean_latency(&self) -> Option<Duration> {
        if self.latency_samples_us.is_empty() {
            return None;
        }
        let total: u128 = self.latency_samples_us.iter().map(|v| u128::from(*v)).sum();
        let mean = total / self.latency_samples_us.len() as u128;
        Some(Duration::from_micros(u64::try_from(mean).unwrap_or(u64::MAX)))
    }

    pub fn max_latency(&self) -> Option<Duration> {
        self.latency_samples_us.last().map(|v| Duration::from_micros(*v))
    }

    /// Requests that reached a terminal outcome
    pub fn requests_completed(&self) -> u64 {
        self.requests_succeeded + self.requests_failed
    }

    /// Fraction of completed requests that succeeded (0.0 when none completed)
    pub fn success_rate(&self) -> f64 {
        let completed = self.requests_completed();
        if completed == 0 {
            return 0.0;
        }
        self.requests_succeeded as f64 / completed as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(samples: &[u64]) -> MetricsSnapshot {
        let mut latency_samples_us = samples.to_vec();
        latency_samples_us.sort_unstable();
        MetricsSnapshot {
            latency_observations: samples.len() as u64,
            latency_samples_us,
            ..MetricsSnapshot::default()
        }
    }

    #[test]
    fn test_percentiles_nearest_rank() {
        let snapshot = snapshot(&(1..=100).collect::<Vec<_>>());
        assert_eq!(snapshot.percentile(0.5), Some(Duration::from_micros(50)));
        assert_eq!(snapshot.percentile(0.99), Some(Duration::from_micros(99)));
        assert_eq!(snapshot.percentile(1.0), Some(Duration::from_micros(100)));
        assert_eq!(snapshot.percentile(0.0), Some(Duration::from_micros(1)));
        assert_eq!(snapshot.percentile(7.0), Some(Duration::from_micros(100)));
    }

    #[test]
    fn test_empty_snapshot_has_no_latency() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.percentile(0.5), None);
        assert_eq!(snapshot.mean_latency(), None);
        assert_eq!(snapshot.max_latency(), None);
        assert!(snapshot.success_rate().abs() < f64::EPSILON);
    }

    #[test]
    fn test_success_rate() {
        let snapshot =
            MetricsSnapshot { requests_succeeded: 3, requests_failed: 1, ..MetricsSnapshot::default() };
        assert_eq!(snapshot.requests_completed(), 4);
        assert!((snapshot.success_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serializes_to_json() {
        let snapshot = snapshot(&[5, 1]);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["latency_samples_us"], serde_json::json!([1, 5]));
        assert_eq!(json["requests_submitted"], 0);
    }
}
