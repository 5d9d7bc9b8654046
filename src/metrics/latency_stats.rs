use std::time::Duration;

use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};

/// Distribution of per-operation latency across the timed samples of one
/// case, in nanoseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyPercentiles {
    pub p50_ns: f64,

    pub p90_ns: f64,

    pub p99_ns: f64,

    pub min_ns: f64,

    pub max_ns: f64,

    pub mean_ns: f64,

    pub sample_count: u64,
}

pub struct LatencyTracker {
    histogram: Histogram<u64>,
    sample_count: u64,
}

impl Default for LatencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LatencyTracker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            histogram: Histogram::new_with_bounds(1, 60_000_000_000, 3)
                .expect("Valid histogram bounds"),
            sample_count: 0,
        }
    }

    /// Sub-nanosecond latencies are clamped to the 1ns floor.
    pub fn record(&mut self, per_op: Duration) {
        let nanos = u64::try_from(per_op.as_nanos()).unwrap_or(u64::MAX).max(1);
        if self.histogram.record(nanos).is_ok() {
            self.sample_count += 1;
        } else {
            log::warn!("Latency sample {nanos}ns is outside the histogram range, dropped");
        }
    }

    #[must_use]
    pub const fn sample_count(&self) -> u64 {
        self.sample_count
    }

    #[must_use]
    pub fn get_percentiles(&self) -> LatencyPercentiles {
        if self.sample_count == 0 {
            return LatencyPercentiles {
                p50_ns: 0.0,
                p90_ns: 0.0,
                p99_ns: 0.0,
                min_ns: 0.0,
                max_ns: 0.0,
                mean_ns: 0.0,
                sample_count: 0,
            };
        }

        let ns = |v: u64| v as f64;

        LatencyPercentiles {
            p50_ns: ns(self.histogram.value_at_quantile(0.50)),
            p90_ns: ns(self.histogram.value_at_quantile(0.90)),
            p99_ns: ns(self.histogram.value_at_quantile(0.99)),
            min_ns: ns(self.histogram.min()),
            max_ns: ns(self.histogram.max()),
            mean_ns: self.histogram.mean(),
            sample_count: self.sample_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tracker_reports_zeroes() {
        let stats = LatencyTracker::new().get_percentiles();

        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.max_ns, 0.0);
    }

    #[test]
    fn test_percentiles_follow_samples() {
        let mut tracker = LatencyTracker::new();
        for nanos in [100, 200, 300, 400] {
            tracker.record(Duration::from_nanos(nanos));
        }

        let stats = tracker.get_percentiles();

        assert_eq!(stats.sample_count, 4);
        assert_eq!(stats.min_ns, 100.0);
        assert!((399.0..=401.0).contains(&stats.max_ns));
        assert!((249.0..=251.0).contains(&stats.mean_ns));
    }

    #[test]
    fn test_zero_latency_is_clamped() {
        let mut tracker = LatencyTracker::new();
        tracker.record(Duration::ZERO);

        assert_eq!(tracker.sample_count(), 1);
        assert_eq!(tracker.get_percentiles().min_ns, 1.0);
    }
}
