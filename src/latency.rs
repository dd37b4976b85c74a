use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub const LATENCY_WINDOW: usize = 50;

struct LatencyWindow {
    samples: VecDeque<Duration>,
    failures: u64,
}

/// Rolling window over the most recent device call latencies.
#[derive(Clone)]
pub struct LatencyTracker {
    window: Arc<Mutex<LatencyWindow>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LatencyStats {
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
    pub samples: usize,
    pub failures: u64,
}

impl fmt::Display for LatencyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Latency: avg={:.1}ms, min={:.1}ms, max={:.1}ms ({} samples, {} failed)",
            self.average.as_secs_f64() * 1000.0,
            self.min.as_secs_f64() * 1000.0,
            self.max.as_secs_f64() * 1000.0,
            self.samples,
            self.failures
        )
    }
}

impl LatencyTracker {
    pub fn new() -> LatencyTracker {
        LatencyTracker {
            window: Arc::new(Mutex::new(LatencyWindow {
                samples: VecDeque::with_capacity(LATENCY_WINDOW),
                failures: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LatencyWindow> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_latency(&self, sample: Duration) {
        let mut window = self.lock();
        if window.samples.len() == LATENCY_WINDOW {
            window.samples.pop_front();
        }
        window.samples.push_back(sample);
    }

    pub fn record_failure(&self) {
        self.lock().failures += 1;
    }

    pub fn failures(&self) -> u64 {
        self.lock().failures
    }

    /// `None` until the first successful call has been recorded.
    pub fn stats(&self) -> Option<LatencyStats> {
        let window = self.lock();
        let min = *window.samples.iter().min()?;
        let max = *window.samples.iter().max()?;
        let total: Duration = window.samples.iter().sum();

        Some(LatencyStats {
            average: total / window.samples.len() as u32,
            min,
            max,
            samples: window.samples.len(),
            failures: window.failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_has_no_stats() {
        let tracker = LatencyTracker::new();
        assert_eq!(tracker.stats(), None);
        tracker.record_failure();
        assert_eq!(tracker.stats(), None);
    }

    #[test]
    fn stats_over_window() {
        let tracker = LatencyTracker::new();
        for ms in [30, 10, 20] {
            tracker.record_latency(Duration::from_millis(ms));
        }

        let stats = tracker.stats().unwrap();
        assert_eq!(stats.average, Duration::from_millis(20));
        assert_eq!(stats.min, Duration::from_millis(10));
        assert_eq!(stats.max, Duration::from_millis(30));
        assert_eq!(stats.samples, 3);
    }

    #[test]
    fn oldest_sample_is_evicted() {
        let tracker = LatencyTracker::new();
        // 1ms..=51ms, the first one falls out
        for ms in 1..=51 {
            tracker.record_latency(Duration::from_millis(ms));
        }

        let stats = tracker.stats().unwrap();
        assert_eq!(stats.samples, LATENCY_WINDOW);
        assert_eq!(stats.min, Duration::from_millis(2));
        assert_eq!(stats.max, Duration::from_millis(51));
        assert_eq!(stats.average, Duration::from_micros(26_500));
    }

    #[test]
    fn display_in_milliseconds() {
        let tracker = LatencyTracker::new();
        tracker.record_latency(Duration::from_micros(12_340));
        tracker.record_failure();
        assert_eq!(
            tracker.stats().unwrap().to_string(),
            "Latency: avg=12.3ms, min=12.3ms, max=12.3ms (1 samples, 1 failed)"
        );
    }
}
