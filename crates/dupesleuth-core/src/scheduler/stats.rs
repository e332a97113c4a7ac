/// Concurrency statistics and the latency sample window behind them.
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

/// Snapshot of the scheduler's counters, safe to hand to a UI or report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConcurrencyStats {
    /// Operations admitted since the scheduler was created.
    pub total_ops: u64,
    pub completed_ops: u64,
    pub failed_ops: u64,
    /// Mean latency of all completed operations.
    pub avg_latency: Duration,
    /// Percentiles over the recent sample window.
    pub p50_latency: Duration,
    pub p95_latency: Duration,
    pub current_concurrency: usize,
    pub max_concurrency: usize,
}

/// Ring of recent latency samples plus a running total for the mean.
#[derive(Debug, Clone)]
pub(crate) struct LatencyWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
    total: Duration,
    count: u64,
    p50: Duration,
    p95: Duration,
}

impl LatencyWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total: Duration::ZERO,
            count: 0,
            p50: Duration::ZERO,
            p95: Duration::ZERO,
        }
    }

    pub(crate) fn record(&mut self, latency: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(latency);
        self.total += latency;
        self.count += 1;
    }

    /// Recompute p50/p95 from the window. O(n log n) over at most
    /// `capacity` samples; callers do this every adjust interval, not per op.
    pub(crate) fn refresh_percentiles(&mut self) {
        if self.samples.is_empty() {
            return;
        }
        let mut sorted: Vec<Duration> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        self.p50 = percentile(&sorted, 50);
        self.p95 = percentile(&sorted, 95);
    }

    pub(crate) fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total.as_nanos() / u128::from(self.count);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub(crate) fn p50(&self) -> Duration {
        self.p50
    }

    pub(crate) fn p95(&self) -> Duration {
        self.p95
    }
}

/// Nearest-rank percentile of an ascending, non-empty slice.
pub(crate) fn percentile(sorted: &[Duration], pct: usize) -> Duration {
    let rank = (pct * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn percentiles_use_nearest_rank() {
        let mut w = LatencyWindow::new(100);
        for i in 1..=100 {
            w.record(ms(i));
        }
        w.refresh_percentiles();
        assert_eq!(w.p50(), ms(50));
        assert_eq!(w.p95(), ms(95));
    }

    #[test]
    fn window_evicts_oldest_but_mean_covers_all() {
        let mut w = LatencyWindow::new(2);
        w.record(ms(30));
        w.record(ms(10));
        w.record(ms(20));
        w.refresh_percentiles();
        // Window now holds [10, 20].
        assert_eq!(w.p50(), ms(10));
        assert_eq!(w.p95(), ms(20));
        assert_eq!(w.mean(), ms(20));
    }

    #[test]
    fn empty_window_reports_zero() {
        let mut w = LatencyWindow::new(8);
        w.refresh_percentiles();
        assert_eq!(w.mean(), Duration::ZERO);
        assert_eq!(w.p50(), Duration::ZERO);
    }
}
