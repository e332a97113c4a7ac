/// Adaptive I/O scheduler — limits how many reads are in flight against
/// storage and tunes that limit from observed latency.
///
/// Spinning disks collapse under too many concurrent reads (seek storms)
/// while NVMe devices need deep queues to reach full throughput. Rather
/// than hard-coding one level, the scheduler runs an AIMD controller:
///
/// - every `adjust_interval` successful completions it compares the median
///   latency of that batch with the p50 of the recent window;
/// - above `backoff_ratio × p50` → concurrency drops by a quarter (min 1);
/// - at or below `stable_ratio × p50` → concurrency rises by one;
/// - always clamped to `[min_concurrency, max_concurrency]`.
///
/// Each in-flight read holds a `read_size` buffer. A level whose buffers do
/// not fit in `memory_budget` is never entered; the controller stays at the
/// last affordable level instead.
///
/// # Locking
///
/// All state, including [`ConcurrencyStats`], sits behind one
/// `parking_lot::Mutex`. Critical sections are counter updates and a
/// percentile refresh; the read itself always runs outside the lock.
pub mod stats;

pub use stats::ConcurrencyStats;

use crate::error::{ConfigError, SchedulerError};
use crate::platform::SECTOR_ALIGN;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use stats::{percentile, LatencyWindow};
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

/// Tunable scheduler parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub min_concurrency: usize,
    pub max_concurrency: usize,
    pub initial_concurrency: usize,
    /// Successful completions between controller decisions.
    pub adjust_interval: u32,
    /// Batch latency above `backoff_ratio × p50` triggers a decrease.
    pub backoff_ratio: f64,
    /// Batch latency at or below `stable_ratio × p50` allows an increase.
    pub stable_ratio: f64,
    /// Number of recent samples used for percentiles.
    pub latency_window: usize,
    /// Bytes requested per read operation.
    pub read_size: usize,
    /// Upper bound on bytes held by in-flight read buffers.
    pub memory_budget: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_concurrency: 1,
            max_concurrency: 16,
            initial_concurrency: 4,
            adjust_interval: 16,
            backoff_ratio: 1.5,
            stable_ratio: 1.1,
            latency_window: 256,
            read_size: 1024 * 1024,
            memory_budget: 256 * 1024 * 1024,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_concurrency == 0 || self.min_concurrency > self.max_concurrency {
            return Err(ConfigError::Invalid(format!(
                "scheduler concurrency must satisfy 0 < min <= max, got {}..{}",
                self.min_concurrency, self.max_concurrency
            )));
        }
        if self.adjust_interval == 0 || self.latency_window == 0 {
            return Err(ConfigError::Invalid(
                "scheduler adjust_interval and latency_window must be non-zero".into(),
            ));
        }
        if !(self.stable_ratio >= 1.0 && self.backoff_ratio > self.stable_ratio) {
            return Err(ConfigError::Invalid(format!(
                "scheduler ratios must satisfy 1.0 <= stable_ratio < backoff_ratio, got {} / {}",
                self.stable_ratio, self.backoff_ratio
            )));
        }
        if self.read_size == 0 || self.read_size % SECTOR_ALIGN != 0 {
            return Err(ConfigError::Invalid(format!(
                "scheduler read_size must be a non-zero multiple of {SECTOR_ALIGN}, got {}",
                self.read_size
            )));
        }
        if self.memory_budget < (self.min_concurrency * self.read_size) as u64 {
            return Err(ConfigError::Invalid(format!(
                "scheduler memory_budget {} cannot hold {} reads of {} bytes",
                self.memory_budget, self.min_concurrency, self.read_size
            )));
        }
        Ok(())
    }

    /// Highest concurrency whose read buffers fit in the memory budget.
    pub fn affordable_concurrency(&self) -> usize {
        let by_budget = (self.memory_budget / self.read_size.max(1) as u64) as usize;
        by_budget.clamp(self.min_concurrency, self.max_concurrency)
    }
}

/// Externally visible controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SchedulerState {
    pub min_concurrency: usize,
    pub current_concurrency: usize,
    pub max_concurrency: usize,
    pub running: bool,
}

/// Everything guarded by the scheduler lock.
#[derive(Debug)]
struct Inner {
    running: bool,
    /// Bumped on every `start`; completions from an older epoch are dropped.
    epoch: u64,
    in_flight: usize,
    current: usize,
    affordable: usize,
    total_ops: u64,
    completed_ops: u64,
    failed_ops: u64,
    latency: LatencyWindow,
    /// Latencies since the last controller decision.
    batch: Vec<Duration>,
}

impl Inner {
    fn new(config: &SchedulerConfig) -> Self {
        let affordable = config.affordable_concurrency();
        Self {
            running: false,
            epoch: 0,
            in_flight: 0,
            current: config
                .initial_concurrency
                .clamp(config.min_concurrency, config.max_concurrency)
                .min(affordable),
            affordable,
            total_ops: 0,
            completed_ops: 0,
            failed_ops: 0,
            latency: LatencyWindow::new(config.latency_window),
            batch: Vec::with_capacity(config.adjust_interval as usize),
        }
    }

    /// Account for one finished operation. Returns `true` when concurrency
    /// was raised (more than one waiter may now proceed).
    fn record(&mut self, latency: Duration, ok: bool, config: &SchedulerConfig) -> bool {
        if !ok {
            self.failed_ops += 1;
            return false;
        }
        self.completed_ops += 1;
        self.latency.record(latency);
        self.batch.push(latency);
        if self.batch.len() < config.adjust_interval as usize {
            return false;
        }

        // Median against median: skewed but steady latency must not read
        // as a slowdown.
        self.batch.sort_unstable();
        let batch_p50 = percentile(&self.batch, 50);
        self.batch.clear();
        self.latency.refresh_percentiles();
        self.adjust(batch_p50, config)
    }

    fn adjust(&mut self, batch_p50: Duration, config: &SchedulerConfig) -> bool {
        let recent = batch_p50.as_secs_f64();
        let p50 = self.latency.p50().as_secs_f64();

        if recent > p50 * config.backoff_ratio {
            let step = (self.current / 4).max(1);
            let next = self.current.saturating_sub(step).max(config.min_concurrency);
            if next != self.current {
                debug!(
                    "I/O latency {:?} above p50 {:?}; concurrency {} -> {}",
                    batch_p50,
                    self.latency.p50(),
                    self.current,
                    next
                );
                self.current = next;
            }
            false
        } else if recent <= p50 * config.stable_ratio && self.current < config.max_concurrency {
            let next = self.current + 1;
            if next > self.affordable {
                debug!(
                    "Concurrency {} exceeds memory budget; holding at {}",
                    next, self.current
                );
                return false;
            }
            self.current = next;
            true
        } else {
            false
        }
    }

    fn snapshot(&self, config: &SchedulerConfig) -> ConcurrencyStats {
        ConcurrencyStats {
            total_ops: self.total_ops,
            completed_ops: self.completed_ops,
            failed_ops: self.failed_ops,
            avg_latency: self.latency.mean(),
            p50_latency: self.latency.p50(),
            p95_latency: self.latency.p95(),
            current_concurrency: self.current,
            max_concurrency: config.max_concurrency,
        }
    }
}

/// Latency-adaptive gate in front of every storage read.
#[derive(Debug)]
pub struct IoScheduler {
    config: SchedulerConfig,
    inner: Mutex<Inner>,
    slot_freed: Condvar,
}

impl IoScheduler {
    /// Create a stopped scheduler.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            inner: Mutex::new(Inner::new(&config)),
            config,
            slot_freed: Condvar::new(),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Begin admitting operations. No-op while already running.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.running {
            return;
        }
        inner.running = true;
        inner.epoch += 1;
        inner.in_flight = 0;
        debug!("I/O scheduler started at concurrency {}", inner.current);
    }

    /// Stop admitting operations and abandon those in flight. Waiters are
    /// woken and fail with [`SchedulerError::Stopped`]. No-op when stopped.
    pub fn stop(&self) {
        {
            let mut inner = self.inner.lock();
            if !inner.running {
                return;
            }
            inner.running = false;
            inner.in_flight = 0;
            debug!("I/O scheduler stopped after {} ops", inner.total_ops);
        }
        self.slot_freed.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// Run `op` once a concurrency slot is free, recording its latency.
    ///
    /// Blocks while `current_concurrency` operations are already in flight.
    /// If the scheduler is stopped before or during the operation, the
    /// result is discarded and `Stopped` is returned.
    pub fn execute<T, F>(&self, op: F) -> Result<T, SchedulerError>
    where
        F: FnOnce() -> io::Result<T>,
    {
        let epoch = self.acquire()?;
        let started = Instant::now();
        let result = op();
        let latency = started.elapsed();

        if !self.complete(epoch, latency, result.is_ok()) {
            return Err(SchedulerError::Stopped);
        }
        result.map_err(SchedulerError::Io)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> ConcurrencyStats {
        self.inner.lock().snapshot(&self.config)
    }

    pub fn state(&self) -> SchedulerState {
        let inner = self.inner.lock();
        SchedulerState {
            min_concurrency: self.config.min_concurrency,
            current_concurrency: inner.current,
            max_concurrency: self.config.max_concurrency,
            running: inner.running,
        }
    }

    fn acquire(&self) -> Result<u64, SchedulerError> {
        let mut inner = self.inner.lock();
        loop {
            if !inner.running {
                return Err(SchedulerError::Stopped);
            }
            if inner.in_flight < inner.current {
                inner.in_flight += 1;
                inner.total_ops += 1;
                return Ok(inner.epoch);
            }
            self.slot_freed.wait(&mut inner);
        }
    }

    /// Returns `false` when the operation belongs to a stopped epoch.
    fn complete(&self, epoch: u64, latency: Duration, ok: bool) -> bool {
        let raised = {
            let mut inner = self.inner.lock();
            if !inner.running || inner.epoch != epoch {
                return false;
            }
            inner.in_flight = inner.in_flight.saturating_sub(1);
            inner.record(latency, ok, &self.config)
        };
        if raised {
            self.slot_freed.notify_all();
        } else {
            self.slot_freed.notify_one();
        }
        true
    }
}
