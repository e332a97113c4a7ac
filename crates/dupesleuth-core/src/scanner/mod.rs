/// Scanner module — orchestrates discovery and fingerprinting.
///
/// A scan is one directory walker feeding a bounded queue of
/// [`ScanTarget`]s to a fixed pool of worker threads. Each worker owns a
/// [`FilePipeline`] and processes one file end to end; every read passes
/// through the shared adaptive [`IoScheduler`].
///
/// Finished fingerprints are written into a **shared `LiveResults`**
/// (`Arc<RwLock<Vec<FileFingerprint>>>`), one write lock per file, so a
/// front end can show results while the scan is still running.
pub mod discovery;
pub mod progress;
pub mod worker;

pub use discovery::{collect_targets, walk_targets};
pub use progress::{ScanFailure, ScanProgress};
pub use worker::FilePipeline;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::model::{FileFingerprint, ScanSummary, ScanTarget};
use crate::scheduler::{ConcurrencyStats, IoScheduler};
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fingerprints written by the workers, readable at any time.
pub type LiveResults = Arc<RwLock<Vec<FileFingerprint>>>;

/// Maximum number of progress messages that may queue up in the channel.
///
/// `Update` and `Discovered` messages are dropped rather than block when the
/// channel is full; `Error` and terminal messages wait for room.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// Queued targets per worker. Keeps the walker a little ahead of the pool
/// without buffering a whole tree's worth of paths.
const TARGETS_PER_WORKER: usize = 64;

/// Send a worker `Update` every this many finished files.
const UPDATE_INTERVAL: u64 = 32;

/// Send a walker `Discovered` every this many files found.
const DISCOVERED_INTERVAL: u64 = 1_000;

/// State shared by the walker and every worker of one scan.
pub(crate) struct ScanContext {
    progress: Option<Sender<ScanProgress>>,
    results: LiveResults,
    cancel_flag: Arc<AtomicBool>,
    files_done: AtomicU64,
    bytes_done: AtomicU64,
    error_count: AtomicU64,
    /// Collected only for synchronous scans, which have no progress channel.
    failures: Option<Mutex<Vec<ScanFailure>>>,
}

impl ScanContext {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    pub(crate) fn record_result(&self, fingerprint: FileFingerprint, scheduler: &IoScheduler) {
        let size = fingerprint.size;
        let path = fingerprint.path.clone();
        self.results.write().push(fingerprint);

        let files_done = self.files_done.fetch_add(1, Ordering::Relaxed) + 1;
        let bytes_done = self.bytes_done.fetch_add(size, Ordering::Relaxed) + size;
        if files_done % UPDATE_INTERVAL == 0 {
            if let Some(tx) = &self.progress {
                let _ = tx.try_send(ScanProgress::Update {
                    files_done,
                    bytes_done,
                    current_path: path.to_string_lossy().into_owned(),
                    concurrency: scheduler.state().current_concurrency,
                });
            }
        }
    }

    pub(crate) fn record_failure(&self, path: &Path, message: &str) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
        warn!("{}: {message}", path.display());
        if let Some(tx) = &self.progress {
            let _ = tx.send(ScanProgress::Error {
                path: path.to_string_lossy().into_owned(),
                message: message.to_owned(),
            });
        }
        if let Some(failures) = &self.failures {
            failures.lock().push(ScanFailure {
                path: path.to_path_buf(),
                message: message.to_owned(),
            });
        }
    }

    fn summary(&self, started: Instant, scheduler: ConcurrencyStats) -> ScanSummary {
        ScanSummary {
            files_scanned: self.files_done.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_done.load(Ordering::Relaxed),
            error_count: self.error_count.load(Ordering::Relaxed),
            duration: started.elapsed(),
            scheduler,
        }
    }
}

/// Handle to a running or completed scan. Allows cancellation and
/// receiving progress updates.
pub struct ScanHandle {
    /// Receiver for progress updates from the scan threads.
    pub progress_rx: Receiver<ScanProgress>,
    /// Fingerprints, appended as files finish.
    pub results: LiveResults,
    cancel_flag: Arc<AtomicBool>,
    scheduler: Arc<IoScheduler>,
    thread: Option<thread::JoinHandle<()>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible. Reads in flight are
    /// abandoned and no new reads start.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
        self.scheduler.stop();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// Live scheduler counters.
    pub fn scheduler_stats(&self) -> ConcurrencyStats {
        self.scheduler.stats()
    }

    /// Block until the scan thread exits. Progress messages still queued
    /// remain readable from `progress_rx`.
    pub fn join(mut self) -> Vec<FileFingerprint> {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Scan thread panicked");
            }
        }
        std::mem::take(&mut *self.results.write())
    }
}

/// Start a new scan of `root` on a background thread.
///
/// Returns a `ScanHandle` for receiving progress, reading live results, and
/// requesting cancellation. Fails only on an invalid configuration or if the
/// thread cannot be spawned.
pub fn start_scan(root: PathBuf, config: ScanConfig) -> Result<ScanHandle, ScanError> {
    config.validate()?;
    let scheduler = Arc::new(IoScheduler::new(config.scheduler)?);

    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let results: LiveResults = Arc::new(RwLock::new(Vec::new()));

    let ctx = ScanContext {
        progress: Some(progress_tx.clone()),
        results: Arc::clone(&results),
        cancel_flag: Arc::clone(&cancel_flag),
        files_done: AtomicU64::new(0),
        bytes_done: AtomicU64::new(0),
        error_count: AtomicU64::new(0),
        failures: None,
    };
    let thread_scheduler = Arc::clone(&scheduler);

    let thread = thread::Builder::new()
        .name("dupesleuth-scanner".into())
        .spawn(move || {
            info!("Starting scan of {}", root.display());
            let started = Instant::now();
            let walk = |targets: Sender<ScanTarget>, ctx: &ScanContext| {
                discover_into(&root, targets, ctx);
            };
            run_pool(&config, &thread_scheduler, &ctx, walk);

            let summary = ctx.summary(started, thread_scheduler.stats());
            thread_scheduler.stop();
            if ctx.is_cancelled() {
                info!("Scan cancelled after {} files", summary.files_scanned);
                let _ = progress_tx.send(ScanProgress::Cancelled);
            } else {
                info!(
                    "Scan complete: {} files, {} bytes, {} errors in {:?}",
                    summary.files_scanned,
                    summary.bytes_scanned,
                    summary.error_count,
                    summary.duration
                );
                let _ = progress_tx.send(ScanProgress::Complete { summary });
            }
        })
        .map_err(ScanError::Spawn)?;

    Ok(ScanHandle {
        progress_rx,
        results,
        cancel_flag,
        scheduler,
        thread: Some(thread),
    })
}

/// Output of a synchronous scan.
#[derive(Debug)]
pub struct ScanOutput {
    pub fingerprints: Vec<FileFingerprint>,
    pub failures: Vec<ScanFailure>,
    pub summary: ScanSummary,
}

/// Fingerprint a pre-built target list on the calling thread's pool and
/// return when every target is done.
pub fn scan_targets(targets: Vec<ScanTarget>, config: &ScanConfig) -> Result<ScanOutput, ScanError> {
    config.validate()?;
    let scheduler = IoScheduler::new(config.scheduler)?;
    let ctx = ScanContext {
        progress: None,
        results: Arc::new(RwLock::new(Vec::with_capacity(targets.len()))),
        cancel_flag: Arc::new(AtomicBool::new(false)),
        files_done: AtomicU64::new(0),
        bytes_done: AtomicU64::new(0),
        error_count: AtomicU64::new(0),
        failures: Some(Mutex::new(Vec::new())),
    };

    let started = Instant::now();
    run_pool(config, &scheduler, &ctx, |tx: Sender<ScanTarget>, _: &ScanContext| {
        for target in targets {
            if tx.send(target).is_err() {
                break;
            }
        }
    });
    let summary = ctx.summary(started, scheduler.stats());
    scheduler.stop();

    let fingerprints = std::mem::take(&mut *ctx.results.write());
    let failures = ctx
        .failures
        .map(Mutex::into_inner)
        .unwrap_or_default();
    Ok(ScanOutput {
        fingerprints,
        failures,
        summary,
    })
}

/// Run the worker pool while `feed` fills the target queue on this thread.
/// Returns once the queue is drained and every worker has exited.
fn run_pool<F>(config: &ScanConfig, scheduler: &IoScheduler, ctx: &ScanContext, feed: F)
where
    F: FnOnce(Sender<ScanTarget>, &ScanContext),
{
    let workers = config.worker_count();
    let (target_tx, target_rx) = crossbeam_channel::bounded(workers * TARGETS_PER_WORKER);
    if !start_unless_cancelled(scheduler, &ctx.cancel_flag) {
        return;
    }
    debug!("Spawning {workers} workers");

    thread::scope(|scope| {
        let mut spawned = 0usize;
        for id in 0..workers {
            let pipeline = match FilePipeline::new(config) {
                Ok(p) => p,
                Err(err) => {
                    warn!("Worker {id} not started: {err}");
                    continue;
                }
            };
            let rx = target_rx.clone();
            let result = thread::Builder::new()
                .name(format!("dupesleuth-worker-{id}"))
                .spawn_scoped(scope, move || worker::run_worker(rx, pipeline, scheduler, ctx));
            match result {
                Ok(_) => spawned += 1,
                Err(err) => warn!("Worker {id} not started: {err}"),
            }
        }
        // Workers hold the only receivers now; if none started, sends fail.
        drop(target_rx);
        if spawned == 0 {
            warn!("No scan workers could be started");
        }
        feed(target_tx, ctx);
    });
}

/// Start `scheduler` unless the scan is already cancelled. Returns whether
/// it is left running.
///
/// The flag is checked after `start`: `cancel` sets the flag before calling
/// `stop`, so a cancel whose `stop` ran too early is still seen here.
fn start_unless_cancelled(scheduler: &IoScheduler, cancel_flag: &AtomicBool) -> bool {
    scheduler.start();
    if cancel_flag.load(Ordering::SeqCst) {
        scheduler.stop();
        return false;
    }
    true
}

/// Walk `root` into the target queue, reporting discovery progress.
fn discover_into(root: &Path, targets: Sender<ScanTarget>, ctx: &ScanContext) {
    let mut files_found: u64 = 0;
    let mut bytes_found: u64 = 0;

    walk_targets(root, &ctx.cancel_flag, |item| match item {
        Ok(target) => {
            files_found += 1;
            bytes_found += target.size;
            if files_found % DISCOVERED_INTERVAL == 0 {
                if let Some(tx) = &ctx.progress {
                    let _ = tx.try_send(ScanProgress::Discovered {
                        files_found,
                        bytes_found,
                    });
                }
            }
            // Every worker gone means cancelled or failed; stop walking.
            match targets.send(target) {
                Ok(()) => ControlFlow::Continue(()),
                Err(_) => ControlFlow::Break(()),
            }
        }
        Err(failure) => {
            ctx.record_failure(&failure.path, &failure.message);
            ControlFlow::Continue(())
        }
    });

    debug!("Discovery finished: {files_found} files, {bytes_found} bytes");
    if let Some(tx) = &ctx.progress {
        let _ = tx.try_send(ScanProgress::Discovered {
            files_found,
            bytes_found,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerConfig;

    #[test]
    fn cancelled_scan_leaves_scheduler_stopped() {
        let scheduler = IoScheduler::new(SchedulerConfig::default()).unwrap();
        let cancel_flag = AtomicBool::new(true);
        assert!(!start_unless_cancelled(&scheduler, &cancel_flag));
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.stats().total_ops, 0);
    }

    #[test]
    fn live_scan_starts_scheduler() {
        let scheduler = IoScheduler::new(SchedulerConfig::default()).unwrap();
        let cancel_flag = AtomicBool::new(false);
        assert!(start_unless_cancelled(&scheduler, &cancel_flag));
        assert!(scheduler.is_running());
    }

    #[test]
    fn cancel_between_check_and_start_is_honoured() {
        // `cancel` ran entirely before the pool started: its `stop` was a
        // no-op on a scheduler that was not yet running.
        let scheduler = IoScheduler::new(SchedulerConfig::default()).unwrap();
        let cancel_flag = AtomicBool::new(false);
        cancel_flag.store(true, Ordering::SeqCst);
        scheduler.stop();

        assert!(!start_unless_cancelled(&scheduler, &cancel_flag));
        assert!(matches!(
            scheduler.execute(|| Ok(())),
            Err(crate::error::SchedulerError::Stopped)
        ));
    }
}
