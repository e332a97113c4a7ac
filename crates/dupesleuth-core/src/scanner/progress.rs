/// Scan progress reporting — lightweight messages sent from the scan
/// threads to whoever drives the scan, via a bounded crossbeam channel.
use crate::model::ScanSummary;
use serde::Serialize;
use std::path::PathBuf;

/// Progress updates sent from the scan threads.
///
/// Finished fingerprints live in the shared `LiveResults`; these messages
/// carry only counters and status.
#[derive(Debug)]
pub enum ScanProgress {
    /// Running totals from the directory walker.
    Discovered { files_found: u64, bytes_found: u64 },
    /// Running totals from the worker pool.
    Update {
        files_done: u64,
        bytes_done: u64,
        current_path: String,
        concurrency: usize,
    },
    /// A non-fatal, per-file error. The scan continues.
    Error { path: String, message: String },
    /// All targets processed.
    Complete { summary: ScanSummary },
    /// Scan was cancelled.
    Cancelled,
}

/// A target that produced no fingerprint, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub path: PathBuf,
    pub message: String,
}

impl ScanProgress {
    /// `true` for the message that ends a scan.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Cancelled)
    }
}
