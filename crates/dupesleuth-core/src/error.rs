/// Error types for the fingerprinting pipeline.
///
/// Every error here is scoped to a single file or a single operation —
/// nothing in the pipeline is fatal to the process. The scan driver counts
/// per-file failures and carries on.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure while fingerprinting one scan target.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The file could not be opened (vanished, permission denied, ...).
    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },

    /// A read failed part-way through the file.
    #[error("read failed on {} at offset {offset}: {source}", path.display())]
    Read {
        path: PathBuf,
        offset: u64,
        source: io::Error,
    },

    /// The file ended before the size reported by the walker.
    #[error("{} shrank during scan: expected {expected} bytes, read {actual}", path.display())]
    Truncated {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// The worker could not allocate its read buffer.
    #[error("could not allocate a {0}-byte read buffer")]
    BufferAlloc(usize),

    /// The scheduler was stopped while this file was in flight.
    #[error("scan cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn scan thread: {0}")]
    Spawn(io::Error),
}

/// Failure returned by the adaptive I/O scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The scheduler is not running, or was stopped while the operation ran.
    #[error("I/O scheduler is stopped")]
    Stopped,

    /// The operation itself failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Precondition violation passed to the perceptual hasher.
#[derive(Debug, Error)]
pub enum PhashError {
    #[error("pixel buffer is empty")]
    EmptyBuffer,

    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel buffer holds {actual} bytes, {expected} required")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Invalid or unreadable configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure while exporting a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to write JSON report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write CSV report: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}
