/// DupeSleuth Core — content fingerprinting, duplicate analysis, and data model.
///
/// This crate contains all business logic with zero UI dependencies.
/// It is designed to be reusable across different frontends (CLI, GUI, reports).
///
/// # Modules
///
/// - [`chunker`] — Buzhash rolling hash and content-defined chunker.
/// - [`hasher`] — BLAKE3 content hasher with once-per-process CPU feature detection.
/// - [`minhash`] — Fixed-size MinHash signatures for near-duplicate detection.
/// - [`phash`] — DCT-based 64-bit perceptual image hash.
/// - [`scheduler`] — Latency-driven adaptive I/O concurrency controller.
/// - [`io`] — Buffered and direct (unbuffered) byte sources.
/// - [`scanner`] — Directory discovery, worker pool, and scan handle.
/// - [`analysis`] — Exact duplicate groups, near-duplicate pairs, similar images.
/// - [`report`] — JSON and CSV export.
pub mod analysis;
pub mod chunker;
pub mod config;
pub mod error;
pub mod hasher;
pub mod io;
pub mod minhash;
pub mod model;
pub mod phash;
pub mod platform;
pub mod report;
pub mod scanner;
pub mod scheduler;

mod mix;

pub use config::ScanConfig;
pub use error::{ConfigError, PhashError, ReportError, ScanError, SchedulerError};
pub use model::{ChunkDigest, FileFingerprint, ScanTarget};
