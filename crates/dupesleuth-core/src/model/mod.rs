/// Data model for the DupeSleuth fingerprinting pipeline.
///
/// Re-exports the scan target, digest, and fingerprint types plus
/// supporting formatting helpers.
pub mod fingerprint;
pub mod size;

pub use fingerprint::{ChunkDigest, FileFingerprint, ScanSummary, ScanTarget};
pub use size::{format_count, format_rate, format_size};
