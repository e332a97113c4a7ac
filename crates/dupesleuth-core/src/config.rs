/// Scan configuration — every tunable of the pipeline in one serde struct.
///
/// All fields default, so a JSON file only needs the keys it overrides:
///
/// ```json
/// { "minhash_slots": 64, "scheduler": { "max_concurrency": 4 } }
/// ```
use crate::chunker::ChunkerConfig;
use crate::error::ConfigError;
use crate::io::{AccessPolicy, DEFAULT_DIRECT_THRESHOLD};
use crate::minhash::DEFAULT_SIGNATURE_SLOTS;
use crate::scheduler::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Largest image buffered in memory for perceptual hashing.
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub chunker: ChunkerConfig,
    pub scheduler: SchedulerConfig,
    /// MinHash slots per file (8 bytes each).
    pub minhash_slots: usize,
    /// Compute a BLAKE3 digest over the whole file as well as per chunk.
    pub whole_file_digest: bool,
    /// Compute perceptual hashes for files with an image extension.
    pub perceptual_images: bool,
    pub max_image_bytes: u64,
    pub access_policy: AccessPolicy,
    /// File size at which `AccessPolicy::Auto` switches to direct reads.
    pub direct_io_threshold: u64,
    /// Worker threads; 0 picks the CPU count.
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            scheduler: SchedulerConfig::default(),
            minhash_slots: DEFAULT_SIGNATURE_SLOTS,
            whole_file_digest: true,
            perceptual_images: true,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            access_policy: AccessPolicy::Auto,
            direct_io_threshold: DEFAULT_DIRECT_THRESHOLD,
            workers: 0,
        }
    }
}

impl ScanConfig {
    /// Load and validate a configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunker.validate()?;
        self.scheduler.validate()?;
        if self.minhash_slots == 0 {
            return Err(ConfigError::Invalid("minhash_slots must be at least 1".into()));
        }
        Ok(())
    }

    /// Number of worker threads to spawn: the configured count, or the CPU
    /// count, never more than the scheduler could ever admit at once.
    pub fn worker_count(&self) -> usize {
        let wanted = if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        };
        wanted.clamp(1, self.scheduler.max_concurrency.max(1))
    }
}
