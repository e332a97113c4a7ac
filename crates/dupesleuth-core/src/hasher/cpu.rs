/// Process-wide CPU feature detection.
///
/// Detection runs once, on first use, and the result is immutable for the
/// life of the process. BLAKE3 dispatches its compression kernels on the
/// same features internally; this value decides how the content hasher
/// feeds data to it and is reported in logs.
use serde::Serialize;
use std::sync::OnceLock;
use tracing::debug;

/// Widest SIMD instruction set available to the hasher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum SimdTier {
    Portable,
    Sse41,
    Neon,
    Avx2,
    Avx512,
}

impl SimdTier {
    /// Number of 1 KiB BLAKE3 chunks compressed in parallel by this tier.
    pub fn lanes(self) -> usize {
        match self {
            Self::Portable => 1,
            Self::Sse41 | Self::Neon => 4,
            Self::Avx2 => 8,
            Self::Avx512 => 16,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Portable => "portable",
            Self::Sse41 => "SSE4.1",
            Self::Neon => "NEON",
            Self::Avx2 => "AVX2",
            Self::Avx512 => "AVX-512",
        }
    }
}

/// Snapshot of the host's hashing capabilities.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CpuFeatures {
    pub tier: SimdTier,
    /// Logical CPUs available for multi-threaded hashing.
    pub threads: usize,
}

static CPU_FEATURES: OnceLock<CpuFeatures> = OnceLock::new();

/// The detected CPU features (computed on first call).
pub fn cpu_features() -> &'static CpuFeatures {
    CPU_FEATURES.get_or_init(|| {
        let features = CpuFeatures {
            tier: detect_tier(),
            threads: num_cpus::get(),
        };
        debug!(
            "Hasher CPU features: {} ({} lanes), {} threads",
            features.tier.label(),
            features.tier.lanes(),
            features.threads
        );
        features
    })
}

fn detect_tier() -> SimdTier {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512vl") {
            return SimdTier::Avx512;
        }
        if is_x86_feature_detected!("avx2") {
            return SimdTier::Avx2;
        }
        if is_x86_feature_detected!("sse4.1") {
            return SimdTier::Sse41;
        }
    }
    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            return SimdTier::Neon;
        }
    }
    SimdTier::Portable
}
