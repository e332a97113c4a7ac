/// Cryptographic content hasher — BLAKE3 with streaming, one-shot, and
/// batch entry points.
///
/// Chunk hashing is the dominant CPU cost of a full-disk scan, so the
/// hasher supports:
/// - **streaming** — `init` / `update` / `finalize`, bounded memory per file;
///   partial blocks are buffered inside the BLAKE3 state;
/// - **one-shot** — [`ContentHasher::hash`];
/// - **batch** — [`ContentHasher::hash_batch`], independent inputs hashed in
///   parallel on the rayon pool.
///
/// The update path (single-threaded vs. rayon-parallel tree hashing) is
/// picked once per process from [`cpu::cpu_features`]. Every path produces
/// byte-identical digests.
pub mod cpu;

use crate::model::ChunkDigest;
use rayon::prelude::*;
use std::sync::OnceLock;
use tracing::debug;

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Per-lane input size above which the rayon path pays for itself.
const PARALLEL_BYTES_PER_LANE: usize = 16 * 1024;

/// Never go parallel below this, whatever the lane count.
const PARALLEL_FLOOR: usize = 128 * 1024;

/// How `update` feeds bytes into the BLAKE3 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePath {
    /// Single-threaded; BLAKE3 still uses the widest SIMD kernel.
    Serial,
    /// Inputs of at least `min_len` bytes are tree-hashed across the rayon pool.
    Parallel { min_len: usize },
}

impl UpdatePath {
    /// The fastest path for this machine (computed once per process).
    pub fn selected() -> Self {
        static SELECTED: OnceLock<UpdatePath> = OnceLock::new();
        *SELECTED.get_or_init(|| {
            let cpu = cpu::cpu_features();
            let path = if cpu.threads > 1 {
                UpdatePath::Parallel {
                    min_len: (PARALLEL_BYTES_PER_LANE * cpu.tier.lanes()).max(PARALLEL_FLOOR),
                }
            } else {
                UpdatePath::Serial
            };
            debug!("Content hasher update path: {path:?}");
            path
        })
    }
}

/// Streaming BLAKE3 hasher.
#[derive(Clone)]
pub struct ContentHasher {
    inner: blake3::Hasher,
    path: UpdatePath,
    bytes: u64,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("path", &self.path)
            .field("bytes", &self.bytes)
            .finish()
    }
}

impl ContentHasher {
    /// A fresh hasher on the process-selected update path.
    pub fn new() -> Self {
        Self::with_path(UpdatePath::selected())
    }

    /// A fresh hasher forced onto `path`.
    pub fn with_path(path: UpdatePath) -> Self {
        Self {
            inner: blake3::Hasher::new(),
            path,
            bytes: 0,
        }
    }

    pub fn path(&self) -> UpdatePath {
        self.path
    }

    /// Reset to the initial chaining state.
    pub fn init(&mut self) {
        self.inner.reset();
        self.bytes = 0;
    }

    /// Feed more bytes. Empty input is a no-op.
    pub fn update(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        match self.path {
            UpdatePath::Parallel { min_len } if data.len() >= min_len => {
                self.inner.update_rayon(data);
            }
            _ => {
                self.inner.update(data);
            }
        }
        self.bytes += data.len() as u64;
    }

    /// Write up to `out.len()` bytes of the digest (at most [`DIGEST_LEN`])
    /// and return how many were written. The state is left untouched, so
    /// more data may still be fed afterwards.
    pub fn finalize(&self, out: &mut [u8]) -> usize {
        if out.is_empty() {
            return 0;
        }
        let hash = self.inner.finalize();
        let n = out.len().min(DIGEST_LEN);
        out[..n].copy_from_slice(&hash.as_bytes()[..n]);
        n
    }

    /// The full 32-byte digest of everything fed since `init`.
    pub fn digest(&self) -> ChunkDigest {
        ChunkDigest::from_bytes(*self.inner.finalize().as_bytes())
    }

    /// Bytes fed since `init`.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes
    }

    /// One-shot hash: `init` + `update` + `finalize` on a fresh instance.
    pub fn hash(data: &[u8]) -> ChunkDigest {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.digest()
    }

    /// One-shot hash written into `out`; returns bytes written.
    pub fn hash_into(data: &[u8], out: &mut [u8]) -> usize {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize(out)
    }

    /// Hash independent inputs in parallel. Output order matches input order.
    pub fn hash_batch<T: AsRef<[u8]> + Sync>(inputs: &[T]) -> Vec<ChunkDigest> {
        inputs
            .par_iter()
            .map(|input| Self::hash(input.as_ref()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_BLAKE3: &str = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn empty_input_matches_reference_vector() {
        assert_eq!(ContentHasher::hash(&[]).to_hex(), EMPTY_BLAKE3);
    }

    #[test]
    fn empty_update_is_noop() {
        let mut h = ContentHasher::new();
        h.update(b"abc");
        let before = h.digest();
        h.update(&[]);
        assert_eq!(h.digest(), before);
        assert_eq!(h.bytes_hashed(), 3);
    }

    #[test]
    fn all_update_paths_agree() {
        let data = sample(600 * 1024);
        let mut serial = ContentHasher::with_path(UpdatePath::Serial);
        let mut parallel = ContentHasher::with_path(UpdatePath::Parallel { min_len: 1 });
        serial.update(&data);
        parallel.update(&data);

        let reference = ChunkDigest::from_bytes(*blake3::hash(&data).as_bytes());
        assert_eq!(serial.digest(), reference);
        assert_eq!(parallel.digest(), reference);
        assert_eq!(ContentHasher::hash(&data), reference);
    }

    #[test]
    fn split_updates_match_one_shot() {
        let data = sample(10_000);
        let mut h = ContentHasher::new();
        for piece in data.chunks(37) {
            h.update(piece);
        }
        assert_eq!(h.digest(), ContentHasher::hash(&data));
    }

    #[test]
    fn finalize_writes_requested_prefix() {
        let full = ContentHasher::hash(b"prefix");
        let mut short = [0u8; 8];
        assert_eq!(ContentHasher::hash_into(b"prefix", &mut short), 8);
        assert_eq!(&short, &full.as_bytes()[..8]);

        let mut long = [0u8; 40];
        assert_eq!(ContentHasher::hash_into(b"prefix", &mut long), DIGEST_LEN);
        assert_eq!(&long[..DIGEST_LEN], full.as_bytes());
        assert!(long[DIGEST_LEN..].iter().all(|&b| b == 0));

        assert_eq!(ContentHasher::hash_into(b"prefix", &mut []), 0);
    }

    #[test]
    fn init_resets_state() {
        let mut h = ContentHasher::new();
        h.update(b"garbage");
        h.init();
        h.update(b"hello");
        assert_eq!(h.digest(), ContentHasher::hash(b"hello"));
    }

    #[test]
    fn batch_matches_individual_hashes() {
        let inputs: Vec<Vec<u8>> = (0..16).map(|i| sample(i * 1_000 + 1)).collect();
        let batch = ContentHasher::hash_batch(&inputs);
        assert_eq!(batch.len(), inputs.len());
        for (input, digest) in inputs.iter().zip(&batch) {
            assert_eq!(*digest, ContentHasher::hash(input));
        }
    }
}
