/// Scan targets, digests, and per-file fingerprints.
///
/// A [`ScanTarget`] comes in from the walker; a [`FileFingerprint`] goes out
/// to the analysis/report layer. Everything in between is transient.
use crate::hasher::{ContentHasher, DIGEST_LEN};
use crate::minhash::MinHashSignature;
use crate::scheduler::ConcurrencyStats;
use serde::{Serialize, Serializer};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// A file discovered by the walker, with its size and mtime cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanTarget {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
}

impl ScanTarget {
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            modified: None,
        }
    }

    /// Stat `path` (without following symlinks) and build a target.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let meta = std::fs::symlink_metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size: meta.len(),
            modified: meta.modified().ok(),
        })
    }
}

/// A 32-byte BLAKE3 digest of one chunk (or of a whole file).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkDigest([u8; DIGEST_LEN]);

impl ChunkDigest {
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        let mut s = String::with_capacity(DIGEST_LEN * 2);
        for byte in self.0 {
            s.push(char::from_digit((byte >> 4) as u32, 16).unwrap_or('0'));
            s.push(char::from_digit((byte & 0x0F) as u32, 16).unwrap_or('0'));
        }
        s
    }

    /// The first eight bytes as a little-endian `u64` — the MinHash input.
    #[inline]
    pub fn fold(&self) -> u64 {
        let mut word = [0u8; 8];
        word.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(word)
    }
}

impl fmt::Debug for ChunkDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ChunkDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ChunkDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Everything the pipeline learned about one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileFingerprint {
    pub path: PathBuf,
    /// Bytes actually scanned (equals the sum of chunk lengths).
    pub size: u64,
    /// BLAKE3 of the whole file; `None` when whole-file hashing is disabled.
    pub whole_file_digest: Option<ChunkDigest>,
    /// Chunk digests in stream order.
    pub chunk_digests: Vec<ChunkDigest>,
    pub min_hash: MinHashSignature,
    /// 64-bit perceptual hash (images only).
    #[serde(serialize_with = "serialize_phash")]
    pub perceptual_hash: Option<u64>,
}

impl FileFingerprint {
    /// Key for exact-duplicate grouping: the whole-file digest when present,
    /// otherwise the digest of the ordered chunk-digest list.
    pub fn exact_key(&self) -> ChunkDigest {
        match self.whole_file_digest {
            Some(digest) => digest,
            None => {
                let mut hasher = ContentHasher::new();
                for digest in &self.chunk_digests {
                    hasher.update(digest.as_bytes());
                }
                hasher.digest()
            }
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_digests.len()
    }
}

fn serialize_phash<S: Serializer>(value: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(hash) => serializer.serialize_some(&format!("{hash:016x}")),
        None => serializer.serialize_none(),
    }
}

/// Totals delivered when a scan finishes.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub files_scanned: u64,
    pub bytes_scanned: u64,
    pub error_count: u64,
    pub duration: Duration,
    pub scheduler: ConcurrencyStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase_and_full_length() {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes[0] = 0xAB;
        bytes[31] = 0x0F;
        let hex = ChunkDigest::from_bytes(bytes).to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.starts_with("ab00"));
        assert!(hex.ends_with("0f"));
    }

    #[test]
    fn fold_reads_little_endian_prefix() {
        let mut bytes = [0u8; DIGEST_LEN];
        bytes[0] = 1;
        bytes[7] = 0x80;
        assert_eq!(ChunkDigest::from_bytes(bytes).fold(), 0x8000_0000_0000_0001);
    }

    #[test]
    fn exact_key_prefers_whole_file_digest() {
        let whole = ContentHasher::hash(b"whole");
        let chunk = ContentHasher::hash(b"chunk");
        let mut fp = FileFingerprint {
            path: PathBuf::from("a"),
            size: 5,
            whole_file_digest: Some(whole),
            chunk_digests: vec![chunk],
            min_hash: MinHashSignature::empty(2),
            perceptual_hash: None,
        };
        assert_eq!(fp.exact_key(), whole);

        fp.whole_file_digest = None;
        assert_eq!(fp.exact_key(), ContentHasher::hash(chunk.as_bytes()));
    }
}
